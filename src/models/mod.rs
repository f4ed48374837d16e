pub mod context;
pub mod item;

pub use context::*;
pub use item::*;
