use anyhow::Context;
use clap::{Parser, Subcommand};
use discussion_enricher::{
    config::Config, enrichment::KeywordExtractor, ContextPack, ContextStyle, EnrichmentConfig,
    EnrichmentService,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "enricher-cli")]
#[command(about = "Discussion enricher operator CLI", long_about = None, version)]
struct Cli {
    /// Configuration override file
    #[arg(short, long, env = "CONFIG_PATH", default_value = "config/default.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a context pack for a prompt
    Enrich {
        #[arg(value_name = "PROMPT")]
        prompt: String,

        #[arg(short, long)]
        title: Option<String>,

        /// Explicit search term (repeatable); skips extraction
        #[arg(short, long = "keyword")]
        keywords: Vec<String>,

        #[arg(short, long, default_value = "10")]
        limit: usize,

        #[arg(short = 'p', long)]
        min_points: Option<u32>,

        #[arg(short = 'a', long)]
        max_age_days: Option<u32>,

        /// integrated, reference, or appendix
        #[arg(short, long, default_value = "integrated")]
        style: ContextStyle,

        /// Rate-limit as this user
        #[arg(short, long)]
        user: Option<String>,

        /// Print the full pack as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show cache key count and memory usage
    Stats,

    /// Remove all cached context packs
    ClearCache,

    /// Show the keywords extracted from a prompt
    Keywords {
        #[arg(value_name = "PROMPT")]
        prompt: String,

        #[arg(short, long)]
        title: Option<String>,
    },
}

fn print_pack(pack: &ContextPack) {
    if pack.is_empty() {
        println!("No related discussions found (query: \"{}\")", pack.query);
        return;
    }

    println!("{}", pack.context_text);
    println!(
        "{} citation(s), cache {}",
        pack.citations.len(),
        if pack.cache_hit { "hit" } else { "miss" }
    );
    for citation in &pack.citations {
        println!(
            "  [{}] {} ({} points, {} comments)",
            citation.id, citation.title, citation.score, citation.comment_count
        );
    }
}

async fn connect(config_path: &str) -> anyhow::Result<EnrichmentService> {
    let config = Config::load_from(config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;
    EnrichmentService::from_config(&config)
        .await
        .context("Failed to initialize enrichment service")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "discussion_enricher=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Keywords { prompt, title } => {
            let keywords = KeywordExtractor::new().extract(&prompt, title.as_deref());
            if keywords.is_empty() {
                println!("(no keywords)");
            }
            for keyword in keywords {
                println!("{}", keyword);
            }
        }

        Commands::Enrich {
            prompt,
            title,
            keywords,
            limit,
            min_points,
            max_age_days,
            style,
            user,
            json,
        } => {
            let service = connect(&cli.config).await?;

            let enrichment = EnrichmentConfig {
                enabled: true,
                keywords,
                title,
                min_points,
                max_age_days,
                limit,
                context_style: style,
            };

            let pack = service
                .enrich(&prompt, &enrichment, user.as_deref())
                .await
                .context("Enrichment failed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&pack)?);
            } else {
                print_pack(&pack);
            }
        }

        Commands::Stats => {
            let service = connect(&cli.config).await?;

            let stats = service
                .cache_stats()
                .await
                .context("Failed to read cache stats")?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }

        Commands::ClearCache => {
            let service = connect(&cli.config).await?;

            let removed = service
                .clear_cache()
                .await
                .context("Failed to clear cache")?;
            println!("Removed {} cached context pack(s)", removed);
        }
    }

    Ok(())
}
