use clap::Parser;
use snipseek_core::Config;
use snipseek_semantic::{PartitionState, SearchService};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "snipseek")]
#[command(version, about = "Semantic code snippet search over prebuilt indices", long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Search a language's snippets by what they do
    Search {
        /// Description of the code you want
        query: String,

        /// Language partition to search
        #[arg(short, long)]
        language: String,

        /// How many results to return
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the languages this instance can search
    Languages,
    /// Load everything and report per-partition state
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - helps when things go sideways
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snipseek=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Search {
            query,
            language,
            top_k,
            json,
        } => {
            let requested = top_k.unwrap_or(config.search.default_top_k);
            let top_k = requested.min(config.search.max_top_k);
            if top_k < requested {
                tracing::debug!("Capping top_k at {} (requested {})", top_k, requested);
            }

            let service = SearchService::new(config);
            let results = service.search(&query, &language, top_k).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if results.is_empty() {
                println!("No matches in the {} partition.", language);
            } else {
                for (rank, result) in results.iter().enumerate() {
                    println!(
                        "#{} similarity {:.3} (distance {:.3})",
                        rank + 1,
                        result.similarity,
                        result.distance
                    );
                    if let Some(doc) = &result.snippet.doc {
                        println!("  // {}", doc);
                    }
                    for line in result.snippet.code.lines() {
                        println!("  {}", line);
                    }
                    println!();
                }
            }
        }
        Commands::Languages => {
            for language in config.search.languages {
                println!("{}", language);
            }
        }
        Commands::Status => {
            let service = SearchService::new(config);
            service.initialize().await?;

            println!("service: {}", service.state());
            for status in service.partition_status() {
                match status.state {
                    PartitionState::Loaded {
                        snippets,
                        loaded_at,
                    } => {
                        println!(
                            "{:12} loaded ({} snippets, since {})",
                            status.language, snippets, loaded_at
                        );
                    }
                    PartitionState::Failed { error } => {
                        println!("{:12} unavailable: {}", status.language, error);
                    }
                    PartitionState::Unloaded => {
                        println!("{:12} not loaded", status.language);
                    }
                }
            }
        }
    }

    Ok(())
}
