use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use tracing::info;

use knitinfo::identity::{Authenticator, StaticTokenAuthenticator};
use knitinfo::model::ListingStatus;
use knitinfo::{analytics, category, config, db, ingest, listing, priority};

#[derive(Debug, Parser)]
#[command(author, version, about = "Administrative tasks for the directory catalog")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending schema migrations and exit
    Migrate,
    /// Bulk-import companies from a CSV file
    Import {
        file: PathBuf,
        #[arg(long)]
        category: String,
        /// Bearer token identifying the uploader
        #[arg(long)]
        token: String,
    },
    /// Export companies as CSV
    Export {
        #[arg(long)]
        category: Option<String>,
        /// active or inactive
        #[arg(long)]
        status: Option<String>,
        /// Output file; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print dashboard counters as JSON
    Stats,
    /// Print monthly submission trends as JSON
    Trends {
        #[arg(long, default_value_t = 0)]
        months: i64,
    },
    /// List priorities that are still active but already expired
    ExpireCheck,
    /// Print featured categories with listing counts as JSON
    Categories {
        /// Every active category instead of the featured few
        #[arg(long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))
        .with_context(|| format!("loading {}", args.config.display()))?;
    cfg.ensure_dirs()?;

    let database_url = cfg.database_url();
    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    match args.command {
        Command::Migrate => {
            info!(%database_url, "migrations applied");
        }
        Command::Import {
            file,
            category,
            token,
        } => {
            let auth = StaticTokenAuthenticator::from_entries(&cfg.auth.tokens);
            let uploader = auth.authenticate(&token).await?;
            let reader = BufReader::new(
                File::open(&file).with_context(|| format!("opening {}", file.display()))?,
            );
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let summary = ingest::import(&pool, reader, &file_name, &category, &uploader).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Export {
            category,
            status,
            out,
        } => {
            let status = status
                .as_deref()
                .map(|s| ListingStatus::parse(s).ok_or_else(|| anyhow!("unknown status {s:?}")))
                .transpose()?;
            let listings = listing::list(&pool, category.as_deref(), status, None).await?;
            match out {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    listing::export_csv(&listings, file)?;
                    info!(count = listings.len(), path = %path.display(), "companies exported");
                }
                None => listing::export_csv(&listings, io::stdout().lock())?,
            }
        }
        Command::Stats => {
            let stats = analytics::dashboard(&pool).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Trends { months } => {
            let trends = analytics::trends(&pool, months, cfg.analytics.trend_months).await?;
            println!("{}", serde_json::to_string_pretty(&trends)?);
        }
        Command::ExpireCheck => {
            let lapsed = priority::lapsed(&pool, Utc::now()).await?;
            println!("{}", serde_json::to_string_pretty(&lapsed)?);
        }
        Command::Categories { all } => {
            let categories = if all {
                category::all(&pool).await?
            } else {
                category::featured(&pool, i64::from(cfg.analytics.featured_categories)).await?
            };
            println!("{}", serde_json::to_string_pretty(&categories)?);
        }
    }

    Ok(())
}
