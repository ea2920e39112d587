#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the noise complaint ingestion tool.

use clap::{Parser, Subcommand};
use quiet_spaces_ingest::refresh_complaints;
use quiet_spaces_source::socrata::SocrataClient;
use quiet_spaces_store::ComplaintStore;
use quiet_spaces_store::postgrest::SupabaseStore;

#[derive(Parser)]
#[command(name = "quiet_spaces_ingest", about = "Noise complaint ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the past week of noise complaints and upsert them into the store
    Refresh {
        /// Records per page requested from NYC Open Data
        #[arg(long)]
        page_size: Option<u64>,
    },
    /// Print the number of complaints in the store
    Count,
    /// Print one stored complaint as JSON
    Show {
        /// Complaint unique key
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let store = SupabaseStore::from_env()?;

    match cli.command {
        Commands::Refresh { page_size } => {
            let mut source = SocrataClient::from_env()?;
            if let Some(page_size) = page_size {
                source = source.with_page_size(page_size);
            }
            let summary = refresh_complaints(&source, &store).await?;
            println!("Fetched {} complaints, upserted {}", summary.fetched, summary.inserted);
        }
        Commands::Count => {
            println!("{}", store.count().await?);
        }
        Commands::Show { id } => match store.fetch_by_id(&id).await? {
            Some(complaint) => println!("{}", serde_json::to_string_pretty(&complaint)?),
            None => {
                log::error!("No complaint with unique_key {id}");
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
