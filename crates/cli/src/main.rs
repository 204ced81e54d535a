use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use referrals_core::config::{
    bundle_creation_from_env, referral_data_dir_from_env, referral_data_dir_from_env_value,
};
use referrals_core::service::replace_record;
use referrals_core::{BundleCreator, FileReferralRepository, ReferralRecord, ReferralRepository};

#[derive(Parser)]
#[command(name = "referrals")]
#[command(about = "Referral document viewer and editor")]
struct Cli {
    /// Store root (defaults to REFERRAL_DATA_DIR, then "referral_data")
    #[arg(long, global = true)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all stored referrals
    List,
    /// Print one stored referral document
    Show {
        /// Referral document id (GUID)
        id: String,
    },
    /// Replace a stored referral document with the contents of a JSON file
    Edit {
        /// Referral document id (GUID)
        id: String,
        /// JSON file holding the full replacement document
        file: PathBuf,
    },
    /// Print the FHIR bundle synthesized from a stored referral
    Render {
        /// Referral document id (GUID)
        id: String,
    },
}

fn summary_line(record: &ReferralRecord) -> String {
    let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".into());
    format!(
        "ID: {}, Case: {}, NHS: {}, Created: {}",
        record.id,
        field(&record.case_number),
        field(&record.nhs_number),
        field(&record.creation_date)
    )
}

fn read_record(file: &Path) -> Result<ReferralRecord, Box<dyn std::error::Error>> {
    let contents = fs::read_to_string(file)?;
    Ok(serde_json::from_str(&contents)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("referrals_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let data_dir = match cli.data_dir {
        Some(dir) => referral_data_dir_from_env_value(Some(dir)),
        None => referral_data_dir_from_env(),
    };
    let repository = FileReferralRepository::new(data_dir);

    match cli.command {
        Some(Commands::List) => {
            let mut records = repository.get_all()?;
            if records.is_empty() {
                println!("No referrals found.");
            } else {
                records.sort_by(|a, b| a.creation_date.cmp(&b.creation_date));
                for record in &records {
                    println!("{}", summary_line(record));
                }
            }
        }
        Some(Commands::Show { id }) => match repository.get_by_id(&id) {
            Ok(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            Err(e) => eprintln!("Error reading referral {}: {}", id, e),
        },
        Some(Commands::Edit { id, file }) => {
            let record = read_record(&file)?;
            match replace_record(&repository, &id, &record) {
                Ok(()) => println!("Updated referral {}", id),
                Err(e) => eprintln!("Error updating referral {}: {}", id, e),
            }
        }
        Some(Commands::Render { id }) => {
            let config = bundle_creation_from_env()?;
            let record = repository.get_by_id(&id)?;
            let bundle = BundleCreator::create_bundle(&record, &config)?;
            println!("{}", bundle.render()?);
        }
        None => {
            println!("Use 'referrals --help' for commands");
        }
    }

    Ok(())
}
