// ==============================================================================
// main.rs - Prevalence CLI Entry Point
// ==============================================================================
// Description: Offline calculation and shared-annotation sync commands
// Author: Matt Barham
// Created: 2026-10-09
// Modified: 2026-10-17
// Version: 1.1.0
// ==============================================================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use prevalence_core::annotation::AnnotationSession;
use prevalence_core::calculations::{self, CalculationResult};
use prevalence_core::config::{DatabaseConfig, SessionConfig};
use prevalence_core::frequency::CalculationOptions;
use prevalence_core::models::{Selection, VariantList};
use prevalence_core::store::{AnnotationStore, PgStore, VariantListSource};
use prevalence_core::validator::validate_variant_list;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute carrier frequency and prevalence for a variant list file
    Calculate {
        /// Variant list JSON document
        #[arg(short, long)]
        input: PathBuf,

        /// Count homozygote alleles towards carrier frequency
        #[arg(long)]
        include_homozygotes: bool,

        /// Restrict to these variant ids (repeatable; default: all variants)
        #[arg(long = "selected")]
        selected: Vec<String>,

        /// Pretty-print the JSON result
        #[arg(long)]
        pretty: bool,
    },

    /// Load a list's shared annotation, migrating legacy calculations
    Sync {
        /// Variant list ID
        #[arg(short, long)]
        list_id: Uuid,

        /// Database URL (or use DATABASE_URL_FILE env var)
        #[arg(long, env)]
        database_url: Option<String>,

        /// Create the store tables if missing
        #[arg(long)]
        ensure_schema: bool,

        /// Pretty-print the JSON result
        #[arg(long)]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing (stderr; stdout carries the JSON result)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prevalence_core=info,prevalence=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let output = match args.command {
        Command::Calculate {
            input,
            include_homozygotes,
            selected,
            pretty,
        } => {
            let options = CalculationOptions {
                include_homozygotes_in_calculations: include_homozygotes,
            };
            let result = run_calculate(&input, selected, options)?;
            render(&result, pretty)?
        }
        Command::Sync {
            list_id,
            database_url,
            ensure_schema,
            pretty,
        } => match run_sync(list_id, database_url, ensure_schema).await? {
            Some(result) => render(&result, pretty)?,
            None => "null".to_string(),
        },
    };

    println!("{}", output);

    Ok(())
}

/// Read and validate a variant list document
fn read_variant_list(path: &Path) -> Result<VariantList> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read variant list {}", path.display()))?;
    let list: VariantList = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse variant list {}", path.display()))?;

    validate_variant_list(&list).context("Variant list failed validation")?;

    Ok(list)
}

fn run_calculate(path: &Path, selected: Vec<String>, options: CalculationOptions) -> Result<CalculationResult> {
    let list = read_variant_list(path)?;

    if !list.is_ready() {
        anyhow::bail!(
            "Variant list {} is not ready (status: {}); calculations are only valid for ready lists",
            list.id,
            list.status.as_str()
        );
    }

    let selection = Selection::from_ids(selected);
    if let Selection::Subset(ids) = &selection {
        let known = list.variant_ids();
        for id in ids.iter().filter(|id| !known.contains(*id)) {
            warn!("Selected variant {} is not in list {}", id, list.id);
        }
    }

    let variants = selection.resolve(&list);
    info!(
        "Calculating list {} over {} of {} variants",
        list.id,
        variants.len(),
        list.variants.len()
    );

    Ok(calculations::calculate(&list, &variants, options))
}

async fn run_sync(
    list_id: Uuid,
    database_url: Option<String>,
    ensure_schema: bool,
) -> Result<Option<CalculationResult>> {
    let database = DatabaseConfig::resolve(database_url)?;
    let session_config = SessionConfig::from_env()?;

    let store = Arc::new(
        PgStore::connect(&database)
            .await
            .context("Failed to connect to database")?,
    );

    if ensure_schema {
        store.ensure_schema().await.context("Failed to create store tables")?;
    }

    let list = store
        .get_variant_list(list_id)
        .await
        .with_context(|| format!("Failed to read variant list {}", list_id))?;

    let annotation_store: Arc<dyn AnnotationStore> = store.clone();
    let session = AnnotationSession::new(list, annotation_store, &session_config);

    session
        .load()
        .await
        .with_context(|| format!("Failed to load shared annotation for {}", list_id))?;
    session.flush().await;

    if let Some(notification) = session.notification().get() {
        warn!("{:?}: {}", notification.kind, notification.message);
    }

    info!("Shared annotation for list {} is up to date", list_id);

    Ok(session.calculations().get())
}

fn render(result: &CalculationResult, pretty: bool) -> Result<String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    Ok(rendered)
}
