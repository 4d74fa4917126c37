//! rowstream CLI: inspect stored Parquet objects and check stream configs.

use clap::{Parser, Subcommand};
use rowstream_core::config::StreamConfig;
use rowstream_io::readers::describe;
use rowstream_io::{FsStore, ObjectLocation};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rowstream")]
#[command(about = "rowstream: chunked typed access to Parquet objects in storage", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show row, row group and chunk counts plus the schema of a stored object
    Inspect {
        /// Local directory acting as the object store root
        #[arg(long)]
        root: PathBuf,

        /// Stream config file (YAML or JSON); flags override its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long)]
        bucket: Option<String>,

        #[arg(long)]
        key: Option<String>,

        /// Batch size used to compute the chunk count
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Load and validate a stream config file
    ValidateConfig {
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect {
            root,
            config,
            bucket,
            key,
            batch_size,
        } => {
            if let Err(e) = inspect(&root, config.as_deref(), bucket, key, batch_size) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::ValidateConfig { config } => match load_config(Some(&config)) {
            Ok(cfg) => match cfg.validate() {
                Ok(()) => println!("✓ Config is valid"),
                Err(e) => {
                    eprintln!("Validation failed: {}", e);
                    for hint in e.suggestions() {
                        eprintln!("  hint: {}", hint);
                    }
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("Validation failed: {}", e);
                std::process::exit(1);
            }
        },
    }
}

/// The config file when given, otherwise `ROWSTREAM_*` environment variables.
fn load_config(path: Option<&Path>) -> Result<StreamConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(StreamConfig::from_env()?);
    };
    let content = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let cfg = if is_json {
        StreamConfig::from_json(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };
    Ok(cfg)
}

fn inspect(
    root: &Path,
    config: Option<&Path>,
    bucket: Option<String>,
    key: Option<String>,
    batch_size: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut cfg = load_config(config)?;
    if let Some(bucket) = bucket {
        cfg.bucket = bucket;
    }
    if let Some(key) = key {
        cfg.key = key;
    }
    if let Some(batch_size) = batch_size {
        cfg.batch_size = batch_size;
    }
    cfg.validate()?;

    let store = FsStore::new(root);
    let location = ObjectLocation::new(cfg.bucket.clone(), cfg.key.clone());
    let summary = describe(&store, &location)?;

    println!("Object: {}", location);
    println!("  Size: {} bytes ({:.2} MB)", summary.size_bytes, summary.size_bytes as f64 / 1_048_576.0);
    println!("  Rows: {}", summary.num_rows);
    println!("  Row groups: {}", summary.num_row_groups());
    println!(
        "  Chunks: {} (batch size {})",
        summary.num_chunks(cfg.batch_size),
        cfg.batch_size
    );
    println!();
    println!("Row group sizes:");
    for (i, rows) in summary.row_group_rows.iter().enumerate() {
        println!("  {}. {} rows", i + 1, rows);
    }
    println!();
    println!("Schema:");
    for field in summary.schema.fields() {
        println!(
            "  {}: {:?}{}",
            field.name(),
            field.data_type(),
            if field.is_nullable() { " (nullable)" } else { "" }
        );
    }

    Ok(())
}
