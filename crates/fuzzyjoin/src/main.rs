//! fuzzyjoin - Main Entry Point
//!
//! Joins each row of a main JSON-lines file to the closest row of a lookup
//! file.
//!
//! Usage:
//!     fuzzyjoin --config join.json --main customers.jsonl --lookup names.jsonl
//!     fuzzyjoin --list-algorithms

use std::path::PathBuf;

use clap::Parser;
use fuzzyjoin::pipeline::{load_config, Output, Pipeline, DEFAULT_CHANNEL_CAPACITY};
use fuzzyjoin_core::{AlgorithmCatalog, Similarity as _};
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "fuzzyjoin")]
#[command(about = "Fuzzy join of two JSON-lines row files")]
#[command(version)]
struct Args {
    /// Operator configuration (JSON)
    #[arg(short, long, required_unless_present = "list_algorithms")]
    config: Option<PathBuf>,

    /// Main row file
    #[arg(long, required_unless_present = "list_algorithms")]
    main: Option<PathBuf>,

    /// Lookup row file
    #[arg(long, required_unless_present = "list_algorithms")]
    lookup: Option<PathBuf>,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Override the configured algorithm
    #[arg(short, long, env = "FUZZYJOIN_ALGORITHM")]
    algorithm: Option<String>,

    /// Capacity of each row channel
    #[arg(long, env = "FUZZYJOIN_CHANNEL_CAPACITY", default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    channel_capacity: usize,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print the available algorithms and exit
    #[arg(long)]
    list_algorithms: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.list_algorithms {
        let catalog = AlgorithmCatalog::default();
        for name in catalog.names() {
            if let Some(algorithm) = catalog.get(name) {
                println!("{name}\t{:?}", algorithm.family());
            }
        }
        return Ok(());
    }

    fuzzyjoin::tracing::init_with_filter(&args.log_level);

    let (Some(config_path), Some(main_path), Some(lookup_path)) =
        (args.config, args.main, args.lookup)
    else {
        return Err("--config, --main and --lookup are required".into());
    };

    let mut config = load_config(&config_path).await?;
    if let Some(algorithm) = args.algorithm {
        config.algorithm = algorithm;
    }

    let pipeline = Pipeline::new(config).with_channel_capacity(args.channel_capacity);

    let cancel = pipeline.cancel_handle();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; cancelling join");
            cancel.cancel();
        }
    });

    let output = args.output.map_or(Output::Stdout, Output::File);
    match pipeline.run(&main_path, &lookup_path, output).await {
        Ok(summary) => {
            info!(
                main_rows = summary.stats.main_rows_read,
                lookup_rows = summary.stats.lookup_rows_read,
                index_size = summary.stats.index_size,
                "Done"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Fuzzy join failed");
            Err(e.into())
        }
    }
}
