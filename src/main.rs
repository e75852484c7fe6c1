mod args;
mod tally;

use clap::Parser;
use log::{info, warn};
use serde_json::Value as JSValue;
use snafu::ErrorCompat;

use crate::args::Args;
use crate::tally::config_reader::DocumentSource;
use crate::tally::{run_batch, run_single, TallyError, TallyResult};

fn single_source(args: &Args, input: &str) -> DocumentSource {
    DocumentSource {
        provider: args
            .input_type
            .clone()
            .unwrap_or_else(|| "json".to_string()),
        file_path: input.to_string(),
        constituency_number: args
            .constituency_number
            .clone()
            .map(JSValue::String),
        constituency_name: args.constituency_name.clone(),
        tracked_parties: if args.tracked_party.is_empty() {
            None
        } else {
            Some(args.tracked_party.clone())
        },
        major_parties: None,
        stations_path: None,
        fallback_center: None,
    }
}

fn run(args: &Args) -> TallyResult<()> {
    match (&args.config, &args.input) {
        (Some(config), None) => {
            let js = run_batch(config, args.reference.as_deref())?;
            let failed = js["documents"]
                .as_array()
                .map(|l| l.iter().filter(|d| d["status"] == "failed").count())
                .unwrap_or(0);
            info!("Batch done, {} failed documents", failed);
            Ok(())
        }
        (None, Some(input)) => {
            let source = single_source(args, input);
            run_single(&source, args.out.as_deref(), args.reference.as_deref())?;
            Ok(())
        }
        (Some(_), Some(_)) => {
            snafu::whatever!("--config and --input cannot be used together")
        }
        (None, None) => {
            snafu::whatever!("Either --config or --input must be provided")
        }
    }
}

fn report(e: &TallyError) {
    warn!("Error occured {:?}", e);
    eprintln!("An error occured {}", e);
    let mut current = std::error::Error::source(e);
    while let Some(cause) = current {
        eprintln!("  caused by: {}", cause);
        current = cause.source();
    }
    if let Some(bt) = ErrorCompat::backtrace(e) {
        eprintln!("trace: {}", bt);
    }
}

fn main() {
    let args = Args::parse();
    if args.verbose {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }
    info!("args: {:?}", args);

    if let Err(e) = run(&args) {
        report(&e);
        std::process::exit(1);
    }
}
