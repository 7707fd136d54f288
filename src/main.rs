use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use flowtrace::{
    batch,
    cli::{Cli, OutputFormat},
    config::FlowConfig,
    csv_output::CsvOutput,
    json_output::JsonOutput,
    provider::{FieldMap, JsonExportProvider},
    text_output,
};
use regex::Regex;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Resolve the observation horizon
fn observation_time(now: Option<&str>) -> Result<DateTime<Utc>> {
    match now {
        Some(raw) => Ok(DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("Invalid --now timestamp: {}", raw))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

/// Load configuration, applying command-line overrides
fn load_config(args: &Cli) -> Result<FlowConfig> {
    let mut config = match &args.config {
        Some(path) => FlowConfig::from_file(path)?,
        None => FlowConfig::default(),
    };

    if let Some(jobs) = args.jobs {
        if jobs == 0 {
            anyhow::bail!("Invalid value for --jobs: {} (must be >= 1)", jobs);
        }
        config.jobs = jobs;
    }

    Ok(config)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = load_config(&args)?;
    let now = observation_time(args.now.as_deref())?;

    let filter = match &args.filter {
        Some(expr) => {
            Some(Regex::new(expr).with_context(|| format!("Invalid --filter regex: {}", expr))?)
        }
        None => None,
    };

    let provider =
        JsonExportProvider::from_path(&args.input)?.with_field_map(FieldMap::from_config(&config));
    let item_ids: Vec<String> = provider
        .item_ids()
        .into_iter()
        .filter(|id| filter.as_ref().map_or(true, |re| re.is_match(id)))
        .collect();

    tracing::info!("Processing {} items (horizon {})", item_ids.len(), now);

    let report = batch::run_batch(&provider, &item_ids, &config, now);

    match args.format {
        OutputFormat::Text => print!("{}", text_output::format_report(&report)),
        OutputFormat::Json => println!("{}", JsonOutput::from_report(&report, now).to_json()?),
        OutputFormat::Csv => {
            let mut csv = CsvOutput::new();
            for row in report.rows.iter().cloned() {
                csv.add_row(row);
            }
            print!("{}", csv.to_csv());
            for failure in &report.failures {
                eprintln!("flowtrace: failed {}", failure);
            }
        }
    }

    Ok(())
}
