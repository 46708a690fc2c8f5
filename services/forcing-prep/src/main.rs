//! Oil-spill forcing preparation.
//!
//! Subsets, converts and quantizes meteorological, ocean and wave NetCDF
//! files from a known provider into canonical forcing files, one output per
//! input with the same base name.

mod config;
mod inputs;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use config::{load_run_config, RunConfig};
use forcing::{
    native_bbox, process_files, process_files_parallel, BoundingBox, Domain, Ontology,
    ProviderRegistry, RegistryConfig,
};
use inputs::collect_inputs;

#[derive(Parser, Debug)]
#[command(name = "forcing-prep")]
#[command(about = "Prepare met/ocean/wave forcing files for oil-spill models")]
struct Args {
    /// Forcing domain: meteo, ocean or waves
    domain: Domain,

    /// Area of interest in -180..180 longitudes
    #[arg(
        long,
        num_args = 4,
        value_names = ["LON_MIN", "LON_MAX", "LAT_MIN", "LAT_MAX"],
        allow_negative_numbers = true,
        required = true
    )]
    bbox: Vec<f64>,

    /// Directory receiving the output files
    #[arg(short, long)]
    output_dir: PathBuf,

    /// Provider within the domain (default: the domain's default provider)
    #[arg(short, long)]
    provider: Option<String>,

    /// Run configuration file path
    #[arg(short, long, env = "FORCING_PREP_CONFIG")]
    config: Option<PathBuf>,

    /// Files processed concurrently (overrides the config)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Log level (overrides the config)
    #[arg(long)]
    log_level: Option<String>,

    /// Input NetCDF files or directories containing them
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

fn init_tracing(level: &str, format: &str) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true);

    if format == "pretty" {
        tracing::subscriber::set_global_default(builder.pretty().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let run_config = match &args.config {
        Some(path) => load_run_config(path)?,
        None => RunConfig::default(),
    };

    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&run_config.logging.level);
    init_tracing(log_level, &run_config.logging.format)?;
    netcdf_io::silence_hdf5_errors();

    info!(domain = %args.domain, "Starting forcing preparation");

    // Mapping problems surface here, before any input is opened.
    let ontology = Ontology::builtin();
    let registry_config = match &run_config.providers {
        Some(path) => RegistryConfig::from_path(path)
            .with_context(|| format!("Failed to load provider config {}", path.display()))?,
        None => RegistryConfig::builtin().context("Failed to load builtin provider config")?,
    };
    let registry = ProviderRegistry::from_config(&registry_config, &ontology)
        .context("Invalid provider config")?;

    let schema = match &args.provider {
        Some(name) => registry.load(args.domain, name)?,
        None => registry.load_default(args.domain)?,
    };
    info!(provider = %schema.id(), "Loaded provider schema");

    let bbox = BoundingBox::new(args.bbox[0], args.bbox[1], args.bbox[2], args.bbox[3]);
    anyhow::ensure!(
        bbox.lat_min <= bbox.lat_max,
        "Bounding box latitudes are reversed: {} > {}",
        bbox.lat_min,
        bbox.lat_max
    );
    let bbox = native_bbox(args.domain, &bbox);

    let inputs = collect_inputs(&args.inputs)?;
    let jobs = args.jobs.unwrap_or(run_config.processing.jobs);
    anyhow::ensure!(jobs > 0, "--jobs must be at least 1");
    info!(files = inputs.len(), jobs, output_dir = %args.output_dir.display(), "Processing inputs");

    if jobs == 1 {
        let written = process_files(&inputs, &bbox, &args.output_dir, schema, &ontology)?;
        info!(written = written.len(), "Done");
        return Ok(());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .context("Failed to build worker pool")?;
    let report = pool.install(|| {
        process_files_parallel(&inputs, &bbox, &args.output_dir, schema, &ontology)
    })?;

    for (input, err) in &report.failed {
        error!(input = %input.display(), error = %err, "File failed");
    }
    anyhow::ensure!(
        report.is_success(),
        "{} of {} files failed",
        report.failed.len(),
        report.total()
    );
    info!(written = report.succeeded.len(), "Done");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_negative_bbox() {
        let args = Args::try_parse_from([
            "forcing-prep",
            "waves",
            "--bbox",
            "-3",
            "3",
            "-2",
            "2",
            "--output-dir",
            "/tmp/out",
            "a.nc",
            "b.nc",
        ])
        .unwrap();
        assert_eq!(args.domain, Domain::Waves);
        assert_eq!(args.bbox, vec![-3.0, 3.0, -2.0, 2.0]);
        assert_eq!(args.inputs.len(), 2);
        assert!(args.provider.is_none());
    }

    #[test]
    fn test_unknown_domain_rejected() {
        let result = Args::try_parse_from([
            "forcing-prep",
            "atmosphere",
            "--bbox",
            "0",
            "1",
            "0",
            "1",
            "--output-dir",
            "out",
            "a.nc",
        ]);
        assert!(result.is_err());
    }
}
