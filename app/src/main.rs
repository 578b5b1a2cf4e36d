use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Local;
use clap::Parser;
use env_logger::Builder;
use glob::glob;
use log::LevelFilter;

use pcd_parser::parsers::extension_of;
use pcd_scorch::{
    default_model, list_point_cloud_files, load_model, predict_files, BatchPolicy, BatchRecord,
    ScorchConfig, ScorchError, ScorchModel, ScorchPredictor,
};

#[derive(Parser, Debug)]
#[command(
    name = "Scorch",
    about = "Estimate crown fire scorch from terrestrial lidar point clouds of single trees",
    version = "0.0.1"
)]
struct Cli {
    /// Point cloud files, directories of files, or glob patterns
    #[arg(short, long, required = true, num_args = 1.., value_name = "PATH")]
    input: Vec<String>,

    /// Model JSON; the packaged model is used when omitted
    #[arg(short, long, value_name = "FILE")]
    model: Option<PathBuf>,

    /// Pipeline configuration JSON
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write one reflectance histogram PNG per tree into this directory
    #[arg(long, value_name = "DIR")]
    plot_dir: Option<PathBuf>,

    /// CSV output; stdout when omitted
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Inputs already contain crown points only
    #[arg(long, default_value_t = false)]
    crown_only: bool,

    /// Record failing files and continue instead of aborting
    #[arg(long, default_value_t = false)]
    keep_going: bool,

    /// Number of worker threads
    #[arg(short, long)]
    jobs: Option<usize>,
}

fn expand_inputs(input_patterns: &[String]) -> Result<Vec<PathBuf>, ScorchError> {
    let mut paths = Vec::new();
    for pattern in input_patterns {
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let entries = glob(pattern).map_err(|e| ScorchError::Io {
                path: PathBuf::from(pattern),
                source: io::Error::new(io::ErrorKind::InvalidInput, e),
            })?;
            for entry in entries {
                match entry {
                    Ok(path) if extension_of(&path).is_ok() => paths.push(path),
                    Ok(path) => log::debug!("skipping {:?}", path),
                    Err(e) => log::warn!("{}", e),
                }
            }
        } else {
            let path = PathBuf::from(pattern);
            if path.is_dir() {
                paths.extend(list_point_cloud_files(&path)?);
            } else {
                paths.push(path);
            }
        }
    }
    Ok(paths)
}

fn write_records<W: Write>(writer: W, records: &[BatchRecord]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["file", "predicted_scorch", "error"])?;
    for record in records {
        let scorch = record
            .predicted_scorch
            .map(|s| s.to_string())
            .unwrap_or_default();
        let error = record.error.as_deref().unwrap_or("");
        wtr.write_record([record.file.as_str(), scorch.as_str(), error])?;
    }
    wtr.flush()?;
    Ok(())
}

fn output_records(output: Option<&Path>, records: &[BatchRecord]) -> Result<(), String> {
    let result = match output {
        Some(path) => std::fs::File::create(path)
            .map_err(csv::Error::from)
            .and_then(|file| write_records(io::BufWriter::new(file), records)),
        None => write_records(io::stdout().lock(), records),
    };
    result.map_err(|e| format!("failed to write results: {}", e))
}

fn run(args: Cli) -> Result<(), String> {
    let start = std::time::Instant::now();

    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .map_err(|e| e.to_string())?;
    }

    let config = match &args.config {
        Some(path) => ScorchConfig::from_path(path).map_err(|e| e.to_string())?,
        None => ScorchConfig::default(),
    };
    log::info!("config: {:?}", config);

    let model: std::sync::Arc<dyn ScorchModel> = match &args.model {
        Some(path) => std::sync::Arc::new(load_model(path).map_err(|e| e.to_string())?),
        None => default_model().map_err(|e| e.to_string())?,
    };

    let predictor = ScorchPredictor::new(config)
        .map_err(|e| e.to_string())?
        .assume_crown_only(args.crown_only);

    let files = expand_inputs(&args.input).map_err(|e| e.to_string())?;
    if files.is_empty() {
        return Err("no point cloud files found".to_string());
    }
    log::info!("input files: {:?}", files);

    if let Some(dir) = &args.plot_dir {
        std::fs::create_dir_all(dir).map_err(|e| format!("{:?}: {}", dir, e))?;
    }

    let policy = if args.keep_going {
        BatchPolicy::KeepGoing
    } else {
        BatchPolicy::AbortOnError
    };
    let records = predict_files(
        &files,
        &predictor,
        model.as_ref(),
        args.plot_dir.as_deref(),
        policy,
    )
    .map_err(|e| e.to_string())?;

    output_records(args.output.as_deref(), &records)?;

    let failed = records.iter().filter(|r| r.error.is_some()).count();
    log::info!(
        "Finish processing {} files ({} failed) in {:?}",
        records.len(),
        failed,
        start.elapsed()
    );
    Ok(())
}

fn main() -> ExitCode {
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Cli::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
