use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use onnx_digits::{
    config::{Config, DEFAULT_BIND_ADDR, DEFAULT_DIGITS_DIR, DEFAULT_MODEL_PATH},
    image::{PreprocessOptions, ResultFormatter},
    models::ModelManager,
    recognition::{BatchScanner, DigitRecognizer},
    web::serve,
    ErrorStage,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "onnx-digits")]
#[command(about = "Handwritten digit recognition service powered by ONNX Runtime")]
struct Args {
    /// Trained classifier exported as ONNX
    #[arg(long, global = true, env = "DIGITS_MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    model: PathBuf,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Enable development mode
    #[arg(long, global = true)]
    dev: bool,

    /// Number of worker threads
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Resampling filter: triangle, catmullrom, gaussian or lanczos3
    #[arg(long, global = true, default_value = "catmullrom")]
    filter: String,

    /// Skip the ink inversion step
    #[arg(long, global = true)]
    no_invert: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the drawing canvas and the /predict API
    Serve {
        /// Server bind address
        #[arg(long, default_value = DEFAULT_BIND_ADDR)]
        bind: String,
    },
    /// Classify digit1.png, digit2.png, ... from a directory
    Batch {
        #[arg(long, default_value = DEFAULT_DIGITS_DIR)]
        digits_dir: PathBuf,

        /// Write each preprocessed 28x28 image here
        #[arg(long)]
        dump_dir: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Classify a single image file
    Predict {
        image: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    // 初始化日志系统
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let preprocess = PreprocessOptions::default()
        .with_filter(PreprocessOptions::parse_filter(&args.filter)?)
        .with_invert(!args.no_invert);

    let (bind, digits_dir) = match &args.command {
        Command::Serve { bind } => (bind.clone(), PathBuf::from(DEFAULT_DIGITS_DIR)),
        Command::Batch { digits_dir, .. } => (DEFAULT_BIND_ADDR.to_string(), digits_dir.clone()),
        Command::Predict { .. } => (DEFAULT_BIND_ADDR.to_string(), PathBuf::from(DEFAULT_DIGITS_DIR)),
    };

    let config = Config::new(bind, args.model.clone(), digits_dir, args.workers, args.dev)?
        .with_preprocess(preprocess);

    tracing::info!("Model path: {}", config.model_path.display());

    let models = match ModelManager::load(&config) {
        Ok(models) => Arc::new(models),
        Err(e) if e.stage() == ErrorStage::ModelLoad => {
            tracing::error!(
                "No usable model. Train the classifier and export it to {} (or pass --model)",
                config.model_path.display()
            );
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    match args.command {
        Command::Serve { .. } => {
            tracing::info!("Starting digit recognition service...");
            tracing::info!("Worker threads: {}", config.workers);

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(config.workers)
                .enable_all()
                .build()
                .context("failed to build tokio runtime")?;

            runtime.block_on(serve(config, models))?;
        }
        Command::Batch { dump_dir, json, .. } => {
            let recognizer = DigitRecognizer::new(models.classifier(), config.preprocess);
            let mut scanner = BatchScanner::new(&config.digits_dir);
            if let Some(dump_dir) = dump_dir {
                scanner = scanner.with_dump_dir(dump_dir);
            }

            let report = scanner.run(&recognizer)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.to_text());
            }
        }
        Command::Predict { image, json } => {
            let recognizer = DigitRecognizer::new(models.classifier(), config.preprocess);
            let recognition = recognizer
                .recognize_path(&image)
                .with_context(|| format!("failed to classify {}", image.display()))?;

            if json {
                let report = ResultFormatter::report(&recognition.prediction);
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{}: {}",
                    image.display(),
                    ResultFormatter::format_summary(&recognition.prediction)
                );
                println!("{}", ResultFormatter::format_distribution(&recognition.prediction));
            }
        }
    }

    Ok(())
}
