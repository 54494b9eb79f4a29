mod depth;
mod error;
mod model;
mod pipeline;
mod protocol;
mod server;
mod source;

use anyhow::{Context, Result};
use clap::Parser;
use depth::{BoundingBox, ResampleMethod, Resampler};
use model::{BackendKind, ModelOptions};
use pipeline::DepthPipeline;
use server::Server;
use source::FileSource;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the depth model (ONNX file)
    #[arg(long, env = "DEPTHSVC_MODEL", default_value = "models/depth_pro.onnx")]
    model: PathBuf,

    /// Which depth convention the model emits
    #[arg(long, env = "DEPTHSVC_BACKEND", value_enum, default_value_t = BackendKind::InverseDepth)]
    backend: BackendKind,

    /// How model output is resized to the input image resolution
    #[arg(long, env = "DEPTHSVC_RESAMPLER", value_enum, default_value_t = ResampleMethod::Bilinear)]
    resampler: ResampleMethod,

    /// Intra-op threads for the inference session
    #[arg(long, env = "DEPTHSVC_THREADS", default_value_t = 4)]
    threads: usize,

    /// Run inference on CUDA device 0
    #[arg(long)]
    cuda: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Process a single image, print the result and exit instead of serving
    #[arg(long, value_name = "IMAGE")]
    test: Option<PathBuf>,

    /// Box to summarize in test mode
    #[arg(long, num_args = 4, value_names = ["X", "Y", "W", "H"], allow_negative_numbers = true, requires = "test")]
    bbox: Option<Vec<i64>>,
}

fn main() {
    let args = Args::parse();

    // Initialize logging; stdout carries responses, so logs go to stderr
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(args) {
        eprintln!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    tracing::info!("Depth service starting");
    tracing::info!("Backend: {:?}, resampler: {:?}", args.backend, args.resampler);

    let options = ModelOptions {
        threads: args.threads,
        cuda: args.cuda,
    };

    let load_start = Instant::now();
    let model = model::create_model(&args.model, args.backend, &options)
        .context("Failed to load depth model")?;
    tracing::info!(
        "Model ready in {:.1}s (input {:?})",
        load_start.elapsed().as_secs_f64(),
        model.input_size()
    );

    let resampler = Resampler::new(args.resampler);
    if resampler.method() == ResampleMethod::Lanczos {
        tracing::info!("Using quantized Lanczos resampling");
    }

    let mut pipeline = DepthPipeline::new(model, Box::new(FileSource), resampler);

    match args.test {
        Some(image) => {
            let boxes: Vec<BoundingBox> = args
                .bbox
                .map(|b| vec![BoundingBox::new(b[0], b[1], b[2], b[3])])
                .unwrap_or_default();

            let report = pipeline.process(&image, &boxes)?;

            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &report)?;
            writeln!(stdout)?;
            Ok(())
        }
        None => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            Server::new(pipeline).run(stdin.lock(), stdout.lock())
        }
    }
}
