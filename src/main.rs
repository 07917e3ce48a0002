use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info, warn};

use shaderland::compile::ShaderCompiler;
use shaderland::pipeline::{self, Pipeline};
use shaderland::segment::SegmentOptions;

/// Compiles .shader documents into SPIR-V shader packs.
#[derive(Parser)]
#[command(name = "shaderland", version)]
struct Args {
    /// Input .shader files, or directories to search recursively.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Write the pack here instead of next to the input. Single input only.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Extra macro definition for every stage. May be repeated.
    #[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]")]
    defines: Vec<String>,

    /// Keep going past duplicate stage blocks and stages without an entry
    /// point instead of failing the document.
    #[arg(long)]
    lenient: bool,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let compiler = match ShaderCompiler::new() {
        Ok(compiler) => compiler,
        Err(err) => {
            error!("{err}");
            return;
        }
    };

    let options = if args.lenient {
        SegmentOptions::lenient()
    } else {
        SegmentOptions::default()
    };

    let macros = args.defines.iter().map(|raw| parse_define(raw)).collect();
    let pipeline = Pipeline::new(&compiler, options, macros);

    let inputs = pipeline::discover_inputs(&args.inputs);

    if inputs.is_empty() {
        warn!("no .shader inputs found");
        return;
    }

    if args.output.is_some() && inputs.len() > 1 {
        error!("--output requires a single input file");
        return;
    }

    let mut failed = 0usize;

    for input in &inputs {
        match pipeline.process_file(input, args.output.as_deref()) {
            Ok(output) => {
                info!("{} -> {}", input.display(), output.display());
            }
            Err(err) => {
                failed += 1;
                error!("{}: {err}", input.display());
            }
        }
    }

    if failed > 0 {
        warn!("{failed} of {} inputs failed", inputs.len());
    }
}

/// `NAME=VALUE` or bare `NAME`, which defines to 1.
fn parse_define(raw: &str) -> (String, String) {
    match raw.split_once('=') {
        Some((name, value)) => (name.to_owned(), value.to_owned()),
        None => (raw.to_owned(), "1".to_owned()),
    }
}
