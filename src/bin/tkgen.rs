//! Transform kernel generator.
//!
//! Usage: `tkgen <config> [--stats]`
//!
//! Reads a JSON kernel configuration, compiles the kernel and writes the
//! generated Rust source to the configured `output` path.

use clap::error::ErrorKind;
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tkgen::{compile, emit_rust, CompileError, CompileResult, KernelConfig};

#[derive(Parser, Debug)]
#[command(name = "tkgen", version)]
#[command(about = "Generate fixed-size DCT-II and mixed-radix FFT kernels")]
struct Args {
    /// Path to the JSON kernel configuration
    config: PathBuf,

    /// Print compilation statistics to stderr
    #[arg(long)]
    stats: bool,
}

fn run(args: &Args) -> CompileResult<String> {
    let config = KernelConfig::load(&args.config)?;
    let output_path = config.output_path(&args.config)?;

    let kernel = compile(&config)?;
    let source = emit_rust(&kernel)?;

    write_output(&output_path, &source)?;
    log::debug!("wrote {} bytes to {}", source.len(), output_path.display());

    if args.stats {
        eprint!("{}", kernel.stats);
    }

    let cost = kernel.cost();
    Ok(format!("OK! Mul/Add={}/{}.", cost.mul, cost.add))
}

fn write_output(path: &Path, source: &str) -> CompileResult<()> {
    fs::write(path, source).map_err(|source| CompileError::Io { path: path.to_path_buf(), source })
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = err.print();
            process::exit(code);
        }
    };

    match run(&args) {
        Ok(summary) => {
            log::info!("{}", summary);
            println!("{}", summary);
        }
        Err(err) => {
            eprintln!("error: {}", err);
            process::exit(1);
        }
    }
}
