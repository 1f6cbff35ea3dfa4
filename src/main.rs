use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use wasmcall::config::{HarnessConfig, Overrides};
use wasmcall::harness::{self, DisplaySink, Stage};

/// Load a WebAssembly module, give it an `env.print` import and call one of
/// its exports, printing the result.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Module to load [default: ./math.wasm]
    module: Option<PathBuf>,

    /// Exported function to call [default: add]
    #[arg(long, value_name = "NAME")]
    invoke: Option<String>,

    /// Argument for the call, repeated once per parameter [default: 11 22]
    #[arg(long = "arg", value_name = "VALUE", allow_hyphen_values = true)]
    args: Vec<String>,

    /// JSON file with harness settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Limit each call to this many instructions
    #[arg(long)]
    fuel: Option<u64>,

    /// Maximum depth of nested wasm calls
    #[arg(long, value_name = "N")]
    max_call_depth: Option<u32>,

    /// Maximum size of linear memory, in 64KiB pages
    #[arg(long, value_name = "PAGES")]
    max_memory_pages: Option<u32>,
}

impl Cli {
    fn overrides(self) -> Overrides {
        Overrides {
            module: self.module,
            export: self.invoke,
            args: self.args,
            fuel: self.fuel,
            max_call_depth: self.max_call_depth,
            max_memory_pages: self.max_memory_pages,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let file_config = match &cli.config {
        Some(path) => HarnessConfig::from_file(path),
        None => Ok(HarnessConfig::default()),
    };
    let config = match file_config {
        Ok(config) => config.with_overrides(cli.overrides()),
        Err(err) => {
            eprintln!("error: {} failed: {err}", Stage::Load);
            return ExitCode::FAILURE;
        }
    };

    match harness::run(&config, DisplaySink::stdout()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {} failed: {err}", err.stage());
            ExitCode::FAILURE
        }
    }
}
