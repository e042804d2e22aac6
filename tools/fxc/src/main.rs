//! Command-line driver for the HFX/HDF toolchain.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fxc", about = "Shader effect and data format compiler")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile an HFX file into a binary effect container and host module.
    Compile {
        /// Input .hfx file.
        input: PathBuf,
        /// Output directory.
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Name of the binary effect file.
        #[arg(long)]
        out_name: String,
    },
    /// Emit one shader source file per stage of every pass.
    Permutations {
        /// Input .hfx file.
        input: PathBuf,
        /// Output directory.
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Compile an HDF file into a Rust module.
    Hdf {
        /// Input .hdf file.
        input: PathBuf,
        /// Output .rs file.
        #[arg(long)]
        output: PathBuf,
        /// Emit egui reflection scaffolding.
        #[arg(long)]
        ui: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_target(false).init();

    let args = Args::parse();

    let result = match args.command {
        Command::Compile {
            input,
            out_dir,
            out_name,
        } => fx_effect::compile_hfx(&input, &out_dir, &out_name).map_err(|err| err.to_string()),
        Command::Permutations { input, out_dir } => {
            fx_effect::generate_hfx_permutations(&input, &out_dir).map_err(|err| err.to_string())
        }
        Command::Hdf { input, output, ui } => {
            fx_hdf::compile_hdf(&input, &output, ui).map_err(|err| err.to_string())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            tracing::error!("{message}");
            ExitCode::FAILURE
        }
    }
}
