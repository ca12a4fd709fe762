//! Standalone flat constant folder. A conservative subset of the pipeline's
//! folding for scripts that only need their arithmetic cleaned up.

use clap::Parser;
use lua_unvm::deobfuscate::constant_folding::fold_flat;
use lua_unvm::Options;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "simplify",
    version,
    about = "Folds fully-delimited numeric arithmetic in a Lua script"
)]
struct Cli {
    input: PathBuf,

    /// Where to write the result; defaults to `<input>.simplified.lua`.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let source = fs::read_to_string(&cli.input)?;
    let options = Options::default();

    let simplified = fold_flat(&source, options.flat_fold_passes);

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| derive_output_path(&cli.input));
    fs::write(&output, simplified)?;
    eprintln!("wrote {}", output.display());

    Ok(())
}

fn derive_output_path(input: &Path) -> PathBuf {
    let name = input.to_string_lossy();
    match name.strip_suffix(".lua") {
        Some(stem) => PathBuf::from(format!("{stem}.simplified.lua")),
        None => PathBuf::from(format!("{name}.final.lua")),
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
