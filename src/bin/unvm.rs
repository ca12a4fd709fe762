//! Full deobfuscation pipeline, staged so progress is visible on large
//! inputs.

use clap::Parser;
use lua_unvm::deobfuscate::{annotate, constant_folding, inline_strings};
use lua_unvm::{beautify, DeobfuscateContext, Options};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "unvm",
    version,
    about = "Recovers readable Lua from XHider-style string-hiding VMs"
)]
struct Cli {
    /// Obfuscated Lua script.
    input: PathBuf,

    /// Where to write the result; defaults to `<input>.unvm.lua`.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let source = fs::read_to_string(&cli.input)?;
    let options = Options::default();

    eprintln!("[1/6] folding constant arithmetic...");
    let folded = constant_folding::fold_constants(&source, options.max_fold_passes);

    eprintln!("[2/6] harvesting the byte pool, keys, and decoder...");
    let mut ctx = DeobfuscateContext::analyze(&folded, &options)?;
    eprintln!(
        "      pool: {} bytes, keys: {:?}, decoder: {}",
        ctx.pool.len(),
        ctx.keys,
        ctx.decoder_name
    );

    eprintln!("[3/6] decoding call sites...");
    ctx.decode_call_sites(&folded);
    eprintln!("      recovered {} strings", ctx.decoded.len());

    eprintln!("[4/6] inlining recovered strings...");
    let reconstructed =
        inline_strings::substitute_calls(&folded, &ctx.decoder_name, &ctx.decoded);

    eprintln!("[5/6] beautifying...");
    let pretty = beautify(&reconstructed, &options);

    eprintln!("[6/6] commenting out the decoder...");
    let annotated = annotate::wrap_vm_block(&pretty, &ctx.decoder_name);

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| derive_output_path(&cli.input));
    fs::write(&output, annotated)?;
    eprintln!("wrote {}", output.display());

    Ok(())
}

fn derive_output_path(input: &Path) -> PathBuf {
    let name = input.to_string_lossy();
    match name.strip_suffix(".lua") {
        Some(stem) => PathBuf::from(format!("{stem}.unvm.lua")),
        None => PathBuf::from(format!("{name}.unvm.lua")),
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
