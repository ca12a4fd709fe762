//! Hex inspection tool for poking at suspect literals by hand.

use clap::{Parser, Subcommand};
use lua_unvm::hex::{bytes_to_hex, find_hex_encoded_text, hex_to_bytes};
use std::error::Error;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hexutil", version, about = "Encode, decode, and hunt for hex-hidden text")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Hex-encode a text argument.
    Encode { text: String },

    /// Decode a hex string to text; non-hex characters are ignored.
    Decode { hex: String },

    /// Scan a file for quoted hex segments that decode to readable text.
    Search {
        file: PathBuf,

        /// Emit the matches as JSON instead of the report format.
        #[arg(long)]
        json: bool,
    },
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    match &cli.command {
        Command::Encode { text } => {
            println!("{}", bytes_to_hex(text.as_bytes()));
        }
        Command::Decode { hex } => {
            let bytes = hex_to_bytes(hex)?;
            println!("{}", String::from_utf8_lossy(&bytes));
        }
        Command::Search { file, json } => {
            let source = fs::read_to_string(file)?;
            let found = find_hex_encoded_text(&source);

            if *json {
                println!("{}", serde_json::to_string_pretty(&found)?);
            } else if found.is_empty() {
                eprintln!("no readable hex segments found");
            } else {
                for m in &found {
                    let preview = if m.hex.len() > 30 {
                        format!("{}...", &m.hex[..30])
                    } else {
                        m.hex.clone()
                    };
                    println!("[{}] Hex: {}", m.position, preview);
                    println!("     Dec: {}", m.decoded);
                    println!("{}", "-".repeat(40));
                }
            }
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
