use clap::{Parser, Subcommand};
use citex_extract::{
    extract_all_from_text, extract_all_from_value, normalize_citations,
    parse_deferred_response, replace_markers, MarkerStyle,
};
use std::fs;
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract citations from model output (file or stdin)
    Extract {
        /// Path to the response text; reads stdin when omitted
        input: Option<PathBuf>,

        /// Treat the input as a JSON value instead of raw text
        #[arg(long)]
        json_input: bool,

        /// Emit compact JSON instead of pretty-printed
        #[arg(long)]
        compact: bool,
    },
    /// Print the text with every citation tag in canonical form
    Normalize {
        /// Path to the response text; reads stdin when omitted
        input: Option<PathBuf>,
    },
    /// Print the visible text of a deferred response, markers resolved
    Markers {
        /// Path to the response text; reads stdin when omitted
        input: Option<PathBuf>,

        /// Replace markers with their anchor text instead of removing them
        #[arg(long)]
        anchor: bool,
    },
    /// Generate the JSON schema for citation records
    #[cfg(feature = "schema")]
    Schema,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            input,
            json_input,
            compact,
        } => {
            let text = read_input(input.as_deref());
            let record = if json_input {
                let value: serde_json::Value = match serde_json::from_str(&text) {
                    Ok(value) => value,
                    Err(e) => {
                        eprintln!("Error parsing JSON input: {}", e);
                        std::process::exit(1);
                    }
                };
                extract_all_from_value(&value)
            } else {
                extract_all_from_text(&text)
            };
            match record {
                Ok(record) => {
                    let rendered = if compact {
                        serde_json::to_string(&record)
                    } else {
                        serde_json::to_string_pretty(&record)
                    };
                    match rendered {
                        Ok(json) => println!("{}", json),
                        Err(e) => {
                            eprintln!("Error serializing result: {}", e);
                            std::process::exit(1);
                        }
                    }
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Normalize { input } => {
            let text = read_input(input.as_deref());
            match normalize_citations(&text) {
                Ok(normalized) => println!("{}", normalized),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Markers { input, anchor } => {
            let text = read_input(input.as_deref());
            let outcome = match parse_deferred_response(&text) {
                Ok(outcome) => outcome,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            if let Some(error) = &outcome.error {
                eprintln!("Warning: {}", error);
            }
            let style = if anchor {
                MarkerStyle::AnchorText
            } else {
                MarkerStyle::Remove
            };
            match replace_markers(&outcome.visible_text, &outcome.citations, style) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        #[cfg(feature = "schema")]
        Commands::Schema => {
            let schema = schemars::schema_for!(citex_core::Citation);
            match serde_json::to_string_pretty(&schema) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Error serializing schema: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

fn read_input(path: Option<&std::path::Path>) -> String {
    match path {
        Some(path) => match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("Error reading {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut text = String::new();
            if let Err(e) = std::io::stdin().read_to_string(&mut text) {
                eprintln!("Error reading stdin: {}", e);
                std::process::exit(1);
            }
            text
        }
    }
}
