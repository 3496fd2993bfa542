// SPDX-FileCopyrightText: 2025 2025 Contributors to the pipekit project.
// SPDX-License-Identifier: Apache-2.0

//! Parses structures and caps from the command line and prints their
//! canonical form.
//!
//! ```text
//! cargo run --example structure_tool -- parse "test, message=hello"
//! cargo run --example structure_tool -- subset "a, x=(int)1" "a, x=(int)[ 0, 5 ]"
//! cargo run --example structure_tool -- caps "video/x-raw, width=640; video/x-bayer"
//! ```

mod common;

use clap::{Parser, Subcommand};
use pipekit::{Caps, Structure};
use tracing::info;

#[derive(Parser)]
#[command(version, about = "Inspect pipekit structures and caps")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a structure and print its canonical text form
    Parse {
        text: String,

        /// Print the fields as JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Check whether SUBSET is a subset of SUPERSET
    Subset { subset: String, superset: String },
    /// Parse caps and list their structures
    Caps { text: String },
}

fn main() -> Result<(), pipekit::Error> {
    common::setup_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Parse { text, json } => {
            let structure: Structure = text.parse()?;
            info!("Parsed {} with {} field(s)", structure.name(), structure.n_fields());
            if json {
                let fields: serde_json::Map<String, serde_json::Value> = structure
                    .iter()
                    .map(|(key, value)| (key.to_owned(), value.to_string().into()))
                    .collect();
                let out = serde_json::json!({ "name": structure.name(), "fields": fields });
                println!("{out:#}");
            } else {
                println!("{structure}");
            }
        }
        Command::Subset { subset, superset } => {
            let subset: Structure = subset.parse()?;
            let superset: Structure = superset.parse()?;
            println!("{}", subset.is_subset(&superset));
        }
        Command::Caps { text } => {
            let caps: Caps = text.parse()?;
            if caps.is_any() || caps.is_empty() {
                println!("{caps}");
            }
            for (i, structure) in caps.iter().enumerate() {
                println!("{i}: {structure}");
            }
        }
    }
    Ok(())
}
