//! # Orderline CLI
//!
//! Runs order or menu payloads through the engine and prints the outcomes.
//!
//! ## Usage
//! ```bash
//! # Admit one order or an array of orders
//! cargo run -p orderline-engine --bin orderline -- process orders.json
//!
//! # Read from stdin, with an explicit config file
//! cat orders.json | cargo run -p orderline-engine --bin orderline -- --config engine.toml process -
//!
//! # Create menu items one by one, reporting collisions and suggested ids
//! cargo run -p orderline-engine --bin orderline -- validate-menu menu.json
//! ```
//!
//! Exits with status 1 when any payload was not accepted.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use serde_json::Value;
use tracing::info;

use orderline_engine::telemetry::init_tracing;
use orderline_engine::{EngineConfig, MenuCatalog, OrderProcessor};

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut config_path: Option<PathBuf> = None;
    let mut positional = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_usage();
                return Ok(ExitCode::SUCCESS);
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let (command, source) = match positional.as_slice() {
        [command, source] => (command.as_str(), source.as_str()),
        _ => {
            print_usage();
            return Ok(ExitCode::from(2));
        }
    };

    let config = EngineConfig::load(config_path)?;
    let payloads = read_payloads(source)?;
    info!(count = payloads.len(), command, "Processing payloads");

    let (report, all_ok) = match command {
        "process" => {
            let processor = OrderProcessor::from_config(&config);
            let outcomes: Vec<_> = payloads.iter().map(|p| processor.process_order(p)).collect();
            let all_ok = outcomes.iter().all(|o| o.success);
            (serde_json::to_string_pretty(&outcomes)?, all_ok)
        }
        "validate-menu" => {
            let processor = OrderProcessor::from_config(&config);
            let catalog = MenuCatalog::with_rules(processor.locks().clone(), config.validation);
            let outcomes: Vec<_> = payloads.iter().map(|p| catalog.create_item(p)).collect();
            let all_ok = outcomes.iter().all(|o| o.success);
            (serde_json::to_string_pretty(&outcomes)?, all_ok)
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            return Ok(ExitCode::from(2));
        }
    };

    println!("{report}");
    Ok(if all_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Reads a JSON document from a file (or stdin for `-`). A top-level array
/// is treated as a batch.
fn read_payloads(source: &str) -> Result<Vec<Value>, Box<dyn std::error::Error>> {
    let text = if source == "-" {
        std::io::read_to_string(std::io::stdin())?
    } else {
        std::fs::read_to_string(source)?
    };

    Ok(match serde_json::from_str::<Value>(&text)? {
        Value::Array(values) => values,
        single => vec![single],
    })
}

fn print_usage() {
    eprintln!("Usage: orderline [--config <engine.toml>] <process|validate-menu> <file|->");
}
