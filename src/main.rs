//! avrisp - AVR in-system programmer
//!
//! Drives the serial programming interface of AVR microcontrollers through
//! a host-side programmer backend. The only backend today is `linux_spi`,
//! which talks to the target over a Linux spidev node and holds RESET with a
//! sysfs GPIO.

mod cli;
mod commands;
mod programmers;

use avrisp_core::part::{Part, PartDatabase};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG still wins over -v
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_filter(cli.verbose)),
    )
    .init();

    let loaded;
    let db: &PartDatabase = match cli.part_db.as_deref() {
        Some(path) => {
            loaded = match load_part_database(path) {
                Ok(db) => db,
                Err(e) => {
                    eprintln!("Failed to load part database: {}", e);
                    std::process::exit(1);
                }
            };
            &loaded
        }
        None => PartDatabase::builtin()?,
    };

    log::debug!("Loaded {} part definitions", db.len());

    let result = match cli.command {
        Commands::Probe {
            programmer,
            part,
            force,
        } => {
            let part = find_part(db, &part)?;
            let mut pgm = programmers::open_programmer(&programmer)?;
            commands::run_probe(&mut pgm, part, force)
        }
        Commands::Erase {
            programmer,
            part,
            force,
        } => {
            let part = find_part(db, &part)?;
            let mut pgm = programmers::open_programmer(&programmer)?;
            commands::run_erase(&mut pgm, part, force)
        }
        Commands::Info { programmer, part } => {
            let part = find_part(db, &part)?;
            let mut pgm = programmers::open_programmer(&programmer)?;
            commands::run_info(&mut pgm, part)
        }
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
        Commands::ListParts { filter } => {
            commands::list_parts(db, filter.as_deref());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Default log filter for the given number of `-v` flags
fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn load_part_database(path: &Path) -> Result<PartDatabase, Box<dyn std::error::Error>> {
    let mut db = PartDatabase::new();
    let count = db.load_file(path)?;
    log::info!("Loaded {} parts from {}", count, path.display());
    Ok(db)
}

fn find_part<'a>(db: &'a PartDatabase, name: &str) -> Result<&'a Part, String> {
    db.find(name)
        .ok_or_else(|| format!("Unknown part '{}' (see list-parts)", name))
}
