//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

const PROGRAMMER_HELP: &str =
    "Programmer to use, e.g. linux_spi:dev=/dev/spidev0.0,reset=25 (see list-programmers)";

#[derive(Parser)]
#[command(name = "avrisp")]
#[command(author, version, about = "AVR in-system programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Part database (RON) to use instead of the built-in one
    #[arg(long, global = true)]
    pub part_db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Enter programming mode and check the device signature
    Probe {
        /// Programmer to use
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,

        /// Part id or name (e.g. m328p, ATtiny85)
        #[arg(short = 'c', long)]
        part: String,

        /// Continue even if the signature does not match
        #[arg(short = 'F', long)]
        force: bool,
    },

    /// Erase flash and EEPROM
    Erase {
        /// Programmer to use
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,

        /// Part id or name (e.g. m328p, ATtiny85)
        #[arg(short = 'c', long)]
        part: String,

        /// Erase even if the signature does not match
        #[arg(short = 'F', long)]
        force: bool,
    },

    /// Show signature, fuses and lock byte
    Info {
        /// Programmer to use
        #[arg(short, long, help = PROGRAMMER_HELP)]
        programmer: String,

        /// Part id or name (e.g. m328p, ATtiny85)
        #[arg(short = 'c', long)]
        part: String,
    },

    /// List supported programmers
    ListProgrammers,

    /// List parts in the database
    ListParts {
        /// Only show parts whose id or name contains this text
        #[arg(long)]
        filter: Option<String>,
    },
}
