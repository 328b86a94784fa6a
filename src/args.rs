use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Transform an HMS accounting export into Odoo import sheets and
/// reconciliation reports.
#[derive(Parser, Debug)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Rewrite the HMS export into one Odoo import sheet per journal
    Transform {
        /// Path to the HMS export (CSV)
        input: PathBuf,

        /// Directory receiving one CSV per journal
        #[clap(short, long, default_value = "out")]
        out_dir: PathBuf,

        /// Optional two-column old-id/new-id partner mapping table (CSV)
        #[clap(long)]
        partner_map: Option<PathBuf>,
    },

    /// Extract reference codes (trailing comment segment) from AC2/VEN rows
    ExtractRefs {
        /// Path to the HMS export (CSV)
        input: PathBuf,

        /// Output CSV file
        #[clap(short, long, default_value = "reference_codes.csv")]
        output: PathBuf,
    },

    /// Extract address codes (second-to-last comment segment) from AC2/VEN rows
    ExtractAddresses {
        /// Path to the HMS export (CSV)
        input: PathBuf,

        /// Output CSV file
        #[clap(short, long, default_value = "address_codes.csv")]
        output: PathBuf,
    },

    /// Fill the repeating attribute blocks of a destination template from
    /// VEN/AC2 rows, spilling unmatched keys into a separate sheet
    Reconcile {
        /// Path to the HMS export (CSV)
        input: PathBuf,

        /// Destination template exported from Odoo (CSV)
        #[clap(short, long)]
        template: PathBuf,

        /// Directory receiving the filled template and the spill sheet
        #[clap(short, long, default_value = "out")]
        out_dir: PathBuf,
    },
}

pub fn parse() -> Args {
    Args::parse()
}
