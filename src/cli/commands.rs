//! CLI command definitions

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "freightlink")]
#[command(about = "Freightlink - Quotation Negotiation & Order Lifecycle Engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scripted end-to-end scenario against an in-memory marketplace
    Demo,

    /// Run the quotation expiry sweep on an interval
    Sweep {
        /// Seconds between sweep passes
        #[arg(short, long, default_value = "60")]
        interval_secs: u64,
    },

    /// Compute the great-circle distance between two coordinates
    Distance {
        /// Origin latitude
        #[arg(long)]
        from_lat: f64,

        /// Origin longitude
        #[arg(long)]
        from_lon: f64,

        /// Target latitude
        #[arg(long)]
        to_lat: f64,

        /// Target longitude
        #[arg(long)]
        to_lon: f64,
    },
}
