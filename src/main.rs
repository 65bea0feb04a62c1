//! Freightlink CLI binary

use clap::Parser;
use freightlink::cli::{run_demo, Cli, Commands};
use freightlink::routing::GeoPoint;
use freightlink::Marketplace;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo => {
            tracing::info!("Running the marketplace demo scenario");
            run_demo().await?;
        }

        Commands::Sweep { interval_secs } => {
            tracing::info!(interval_secs, "Starting quotation expiry sweep. Press Ctrl+C to stop.");
            let (market, _events) = Marketplace::new();
            market
                .run_expiry_sweep(std::time::Duration::from_secs(interval_secs))
                .await;
        }

        Commands::Distance {
            from_lat,
            from_lon,
            to_lat,
            to_lon,
        } => {
            let from = GeoPoint::new(from_lat, from_lon);
            let to = GeoPoint::new(to_lat, to_lon);
            println!("{:.2} km", from.distance_km(&to));
        }
    }

    Ok(())
}
