//! Operator tool: repairs a malformed flight document in place.

use clap::Parser;
use skyseat_booking::FlightRepairer;
use skyseat_store::app_config::Config;
use skyseat_store::{DbClient, PostgresReservationStore};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "fix-flight", about = "Repair a malformed flight document")]
struct Args {
    /// Flight to repair.
    flight_id: Uuid,

    /// Report what would change without writing.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fix_flight=info,skyseat_booking=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    let db = DbClient::new(&config.database.url, config.database.max_connections).await?;
    let store = Arc::new(PostgresReservationStore::new(db.pool.clone()));

    let repairer = FlightRepairer::new(store, config.reservation.max_attempts);
    let outcome = repairer.repair(args.flight_id, args.dry_run).await?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if !outcome.remaining.is_empty() {
        anyhow::bail!("{} violations remain after repair", outcome.remaining.len());
    }
    Ok(())
}
