//! Bombfield server binary.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: 64x32 board, 30 ticks/s, listening on 0.0.0.0:8080
//! bombfield-server
//!
//! # Override anything from a JSON file; missing fields keep their defaults
//! bombfield-server server.json
//! ```
//!
//! Set `RUST_LOG=debug` to see protocol noise, `RUST_LOG=trace` for every
//! tick.

use bombfield::prelude::*;

const DEFAULT_BIND: &str = "0.0.0.0:8080";

fn parse_config(json: &str) -> Result<ServerConfig, serde_json::Error> {
    serde_json::from_str(json)
}

fn load_config(path: Option<&str>) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(parse_config(&std::fs::read_to_string(path)?)?),
        None => Ok(ServerConfig {
            bind_addr: DEFAULT_BIND.to_owned(),
            ..ServerConfig::default()
        }),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    bombfield::init_tracing();

    let path = std::env::args().nth(1);
    let config = load_config(path.as_deref())?;
    tracing::info!(
        bind = %config.bind_addr,
        width = config.room.game.width,
        height = config.room.game.height,
        tick_rate_hz = config.room.tick.tick_rate_hz,
        "starting Bombfield server"
    );

    let server = BombfieldServer::builder().config(config).build().await?;
    tracing::info!("listening on {}", server.local_addr()?);
    server.run().await?;
    Ok(())
}
