//! Arcade Relay Server
//!
//! Realtime telemetry relay for casual web games: presence, leaderboards,
//! chat, and anti-cheat run tokens, broadcast over WebSocket topics.

use std::sync::Arc;
use tokio::time::interval;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use arcade_relay::{
    Broker, FeatureGate, LeaderboardStore, PresenceRegistry, RealtimeGateway, RelayConfig,
    RunTokenStore, VERSION,
};
use arcade_relay::network::RelayServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RelayConfig::from_env();
    info!("Arcade Relay v{}", VERSION);
    info!("Presence TTL: {:?}", config.presence_ttl);
    info!("Run token TTL: {:?}", config.run_token_ttl);

    let flags = Arc::new(FeatureGate::new(&config.flags));
    let presence = Arc::new(PresenceRegistry::with_ttl(config.presence_ttl));
    let leaderboard = Arc::new(LeaderboardStore::new());
    let tokens = Arc::new(RunTokenStore::with_ttl(config.run_token_ttl));
    let broker = Arc::new(Broker::new());

    let gateway = Arc::new(RealtimeGateway::new(
        flags,
        presence.clone(),
        leaderboard,
        tokens.clone(),
        broker.clone(),
    ));

    // Background sweep bounds the memory of the TTL stores; reads already
    // expire lazily.
    {
        let presence = presence.clone();
        let tokens = tokens.clone();
        let sweep_interval = config.sweep_interval;
        tokio::spawn(async move {
            let mut tick = interval(sweep_interval);
            loop {
                tick.tick().await;
                let lapsed = presence.sweep().await;
                let expired = tokens.sweep().await;
                if lapsed + expired > 0 {
                    debug!("Sweep removed {} presence entries, {} tokens", lapsed, expired);
                }
            }
        });
    }

    let server = Arc::new(RelayServer::new(config, gateway, broker));

    {
        let server = server.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received, shutting down");
                server.shutdown();
            }
        });
    }

    server.run().await?;
    Ok(())
}
