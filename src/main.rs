// Fire Back wager engine - HTTP server entry point

use std::sync::Arc;
use tracing::{error, info, Level};

use fireback_wagers::{router, AppState, EngineConfig, SharedState};

#[tokio::main]
async fn main() {
    let config = EngineConfig::from_env();
    let level = config.log_level.parse::<Level>().unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).with_target(false).init();

    info!("═══════════════════════════════════════════════");
    info!("     🔥 Fire Back - Friendly Wagers Engine");
    info!("═══════════════════════════════════════════════");

    let bind_addr = config.bind_addr.clone();
    let state: SharedState = Arc::new(AppState::new(config));
    let shutdown_state = state.clone();
    let app = router(state);

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("❌ Failed to bind {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };

    info!("🚀 Server running on http://{}", bind_addr);
    info!("📋 Endpoints:");
    info!("   POST /users                    - Open a wallet");
    info!("   GET  /users/:id/balance        - Wallet balance");
    info!("   POST /bets                     - Create a bet");
    info!("   GET  /bets/:id                 - Bet with live odds");
    info!("   POST /bets/:id/wagers          - Place a stake");
    info!("   POST /bets/:id/fire-back       - Challenge the creator");
    info!("   POST /fire-backs/:id/respond   - Match or back down");
    info!("   POST /bets/:id/settle          - Settle and pay out");
    info!("   GET  /activity                 - Recent activity");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("❌ Failed to install CTRL+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("🛑 Shutdown signal received, draining requests...");
    };

    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
        error!("❌ Server error: {}", e);
    }

    // In-flight requests have finished, so the snapshot is consistent.
    if shutdown_state.save_to_disk().is_ok() {
        info!("👋 Goodbye!");
    }
}
