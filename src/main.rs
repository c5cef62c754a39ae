use std::sync::Arc;

use profile_wizard::config::WizardConfig;
use profile_wizard::store::{LibSqlStore, MemoryStore, SettingsStore};
use profile_wizard::wizard::{WizardManager, wizard_routes};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = WizardConfig::from_env()?;

    eprintln!("🎓 Profile Wizard v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Wizard WS: ws://0.0.0.0:{}/ws", config.port);
    eprintln!("   Wizard API: http://0.0.0.0:{}/api/wizard/status", config.port);
    eprintln!("   User: {}", config.user_id);

    // ── Database ─────────────────────────────────────────────────────────
    let store: Arc<dyn SettingsStore> = match &config.db_path {
        Some(path) => {
            let store = LibSqlStore::new_local(path).await.map_err(|e| {
                eprintln!("Error: Failed to open database at {}: {}", path.display(), e);
                e
            })?;
            eprintln!("   Database: {}", path.display());
            Arc::new(store)
        }
        None => {
            eprintln!("   Database: in-memory (progress is not kept across restarts)");
            Arc::new(MemoryStore::new())
        }
    };

    // ── Wizard ───────────────────────────────────────────────────────────
    let manager = WizardManager::new(config.clone(), store);
    match manager.restore().await {
        Ok(true) => {
            let status = manager.status().await;
            eprintln!(
                "   Resumed session at step {} ({}%)",
                status.current, status.progress
            );
        }
        Ok(false) => eprintln!("   Starting a new session"),
        Err(e) => tracing::warn!(error = %e, "Could not load saved wizard state"),
    }

    let app = wizard_routes(manager);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Wizard server started");
    axum::serve(listener, app).await?;

    Ok(())
}
