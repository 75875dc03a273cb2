use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use warbler_api::{AppStateInner, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warbler=debug,tower_http=debug".into()),
        )
        .init();

    // Config — DATABASE_URL selects the SQLite file; tests use in-memory
    // databases and never reach this binary.
    let db_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "warbler.db".into());
    let secret = std::env::var("WARBLER_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let host = std::env::var("WARBLER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("WARBLER_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let csrf_protect = std::env::var("WARBLER_CSRF_PROTECT")
        .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
        .unwrap_or(true);

    // Init database
    let db = warbler_db::Database::open(&PathBuf::from(&db_url))?;

    let state = Arc::new(AppStateInner {
        db,
        secret,
        csrf_protect,
    });

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Warbler listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
