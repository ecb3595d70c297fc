use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use salvo::prelude::*;
use tracing::info;
use userdesk_data::{MemoryUserStore, MigrationRunner, PgUserStore, UserHook, UserStore};
use userdesk_server::{AppState, SessionManager, config, logging, service};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        eprintln!("failed to load .env: {e}");
    }

    let conf = config::init(config::load().context("failed to load configuration")?);
    logging::init(&conf.logger)?;
    info!(listen_addr = %conf.listen_addr, "starting userdesk");

    let hook = UserHook::new(conf.admin_email.as_deref()).with_cost(conf.bcrypt_cost);
    if hook.admin_email().is_none() {
        tracing::warn!("no admin email configured; nobody will be promoted to admin");
    }

    let users: Arc<dyn UserStore> = if conf.database.is_configured() {
        info!("connecting to database");
        let pool = userdesk_data::connect_pool(&conf.database)?;
        let applied = MigrationRunner::new(pool.clone()).run_migrations()?;
        info!(applied, "database migrations completed");
        Arc::new(PgUserStore::new(pool, hook))
    } else {
        tracing::warn!("no database url configured; users are kept in memory and lost on restart");
        Arc::new(MemoryUserStore::new(hook))
    };

    let sessions = Arc::new(SessionManager::new(&conf.session));
    spawn_session_cleanup(
        sessions.clone(),
        Duration::from_secs(conf.session.cleanup_interval_minutes.max(1) * 60),
    );

    let acceptor = TcpListener::new(conf.listen_addr.as_str()).bind().await;
    info!("listening on http://{}", conf.listen_addr);
    Server::new(acceptor)
        .serve(service(AppState::new(users, sessions)))
        .await;

    Ok(())
}

fn spawn_session_cleanup(sessions: Arc<SessionManager>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = sessions.cleanup_expired_sessions().await;
            if removed > 0 {
                tracing::debug!(removed, "expired sessions removed");
            }
        }
    });
}
