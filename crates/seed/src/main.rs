//! ContactDesk seed tool
//!
//! Applies migrations and upserts the plan catalogue, the admin tenant and
//! the admin user. Safe to run repeatedly.

use contactdesk_common::{auth::JwtManager, config::AppConfig, db, seed};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if config.observability.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!("Seeding ContactDesk v{}", contactdesk_common::VERSION);

    if config.database.is_in_memory() {
        warn!("Seeding the in-memory store; nothing will persist after exit");
    }

    let store = db::connect_store(&config.database).await?;
    let report = seed::run(store.as_ref(), &config.seed).await?;

    let plan_names: Vec<&str> = report.plans.iter().map(|p| p.name.as_str()).collect();
    info!(
        plans = ?plan_names,
        tenant_id = %report.tenant.id,
        user_id = %report.user.id,
        admin_email = %report.user.email,
        "Seed complete"
    );

    if let Some(secret) = config.auth.jwt_secret.as_deref() {
        let token = JwtManager::new(secret, config.auth.jwt_expiration_secs).generate_token(
            report.user.id,
            report.tenant.id,
            &report.user.role,
        )?;
        info!(token = %token, "Admin bearer token");
    }

    Ok(())
}
