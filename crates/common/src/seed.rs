//! Reference data bootstrap
//!
//! Upserts the plan catalogue, the admin tenant and the admin user. Every
//! write is keyed by a unique column, so running the seed repeatedly
//! converges on the same rows.

use crate::auth::hash_password;
use crate::config::SeedConfig;
use crate::db::models::{Plan, PlanFeatures, PlanLimits, Tenant, User, SUPER_ADMIN_ROLE};
use crate::db::{PlanSeed, Store, TenantSeed, UserSeed};
use crate::errors::{AppError, Result};
use tracing::info;

/// Plan assigned to the admin tenant
pub const ADMIN_PLAN: &str = "Pro";

/// What the seed wrote
#[derive(Debug)]
pub struct SeedReport {
    pub plans: Vec<Plan>,
    pub tenant: Tenant,
    pub user: User,
}

/// The plan catalogue
pub fn default_plans() -> Vec<PlanSeed> {
    vec![
        PlanSeed {
            name: "Starter".to_string(),
            price: 4_900,
            active: true,
            limits: PlanLimits {
                users: 3,
                connections: 1,
                messages_per_month: 5_000,
            },
            features: PlanFeatures {
                bulk_messaging: false,
                api_access: false,
                analytics: true,
                priority_support: false,
            },
        },
        PlanSeed {
            name: ADMIN_PLAN.to_string(),
            price: 14_900,
            active: true,
            limits: PlanLimits {
                users: 20,
                connections: 5,
                messages_per_month: 100_000,
            },
            features: PlanFeatures {
                bulk_messaging: true,
                api_access: true,
                analytics: true,
                priority_support: true,
            },
        },
    ]
}

/// Run the seed against any store
pub async fn run(store: &dyn Store, config: &SeedConfig) -> Result<SeedReport> {
    let mut plans = Vec::new();
    for plan in default_plans() {
        let saved = store.upsert_plan(plan).await?;
        info!(plan_id = %saved.id, name = %saved.name, "Plan upserted");
        plans.push(saved);
    }

    let admin_plan = plans
        .iter()
        .find(|p| p.name == ADMIN_PLAN)
        .ok_or_else(|| AppError::PlanNotFound {
            name: ADMIN_PLAN.to_string(),
        })?;

    let tenant = store
        .upsert_tenant(TenantSeed {
            name: config.admin_tenant_name.clone(),
            email: config.admin_email.clone(),
            owner_name: config.admin_owner_name.clone(),
            status: "active".to_string(),
            plan_id: admin_plan.id,
        })
        .await?;
    info!(tenant_id = %tenant.id, email = %tenant.email, "Admin tenant upserted");

    let user = store
        .upsert_user(UserSeed {
            email: config.admin_email.clone(),
            password_hash: hash_password(&config.admin_password)?,
            role: SUPER_ADMIN_ROLE.to_string(),
            tenant_id: tenant.id,
        })
        .await?;
    info!(user_id = %user.id, email = %user.email, role = %user.role, "Admin user upserted");

    Ok(SeedReport {
        plans,
        tenant,
        user,
    })
}
