//! Storage abstraction shared by the SeaORM repository and the in-memory store

use crate::db::models::{Contact, Plan, PlanFeatures, PlanLimits, Tenant, User};
use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

/// A fully resolved contact ready to be inserted
#[derive(Debug, Clone)]
pub struct NewContact {
    pub tenant_id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub status: String,
    /// Used for `created_at`, `updated_at` and `last_message_at`
    pub created_at: DateTime<Utc>,
}

/// Partial update merged into an existing contact.
///
/// Unknown keys are ignored so that clients may send back a full contact
/// document; `id` and `company_id` are never writable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactPatch {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub phone: Option<String>,

    /// `Some(None)` clears the address
    #[serde(default, deserialize_with = "present")]
    pub email: Option<Option<String>>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
}

// Distinguishes an explicit `null` from an absent key.
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Plan reference data, upserted by name
#[derive(Debug, Clone)]
pub struct PlanSeed {
    pub name: String,
    pub price: i64,
    pub active: bool,
    pub limits: PlanLimits,
    pub features: PlanFeatures,
}

/// Tenant upserted by email
#[derive(Debug, Clone)]
pub struct TenantSeed {
    pub name: String,
    pub email: String,
    pub owner_name: String,
    pub status: String,
    pub plan_id: Uuid,
}

/// User upserted by email. The hash is only written on first insert.
#[derive(Debug, Clone)]
pub struct UserSeed {
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub tenant_id: Uuid,
}

/// Data access used by the service layer and the seed routine
#[async_trait]
pub trait Store: Send + Sync {
    /// Check connectivity
    async fn ping(&self) -> Result<()>;

    async fn find_tenant(&self, id: Uuid) -> Result<Option<Tenant>>;

    /// All contacts of a tenant, most recent activity first
    async fn list_contacts(&self, tenant_id: Uuid) -> Result<Vec<Contact>>;

    async fn find_contact(&self, id: Uuid) -> Result<Option<Contact>>;

    async fn insert_contact(&self, contact: NewContact) -> Result<Contact>;

    /// Apply a patch; fails with `ContactNotFound` when the id is unknown
    async fn update_contact(&self, id: Uuid, patch: ContactPatch) -> Result<Contact>;

    /// Returns whether a row was removed
    async fn delete_contact(&self, id: Uuid) -> Result<bool>;

    async fn upsert_plan(&self, plan: PlanSeed) -> Result<Plan>;

    async fn upsert_tenant(&self, tenant: TenantSeed) -> Result<Tenant>;

    async fn upsert_user(&self, user: UserSeed) -> Result<User>;
}
