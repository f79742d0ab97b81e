//! Repository pattern for database operations
//!
//! SeaORM-backed implementation of [`Store`]. Reads go to the replica
//! when one is configured, writes always go to the primary.

use crate::db::models::*;
use crate::db::store::{ContactPatch, NewContact, PlanSeed, Store, TenantSeed, UserSeed};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }
}

#[async_trait]
impl Store for Repository {
    // ========================================================================
    // Health Check
    // ========================================================================

    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Tenant Operations
    // ========================================================================

    async fn find_tenant(&self, id: Uuid) -> Result<Option<Tenant>> {
        TenantEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Contact Operations
    // ========================================================================

    async fn list_contacts(&self, tenant_id: Uuid) -> Result<Vec<Contact>> {
        ContactEntity::find()
            .filter(ContactColumn::CompanyId.eq(tenant_id))
            .order_by_desc(ContactColumn::LastMessageAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn find_contact(&self, id: Uuid) -> Result<Option<Contact>> {
        ContactEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn insert_contact(&self, contact: NewContact) -> Result<Contact> {
        let now = contact.created_at;

        let model = ContactActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(contact.tenant_id),
            name: Set(contact.name),
            phone: Set(contact.phone),
            email: Set(contact.email),
            status: Set(contact.status),
            last_message_at: Set(now.into()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        model.insert(self.write_conn()).await.map_err(Into::into)
    }

    async fn update_contact(&self, id: Uuid, patch: ContactPatch) -> Result<Contact> {
        let mut contact: ContactActiveModel = ContactEntity::find_by_id(id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::ContactNotFound { id: id.to_string() })?
            .into();

        if let Some(name) = patch.name {
            contact.name = Set(name);
        }

        if let Some(phone) = patch.phone {
            contact.phone = Set(phone);
        }

        if let Some(email) = patch.email {
            contact.email = Set(email);
        }

        if let Some(status) = patch.status {
            contact.status = Set(status);
        }

        if let Some(at) = patch.last_message_at {
            contact.last_message_at = Set(at.into());
        }

        contact.updated_at = Set(Utc::now().into());

        contact.update(self.write_conn()).await.map_err(Into::into)
    }

    async fn delete_contact(&self, id: Uuid) -> Result<bool> {
        let result = ContactEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Seed Operations
    // ========================================================================

    async fn upsert_plan(&self, plan: PlanSeed) -> Result<Plan> {
        let now = Utc::now();

        let model = PlanActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(plan.name),
            price: Set(plan.price),
            active: Set(plan.active),
            limits: Set(serde_json::to_value(&plan.limits)?),
            features: Set(serde_json::to_value(&plan.features)?),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        PlanEntity::insert(model)
            .on_conflict(
                OnConflict::column(PlanColumn::Name)
                    .update_columns([
                        PlanColumn::Price,
                        PlanColumn::Active,
                        PlanColumn::Limits,
                        PlanColumn::Features,
                        PlanColumn::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_with_returning(self.write_conn())
            .await
            .map_err(Into::into)
    }

    async fn upsert_tenant(&self, tenant: TenantSeed) -> Result<Tenant> {
        let now = Utc::now();

        let model = TenantActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(tenant.name),
            email: Set(tenant.email),
            owner_name: Set(tenant.owner_name),
            status: Set(tenant.status),
            plan_id: Set(tenant.plan_id),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        TenantEntity::insert(model)
            .on_conflict(
                OnConflict::column(TenantColumn::Email)
                    .update_columns([
                        TenantColumn::Name,
                        TenantColumn::OwnerName,
                        TenantColumn::Status,
                        TenantColumn::PlanId,
                        TenantColumn::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_with_returning(self.write_conn())
            .await
            .map_err(Into::into)
    }

    async fn upsert_user(&self, user: UserSeed) -> Result<User> {
        let now = Utc::now();

        let model = UserActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(user.email),
            password_hash: Set(user.password_hash),
            role: Set(user.role),
            tenant_id: Set(user.tenant_id),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        // password_hash is left out so a re-seed never resets a changed password
        UserEntity::insert(model)
            .on_conflict(
                OnConflict::column(UserColumn::Email)
                    .update_columns([
                        UserColumn::Role,
                        UserColumn::TenantId,
                        UserColumn::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_with_returning(self.write_conn())
            .await
            .map_err(Into::into)
    }
}
