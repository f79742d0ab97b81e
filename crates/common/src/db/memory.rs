//! In-process [`Store`] selected with `database.url = "memory://"`.
//!
//! Mirrors the relational constraints of the schema: unique plan names,
//! unique tenant and user emails, and contacts that must reference an
//! existing tenant. Nothing survives a restart.

use crate::db::models::{Contact, Plan, Tenant, User};
use crate::db::store::{ContactPatch, NewContact, PlanSeed, Store, TenantSeed, UserSeed};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    plans: Vec<Plan>,
    tenants: Vec<Tenant>,
    users: Vec<User>,
    contacts: HashMap<Uuid, Contact>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn plans(&self) -> Vec<Plan> {
        self.state.read().await.plans.clone()
    }

    pub async fn tenants(&self) -> Vec<Tenant> {
        self.state.read().await.tenants.clone()
    }

    pub async fn users(&self) -> Vec<User> {
        self.state.read().await.users.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn find_tenant(&self, id: Uuid) -> Result<Option<Tenant>> {
        let state = self.state.read().await;
        Ok(state.tenants.iter().find(|t| t.id == id).cloned())
    }

    async fn list_contacts(&self, tenant_id: Uuid) -> Result<Vec<Contact>> {
        let state = self.state.read().await;
        let mut contacts: Vec<Contact> = state
            .contacts
            .values()
            .filter(|c| c.company_id == tenant_id)
            .cloned()
            .collect();

        contacts.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        Ok(contacts)
    }

    async fn find_contact(&self, id: Uuid) -> Result<Option<Contact>> {
        Ok(self.state.read().await.contacts.get(&id).cloned())
    }

    async fn insert_contact(&self, contact: NewContact) -> Result<Contact> {
        let mut state = self.state.write().await;

        if !state.tenants.iter().any(|t| t.id == contact.tenant_id) {
            return Err(AppError::TenantNotFound {
                id: contact.tenant_id.to_string(),
            });
        }

        let now = contact.created_at.into();
        let model = Contact {
            id: Uuid::new_v4(),
            company_id: contact.tenant_id,
            name: contact.name,
            phone: contact.phone,
            email: contact.email,
            status: contact.status,
            last_message_at: now,
            created_at: now,
            updated_at: now,
        };

        state.contacts.insert(model.id, model.clone());
        Ok(model)
    }

    async fn update_contact(&self, id: Uuid, patch: ContactPatch) -> Result<Contact> {
        let mut state = self.state.write().await;

        let contact = state
            .contacts
            .get_mut(&id)
            .ok_or_else(|| AppError::ContactNotFound { id: id.to_string() })?;

        if let Some(name) = patch.name {
            contact.name = name;
        }
        if let Some(phone) = patch.phone {
            contact.phone = phone;
        }
        if let Some(email) = patch.email {
            contact.email = email;
        }
        if let Some(status) = patch.status {
            contact.status = status;
        }
        if let Some(at) = patch.last_message_at {
            contact.last_message_at = at.into();
        }
        contact.updated_at = Utc::now().into();

        Ok(contact.clone())
    }

    async fn delete_contact(&self, id: Uuid) -> Result<bool> {
        Ok(self.state.write().await.contacts.remove(&id).is_some())
    }

    async fn upsert_plan(&self, plan: PlanSeed) -> Result<Plan> {
        let mut state = self.state.write().await;
        let now = Utc::now().into();
        let limits = serde_json::to_value(&plan.limits)?;
        let features = serde_json::to_value(&plan.features)?;

        if let Some(existing) = state.plans.iter_mut().find(|p| p.name == plan.name) {
            existing.price = plan.price;
            existing.active = plan.active;
            existing.limits = limits;
            existing.features = features;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let model = Plan {
            id: Uuid::new_v4(),
            name: plan.name,
            price: plan.price,
            active: plan.active,
            limits,
            features,
            created_at: now,
            updated_at: now,
        };
        state.plans.push(model.clone());
        Ok(model)
    }

    async fn upsert_tenant(&self, tenant: TenantSeed) -> Result<Tenant> {
        let mut state = self.state.write().await;
        let now = Utc::now().into();

        if !state.plans.iter().any(|p| p.id == tenant.plan_id) {
            return Err(AppError::NotFound {
                resource_type: "plan".to_string(),
                id: tenant.plan_id.to_string(),
            });
        }

        if let Some(existing) = state.tenants.iter_mut().find(|t| t.email == tenant.email) {
            existing.name = tenant.name;
            existing.owner_name = tenant.owner_name;
            existing.status = tenant.status;
            existing.plan_id = tenant.plan_id;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let model = Tenant {
            id: Uuid::new_v4(),
            name: tenant.name,
            email: tenant.email,
            owner_name: tenant.owner_name,
            status: tenant.status,
            plan_id: tenant.plan_id,
            created_at: now,
            updated_at: now,
        };
        state.tenants.push(model.clone());
        Ok(model)
    }

    async fn upsert_user(&self, user: UserSeed) -> Result<User> {
        let mut state = self.state.write().await;
        let now = Utc::now().into();

        if !state.tenants.iter().any(|t| t.id == user.tenant_id) {
            return Err(AppError::TenantNotFound {
                id: user.tenant_id.to_string(),
            });
        }

        if let Some(existing) = state.users.iter_mut().find(|u| u.email == user.email) {
            existing.role = user.role;
            existing.tenant_id = user.tenant_id;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let model = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            tenant_id: user.tenant_id,
            created_at: now,
            updated_at: now,
        };
        state.users.push(model.clone());
        Ok(model)
    }
}
