//! Tenant-scoped contact operations

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use contactdesk_common::{
    db::{models::Contact, models::DEFAULT_CONTACT_STATUS, ContactPatch, NewContact, Store},
    errors::{AppError, Result},
    metrics::{self, ContactEvent},
};

/// Validated fields for a new contact
#[derive(Debug, Clone)]
pub struct ContactInput {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

/// Pick the effective tenant from an explicit id and the caller's identity.
///
/// An explicit id wins; an authenticated caller may only name its own tenant.
pub fn resolve_tenant(explicit: Option<Uuid>, caller: Option<Uuid>) -> Result<Uuid> {
    match (explicit, caller) {
        (Some(explicit), Some(caller)) if explicit != caller => Err(AppError::TenantMismatch),
        (Some(tenant_id), _) | (None, Some(tenant_id)) => Ok(tenant_id),
        (None, None) => Err(AppError::MissingField {
            field: "tenantId".to_string(),
        }),
    }
}

#[derive(Clone)]
pub struct ContactService {
    store: Arc<dyn Store>,
}

impl ContactService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// All contacts of a tenant, most recent activity first
    pub async fn list(&self, tenant_id: Uuid) -> Result<Vec<Contact>> {
        self.store.list_contacts(tenant_id).await
    }

    pub async fn create(&self, tenant_id: Uuid, input: ContactInput) -> Result<Contact> {
        if self.store.find_tenant(tenant_id).await?.is_none() {
            return Err(AppError::TenantNotFound {
                id: tenant_id.to_string(),
            });
        }

        let contact = self
            .store
            .insert_contact(NewContact {
                tenant_id,
                name: input.name,
                phone: input.phone,
                email: input.email,
                status: DEFAULT_CONTACT_STATUS.to_string(),
                created_at: Utc::now(),
            })
            .await?;

        metrics::record_contact(ContactEvent::Created, &tenant_id.to_string());
        tracing::info!(
            contact_id = %contact.id,
            tenant_id = %tenant_id,
            "Contact created"
        );

        Ok(contact)
    }

    /// Fetch a contact owned by the tenant; foreign contacts are not found
    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Contact> {
        self.store
            .find_contact(id)
            .await?
            .filter(|contact| contact.is_owned_by(tenant_id))
            .ok_or_else(|| AppError::ContactNotFound { id: id.to_string() })
    }

    pub async fn update(&self, tenant_id: Uuid, id: Uuid, patch: ContactPatch) -> Result<Contact> {
        self.get(tenant_id, id).await?;

        let contact = self.store.update_contact(id, patch).await?;

        metrics::record_contact(ContactEvent::Updated, &tenant_id.to_string());
        tracing::info!(contact_id = %id, tenant_id = %tenant_id, "Contact updated");

        Ok(contact)
    }

    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<()> {
        self.get(tenant_id, id).await?;

        if !self.store.delete_contact(id).await? {
            return Err(AppError::ContactNotFound { id: id.to_string() });
        }

        metrics::record_contact(ContactEvent::Deleted, &tenant_id.to_string());
        tracing::info!(contact_id = %id, tenant_id = %tenant_id, "Contact deleted");

        Ok(())
    }
}
