//! Contact management handlers

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidateEmail};

use crate::services::{resolve_tenant, ContactInput, ContactService};
use crate::AppState;
use contactdesk_common::{
    auth::MaybeAuth,
    db::{models::Contact, ContactPatch},
    errors::{AppError, Result},
};

const MIN_PHONE_LEN: usize = 8;

/// Request to create a new contact
#[derive(Debug, Deserialize, Validate)]
pub struct CreateContactRequest {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,

    #[validate(length(min = 8, message = "phone must have at least 8 characters"))]
    pub phone: String,

    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,

    #[serde(rename = "tenantId", default)]
    pub tenant_id: Option<Uuid>,
}

/// Tenant scope carried in the query string
#[derive(Debug, Default, Deserialize)]
pub struct TenantQuery {
    #[serde(rename = "tenantId")]
    pub tenant_id: Option<String>,
}

impl TenantQuery {
    fn parse(&self) -> Result<Option<Uuid>> {
        self.tenant_id
            .as_deref()
            .filter(|raw| !raw.is_empty())
            .map(|raw| parse_uuid(raw, "tenantId"))
            .transpose()
    }
}

fn parse_uuid(raw: &str, field: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::InvalidFormat {
        message: format!("{} must be a UUID", field),
    })
}

fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload.map(|Json(body)| body).map_err(|rejection| AppError::Validation {
        message: rejection.body_text(),
        field: None,
    })
}

/// Apply the creation rules to whichever fields a patch carries
fn validate_patch(patch: &ContactPatch) -> Result<()> {
    let invalid = |field: &str, message: &str| AppError::Validation {
        message: message.to_string(),
        field: Some(field.to_string()),
    };

    if matches!(&patch.name, Some(name) if name.is_empty()) {
        return Err(invalid("name", "name must not be empty"));
    }
    if matches!(&patch.phone, Some(phone) if phone.chars().count() < MIN_PHONE_LEN) {
        return Err(invalid("phone", "phone must have at least 8 characters"));
    }
    if matches!(&patch.email, Some(Some(email)) if !email.validate_email()) {
        return Err(invalid("email", "email must be a valid address"));
    }
    if matches!(&patch.status, Some(status) if status.is_empty()) {
        return Err(invalid("status", "status must not be empty"));
    }
    Ok(())
}

/// List a tenant's contacts; the tenant must be named in the query string
pub async fn list_contacts(
    State(state): State<AppState>,
    auth: MaybeAuth,
    Query(query): Query<TenantQuery>,
) -> Result<Json<Vec<Contact>>> {
    let tenant_id = query.parse()?.ok_or_else(|| AppError::MissingField {
        field: "tenantId".to_string(),
    })?;
    let tenant_id = resolve_tenant(Some(tenant_id), auth.tenant_id())?;

    let service = ContactService::new(state.store.clone());
    let contacts = service.list(tenant_id).await?;

    Ok(Json(contacts))
}

/// Create a contact. Failures other than a tenant mismatch surface as 400
/// with the underlying message.
pub async fn create_contact(
    State(state): State<AppState>,
    auth: MaybeAuth,
    payload: std::result::Result<Json<CreateContactRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Contact>)> {
    let outcome = async {
        let request = json_body(payload)?;
        request.validate()?;

        let tenant_id = resolve_tenant(request.tenant_id, auth.tenant_id())?;

        let service = ContactService::new(state.store.clone());
        service
            .create(
                tenant_id,
                ContactInput {
                    name: request.name,
                    phone: request.phone,
                    email: request.email,
                },
            )
            .await
    }
    .await;

    match outcome {
        Ok(contact) => Ok((StatusCode::CREATED, Json(contact))),
        Err(AppError::TenantMismatch) => Err(AppError::TenantMismatch),
        Err(err) => Err(err.into_bad_request()),
    }
}

/// Get a single contact owned by the resolved tenant
pub async fn get_contact(
    State(state): State<AppState>,
    auth: MaybeAuth,
    Path(contact_id): Path<String>,
    Query(query): Query<TenantQuery>,
) -> Result<Json<Contact>> {
    let contact_id = parse_uuid(&contact_id, "id")?;
    let tenant_id = resolve_tenant(query.parse()?, auth.tenant_id())?;

    let service = ContactService::new(state.store.clone());
    let contact = service.get(tenant_id, contact_id).await?;

    Ok(Json(contact))
}

/// Merge a partial update into a contact. Every failure is a generic 400.
pub async fn update_contact(
    State(state): State<AppState>,
    auth: MaybeAuth,
    Path(contact_id): Path<String>,
    Query(query): Query<TenantQuery>,
    payload: std::result::Result<Json<ContactPatch>, JsonRejection>,
) -> Result<Json<Contact>> {
    let outcome = async {
        let contact_id = parse_uuid(&contact_id, "id")?;
        let tenant_id = resolve_tenant(query.parse()?, auth.tenant_id())?;
        let patch = json_body(payload)?;
        validate_patch(&patch)?;

        let service = ContactService::new(state.store.clone());
        service.update(tenant_id, contact_id, patch).await
    }
    .await;

    outcome
        .map(Json)
        .map_err(|err| err.into_generic_bad_request("Unable to update contact"))
}

/// Delete a contact. Unknown ids are reported like any other failure.
pub async fn delete_contact(
    State(state): State<AppState>,
    auth: MaybeAuth,
    Path(contact_id): Path<String>,
    Query(query): Query<TenantQuery>,
) -> Result<StatusCode> {
    let outcome = async {
        let contact_id = parse_uuid(&contact_id, "id")?;
        let tenant_id = resolve_tenant(query.parse()?, auth.tenant_id())?;

        let service = ContactService::new(state.store.clone());
        service.delete(tenant_id, contact_id).await
    }
    .await;

    outcome
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(|err| err.into_generic_bad_request("Unable to delete contact"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_router, AppState};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request},
        Router,
    };
    use async_trait::async_trait;
    use chrono::Utc;
    use contactdesk_common::{
        auth::JwtManager,
        config::AppConfig,
        db::{
            models::{Plan, PlanFeatures, PlanLimits, Tenant, User},
            MemoryStore, NewContact, PlanSeed, Store, TenantSeed, UserSeed,
        },
    };
    use serde_json::{json, Value};
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    const SECRET: &str = "test-secret";

    struct TestApp {
        router: Router,
        store: Arc<MemoryStore>,
    }

    impl TestApp {
        async fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            Self::serving(store.clone(), store)
        }

        /// Route requests through `served` while fixtures go to `store`
        fn serving(store: Arc<MemoryStore>, served: Arc<dyn Store>) -> Self {
            let mut config = AppConfig::in_memory();
            config.auth.jwt_secret = Some(SECRET.to_string());

            Self {
                router: create_router(AppState::new(config, served)),
                store,
            }
        }

        async fn tenant(&self, email: &str) -> Uuid {
            let plan = self
                .store
                .upsert_plan(PlanSeed {
                    name: "Starter".into(),
                    price: 0,
                    active: true,
                    limits: PlanLimits::default(),
                    features: PlanFeatures::default(),
                })
                .await
                .unwrap();
            self.store
                .upsert_tenant(TenantSeed {
                    name: email.into(),
                    email: email.into(),
                    owner_name: "Owner".into(),
                    status: "active".into(),
                    plan_id: plan.id,
                })
                .await
                .unwrap()
                .id
        }

        fn token_for(&self, tenant_id: Uuid) -> String {
            JwtManager::new(SECRET, 3600)
                .generate_token(Uuid::new_v4(), tenant_id, "agent")
                .unwrap()
        }

        async fn send(
            &self,
            method: Method,
            uri: &str,
            body: Option<Value>,
            token: Option<&str>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }
            let body = match body {
                Some(value) => {
                    builder = builder.header(header::CONTENT_TYPE, "application/json");
                    Body::from(value.to_string())
                }
                None => Body::empty(),
            };

            let response = self
                .router
                .clone()
                .oneshot(builder.body(body).unwrap())
                .await
                .unwrap();

            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, value)
        }

        async fn create(&self, tenant_id: Uuid, name: &str) -> Value {
            let (status, body) = self
                .send(
                    Method::POST,
                    "/api/contacts",
                    Some(json!({"name": name, "phone": "11999990000", "tenantId": tenant_id})),
                    None,
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
            body
        }
    }

    /// Reads succeed; every contact write fails like a dropped connection
    struct BrokenWrites(Arc<MemoryStore>);

    impl BrokenWrites {
        fn failure() -> AppError {
            AppError::DatabaseConnection {
                message: "connection reset".to_string(),
            }
        }
    }

    #[async_trait]
    impl Store for BrokenWrites {
        async fn ping(&self) -> Result<()> {
            self.0.ping().await
        }

        async fn find_tenant(&self, id: Uuid) -> Result<Option<Tenant>> {
            self.0.find_tenant(id).await
        }

        async fn list_contacts(&self, tenant_id: Uuid) -> Result<Vec<Contact>> {
            self.0.list_contacts(tenant_id).await
        }

        async fn find_contact(&self, id: Uuid) -> Result<Option<Contact>> {
            self.0.find_contact(id).await
        }

        async fn insert_contact(&self, _contact: NewContact) -> Result<Contact> {
            Err(Self::failure())
        }

        async fn update_contact(&self, _id: Uuid, _patch: ContactPatch) -> Result<Contact> {
            Err(Self::failure())
        }

        async fn delete_contact(&self, _id: Uuid) -> Result<bool> {
            Err(Self::failure())
        }

        async fn upsert_plan(&self, plan: PlanSeed) -> Result<Plan> {
            self.0.upsert_plan(plan).await
        }

        async fn upsert_tenant(&self, tenant: TenantSeed) -> Result<Tenant> {
            self.0.upsert_tenant(tenant).await
        }

        async fn upsert_user(&self, user: UserSeed) -> Result<User> {
            self.0.upsert_user(user).await
        }
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        /// Capture INFO and above on this thread until the guard drops
        fn install() -> (Self, tracing::subscriber::DefaultGuard) {
            let logs = Self::default();
            let subscriber = tracing_subscriber::fmt()
                .with_writer({
                    let logs = logs.clone();
                    move || logs.clone()
                })
                .with_max_level(tracing::Level::INFO)
                .with_ansi(false)
                .finish();
            (logs, tracing::subscriber::set_default(subscriber))
        }

        fn error_lines(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.0.lock().unwrap())
                .lines()
                .filter(|line| line.contains("ERROR"))
                .map(String::from)
                .collect()
        }
    }

    #[tokio::test]
    async fn test_store_failures_are_logged_before_collapsing() {
        let (logs, _guard) = CapturedLogs::install();

        let memory = Arc::new(MemoryStore::new());
        let app = TestApp::serving(memory.clone(), Arc::new(BrokenWrites(memory.clone())));
        let tenant = app.tenant("a@tenant.test").await;
        let contact = memory
            .insert_contact(NewContact {
                tenant_id: tenant,
                name: "Ada".into(),
                phone: "11999990000".into(),
                email: None,
                status: "saved".into(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let uri = format!("/api/contacts/{}?tenantId={}", contact.id, tenant);

        let (status, body) = app
            .send(Method::PUT, &uri, Some(json!({"name": "Grace"})), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Unable to update contact");

        let (status, body) = app.send(Method::DELETE, &uri, None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Unable to delete contact");

        let (status, _) = app
            .send(
                Method::POST,
                "/api/contacts",
                Some(json!({"name": "Ada", "phone": "11999990000", "tenantId": tenant})),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let errors = logs.error_lines();
        assert_eq!(errors.len(), 3, "{:?}", errors);
        assert!(errors.iter().all(|line| line.contains("connection reset")));
    }

    #[tokio::test]
    async fn test_client_failures_stay_below_error_level() {
        let (logs, _guard) = CapturedLogs::install();

        let app = TestApp::new().await;
        let tenant = app.tenant("a@tenant.test").await;
        let (status, _) = app
            .send(
                Method::DELETE,
                &format!("/api/contacts/{}?tenantId={}", Uuid::new_v4(), tenant),
                None,
                None,
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(logs.error_lines().is_empty());
    }

    #[tokio::test]
    async fn test_list_requires_tenant_id() {
        let app = TestApp::new().await;
        let tenant = app.tenant("a@tenant.test").await;
        let token = app.token_for(tenant);

        let (status, body) = app.send(Method::GET, "/api/contacts", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "MISSING_FIELD");

        // An authenticated caller still has to name the tenant
        let (status, _) = app
            .send(Method::GET, "/api/contacts", None, Some(&token))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_rejects_malformed_tenant_id() {
        let app = TestApp::new().await;
        let (status, body) = app
            .send(Method::GET, "/api/contacts?tenantId=nope", None, None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_FORMAT");
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let app = TestApp::new().await;
        let tenant = app.tenant("a@tenant.test").await;

        let created = app.create(tenant, "Ada").await;
        assert_eq!(created["status"], "saved");
        assert_eq!(created["company_id"], tenant.to_string());
        assert_eq!(created["last_message_at"], created["created_at"]);

        let (status, body) = app
            .send(Method::GET, &format!("/api/contacts?tenantId={}", tenant), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["name"], "Ada");
    }

    #[tokio::test]
    async fn test_create_without_tenant() {
        let app = TestApp::new().await;
        let (status, body) = app
            .send(
                Method::POST,
                "/api/contacts",
                Some(json!({"name": "Ada", "phone": "11999990000"})),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Required field missing: tenantId");
    }

    #[tokio::test]
    async fn test_create_uses_caller_tenant() {
        let app = TestApp::new().await;
        let tenant = app.tenant("a@tenant.test").await;
        let token = app.token_for(tenant);

        let (status, body) = app
            .send(
                Method::POST,
                "/api/contacts",
                Some(json!({"name": "Ada", "phone": "11999990000"})),
                Some(&token),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["company_id"], tenant.to_string());
    }

    #[tokio::test]
    async fn test_create_rejects_short_phone() {
        let app = TestApp::new().await;
        let tenant = app.tenant("a@tenant.test").await;

        let (status, body) = app
            .send(
                Method::POST,
                "/api/contacts",
                Some(json!({"name": "Ada", "phone": "1234567", "tenantId": tenant})),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("phone must have at least 8 characters"));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_email_and_empty_name() {
        let app = TestApp::new().await;
        let tenant = app.tenant("a@tenant.test").await;

        for body in [
            json!({"name": "Ada", "phone": "11999990000", "email": "not-an-email", "tenantId": tenant}),
            json!({"name": "", "phone": "11999990000", "tenantId": tenant}),
            json!({"phone": "11999990000", "tenantId": tenant}),
        ] {
            let (status, _) = app.send(Method::POST, "/api/contacts", Some(body), None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_create_unknown_tenant_is_bad_request() {
        let app = TestApp::new().await;
        let (status, body) = app
            .send(
                Method::POST,
                "/api/contacts",
                Some(json!({"name": "Ada", "phone": "11999990000", "tenantId": Uuid::new_v4()})),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Tenant not found"));
    }

    #[tokio::test]
    async fn test_create_for_other_tenant_is_forbidden() {
        let app = TestApp::new().await;
        let mine = app.tenant("a@tenant.test").await;
        let theirs = app.tenant("b@tenant.test").await;
        let token = app.token_for(mine);

        let (status, _) = app
            .send(
                Method::POST,
                "/api/contacts",
                Some(json!({"name": "Ada", "phone": "11999990000", "tenantId": theirs})),
                Some(&token),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_invalid_token_is_unauthorized() {
        let app = TestApp::new().await;
        let tenant = app.tenant("a@tenant.test").await;

        let (status, _) = app
            .send(
                Method::GET,
                &format!("/api/contacts?tenantId={}", tenant),
                None,
                Some("garbage"),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_update_merges_and_validates() {
        let app = TestApp::new().await;
        let tenant = app.tenant("a@tenant.test").await;
        let created = app.create(tenant, "Ada").await;
        let id = created["id"].as_str().unwrap();
        let uri = format!("/api/contacts/{}?tenantId={}", id, tenant);

        let (status, body) = app
            .send(
                Method::PUT,
                &uri,
                Some(json!({"email": "ada@example.com", "status": "archived"})),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "ada@example.com");
        assert_eq!(body["status"], "archived");
        assert_eq!(body["name"], "Ada");

        let (status, body) = app
            .send(Method::PUT, &uri, Some(json!({"phone": "123"})), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Unable to update contact");
    }

    #[tokio::test]
    async fn test_update_other_tenant_contact() {
        let app = TestApp::new().await;
        let owner = app.tenant("a@tenant.test").await;
        let intruder = app.tenant("b@tenant.test").await;
        let created = app.create(owner, "Ada").await;
        let id = created["id"].as_str().unwrap();

        let token = app.token_for(intruder);
        let (status, _) = app
            .send(
                Method::PUT,
                &format!("/api/contacts/{}", id),
                Some(json!({"name": "Mallory"})),
                Some(&token),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = app
            .send(Method::GET, &format!("/api/contacts/{}?tenantId={}", id, owner), None, None)
            .await;
        assert_eq!(body["name"], "Ada");
    }

    #[tokio::test]
    async fn test_delete_contact() {
        let app = TestApp::new().await;
        let tenant = app.tenant("a@tenant.test").await;
        let created = app.create(tenant, "Ada").await;
        let uri = format!(
            "/api/contacts/{}?tenantId={}",
            created["id"].as_str().unwrap(),
            tenant
        );

        let (status, body) = app.send(Method::DELETE, &uri, None, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, _) = app.send(Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_missing_contact_is_bad_request() {
        let app = TestApp::new().await;
        let tenant = app.tenant("a@tenant.test").await;

        for id in [Uuid::new_v4().to_string(), "not-a-uuid".to_string()] {
            let (status, body) = app
                .send(
                    Method::DELETE,
                    &format!("/api/contacts/{}?tenantId={}", id, tenant),
                    None,
                    None,
                )
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"]["code"], "REQUEST_FAILED");
        }
    }

    #[test]
    fn test_validate_patch() {
        assert!(validate_patch(&ContactPatch::default()).is_ok());
        assert!(validate_patch(&ContactPatch {
            email: Some(None),
            ..Default::default()
        })
        .is_ok());
        assert!(validate_patch(&ContactPatch {
            name: Some(String::new()),
            ..Default::default()
        })
        .is_err());
        assert!(validate_patch(&ContactPatch {
            email: Some(Some("nope".into())),
            ..Default::default()
        })
        .is_err());
    }
}
