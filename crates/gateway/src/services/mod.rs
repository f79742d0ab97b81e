//! Service layer between handlers and the store

pub mod contacts;

pub use contacts::{resolve_tenant, ContactInput, ContactService};
