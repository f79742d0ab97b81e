//! SeaORM entity models
//!
//! Database entities for ContactDesk

mod contact;
mod plan;
mod tenant;
mod user;

pub use contact::{
    Entity as ContactEntity,
    Model as Contact,
    ActiveModel as ContactActiveModel,
    Column as ContactColumn,
    DEFAULT_CONTACT_STATUS,
};

pub use tenant::{
    Entity as TenantEntity,
    Model as Tenant,
    ActiveModel as TenantActiveModel,
    Column as TenantColumn,
};

pub use plan::{
    Entity as PlanEntity,
    Model as Plan,
    ActiveModel as PlanActiveModel,
    Column as PlanColumn,
    PlanFeatures,
    PlanLimits,
};

pub use user::{
    Entity as UserEntity,
    Model as User,
    ActiveModel as UserActiveModel,
    Column as UserColumn,
    SUPER_ADMIN_ROLE,
};
