//! Plan entity (billing tier reference data)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Usage caps attached to a plan, stored as JSONB
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub users: u32,
    pub connections: u32,
    pub messages_per_month: u32,
}

/// Capability flags attached to a plan, stored as JSONB
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanFeatures {
    #[serde(default)]
    pub bulk_messaging: bool,
    #[serde(default)]
    pub api_access: bool,
    #[serde(default)]
    pub analytics: bool,
    #[serde(default)]
    pub priority_support: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "plans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text", unique)]
    pub name: String,

    /// Monthly price in minor currency units
    pub price: i64,

    pub active: bool,

    #[sea_orm(column_type = "JsonBinary")]
    pub limits: Json,

    #[sea_orm(column_type = "JsonBinary")]
    pub features: Json,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::tenant::Entity")]
    Tenants,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
