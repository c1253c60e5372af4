//! Response entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Derived classification of a response.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ResponseState {
    /// Answered "YES".
    #[sea_orm(string_value = "ADDRESSED")]
    #[serde(rename = "ADDRESSED")]
    Addressed,
    /// Answered "NO".
    #[sea_orm(string_value = "NOT_ADDRESSED")]
    #[serde(rename = "NOT_ADDRESSED")]
    NotAddressed,
    /// Anything else.
    #[default]
    #[sea_orm(string_value = "NOT_SEEN")]
    #[serde(rename = "NOT_SEEN")]
    NotSeen,
}

/// An inspector's answer to one question within one audit.
///
/// `question_id` and `category_id` carry no foreign key: a response keeps the
/// category it was written under even after its question is removed.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "response")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub audit_id: String,

    pub question_id: String,

    pub category_id: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub answer: Option<String>,

    /// Selected option key.
    #[sea_orm(nullable)]
    pub option_answer: Option<String>,

    /// Selected option label.
    #[sea_orm(nullable)]
    pub option_text: Option<String>,

    pub skip: bool,

    /// Attached evidence (JSON array of `FileRef`).
    #[sea_orm(column_type = "JsonBinary")]
    pub files: Json,

    pub state: ResponseState,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::audit::Entity",
        from = "Column::AuditId",
        to = "super::audit::Column::Id",
        on_delete = "Cascade"
    )]
    Audit,
}

impl Related<super::audit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Audit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
