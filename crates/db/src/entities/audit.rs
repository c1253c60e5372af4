//! Audit entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Progress of an audit.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum AuditStatus {
    #[default]
    #[sea_orm(string_value = "in progress")]
    #[serde(rename = "in progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    #[serde(rename = "completed")]
    Completed,
    #[sea_orm(string_value = "abandoned")]
    #[serde(rename = "abandoned")]
    Abandoned,
}

/// Audit entity - one inspector's run through a survey.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub survey_id: String,

    #[sea_orm(indexed)]
    pub inspector_id: String,

    /// Owner of the survey, copied at creation.
    #[sea_orm(indexed)]
    pub client_id: String,

    pub status: AuditStatus,

    #[sea_orm(column_type = "Text")]
    pub expense: String,

    #[sea_orm(column_type = "Text")]
    pub brand_standard: String,

    #[sea_orm(column_type = "Text")]
    pub detailed_summary: String,

    #[sea_orm(column_type = "Text")]
    pub executive_summary: String,

    #[sea_orm(column_type = "Text")]
    pub scenario: String,

    /// Client feedback.
    #[sea_orm(column_type = "Text", nullable)]
    pub feedback: Option<String>,

    /// Summary field name to uploaded files (JSON object of `FileRef` arrays).
    #[sea_orm(column_type = "JsonBinary")]
    pub uploads: Json,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::survey::Entity",
        from = "Column::SurveyId",
        to = "super::survey::Column::Id",
        on_delete = "Cascade"
    )]
    Survey,
    #[sea_orm(has_many = "super::response::Entity")]
    Responses,
    #[sea_orm(has_many = "super::audit_category::Entity")]
    Categories,
}

impl Related<super::survey::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Survey.def()
    }
}

impl Related<super::response::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Responses.def()
    }
}

impl Related<super::audit_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
