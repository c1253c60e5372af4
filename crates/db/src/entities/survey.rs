//! Survey entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Who a survey is run for.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum SurveyType {
    /// Run by the client's own staff.
    #[sea_orm(string_value = "INTERNAL")]
    #[serde(rename = "INTERNAL")]
    Internal,
    /// Run by external inspectors.
    #[default]
    #[sea_orm(string_value = "EXTERNAL")]
    #[serde(rename = "EXTERNAL")]
    External,
}

/// Survey entity - the aggregate root owning categories and questions.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "survey")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owning client.
    #[sea_orm(indexed)]
    pub client_id: String,

    /// Display name of the client at creation time.
    #[sea_orm(nullable)]
    pub client_name: Option<String>,

    pub hotel_name: String,

    pub campaign: String,

    pub location: String,

    #[sea_orm(nullable)]
    pub start_date: Option<Date>,

    #[sea_orm(nullable)]
    pub end_date: Option<Date>,

    /// Assigned inspector ids (JSON array of strings).
    #[sea_orm(column_type = "JsonBinary")]
    pub inspectors: Json,

    pub survey_type: SurveyType,

    /// Category ids in display order (JSON array of strings).
    #[sea_orm(column_type = "JsonBinary")]
    pub sorted_categories: Json,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Assigned inspector ids.
    #[must_use]
    pub fn inspector_ids(&self) -> Vec<String> {
        serde_json::from_value(self.inspectors.clone()).unwrap_or_default()
    }

    /// Category display order.
    #[must_use]
    pub fn sorted_category_ids(&self) -> Vec<String> {
        serde_json::from_value(self.sorted_categories.clone()).unwrap_or_default()
    }

    /// Whether the inspector is assigned to this survey.
    #[must_use]
    pub fn is_assigned(&self, inspector_id: &str) -> bool {
        self.inspector_ids().iter().any(|id| id == inspector_id)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::survey_category::Entity")]
    Categories,
    #[sea_orm(has_many = "super::question::Entity")]
    Questions,
    #[sea_orm(has_many = "super::audit::Entity")]
    Audits,
}

impl Related<super::survey_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl Related<super::question::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Questions.def()
    }
}

impl Related<super::audit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Audits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
