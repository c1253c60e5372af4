//! Survey category entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A named group of questions within one survey.
///
/// Keyed by (`survey_id`, `id`): category ids are chosen by the caller and only
/// need to be unique within their survey.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "survey_category")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub survey_id: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub title: String,

    /// Position in the last submitted category list.
    pub display_order: i32,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::survey::Entity",
        from = "Column::SurveyId",
        to = "super::survey::Column::Id"
    )]
    Survey,
}

impl Related<super::survey::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Survey.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
