//! Question entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of answer a question expects.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum QuestionType {
    /// Free text answer.
    #[default]
    #[sea_orm(string_value = "text")]
    #[serde(rename = "text")]
    Text,
    /// One of the question's options.
    #[sea_orm(string_value = "multi_choice")]
    #[serde(rename = "multi_choice")]
    MultiChoice,
}

/// A single prompt within a survey, bound to one category.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "question")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub survey_id: String,

    /// Owning category within the same survey.
    pub category_id: String,

    #[serde(rename = "type")]
    pub question_type: QuestionType,

    #[sea_orm(column_type = "Text")]
    pub text: String,

    /// Option key to label (JSON object). Empty for text questions.
    #[sea_orm(column_type = "JsonBinary")]
    pub options: Json,

    /// Position in the last submitted question list.
    pub display_order: i32,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
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
