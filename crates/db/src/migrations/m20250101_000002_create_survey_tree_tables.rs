//! Create survey_category and question tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create survey_category table
        manager
            .create_table(
                Table::create()
                    .table(SurveyCategory::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SurveyCategory::SurveyId).string_len(32).not_null())
                    .col(ColumnDef::new(SurveyCategory::Id).string_len(32).not_null())
                    .col(ColumnDef::new(SurveyCategory::Title).string_len(512).not_null())
                    .col(
                        ColumnDef::new(SurveyCategory::DisplayOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SurveyCategory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(SurveyCategory::SurveyId)
                            .col(SurveyCategory::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_survey_category_survey")
                            .from(SurveyCategory::Table, SurveyCategory::SurveyId)
                            .to(Survey::Table, Survey::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create question table
        manager
            .create_table(
                Table::create()
                    .table(Question::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Question::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Question::SurveyId).string_len(32).not_null())
                    .col(ColumnDef::new(Question::CategoryId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Question::QuestionType)
                            .string_len(16)
                            .not_null()
                            .default("text"),
                    )
                    .col(ColumnDef::new(Question::Text).text().not_null())
                    .col(
                        ColumnDef::new(Question::Options)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'{}'::jsonb")),
                    )
                    .col(ColumnDef::new(Question::DisplayOrder).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Question::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Question::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_question_survey")
                            .from(Question::Table, Question::SurveyId)
                            .to(Survey::Table, Survey::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    // A question may only point at a category of its own survey.
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_question_category")
                            .from(Question::Table, (Question::SurveyId, Question::CategoryId))
                            .to(
                                SurveyCategory::Table,
                                (SurveyCategory::SurveyId, SurveyCategory::Id),
                            )
                            .on_delete(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: survey_id (loading a survey's tree)
        manager
            .create_index(
                Index::create()
                    .name("idx_question_survey_id")
                    .table(Question::Table)
                    .col(Question::SurveyId)
                    .col(Question::DisplayOrder)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Question::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(SurveyCategory::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Survey {
    Table,
    Id,
}

#[derive(Iden)]
enum SurveyCategory {
    Table,
    SurveyId,
    Id,
    Title,
    DisplayOrder,
    CreatedAt,
}

#[derive(Iden)]
enum Question {
    Table,
    Id,
    SurveyId,
    CategoryId,
    QuestionType,
    Text,
    Options,
    DisplayOrder,
    CreatedAt,
    UpdatedAt,
}
