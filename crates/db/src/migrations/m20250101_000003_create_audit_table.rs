//! Create audit table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Audit::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Audit::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Audit::SurveyId).string_len(32).not_null())
                    .col(ColumnDef::new(Audit::InspectorId).string_len(64).not_null())
                    .col(ColumnDef::new(Audit::ClientId).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Audit::Status)
                            .string_len(16)
                            .not_null()
                            .default("in progress"),
                    )
                    .col(ColumnDef::new(Audit::Expense).text().not_null().default(""))
                    .col(ColumnDef::new(Audit::BrandStandard).text().not_null().default(""))
                    .col(ColumnDef::new(Audit::DetailedSummary).text().not_null().default(""))
                    .col(ColumnDef::new(Audit::ExecutiveSummary).text().not_null().default(""))
                    .col(ColumnDef::new(Audit::Scenario).text().not_null().default(""))
                    .col(ColumnDef::new(Audit::Feedback).text())
                    .col(
                        ColumnDef::new(Audit::Uploads)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'{}'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(Audit::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Audit::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_audit_survey")
                            .from(Audit::Table, Audit::SurveyId)
                            .to(Survey::Table, Survey::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: survey_id
        manager
            .create_index(
                Index::create()
                    .name("idx_audit_survey_id")
                    .table(Audit::Table)
                    .col(Audit::SurveyId)
                    .to_owned(),
            )
            .await?;

        // Index: inspector_id
        manager
            .create_index(
                Index::create()
                    .name("idx_audit_inspector_id")
                    .table(Audit::Table)
                    .col(Audit::InspectorId)
                    .to_owned(),
            )
            .await?;

        // Index: client_id
        manager
            .create_index(
                Index::create()
                    .name("idx_audit_client_id")
                    .table(Audit::Table)
                    .col(Audit::ClientId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Audit::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Survey {
    Table,
    Id,
}

#[derive(Iden)]
enum Audit {
    Table,
    Id,
    SurveyId,
    InspectorId,
    ClientId,
    Status,
    Expense,
    BrandStandard,
    DetailedSummary,
    ExecutiveSummary,
    Scenario,
    Feedback,
    Uploads,
    CreatedAt,
    UpdatedAt,
}
