//! Create survey table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Survey::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Survey::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Survey::ClientId).string_len(64).not_null())
                    .col(ColumnDef::new(Survey::ClientName).string_len(256))
                    .col(ColumnDef::new(Survey::HotelName).string_len(256).not_null())
                    .col(ColumnDef::new(Survey::Campaign).string_len(256).not_null())
                    .col(ColumnDef::new(Survey::Location).string_len(256).not_null())
                    .col(ColumnDef::new(Survey::StartDate).date())
                    .col(ColumnDef::new(Survey::EndDate).date())
                    .col(
                        ColumnDef::new(Survey::Inspectors)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(Survey::SurveyType)
                            .string_len(16)
                            .not_null()
                            .default("EXTERNAL"),
                    )
                    .col(
                        ColumnDef::new(Survey::SortedCategories)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(Survey::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Survey::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Index: client_id (client dashboards)
        manager
            .create_index(
                Index::create()
                    .name("idx_survey_client_id")
                    .table(Survey::Table)
                    .col(Survey::ClientId)
                    .to_owned(),
            )
            .await?;

        // Index: (survey_type, created_at) for listing
        manager
            .create_index(
                Index::create()
                    .name("idx_survey_type_created_at")
                    .table(Survey::Table)
                    .col(Survey::SurveyType)
                    .col(Survey::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // GIN index on inspectors for containment lookups
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_survey_inspectors ON survey USING GIN (inspectors)",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Survey::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Survey {
    Table,
    Id,
    ClientId,
    ClientName,
    HotelName,
    Campaign,
    Location,
    StartDate,
    EndDate,
    Inspectors,
    SurveyType,
    SortedCategories,
    CreatedAt,
    UpdatedAt,
}
