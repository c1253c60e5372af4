//! Create response table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Response::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Response::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Response::AuditId).string_len(32).not_null())
                    // No foreign keys on question/category: responses outlive questions
                    .col(ColumnDef::new(Response::QuestionId).string_len(32).not_null())
                    .col(ColumnDef::new(Response::CategoryId).string_len(32).not_null())
                    .col(ColumnDef::new(Response::Answer).text())
                    .col(ColumnDef::new(Response::OptionAnswer).string_len(64))
                    .col(ColumnDef::new(Response::OptionText).string_len(512))
                    .col(ColumnDef::new(Response::Skip).boolean().not_null().default(false))
                    .col(
                        ColumnDef::new(Response::Files)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(Response::State)
                            .string_len(16)
                            .not_null()
                            .default("NOT_SEEN"),
                    )
                    .col(
                        ColumnDef::new(Response::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Response::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_response_audit")
                            .from(Response::Table, Response::AuditId)
                            .to(Audit::Table, Audit::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (audit_id, question_id) - one response per question
        manager
            .create_index(
                Index::create()
                    .name("idx_response_audit_question_unique")
                    .table(Response::Table)
                    .col(Response::AuditId)
                    .col(Response::QuestionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (audit_id, category_id) for per-category reads
        manager
            .create_index(
                Index::create()
                    .name("idx_response_audit_category")
                    .table(Response::Table)
                    .col(Response::AuditId)
                    .col(Response::CategoryId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Response::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Audit {
    Table,
    Id,
}

#[derive(Iden)]
enum Response {
    Table,
    Id,
    AuditId,
    QuestionId,
    CategoryId,
    Answer,
    OptionAnswer,
    OptionText,
    Skip,
    Files,
    State,
    CreatedAt,
    UpdatedAt,
}
