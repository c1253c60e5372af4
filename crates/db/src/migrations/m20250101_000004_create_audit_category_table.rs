//! Create audit_category snapshot table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AuditCategory::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AuditCategory::AuditId).string_len(32).not_null())
                    .col(ColumnDef::new(AuditCategory::CategoryId).string_len(32).not_null())
                    .col(ColumnDef::new(AuditCategory::Title).string_len(512).not_null())
                    .col(
                        ColumnDef::new(AuditCategory::DisplayOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(AuditCategory::AuditId)
                            .col(AuditCategory::CategoryId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_audit_category_audit")
                            .from(AuditCategory::Table, AuditCategory::AuditId)
                            .to(Audit::Table, Audit::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuditCategory::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Audit {
    Table,
    Id,
}

#[derive(Iden)]
enum AuditCategory {
    Table,
    AuditId,
    CategoryId,
    Title,
    DisplayOrder,
}
