//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250101_000001_create_survey_table;
mod m20250101_000002_create_survey_tree_tables;
mod m20250101_000003_create_audit_table;
mod m20250101_000004_create_audit_category_table;
mod m20250101_000005_create_response_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_survey_table::Migration),
            Box::new(m20250101_000002_create_survey_tree_tables::Migration),
            Box::new(m20250101_000003_create_audit_table::Migration),
            Box::new(m20250101_000004_create_audit_category_table::Migration),
            Box::new(m20250101_000005_create_response_table::Migration),
        ]
    }
}
