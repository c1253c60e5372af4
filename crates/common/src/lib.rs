//! Common utilities and shared types for survey-audit.
//!
//! This crate provides foundational components used across all survey-audit crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **Caller identity**: Who is making a request via [`Caller`] and [`Role`]
//! - **ID Generation**: ULID and numeric identifiers via [`IdGenerator`]
//! - **Storage**: Blob storage backends for audit evidence
//!
//! # Example
//!
//! ```no_run
//! use audit_common::{AppResult, Config, IdGenerator};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Listening on {} with new id {}", config.server.port, id);
//!     Ok(())
//! }
//! ```

pub mod caller;
pub mod config;
pub mod error;
pub mod id;
pub mod storage;

pub use caller::{Caller, Role};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use storage::{
    BlobMetadata, FileRef, LocalStorage, StorageBackend, StorageService, generate_storage_key,
};
