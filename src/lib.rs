//! Normalizes a flat healthcare visit extract into a snowflake schema: one
//! `FactVisit` table referencing ten dimension tables.

pub mod args;
pub mod common;
pub mod constants;
pub mod emit;
pub mod engine;
pub mod ingest;
pub mod normalize;
pub mod pipeline;
pub mod registry;
pub mod schema;
pub mod status;
pub mod summary;

pub use engine::{SnowflakeTables, TransformSession};
pub use ingest::{IngestError, SourceReader, SourceRow};
pub use schema::{PatientStatus, Table};
