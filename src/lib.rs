//! Cleanup of mutation tables exported from the cBioPortal gene pages.
//!
//! The composite `Annotation` and `Functional Impact` columns are split into
//! one column per tag sub-field, following a fixed [`schema::Schema`].

pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod pool;
pub mod rename;
pub mod reshape;
pub mod run;
pub mod schema;
pub mod split;
pub mod summary;
pub mod table;

pub use config::RunConfig;
pub use error::{CleanupError, Result};
pub use reshape::{Reshaper, UnknownTagPolicy};
pub use run::{run, RunReport};
pub use schema::Schema;
pub use table::{NormalizedTable, RawRecord, Table};
