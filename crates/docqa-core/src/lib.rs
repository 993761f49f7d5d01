//! docqa-core
//!
//! Domain types, the error taxonomy, backend traits, configuration and the
//! two pure text stages of the pipeline (chunking and context assembly).

pub mod chunker;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
