//! # Toolcat Common Library
//!
//! Shared code for the Toolcat services including:
//! - Error type and result alias
//! - Bootstrap configuration loading (TOML, environment, OS defaults)
//! - Application events (CatalogEvent enum) and the EventBus

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
