//! # Hits Common Library
//!
//! Shared code for the sticker pack bot:
//! - Error type used across crates
//! - Process configuration (validated once at startup)
//! - Database models and schema initialization

pub mod config;
pub mod db;
pub mod error;

pub use config::{BotConfig, DeployMode, RemovalPolicy};
pub use error::{Error, Result};
