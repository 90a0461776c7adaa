//! Connectors for the stores the Boversal workers talk to
//!
//! # Features
//!
//! - `postgres` (default) - PostgreSQL through SeaORM, plus migration running
//! - `redis` (default) - Redis `ConnectionManager` (stream broker)
//! - `config` - `core_config::FromEnv` for `PostgresConfig`
//! - `all` - everything
//!
//! Both connectors retry with exponential backoff so a worker that starts
//! before its database does not crash-loop.
//!
//! ```ignore
//! use database::postgres::{self, PostgresConfig};
//! use database::common::RetryConfig;
//!
//! let db = postgres::connect_with_retry(PostgresConfig::from_env()?, RetryConfig::startup()).await?;
//! postgres::run_migrations::<migration::Migrator>(&db, "boversal_reminder_worker").await?;
//!
//! let redis = database::redis::connect_with_retry("redis://127.0.0.1:6379", RetryConfig::startup()).await?;
//! ```

pub mod common;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "redis")]
pub mod redis;

pub use common::{DatabaseError, DatabaseResult, RetryConfig};
