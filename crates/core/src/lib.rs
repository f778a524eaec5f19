//! Core types and shared functionality for apicache.
//!
//! This crate provides:
//! - RFC 7234 response cache over a pluggable key-value store
//! - In-memory and SQLite store backends
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod headers;
pub mod http;
pub mod store;

pub use cache::{CacheManager, CacheMode, CacheOptions, CachedResponse, Freshness};
pub use config::{AppConfig, ConfigError, StoreKind};
pub use error::Error;
pub use headers::HeaderMap;
pub use http::{CacheRequest, CacheResponse};
pub use store::{ClosableStore, ExpiringStore, MemoryStore, SqliteStore, Store, StoreError};
