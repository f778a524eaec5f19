//! Client code for apicache.
//!
//! This crate provides the HTTP fetch pipeline that consults and maintains
//! the response cache from `apicache-core`.

pub mod fetch;

pub use fetch::{
    CachingClient, FetchConfig, FetchOptions, FetchResponse, ReqwestTransport, ResponseSource, Transport,
};
