//! # TaskTrack Shared Library
//!
//! This crate contains the domain types, persistence and business logic used
//! by the TaskTrack API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `store`: Persistence seam with PostgreSQL and in-memory backends
//! - `services`: Task mutation pipeline, notifications, audit and accounts
//! - `events`: Real-time event types and the publisher seam
//! - `auth`: JWT, password hashing and request authentication
//! - `db`: Connection pool and migrations
//! - `error`: Common error types

pub mod auth;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod services;
pub mod store;

/// Current version of the TaskTrack shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
