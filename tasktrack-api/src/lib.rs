//! # TaskTrack API Server Library
//!
//! This library provides the HTTP and WebSocket surface of TaskTrack.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `realtime`: WebSocket hub and subscription registry
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod realtime;
pub mod routes;
