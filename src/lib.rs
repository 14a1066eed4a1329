//! AyurSutra Results Library
//!
//! Holds the session's Dosha assessment, renders it for the Results surface, and
//! drives report generation against the external report service.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core state and views.
//! - `integrations`: External service integrations.
//! - `circuit_breaker`: Circuit breaker for the report service.
//! - `config`: Configuration management.
//! - `controller`: Report download state machine.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `models`: Assessment and report data models.
//! - `navigation`: Empty-state guard for the Results surface.
//! - `projection`: Read-only Results views.
//! - `report_client`: Report service client.
//! - `saver`: Client-side save of received reports.
//! - `store`: Assessment store.

pub mod api;
pub mod core;
pub mod integrations;

pub mod circuit_breaker;
pub mod config;
pub mod controller;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod navigation;
pub mod projection;
pub mod report_client;
pub mod saver;
pub mod store;
