//! services/api/src/lib.rs
//!
//! The DocSensei API service: adapters for the core ports, configuration,
//! and the WebSocket/REST surface.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
