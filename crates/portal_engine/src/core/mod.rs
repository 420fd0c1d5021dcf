//! Core engine modules
//!
//! Houses the unified configuration consumed by the frame driver and the
//! headless application.

pub mod config;
