//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and the portal view arithmetic
//! - Arena collections and key types
//! - Logging initialisation

pub mod math;
pub mod collections;
pub mod logging;
