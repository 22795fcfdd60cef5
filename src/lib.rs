//! EcoBin Collection Server Library
//!
//! QR-driven waste collection backend.
//!
//! ## Architecture (5 Components)
//!
//! 1. BinRegistry - Bin SSoT + QR payload assignment
//! 2. ScanSurface - Code acquisition (continuous engine / frame sampling)
//! 3. IdentityResolver - Scanned string -> bin identity
//! 4. Collection - Collection event state machine
//! 5. WebAPI - REST API endpoints
//!
//! ## Design Principles
//!
//! - SSoT: BinRegistry is the single source of truth for bins
//! - SOLID: Single responsibility per module
//! - Atomicity: a collection event applies completely or not at all

pub mod bin_registry;
pub mod collection;
pub mod error;
pub mod identity_resolver;
pub mod models;
pub mod scan_surface;
pub mod state;
pub mod store;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
