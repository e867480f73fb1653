//! # DDB Testkit
//!
//! Test utilities for DDB.
//!
//! This crate provides:
//! - Test fixtures and store helpers
//! - Property-based test generators using proptest
//! - A reference model that replays operations and checks the store
//!   against it
//! - Stress testing utilities
//!
//! ## Usage
//!
//! ```rust
//! use ddb_testkit::prelude::*;
//!
//! with_temp_store(|store| {
//!     let id = store.insert_json(br#"{"a":1}"#).unwrap();
//!     assert!(store.find(&id.to_string()).is_ok());
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod model;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::model::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use model::*;
pub use stress::*;
