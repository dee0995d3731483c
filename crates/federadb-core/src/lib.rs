//! `FederaDB` Core
//!
//! This crate provides the scalar value model shared by the planner and the
//! execution engine of `FederaDB`.
//!
//! # Overview
//!
//! - **Values**: [`Value`] is the typed, nullable scalar carried in every row
//! - **Ordering**: [`Value::compare`] is a total order used for sorting,
//!   partitioning and tie detection; [`compare_with_nulls`] places NULLs
//!   first or last explicitly
//! - **Arithmetic**: checked numeric operations that report overflow and
//!   type mismatches as [`CoreError`]
//!
//! # Example
//!
//! ```
//! use std::cmp::Ordering;
//!
//! use federadb_core::{compare_with_nulls, Value};
//!
//! let a = Value::from("a");
//! let b = Value::from("b");
//! assert_eq!(a.compare(&b), Ordering::Less);
//!
//! // NULL sorts after every value when nulls are placed last
//! assert_eq!(compare_with_nulls(&Value::Null, &a, false), Ordering::Greater);
//!
//! let sum = Value::Int(40).checked_add(&Value::Int(2)).unwrap();
//! assert_eq!(sum, Value::Int(42));
//! ```
//!
//! # Modules
//!
//! - [`types`] - The [`Value`] type and its comparison rules
//! - [`error`] - Error types ([`CoreError`])

// Deny unwrap in library code to ensure proper error handling
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, CoreResult};
pub use types::{compare_with_nulls, Value};
