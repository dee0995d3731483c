//! Core data types.

mod value;


pub use value::{compare_with_nulls, Value};
