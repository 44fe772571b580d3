//! # Galleon
//!
//! A columnar in-memory analytics engine: typed contiguous columns
//! ([`series::Series`]), frames of them ([`dataframe::DataFrame`]), a lazy
//! query plan with a rule-based optimizer ([`lazy::LazyFrame`]), vectorized
//! execution over SIMD kernels, and a streaming batch pipeline
//! ([`pipeline::Pipeline`]).

// Core exports
pub use crate::dataframe::DataFrame;
pub use crate::expressions::{col, lit, Expr};
pub use crate::lazy::LazyFrame;
pub use crate::series::Series;
pub use crate::types::{DType, Scalar};

// Core modules
pub mod dataframe;
pub mod error;
pub mod expressions;
pub mod lazy;
pub mod performance;
pub mod pipeline;
pub mod schema;
pub mod series;
pub mod types;

// Re-export the main error type
pub use error::GalleonError;
