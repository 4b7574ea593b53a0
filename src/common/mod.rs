//! Common types, traits, and error definitions for rust_chomp
//!
//! This module provides the foundational building blocks shared by the
//! optimizer, the interactive session and the visualization helpers.

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
pub use error::*;
