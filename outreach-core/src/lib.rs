//! Outreach Core - Entity Types
//!
//! Pure data structures shared by the workflow client and its test utilities.
//! This crate contains ONLY data types and input validation - no I/O.

pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;
pub mod validation;

pub use entities::*;
pub use enums::*;
pub use error::*;
pub use identity::*;
pub use validation::*;
