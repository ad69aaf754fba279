//! Application Services
//!
//! - `ReferenceDataLoader`: Pre-populates the security registry from a
//!   `SecurityRowSource` before the live feed starts

mod reference_data;

pub use reference_data::{LoadSummary, ReferenceDataLoader};
