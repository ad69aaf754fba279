//! Port Interfaces
//!
//! Contracts that infrastructure adapters implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `Clock`: Source of the current time stamped on updates
//! - `SecurityRowSource`: Durable reference data used to pre-populate
//!   the security registry at startup

mod clock;
mod security_row_source;

pub use clock::{Clock, FixedClock, SharedClock, SystemClock};
pub use security_row_source::{RowSourceError, SecurityRow, SecurityRowSource};

#[cfg(test)]
pub use security_row_source::MockSecurityRowSource;
