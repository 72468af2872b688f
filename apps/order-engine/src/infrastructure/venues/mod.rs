//! Venue Adapters
//!
//! Implementations of the `VenueAdapter` port.

pub mod simulated;

pub use simulated::{SimulatedVenueAdapter, SimulatedVenueConfig};
