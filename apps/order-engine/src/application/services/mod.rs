//! Application Services
//!
//! Stateful collaborators shared by the use cases.

mod notification_hub;
mod venue_router;

pub use notification_hub::{HubError, HubStats, NotificationHub, SharedSink, SinkId};
pub use venue_router::{RouterTimeouts, RoutingDecision, RoutingError, VenueRouter, select_best};
