//! Application Layer
//!
//! Orchestrates the domain: port definitions for the outside world,
//! services shared by use cases, and the use cases themselves.

pub mod ports;
pub mod services;
pub mod use_cases;
