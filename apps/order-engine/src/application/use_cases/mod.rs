//! Application Use Cases
//!
//! Use cases orchestrate domain logic to fulfill application requirements.

mod execute_order;
mod recover_orders;
mod submit_order;

pub use execute_order::{ExecutionError, ExecutionOutcome, OrderExecutor};
pub use recover_orders::{RecoverOrdersUseCase, RecoveryReport};
pub use submit_order::{SubmitOrderError, SubmitOrderUseCase};
