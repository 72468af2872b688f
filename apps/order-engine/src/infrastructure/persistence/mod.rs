//! Persistence Adapters
//!
//! Implementations of the `OrderStore` port.

pub mod file;
pub mod in_memory;

pub use file::JsonFileOrderStore;
pub use in_memory::InMemoryOrderStore;
