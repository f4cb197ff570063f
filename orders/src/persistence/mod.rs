pub mod memory_store;
pub mod postgres_store;
pub mod sled_store;

pub use memory_store::MemoryOrderStore;
pub use postgres_store::PostgresOrderStore;
pub use sled_store::SledOrderStore;
