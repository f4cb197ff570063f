pub mod cached;

pub use cached::CachedOrderRepository;
