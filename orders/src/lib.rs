#![deny(clippy::all)]

pub mod domain;
pub mod persistence;
pub mod ports;
pub mod repository;

pub use domain::{Order, OrderId};
pub use ports::{ListCache, OrderStore};
pub use repository::CachedOrderRepository;
