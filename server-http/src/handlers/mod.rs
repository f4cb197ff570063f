pub mod health;
pub mod order_ops;

pub use health::health_check;
pub use order_ops::{create_order, delete_order, get_order, list_orders, update_order};
