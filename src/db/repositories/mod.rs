//! Repository layer
//!
//! One repository per entity. Each repository is a trait describing the data
//! access interface plus a `SqlxXxxRepository` implementation that dispatches
//! to SQLite or MySQL based on the pool driver.

mod live_session;
mod order;
mod product;
mod user;

pub use live_session::{LiveSessionRepository, SqlxLiveSessionRepository};
pub use order::{BestSeller, OrderRepository, SqlxOrderRepository, StatusCounts};
pub use product::{ProductRepository, SqlxProductRepository};
pub use user::{SqlxUserRepository, UserRepository};
