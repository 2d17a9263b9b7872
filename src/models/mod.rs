//! Data models
//!
//! This module contains all data structures used throughout the Livesell system.
//! Models represent:
//! - Database entities (User, Product, LiveSession, Order)
//! - Input types for create/update operations

mod live_session;
mod order;
mod product;
mod user;

pub use live_session::{LiveSession, DEFAULT_SESSION_TITLE};
pub use order::{CreateOrderInput, Order, OrderStatus, OrderWithProduct};
pub use product::{CreateProductInput, Product, UpdateProductInput};
pub use user::{RegisterInput, User};
