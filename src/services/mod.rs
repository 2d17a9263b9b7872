//! Services layer - Business logic
//!
//! This module contains all business logic services for the Livesell system.
//! Services are responsible for:
//! - Implementing business rules
//! - Coordinating between repositories
//! - Handling validation and error cases

pub mod inventory;
pub mod live;
pub mod password;
pub mod session;
pub mod summary;
pub mod users;

pub use inventory::{InventoryError, InventoryService};
pub use live::{LiveError, LiveService};
pub use password::{hash_password, verify_password};
pub use session::{SessionKey, SessionUser, SESSION_COOKIE, SESSION_TTL_SECONDS};
pub use summary::{SalesSummary, SummaryService, LOW_STOCK_THRESHOLD};
pub use users::{UserService, UserServiceError};
