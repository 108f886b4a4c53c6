//! Database Models

// Serde helpers
pub mod serde_helpers;

// Auth
pub mod manager;
pub mod workplace;

// Queue Domain
pub mod category;
pub mod tally;
pub mod ticket;

// Re-exports
pub use category::{Category, CategoryCreate, CategoryId};
pub use manager::{Manager, ManagerCreate, ManagerId};
pub use tally::DailyTally;
pub use ticket::{Ticket, TicketId};
pub use workplace::{Workplace, WorkplaceCreate, WorkplaceId};
