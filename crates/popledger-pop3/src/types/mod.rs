//! Core POP3 types.

mod auth;
mod ids;
mod reply;

pub use auth::AuthMechanism;
pub use ids::{MessageNumber, UniqueId};
pub use reply::{Reply, ResponseCode, Stat, Status};
