//! Data models for the application.

pub mod chat;
pub mod pet;
pub mod user;
pub mod vaccine;

pub use chat::{ChatMessage, ChatRole};
pub use pet::{Pet, Species};
pub use user::{PasswordRecord, PlanTier, UsageStats, User};
pub use vaccine::Vaccine;
