//! Conversation state carried across agent turns

mod conversation;
mod message;

pub use conversation::Conversation;
pub use message::{Message, Role};
