pub mod conversation;
pub mod message;
pub mod user;

pub use conversation::{AcceptOutcome, Conversation};
pub use message::Message;
pub use user::UserProfile;
