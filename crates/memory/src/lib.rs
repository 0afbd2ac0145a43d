pub mod session;
pub mod types;

pub use session::{ConversationStore, SessionError};
pub use types::{current_timestamp, Message, Role};
