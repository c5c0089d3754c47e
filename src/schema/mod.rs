pub mod bot_message;
pub mod chat_log;
pub mod conversation;
pub mod message;
pub mod patient;

pub use bot_message::*;
pub use chat_log::*;
pub use conversation::*;
pub use message::*;
pub use patient::*;
