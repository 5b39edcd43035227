mod email;
mod identity;

pub use email::{DEFAULT_CHARSET, Email, OutgoingMessage, Sender};
pub use identity::User;
