pub mod auth;
pub mod flash;

pub use auth::{CredentialCheck, SessionKeys, SharedCredential};
pub use flash::{Flash, FlashLevel};
