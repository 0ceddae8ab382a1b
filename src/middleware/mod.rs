pub mod session;

pub use session::{get_current_session, require_session, CurrentSession};
