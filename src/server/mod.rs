pub mod app_state;
pub mod session_manager;

pub use app_state::AppState;
pub use session_manager::{SessionManager, Subscription};
