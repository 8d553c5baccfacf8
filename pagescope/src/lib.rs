pub mod handlers;
pub mod logging;
pub mod server;

pub use handlers::ErrorResponse;
pub use server::{AppState, create_app, create_debug_app, run_server};
