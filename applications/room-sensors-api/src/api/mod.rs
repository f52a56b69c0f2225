pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;

pub use handlers::{AppState, Site};
pub use routes::create_router;
