//! `axum` adapter for the CAS client endpoints.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod session_cookie;

pub use routes::register_routes;
pub use session_cookie::SessionCookie;
