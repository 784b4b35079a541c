//! HTTP surface.

pub mod auth;
pub mod middleware;
pub mod params;
pub mod routes;
pub mod server;

pub use server::{build_router, start_server, AppState};
