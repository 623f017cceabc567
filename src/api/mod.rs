//! API Module
//!
//! HTTP handlers and routing for the tracker REST API.
//!
//! # Endpoints
//! - `POST /register/`, `POST /login/`, `POST /token/refresh/`, `GET /users/`
//! - `GET|POST /trees/`, `GET|PUT|PATCH|DELETE /trees/:id/`
//! - `GET /trees/my_stats/`, `GET /trees/geojson/`
//! - `GET /health` - Health check endpoint

pub mod extract;
pub mod handlers;
pub mod routes;

pub use extract::{Caller, TreeBody};
pub use handlers::*;
pub use routes::create_router;
