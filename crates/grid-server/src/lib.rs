//! # grid-server
//!
//! The `axum` binary wiring C11's read API surface: one handler per
//! time-series family (§3/§4.11) and one per computed metric (§4.9/§4.10),
//! a `tower-http` CORS layer configured from `ALLOWED_ORIGINS` (§6), and
//! `GET /health` (§6). Routing and response shaping live here; parameter
//! validation and business logic stay in [`grid_api`] and [`grid_metrics`].

#![warn(clippy::all)]

pub mod error;
pub mod families;
pub mod health;
pub mod metrics;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
