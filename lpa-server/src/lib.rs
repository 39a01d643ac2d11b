//! `lpa-server` exposes the loan product assistant over HTTP.
//! It answers `POST /ask` from a lazily loaded index and reports `GET /health`.

pub mod protocol;
pub mod server;
pub mod state;

pub use server::{ServerConfig, app_router, run_server, serve};
pub use state::AppState;
