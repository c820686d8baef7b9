//! # billing-api
//!
//! HTTP layer for the exchequer billing service.
//!
//! This crate provides:
//! - The [`Server`] lifecycle: bind, health reporting, graceful shutdown
//! - Kubernetes probes and a status endpoint
//! - The Adyen payments webhook
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/healthz`, `/livez` | Liveness probe |
//! | GET | `/readyz` | Readiness probe |
//! | GET | `/` | Index page |
//! | GET | `/v1/status` | Heartbeat with version and uptime |
//! | POST | `/v1/adyen/payments` | Adyen payments webhook |

pub mod completion;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod status;

pub use logging::Logging;
pub use routes::create_router;
pub use server::{shutdown_signal, Server, ServerError};
pub use state::{AppConfig, AppState};
pub use status::{ServerStatus, StatusLock};
