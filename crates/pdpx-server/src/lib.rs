pub mod config;
pub mod error;
pub mod handlers;
pub mod observability;
pub mod server;
pub mod state;

pub use config::{AppConfig, DecisionConfig, LoggingConfig, PoliciesConfig, ServerConfig};
pub use error::{ApiError, ErrorResponse};
pub use observability::init_tracing;
pub use server::{API_BASE, PdpxServer, ServerBuilder, build_app, router};
pub use state::{AppState, build_state};
