// HTTP surface for page analysis and session exposure

pub mod error;
pub mod handler;
pub mod server;

pub use error::{ApiError, Error, Result};
pub use handler::AppState;
pub use server::{create_router, exposure_router, spawn_exposure_server, AnalysisServer, ServerConfig};
