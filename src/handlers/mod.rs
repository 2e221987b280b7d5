pub mod api;
pub mod health;
pub mod metrics;
pub mod session;

pub use api::{create_router, service_error_to_response, ApiError, ApiState};
pub use health::health_check;
pub use metrics::metrics_handler;
