pub mod metrics;
pub mod middleware;
pub mod tracing;

pub use metrics::{Metrics, MetricsError};
pub use middleware::{observability_middleware, SESSION_HEADER};
pub use tracing::{
    default_filter_directives, get_current_trace_id, init_observability, shutdown_observability,
    ObservabilityError,
};
