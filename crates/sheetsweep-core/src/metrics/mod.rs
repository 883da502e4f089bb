//! Metrics and observability infrastructure.
//!
//! - `events`: Internal event types and the `InternalEvent` trait
//! - `server`: Prometheus HTTP server and initialization

pub mod events;
pub mod server;

pub use server::{DEFAULT_METRICS_ADDR, MetricsController, init_global, init_test};

use snafu::ResultExt;

use crate::error::{AddressParseSnafu, MetricsSnafu, SetupError};

/// Parse `address` and start the Prometheus endpoint on it.
pub fn start(address: &str) -> Result<(), SetupError> {
    let addr = address.parse().context(AddressParseSnafu)?;
    init_global(addr).context(MetricsSnafu)
}

/// Macro for emitting metric events.
///
/// Calls `InternalEvent::emit()` on the given event, which records the
/// corresponding Prometheus metric.
///
/// # Example
///
/// ```ignore
/// use sheetsweep_core::metrics::events::RowsFetched;
///
/// emit!(RowsFetched { count: 42 });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}

pub use emit;
