#[macro_use]
extern crate tracing;

mod logging;
pub mod monitor;
pub mod sink;

pub use logging::{
    init_errors,
    init_logging,
};
pub use monitor::{
    Monitor,
    MonitorState,
    RunSummary,
};
pub use sink::{
    MonitorEvent,
    MonitorSink,
    TracingSink,
};
