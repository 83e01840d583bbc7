//! Everything that turns a host and a SiriDB cluster into one batch of
//! points: metric sources, collectors and the groups the series land in.

#[macro_use]
extern crate tracing;

mod batch;
mod collector;
mod database_collector;
mod error;
mod groups;
mod host_collector;
mod probe;
mod sources;

pub use batch::{
    Batch,
    Point,
    Value,
};
pub use collector::Collector;
pub use database_collector::{
    database_series_name,
    server_series_name,
    DatabaseCollector,
    COUNT_SERIES,
    COUNT_SERIES_LENGTH,
    LIST_SERVERS,
    SERIES_NAMESPACE,
};
pub use error::CollectError;
pub use groups::{
    create_group,
    provision,
    Group,
    GroupOutcome,
    GROUPS,
};
pub use host_collector::{
    collect_sample,
    series_name,
    HostCollector,
    SampleSpec,
    TOTAL,
};
pub use probe::{
    HostProbe,
    ProbeError,
    ProcfsProbe,
};
pub use sources::{
    describe,
    Descriptor,
    Reading,
    Record,
    Shape,
    SourceCall,
};
