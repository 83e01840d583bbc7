//! Static knowledge about the host metric sources: how each one is called,
//! what shape its reading has and which attributes a record carries.

use crate::{
    CollectError,
    Value,
};
use siridb_monitor_config::{
    MetricSource,
    SampleConfig,
};
use std::{
    collections::BTreeMap,
    path::PathBuf,
    time::Duration,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// A single number.
    Scalar,
    /// One number per device.
    FlatMap,
    /// One record of named attributes.
    Record,
    /// One record per device, or a single summed record.
    DeviceRecords,
}

impl Shape {
    /// Readings of this shape carry plain numbers rather than attributes.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Shape::Scalar | Shape::FlatMap)
    }
}

#[derive(Debug)]
pub struct Descriptor {
    pub source: MetricSource,
    pub shape: Shape,
    pub attributes: &'static [&'static str],
}

impl Descriptor {
    /// Looks up an attribute name, handing back the static spelling.
    pub fn attribute(&self, name: &str) -> Option<&'static str> {
        self.attributes.iter().copied().find(|ea| *ea == name)
    }
}

static CPU_PERCENT: Descriptor = Descriptor {
    source: MetricSource::CpuPercent,
    shape: Shape::Scalar,
    attributes: &[],
};

static VIRTUAL_MEMORY: Descriptor = Descriptor {
    source: MetricSource::VirtualMemory,
    shape: Shape::Record,
    attributes: &["total", "available", "percent", "used", "free"],
};

static DISK_USAGE: Descriptor = Descriptor {
    source: MetricSource::DiskUsage,
    shape: Shape::Record,
    attributes: &["total", "used", "free", "percent"],
};

static DISK_IO_COUNTERS: Descriptor = Descriptor {
    source: MetricSource::DiskIoCounters,
    shape: Shape::DeviceRecords,
    attributes: &[
        "read_count",
        "write_count",
        "read_bytes",
        "write_bytes",
        "read_time",
        "write_time",
    ],
};

static NET_IO_COUNTERS: Descriptor = Descriptor {
    source: MetricSource::NetIoCounters,
    shape: Shape::DeviceRecords,
    attributes: &[
        "bytes_sent",
        "bytes_recv",
        "packets_sent",
        "packets_recv",
        "errin",
        "errout",
        "dropin",
        "dropout",
    ],
};

pub fn describe(source: MetricSource) -> &'static Descriptor {
    match source {
        MetricSource::CpuPercent => &CPU_PERCENT,
        MetricSource::VirtualMemory => &VIRTUAL_MEMORY,
        MetricSource::DiskUsage => &DISK_USAGE,
        MetricSource::DiskIoCounters => &DISK_IO_COUNTERS,
        MetricSource::NetIoCounters => &NET_IO_COUNTERS,
    }
}

/// A metric source together with its call arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCall {
    /// CPU utilisation measured over `interval`, optionally per core.
    CpuPercent { interval: Duration, per_cpu: bool },
    VirtualMemory,
    DiskUsage { path: PathBuf },
    DiskIoCounters { per_device: bool },
    NetIoCounters { per_device: bool },
}

impl SourceCall {
    pub fn source(&self) -> MetricSource {
        match self {
            SourceCall::CpuPercent { .. } => MetricSource::CpuPercent,
            SourceCall::VirtualMemory => MetricSource::VirtualMemory,
            SourceCall::DiskUsage { .. } => MetricSource::DiskUsage,
            SourceCall::DiskIoCounters { .. } => MetricSource::DiskIoCounters,
            SourceCall::NetIoCounters { .. } => MetricSource::NetIoCounters,
        }
    }

    /// The shape of the reading this call produces.
    pub fn shape(&self) -> Shape {
        match self {
            SourceCall::CpuPercent { per_cpu: true, .. } => Shape::FlatMap,
            SourceCall::DiskIoCounters { per_device: false } | SourceCall::NetIoCounters { per_device: false } => {
                Shape::Record
            }
            _ => describe(self.source()).shape,
        }
    }

    /// `interval` is the CPU measurement window.
    pub fn from_config(sample: &SampleConfig, interval: Duration) -> Result<Self, CollectError> {
        Ok(match sample.source {
            MetricSource::CpuPercent => SourceCall::CpuPercent {
                interval,
                per_cpu: sample.per_device,
            },
            MetricSource::VirtualMemory => SourceCall::VirtualMemory,
            MetricSource::DiskUsage => SourceCall::DiskUsage {
                path: sample.path.clone().ok_or(CollectError::MissingPath {
                    metric: sample.source,
                })?,
            },
            MetricSource::DiskIoCounters => SourceCall::DiskIoCounters {
                per_device: sample.per_device,
            },
            MetricSource::NetIoCounters => SourceCall::NetIoCounters {
                per_device: sample.per_device,
            },
        })
    }
}

/// Named attributes of one reading, e.g. the counters of one disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(BTreeMap<&'static str, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, attribute: &'static str, value: impl Into<Value>) -> Self {
        self.0.insert(attribute, value.into());
        self
    }

    pub fn get(&self, attribute: &str) -> Option<Value> {
        self.0.get(attribute).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Scalar(Value),
    Record(Record),
    Map(BTreeMap<String, Value>),
    PerDevice(BTreeMap<String, Record>),
}
