use crate::{
    sources::{
        Reading,
        Record,
        SourceCall,
    },
    Value,
};
use nix::sys::statvfs::statvfs;
use procfs::{
    Current as _,
    CurrentSI as _,
    CpuTime,
    KernelStats,
    Meminfo,
};
use std::{
    collections::BTreeMap,
    future::Future,
    io,
    path::{
        Path,
        PathBuf,
    },
    pin::Pin,
};

/// Linux reports disk sectors in units of 512 bytes regardless of the device.
const SECTOR_SIZE: u64 = 512;

#[derive(thiserror::Error, Debug)]
pub enum ProbeError {
    #[error(transparent)]
    Proc(#[from] procfs::ProcError),
    #[error("statvfs({path:?}) failed: {source}")]
    Statvfs {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Reads host metrics.
pub trait HostProbe: Send + Sync {
    fn read<'a>(&'a self, call: &'a SourceCall) -> Pin<Box<dyn Future<Output = Result<Reading, ProbeError>> + Send + 'a>>;
}

/// [`HostProbe`] backed by `/proc` and `statvfs(3)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcfsProbe;

impl HostProbe for ProcfsProbe {
    fn read<'a>(&'a self, call: &'a SourceCall) -> Pin<Box<dyn Future<Output = Result<Reading, ProbeError>> + Send + 'a>> {
        Box::pin(async move {
            let reading = match call {
                SourceCall::CpuPercent { interval, per_cpu } => {
                    let before = CpuSnapshot::read()?;
                    tokio::time::sleep(*interval).await;
                    let after = CpuSnapshot::read()?;
                    before.reading(&after, *per_cpu)
                }
                SourceCall::VirtualMemory => Reading::Record(virtual_memory()?),
                SourceCall::DiskUsage { path } => Reading::Record(DiskSpace::of(path)?.into_record()),
                SourceCall::DiskIoCounters { per_device } => per_device_or_total(CounterKind::Disk, disk_io_counters()?, *per_device),
                SourceCall::NetIoCounters { per_device } => per_device_or_total(CounterKind::Net, net_io_counters()?, *per_device),
            };
            trace!(source = %call.source(), ?reading, "probed");
            Ok(reading)
        })
    }
}

fn per_device_or_total(kind: CounterKind, devices: BTreeMap<String, Counters>, per_device: bool) -> Reading {
    if per_device {
        Reading::PerDevice(
            devices
                .into_iter()
                .map(|(name, counters)| (name, counters.into_record()))
                .collect(),
        )
    } else {
        let empty = Counters { kind, values: [0; 8] };
        let total = devices.into_values().fold(empty, |acc, ea| acc.sum(&ea));
        Reading::Record(total.into_record())
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round1(part as f64 / whole as f64 * 100.0)
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-
// cpu

/// Aggregate CPU time of all cores, in clock ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CpuTicks {
    total: u64,
    idle: u64,
}

impl CpuTicks {
    fn busy_percent(&self, later: &CpuTicks) -> f64 {
        let total = later.total.saturating_sub(self.total);
        let idle = later.idle.saturating_sub(self.idle);
        percent(total.saturating_sub(idle), total).clamp(0.0, 100.0)
    }
}

impl From<CpuTime> for CpuTicks {
    fn from(time: CpuTime) -> Self {
        // guest time is already accounted for in user and nice
        let iowait = time.iowait.unwrap_or(0);
        let total = time.user
            + time.nice
            + time.system
            + time.idle
            + iowait
            + time.irq.unwrap_or(0)
            + time.softirq.unwrap_or(0)
            + time.steal.unwrap_or(0);
        Self {
            total,
            idle: time.idle + iowait,
        }
    }
}

/// The aggregate line of `/proc/stat` plus one entry per core.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CpuSnapshot {
    total: CpuTicks,
    cores: Vec<CpuTicks>,
}

impl CpuSnapshot {
    fn read() -> Result<Self, ProbeError> {
        let stats = KernelStats::current()?;
        Ok(Self {
            total: stats.total.into(),
            cores: stats.cpu_time.into_iter().map(CpuTicks::from).collect(),
        })
    }

    /// Busy percent since `self`, one value per core (`cpu0`, `cpu1`, ...) when `per_cpu`.
    fn reading(&self, later: &CpuSnapshot, per_cpu: bool) -> Reading {
        if !per_cpu {
            return Reading::Scalar(Value::Float(self.total.busy_percent(&later.total)));
        }
        Reading::Map(
            self.cores
                .iter()
                .zip(&later.cores)
                .enumerate()
                .map(|(idx, (before, after))| (format!("cpu{idx}"), Value::Float(before.busy_percent(after))))
                .collect(),
        )
    }
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-
// memory

fn virtual_memory() -> Result<Record, ProbeError> {
    let meminfo = Meminfo::current()?;
    let available = meminfo
        .mem_available
        .unwrap_or(meminfo.mem_free + meminfo.buffers + meminfo.cached);
    Ok(memory_record(meminfo.mem_total, meminfo.mem_free, available))
}

fn memory_record(total: u64, free: u64, available: u64) -> Record {
    let used = total.saturating_sub(available);
    Record::new()
        .with("total", total)
        .with("available", available)
        .with("percent", percent(used, total))
        .with("used", used)
        .with("free", free)
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-
// disk usage

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DiskSpace {
    total: u64,
    used: u64,
    /// Space available to unprivileged users.
    free: u64,
}

impl DiskSpace {
    fn of(path: &Path) -> Result<Self, ProbeError> {
        let stat = statvfs(path).map_err(|errno| ProbeError::Statvfs {
            path: path.to_path_buf(),
            source: io::Error::from(errno),
        })?;
        #[allow(clippy::unnecessary_cast)]
        let space = Self::from_blocks(
            stat.blocks() as u64,
            stat.blocks_free() as u64,
            stat.blocks_available() as u64,
            stat.fragment_size() as u64,
        );
        Ok(space)
    }

    fn from_blocks(blocks: u64, blocks_free: u64, blocks_available: u64, fragment_size: u64) -> Self {
        let total = blocks * fragment_size;
        let used = total.saturating_sub(blocks_free * fragment_size);
        Self {
            total,
            used,
            free: blocks_available * fragment_size,
        }
    }

    fn into_record(self) -> Record {
        // reserved root blocks count neither as used nor as free
        Record::new()
            .with("total", self.total)
            .with("used", self.used)
            .with("free", self.free)
            .with("percent", percent(self.used, self.used + self.free))
    }
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-
// io counters

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CounterKind {
    Disk,
    Net,
}

/// The counters of one disk or network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Counters {
    kind: CounterKind,
    values: [u64; 8],
}

const DISK_ATTRIBUTES: [&str; 6] = [
    "read_count",
    "write_count",
    "read_bytes",
    "write_bytes",
    "read_time",
    "write_time",
];

const NET_ATTRIBUTES: [&str; 8] = [
    "bytes_sent",
    "bytes_recv",
    "packets_sent",
    "packets_recv",
    "errin",
    "errout",
    "dropin",
    "dropout",
];

impl Counters {
    fn sum(mut self, other: &Counters) -> Self {
        for (acc, ea) in self.values.iter_mut().zip(other.values) {
            *acc = acc.saturating_add(ea);
        }
        self
    }

    fn into_record(self) -> Record {
        let attributes: &[&'static str] = match self.kind {
            CounterKind::Disk => &DISK_ATTRIBUTES,
            CounterKind::Net => &NET_ATTRIBUTES,
        };
        attributes
            .iter()
            .copied()
            .zip(self.values)
            .fold(Record::new(), |record, (attribute, value)| record.with(attribute, value))
    }
}

fn disk_io_counters() -> Result<BTreeMap<String, Counters>, ProbeError> {
    Ok(procfs::diskstats()?
        .into_iter()
        .map(|disk| {
            let counters = Counters {
                kind: CounterKind::Disk,
                values: [
                    disk.reads,
                    disk.writes,
                    disk.sectors_read * SECTOR_SIZE,
                    disk.sectors_written * SECTOR_SIZE,
                    disk.time_reading,
                    disk.time_writing,
                    0,
                    0,
                ],
            };
            (disk.name, counters)
        })
        .collect())
}

fn net_io_counters() -> Result<BTreeMap<String, Counters>, ProbeError> {
    Ok(procfs::net::dev_status()?
        .into_iter()
        .map(|(name, dev)| {
            let counters = Counters {
                kind: CounterKind::Net,
                values: [
                    dev.sent_bytes,
                    dev.recv_bytes,
                    dev.sent_packets,
                    dev.recv_packets,
                    dev.recv_errs,
                    dev.sent_errs,
                    dev.recv_drop,
                    dev.sent_drop,
                ],
            };
            (name, counters)
        })
        .collect())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sources::describe;
    use pretty_assertions::assert_eq;
    use siridb_monitor_config::MetricSource;
    use std::time::Duration;

    #[test]
    fn busy_percent_ignores_idle_and_iowait() {
        let before = CpuTicks { total: 1_000, idle: 800 };
        let after = CpuTicks { total: 1_400, idle: 1_100 };
        assert_eq!(before.busy_percent(&after), 25.0);
        assert_eq!(before.busy_percent(&before), 0.0);
    }

    #[test]
    fn per_cpu_reading_is_keyed_by_core() {
        let before = CpuSnapshot {
            total: CpuTicks { total: 2_000, idle: 1_600 },
            cores: vec![CpuTicks { total: 1_000, idle: 800 }, CpuTicks { total: 1_000, idle: 800 }],
        };
        let after = CpuSnapshot {
            total: CpuTicks { total: 2_800, idle: 2_100 },
            cores: vec![CpuTicks { total: 1_400, idle: 1_100 }, CpuTicks { total: 1_400, idle: 1_000 }],
        };

        assert_eq!(before.reading(&after, false), Reading::Scalar(Value::Float(37.5)));
        assert_eq!(
            before.reading(&after, true),
            Reading::Map(BTreeMap::from([
                ("cpu0".to_string(), Value::Float(25.0)),
                ("cpu1".to_string(), Value::Float(50.0)),
            ]))
        );
    }

    #[test]
    fn memory_percent_is_based_on_available() {
        let record = memory_record(1_000, 100, 250);
        assert_eq!(record.get("used"), Some(Value::Integer(750)));
        assert_eq!(record.get("percent"), Some(Value::Float(75.0)));
        assert_eq!(record.get("free"), Some(Value::Integer(100)));
    }

    #[test]
    fn disk_usage_excludes_reserved_blocks() {
        // 100 blocks, 30 free of which 10 are reserved for root
        let space = DiskSpace::from_blocks(100, 30, 20, 4096);
        assert_eq!(space.total, 409_600);
        assert_eq!(space.used, 286_720);
        assert_eq!(space.free, 81_920);
        assert_eq!(space.into_record().get("percent"), Some(Value::Float(77.8)));
    }

    #[test]
    fn summed_counters_keep_their_attributes() {
        let mut devices = BTreeMap::new();
        devices.insert(
            "eth0".to_string(),
            Counters {
                kind: CounterKind::Net,
                values: [10, 20, 1, 2, 0, 0, 0, 1],
            },
        );
        devices.insert(
            "lo".to_string(),
            Counters {
                kind: CounterKind::Net,
                values: [5, 5, 1, 1, 0, 0, 0, 0],
            },
        );
        let Reading::Record(total) = per_device_or_total(CounterKind::Net, devices.clone(), false) else {
            panic!("expected a single record");
        };
        assert_eq!(total.get("bytes_sent"), Some(Value::Integer(15)));
        assert_eq!(total.get("dropout"), Some(Value::Integer(1)));
        assert_eq!(total.len(), NET_ATTRIBUTES.len());

        let Reading::PerDevice(per_device) = per_device_or_total(CounterKind::Net, devices, true) else {
            panic!("expected per device records");
        };
        assert_eq!(per_device.keys().collect::<Vec<_>>(), vec!["eth0", "lo"]);
    }

    #[test]
    fn readings_carry_the_described_attributes() {
        assert_eq!(describe(MetricSource::DiskIoCounters).attributes, &DISK_ATTRIBUTES);
        assert_eq!(describe(MetricSource::NetIoCounters).attributes, &NET_ATTRIBUTES);
        let memory = memory_record(1, 1, 1);
        for attribute in describe(MetricSource::VirtualMemory).attributes {
            assert!(memory.get(attribute).is_some(), "{attribute}");
        }
        let disk = DiskSpace::from_blocks(1, 1, 1, 1).into_record();
        for attribute in describe(MetricSource::DiskUsage).attributes {
            assert!(disk.get(attribute).is_some(), "{attribute}");
        }
    }

    #[tokio::test]
    async fn reads_the_local_host() {
        let probe = ProcfsProbe;
        let memory = probe.read(&SourceCall::VirtualMemory).await.unwrap();
        assert!(matches!(memory, Reading::Record(record) if record.get("total").is_some()));

        let root = probe
            .read(&SourceCall::DiskUsage { path: PathBuf::from("/") })
            .await
            .unwrap();
        assert!(matches!(root, Reading::Record(_)));

        let cpu = probe
            .read(&SourceCall::CpuPercent {
                interval: Duration::from_millis(10),
                per_cpu: false,
            })
            .await
            .unwrap();
        assert!(matches!(cpu, Reading::Scalar(Value::Float(p)) if (0.0..=100.0).contains(&p)));

        let cores = probe
            .read(&SourceCall::CpuPercent {
                interval: Duration::from_millis(10),
                per_cpu: true,
            })
            .await
            .unwrap();
        assert!(matches!(cores, Reading::Map(cores) if cores.contains_key("cpu0")));
    }

    #[tokio::test]
    async fn missing_mount_point_is_an_error() {
        let err = ProcfsProbe
            .read(&SourceCall::DiskUsage {
                path: PathBuf::from("/does/not/exist"),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Statvfs { .. }));
    }
}
