use serde::{
    Deserialize,
    Serialize,
};
use std::path::PathBuf;
use strum::{
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
};

/// The host metric sources that can be sampled.
///
/// The string form is used verbatim inside series names, e.g.
/// `myhost|total_cpu_percent`.
#[derive(
    Debug, Clone, Copy, Display, EnumIter, EnumString, IntoStaticStr, Serialize, Deserialize, PartialEq, Eq, Hash,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MetricSource {
    CpuPercent,
    VirtualMemory,
    DiskUsage,
    DiskIoCounters,
    NetIoCounters,
}

impl MetricSource {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// A single entry of the `samples` list in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleConfig {
    pub source: MetricSource,
    /// Mount point for `disk_usage`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Report disks, network interfaces or CPU cores individually instead of summed.
    #[serde(default)]
    pub per_device: bool,
    /// Attributes to extract from each reading. When absent the reading
    /// itself is written, which only works for sources returning plain numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<String>>,
}

#[cfg(test)]
mod test {
    use super::MetricSource;
    use std::str::FromStr;
    use strum::IntoEnumIterator as _;

    #[test]
    fn source_names_round_trip() {
        for source in MetricSource::iter() {
            assert_eq!(MetricSource::from_str(source.as_str()).unwrap(), source);
        }
        assert_eq!(MetricSource::NetIoCounters.as_str(), "net_io_counters");
        assert_eq!(MetricSource::CpuPercent.to_string(), "cpu_percent");
    }
}
