use crate::{
    collector::Collector,
    probe::HostProbe,
    sources::{
        describe,
        Reading,
        Record,
        SourceCall,
    },
    Batch,
    CollectError,
};
use siridb_monitor_config::{
    MetricSource,
    SampleConfig,
};
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    time::Duration,
};

/// Sub-key used for readings that are not split per device.
pub const TOTAL: &str = "total";

/// `{prefix}{subkey}_{source}[_{property}]`
pub fn series_name(prefix: &str, subkey: &str, source: MetricSource, property: Option<&str>) -> String {
    match property {
        Some(property) => format!("{prefix}{subkey}_{source}_{property}"),
        None => format!("{prefix}{subkey}_{source}"),
    }
}

/// What to read from a source and which attributes to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSpec {
    call: SourceCall,
    properties: Option<Vec<&'static str>>,
}

impl SampleSpec {
    /// Checks the properties against the source descriptor.
    pub fn new<S: AsRef<str>>(call: SourceCall, properties: Option<&[S]>) -> Result<Self, CollectError> {
        let metric = call.source();
        let descriptor = describe(metric);
        let properties = match (properties, call.shape().is_numeric()) {
            (None, true) => None,
            (None, false) => return Err(CollectError::MissingProperties { metric }),
            (Some(_), true) => return Err(CollectError::PropertiesOnScalar { metric }),
            (Some(properties), false) => Some(
                properties
                    .iter()
                    .map(|ea| {
                        descriptor
                            .attribute(ea.as_ref())
                            .ok_or_else(|| CollectError::UnknownAttribute {
                                metric,
                                attribute: ea.as_ref().to_string(),
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };
        Ok(Self { call, properties })
    }

    pub fn from_config(sample: &SampleConfig, interval: Duration) -> Result<Self, CollectError> {
        Self::new(SourceCall::from_config(sample, interval)?, sample.properties.as_deref())
    }

    pub fn call(&self) -> &SourceCall {
        &self.call
    }

    pub fn properties(&self) -> Option<&[&'static str]> {
        self.properties.as_deref()
    }
}

/// Reads one source and adds its series to `batch`.
///
/// Scalar readings and single records are stored under the sub-key
/// [`TOTAL`], per device readings under the device name. Without properties
/// every number becomes one series, with properties every selected
/// attribute of every record does.
pub async fn collect_sample(
    batch: &mut Batch,
    prefix: &str,
    probe: &dyn HostProbe,
    spec: &SampleSpec,
) -> Result<usize, CollectError> {
    let metric = spec.call.source();
    let reading = probe.read(&spec.call).await?;
    let before = batch.len();

    match (reading, spec.properties()) {
        (Reading::Scalar(value), None) => {
            batch.push(series_name(prefix, TOTAL, metric, None), value)?;
        }
        (Reading::Map(values), None) => {
            for (subkey, value) in values {
                batch.push(series_name(prefix, &subkey, metric, None), value)?;
            }
        }
        (Reading::Scalar(_) | Reading::Map(_), Some(_)) => return Err(CollectError::PropertiesOnScalar { metric }),
        (Reading::Record(_) | Reading::PerDevice(_), None) => {
            return Err(CollectError::MissingProperties { metric });
        }
        (Reading::Record(record), Some(properties)) => {
            push_record(batch, prefix, TOTAL, metric, &record, properties)?;
        }
        (Reading::PerDevice(devices), Some(properties)) => {
            for (device, record) in &devices {
                push_record(batch, prefix, device, metric, record, properties)?;
            }
        }
    }

    Ok(batch.len() - before)
}

fn push_record(
    batch: &mut Batch,
    prefix: &str,
    subkey: &str,
    metric: MetricSource,
    record: &Record,
    properties: &[&'static str],
) -> Result<(), CollectError> {
    for &property in properties {
        let value = record
            .get(property)
            .ok_or(CollectError::MissingAttribute {
                metric,
                attribute: property,
            })?;
        batch.push(series_name(prefix, subkey, metric, Some(property)), value)?;
    }
    Ok(())
}

/// Samples every configured host metric source in order.
pub struct HostCollector {
    prefix: String,
    probe: Arc<dyn HostProbe>,
    samples: Vec<SampleSpec>,
}

impl HostCollector {
    pub fn new(prefix: impl Into<String>, probe: Arc<dyn HostProbe>, samples: Vec<SampleSpec>) -> Self {
        Self {
            prefix: prefix.into(),
            probe,
            samples,
        }
    }

    /// Validates every sample up front so that a typo fails at startup.
    pub fn from_config(
        prefix: impl Into<String>,
        probe: Arc<dyn HostProbe>,
        samples: &[SampleConfig],
        interval: Duration,
    ) -> Result<Self, CollectError> {
        let samples = samples
            .iter()
            .map(|sample| SampleSpec::from_config(sample, interval))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(prefix, probe, samples))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn samples(&self) -> &[SampleSpec] {
        &self.samples
    }
}

impl Collector for HostCollector {
    fn collect<'a>(&'a self, batch: &'a mut Batch) -> Pin<Box<dyn Future<Output = Result<usize, CollectError>> + Send + 'a>> {
        Box::pin(async move {
            let mut added = 0;
            for spec in &self.samples {
                let count = collect_sample(batch, &self.prefix, self.probe.as_ref(), spec).await?;
                debug!(source = %spec.call.source(), count, "sampled");
                added += count;
            }
            Ok(added)
        })
    }

    fn name(&self) -> &'static str {
        "host"
    }
}
