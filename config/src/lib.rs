#[macro_use]
extern crate tracing;

mod app_config;
mod args;
mod hostname;
mod precision;
mod sample_config;
mod server_address;

pub use app_config::get_config_dir;
pub use args::Args;
pub use hostname::{
    expand_prefix,
    hostname,
    HOSTNAME_TOKEN,
};
pub use precision::TimePrecision;
pub use sample_config::{
    MetricSource,
    SampleConfig,
};
pub use server_address::ServerAddress;

use color_eyre::Result;
use eyre::{
    bail,
    Context as _,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::HashMap,
    time::Duration,
};

/// Resolved run configuration of the monitor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub database: String,
    /// Comma separated `host:port` list, see [`Config::server_addresses`].
    pub servers: String,
    pub prefix: String,
    /// 0 samples forever.
    #[serde(default)]
    pub number_of_samples: u64,
    /// Seconds between samples.
    pub interval: u64,
    #[serde(default)]
    pub time_precision: TimePrecision,
    #[serde(default)]
    pub samples: Vec<SampleConfig>,
}

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");

impl Default for Config {
    fn default() -> Self {
        serde_yml::from_str(DEFAULT_CONFIG).expect("Failed to parse default config")
    }
}

impl config::Source for Config {
    fn clone_into_box(&self) -> Box<dyn config::Source + Send + Sync> {
        Box::new((*self).clone())
    }

    fn collect(&self) -> Result<config::Map<String, config::Value>, config::ConfigError> {
        let mut cache = HashMap::<String, config::Value>::new();
        cache.insert("user".to_string(), self.user.clone().into());
        cache.insert("password".to_string(), self.password.clone().into());
        cache.insert("database".to_string(), self.database.clone().into());
        cache.insert("servers".to_string(), self.servers.clone().into());
        cache.insert("prefix".to_string(), self.prefix.clone().into());
        cache.insert("number_of_samples".to_string(), self.number_of_samples.into());
        cache.insert("interval".to_string(), self.interval.into());
        cache.insert("time_precision".to_string(), self.time_precision.to_string().into());
        cache.insert(
            "samples".to_string(),
            self.samples
                .iter()
                .map(|ea| {
                    let mut table = HashMap::<String, config::Value>::new();
                    table.insert("source".to_string(), ea.source.as_str().into());
                    table.insert("per_device".to_string(), ea.per_device.into());
                    if let Some(path) = &ea.path {
                        table.insert("path".to_string(), path.display().to_string().into());
                    }
                    if let Some(properties) = &ea.properties {
                        table.insert("properties".to_string(), properties.clone().into());
                    }
                    config::ValueKind::Table(table)
                })
                .collect::<Vec<_>>()
                .into(),
        );
        Ok(cache)
    }
}

impl Config {
    /// Layers built-in defaults, `config.yaml` from the config directory, the
    /// file passed with `--config` and finally the command line arguments.
    pub fn new(args: Args) -> Result<Self, config::ConfigError> {
        let config_dir = get_config_dir();
        let mut builder = config::Config::builder().add_source(Config::default());

        let config_files = [("config.yaml", config::FileFormat::Yaml)];

        for (file, format) in &config_files {
            let source = config::File::from(config_dir.join(file))
                .format(*format)
                .required(false);
            builder = builder.add_source(source);
        }

        if let Some(path) = &args.config {
            builder = builder.add_source(
                config::File::from(path.as_path())
                    .format(config::FileFormat::Yaml)
                    .required(true),
            );
        }

        builder = builder.add_source(args);

        let cfg: Self = builder.build()?.try_deserialize()?;

        Ok(cfg)
    }

    /// Checks values that deserialize fine but cannot be run with.
    #[instrument(level = "debug", skip(self))]
    pub fn validate(&self) -> Result<()> {
        self.server_addresses().wrap_err("Invalid server list")?;
        if self.interval == 0 {
            bail!("interval must be at least 1 second");
        }
        if self.database.is_empty() {
            bail!("database name must not be empty");
        }
        for sample in &self.samples {
            if sample.source == MetricSource::DiskUsage && sample.path.is_none() {
                bail!("sample {} requires a path", sample.source);
            }
        }
        debug!(samples = self.samples.len(), "configuration is valid");
        Ok(())
    }

    pub fn server_addresses(&self) -> Result<Vec<ServerAddress>> {
        ServerAddress::parse_list(&self.servers)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// `None` when sampling should go on until stopped.
    pub fn sample_limit(&self) -> Option<u64> {
        (self.number_of_samples > 0).then_some(self.number_of_samples)
    }

    /// The series prefix with `%HOSTNAME%` substituted.
    pub fn resolved_prefix(&self) -> Result<String> {
        if !self.prefix.contains(HOSTNAME_TOKEN) {
            return Ok(self.prefix.clone());
        }
        let host = hostname().context("Failed to read the host name")?;
        Ok(expand_prefix(&self.prefix, &host))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn default_config_matches_the_classic_sampling_set() {
        let config = Config::default();
        assert_eq!(config.user, "iris");
        assert_eq!(config.database, "tutorialdb");
        assert_eq!(config.prefix, "%HOSTNAME%|");
        assert_eq!(config.interval, 5);
        assert_eq!(config.sample_limit(), None);
        assert_eq!(config.time_precision, TimePrecision::Seconds);

        let sources: Vec<_> = config.samples.iter().map(|ea| ea.source).collect();
        assert_eq!(
            sources,
            vec![
                MetricSource::CpuPercent,
                MetricSource::VirtualMemory,
                MetricSource::DiskUsage,
                MetricSource::DiskIoCounters,
                MetricSource::NetIoCounters,
            ]
        );
        assert_eq!(config.samples[2].path, Some(PathBuf::from("/")));
        assert!(config.samples[4].per_device);
        config.validate().unwrap();
    }

    #[test]
    fn args_override_defaults() {
        let args = Args {
            database: Some("metrics".to_string()),
            servers: Some("db1:9020".to_string()),
            number_of_samples: Some(3),
            time_precision: Some(TimePrecision::Milliseconds),
            ..Args::default()
        };
        let config = Config::new(args).unwrap();
        assert_eq!(config.database, "metrics");
        assert_eq!(config.server_addresses().unwrap(), vec![ServerAddress::new("db1", 9020)]);
        assert_eq!(config.sample_limit(), Some(3));
        assert_eq!(config.time_precision, TimePrecision::Milliseconds);
        // untouched values keep their defaults
        assert_eq!(config.user, "iris");
        assert_eq!(config.samples.len(), 5);
    }

    #[test]
    fn rejects_zero_interval() {
        let config = Config {
            interval: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn prefix_without_token_is_kept() {
        let config = Config {
            prefix: "rack7.".to_string(),
            ..Config::default()
        };
        assert_eq!(config.resolved_prefix().unwrap(), "rack7.");
    }
}
