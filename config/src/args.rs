use crate::TimePrecision;
use clap::Parser;
use std::path::PathBuf;

/// Monitor host and SiriDB metrics and write them into SiriDB.
///
/// Every option left out falls back to the configuration file, then to the
/// built-in defaults.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version = version(), about, long_about = None)]
pub struct Args {
    /// SiriDB username.
    #[arg(short, long, env = "SIRIDB_MONITOR_USER")]
    pub user: Option<String>,

    /// SiriDB password.
    #[arg(short, long, env = "SIRIDB_MONITOR_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Database name.
    #[arg(short, long)]
    pub database: Option<String>,

    /// SiriDB server(s), comma separated `host:port` list of HTTP API endpoints.
    #[arg(short, long, value_name = "HOST:PORT,...")]
    pub servers: Option<String>,

    /// Series name prefix. `%HOSTNAME%` is replaced by the host name.
    #[arg(long)]
    pub prefix: Option<String>,

    /// Number of samples, 0 runs forever.
    #[arg(short, long)]
    pub number_of_samples: Option<u64>,

    /// Sampling interval in seconds.
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Time precision of the database.
    #[arg(short, long, value_enum)]
    pub time_precision: Option<TimePrecision>,

    /// Additional YAML configuration file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enables debug logging.
    #[arg(short, long, action)]
    pub verbose: bool,
}

mod config_ext {
    use super::*;
    use config::{
        Map,
        Source,
        Value,
    };
    use std::collections::HashMap;

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            if let Some(user) = &self.user {
                cache.insert("user".to_string(), user.clone().into());
            }
            if let Some(password) = &self.password {
                cache.insert("password".to_string(), password.clone().into());
            }
            if let Some(database) = &self.database {
                cache.insert("database".to_string(), database.clone().into());
            }
            if let Some(servers) = &self.servers {
                cache.insert("servers".to_string(), servers.clone().into());
            }
            if let Some(prefix) = &self.prefix {
                cache.insert("prefix".to_string(), prefix.clone().into());
            }
            if let Some(number_of_samples) = self.number_of_samples {
                cache.insert("number_of_samples".to_string(), number_of_samples.into());
            }
            if let Some(interval) = self.interval {
                cache.insert("interval".to_string(), interval.into());
            }
            if let Some(time_precision) = self.time_precision {
                cache.insert("time_precision".to_string(), time_precision.to_string().into());
            }
            Ok(cache)
        }
    }
}

pub fn version() -> String {
    let author = clap::crate_authors!();
    let config_dir_path = crate::get_config_dir().display().to_string();

    format!(
        "{}

Authors: {author}

Config directory: {config_dir_path}",
        clap::crate_version!()
    )
}
