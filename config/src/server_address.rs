use eyre::{
    bail,
    eyre,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    str::FromStr,
};

/// One `host:port` entry of the server list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parses a comma separated list such as `localhost:9020,db2:9020`.
    pub fn parse_list(servers: &str) -> Result<Vec<Self>> {
        let servers = servers
            .split(',')
            .map(str::trim)
            .filter(|ea| !ea.is_empty())
            .map(Self::from_str)
            .collect::<Result<Vec<_>>>()?;
        if servers.is_empty() {
            bail!("the server list is empty");
        }
        Ok(servers)
    }
}

impl FromStr for ServerAddress {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        // rsplit so that bracketed IPv6 hosts keep their colons
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| eyre!("expected host:port, got {s:?}"))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            bail!("missing host in {s:?}");
        }
        let port = port.parse::<u16>().map_err(|e| eyre!("invalid port in {s:?}: {e}"))?;
        Ok(Self::new(host, port))
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod test {
    use super::ServerAddress;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_server_list() {
        let servers = ServerAddress::parse_list("localhost:9020, 10.0.0.2:9021,").unwrap();
        assert_eq!(
            servers,
            vec![
                ServerAddress::new("localhost", 9020),
                ServerAddress::new("10.0.0.2", 9021)
            ]
        );
    }

    #[test]
    fn keeps_ipv6_hosts() {
        let server: ServerAddress = "[::1]:9020".parse().unwrap();
        assert_eq!(server, ServerAddress::new("::1", 9020));
        assert_eq!(server.to_string(), "[::1]:9020");
    }

    #[test]
    fn rejects_malformed_entries() {
        assert!(ServerAddress::parse_list("").is_err());
        assert!(ServerAddress::parse_list("localhost").is_err());
        assert!(ServerAddress::parse_list("localhost:http").is_err());
        assert!(ServerAddress::parse_list(":9020").is_err());
    }
}
