use crate::ClientError;
use serde::{
    de::DeserializeOwned,
    Deserialize,
};

/// Raw JSON answer to a query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse(serde_json::Value);

impl QueryResponse {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        Ok(T::deserialize(&self.0)?)
    }

    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Answer to `list servers <columns>`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerList {
    pub columns: Vec<String>,
    pub servers: Vec<Vec<serde_json::Value>>,
}

/// Answer to `count series`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SeriesCount {
    pub series: u64,
}

/// Answer to `count series length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SeriesLengthCount {
    pub series_length: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct InsertResponse {
    #[serde(default)]
    pub success_msg: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub(crate) error_msg: String,
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn decodes_server_listing() {
        let response = QueryResponse::new(json!({
            "columns": ["name", "mem_usage", "uptime"],
            "servers": [["db1:9010", 42, 3600], ["db2:9010", 40, 3500]],
        }));
        let list: ServerList = response.decode().unwrap();
        assert_eq!(list.columns, vec!["name", "mem_usage", "uptime"]);
        assert_eq!(list.servers.len(), 2);
        assert_eq!(list.servers[1][0], json!("db2:9010"));
    }

    #[test]
    fn missing_field_is_a_decode_error() {
        let response = QueryResponse::new(json!({"series_length": 7}));
        assert!(matches!(
            response.decode::<SeriesCount>(),
            Err(ClientError::Decode(_))
        ));
        let count: SeriesLengthCount = response.decode().unwrap();
        assert_eq!(count.series_length, 7);
    }
}
