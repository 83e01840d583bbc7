use crate::CollectError;
use serde::{
    ser::SerializeMap,
    Serialize,
    Serializer,
};
use std::collections::BTreeMap;

/// A numeric sample value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        // counters beyond i64::MAX do not fit SiriDB integers
        Value::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl TryFrom<&serde_json::Value> for Value {
    type Error = ();

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        let number = value.as_number().ok_or(())?;
        if let Some(int) = number.as_i64() {
            Ok(Value::Integer(int))
        } else if let Some(uint) = number.as_u64() {
            Ok(uint.into())
        } else {
            number.as_f64().map(Value::Float).ok_or(())
        }
    }
}

/// `(timestamp, value)`, encoded as `[ts, value]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point(pub i64, pub Value);

/// The series written by one sampling iteration.
///
/// Every series holds exactly one point and all points share the timestamp
/// the batch was created with.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    timestamp: i64,
    series: BTreeMap<String, Value>,
}

impl Batch {
    pub fn new(timestamp: i64) -> Self {
        Self {
            timestamp,
            series: BTreeMap::new(),
        }
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Adds a series, names must be unique within the batch.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<(), CollectError> {
        let name = name.into();
        if self.series.contains_key(&name) {
            return Err(CollectError::DuplicateSeries(name));
        }
        self.series.insert(name, value.into());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Point> {
        self.series.get(name).map(|value| Point(self.timestamp, *value))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.series.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn points(&self) -> impl Iterator<Item = (&str, Point)> {
        self.series
            .iter()
            .map(|(name, value)| (name.as_str(), Point(self.timestamp, *value)))
    }

    /// The insert payload, `{"name": [[ts, value]], ...}`.
    pub fn to_json(&self) -> Result<serde_json::Value, CollectError> {
        Ok(serde_json::to_value(self)?)
    }
}

impl Serialize for Batch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.series.len()))?;
        for (name, point) in self.points() {
            map.serialize_entry(name, &[point])?;
        }
        map.end()
    }
}
