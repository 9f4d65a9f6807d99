//! Source and wire record types.
//!
//! [`SourceRecord`] is what a plugin's poll hook produces: a [`Row`] plus
//! destination topic and source-position metadata. [`WireRecord`] is the
//! host-consumable form with the row serialized to a JSON payload; it is
//! only ever built from records that passed the filter, and ownership
//! transfers to the host as soon as a poll call returns.

use std::collections::HashMap;

use rowlink_core::{CellValue, Row};
use serde_json::{Map, Value};

use crate::error::ConnectorError;

/// A record produced by a plugin source, pre-validation.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    /// The row payload.
    pub row: Row,
    /// Destination topic.
    pub topic: String,
    /// Optional explicit destination partition.
    pub partition: Option<i32>,
    /// Identifies the upstream partition this record came from.
    pub source_partition: HashMap<String, String>,
    /// Position within the upstream partition, for offset bookkeeping.
    pub source_offset: HashMap<String, String>,
    /// Optional event-time timestamp in milliseconds since epoch.
    pub timestamp: Option<i64>,
}

impl SourceRecord {
    /// Creates a record bound for `topic` carrying `row`.
    pub fn new(topic: impl Into<String>, row: Row) -> Self {
        Self {
            row,
            topic: topic.into(),
            partition: None,
            source_partition: HashMap::new(),
            source_offset: HashMap::new(),
            timestamp: None,
        }
    }

    /// Sets an explicit destination partition.
    #[must_use]
    pub fn with_partition(mut self, partition: i32) -> Self {
        self.partition = Some(partition);
        self
    }

    /// Sets the upstream partition identity.
    #[must_use]
    pub fn with_source_partition(mut self, partition: HashMap<String, String>) -> Self {
        self.source_partition = partition;
        self
    }

    /// Sets the upstream offset.
    #[must_use]
    pub fn with_source_offset(mut self, offset: HashMap<String, String>) -> Self {
        self.source_offset = offset;
        self
    }

    /// Sets the event-time timestamp (milliseconds since epoch).
    #[must_use]
    pub fn with_timestamp(mut self, ts: i64) -> Self {
        self.timestamp = Some(ts);
        self
    }

    /// Returns the raw-form size of this record in bytes.
    ///
    /// Rejected records are metered from this size; no wire form exists
    /// for them.
    #[must_use]
    pub fn raw_size(&self) -> u64 {
        self.row.byte_size()
    }

    /// Converts this record into its wire form, serializing the row.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::SerializationError`] if the row cannot be
    /// encoded.
    pub fn into_wire(self) -> Result<WireRecord, ConnectorError> {
        let payload = encode_row(&self.row)?;
        Ok(WireRecord {
            topic: self.topic,
            partition: self.partition,
            payload,
            source_partition: self.source_partition,
            source_offset: self.source_offset,
            timestamp: self.timestamp,
        })
    }
}

/// The host-consumable record with a serialized row payload.
#[derive(Debug, Clone)]
pub struct WireRecord {
    /// Destination topic.
    pub topic: String,
    /// Optional explicit destination partition.
    pub partition: Option<i32>,
    /// JSON-serialized row.
    pub payload: Vec<u8>,
    /// Identifies the upstream partition this record came from.
    pub source_partition: HashMap<String, String>,
    /// Position within the upstream partition.
    pub source_offset: HashMap<String, String>,
    /// Optional event-time timestamp in milliseconds since epoch.
    pub timestamp: Option<i64>,
}

impl WireRecord {
    /// Returns the wire-serialized size of this record in bytes.
    ///
    /// Accepted records are metered from this size.
    #[must_use]
    pub fn byte_size(&self) -> u64 {
        self.payload.len() as u64
    }
}

/// Encodes a row as a JSON object mapping cell names to values.
///
/// # Errors
///
/// Returns [`ConnectorError::SerializationError`] if a cell value cannot
/// be represented in JSON (non-finite floats).
pub fn encode_row(row: &Row) -> Result<Vec<u8>, ConnectorError> {
    let mut obj = Map::with_capacity(row.len());
    for cell in row.cells() {
        // serde_json maps non-finite floats to null; reject them instead.
        let finite = match cell.value {
            CellValue::Float(v) => v.is_finite(),
            CellValue::Double(v) => v.is_finite(),
            _ => true,
        };
        if !finite {
            return Err(ConnectorError::SerializationError(format!(
                "cell '{}' holds a non-finite float",
                cell.name
            )));
        }
        let value = serde_json::to_value(&cell.value)?;
        obj.insert(cell.name.clone(), value);
    }
    let bytes = serde_json::to_vec(&Value::Object(obj))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowlink_core::Cell;

    fn sample_record() -> SourceRecord {
        let row = Row::new(vec![Cell::new("id", 7i64), Cell::new("name", "bob")]).unwrap();
        SourceRecord::new("events", row)
            .with_partition(2)
            .with_source_offset(HashMap::from([("pos".into(), "41".into())]))
            .with_timestamp(1_700_000_000_000)
    }

    #[test]
    fn test_encode_row_shape() {
        let row = Row::new(vec![Cell::new("id", 7i64), Cell::new("ok", true)]).unwrap();
        let bytes = encode_row(&row).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["id"], Value::from(7));
        assert_eq!(value["ok"], Value::from(true));
    }

    #[test]
    fn test_into_wire_carries_metadata() {
        let wire = sample_record().into_wire().unwrap();
        assert_eq!(wire.topic, "events");
        assert_eq!(wire.partition, Some(2));
        assert_eq!(wire.source_offset.get("pos").map(String::as_str), Some("41"));
        assert_eq!(wire.timestamp, Some(1_700_000_000_000));
        assert!(!wire.payload.is_empty());
    }

    #[test]
    fn test_wire_size_is_payload_length() {
        let wire = sample_record().into_wire().unwrap();
        assert_eq!(wire.byte_size(), wire.payload.len() as u64);
    }

    #[test]
    fn test_encode_rejects_non_finite_float() {
        let row = Row::new(vec![Cell::new("ratio", f64::NAN)]).unwrap();
        let err = encode_row(&row).unwrap_err();
        assert!(matches!(err, ConnectorError::SerializationError(_)));
    }

    #[test]
    fn test_raw_size_matches_row() {
        let record = sample_record();
        assert_eq!(record.raw_size(), record.row.byte_size());
    }
}
