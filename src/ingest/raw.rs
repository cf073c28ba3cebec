/// Raw batch decoding for the acquisition boundary.
///
/// The upstream extractor hands over a JSON object mapping station id to a
/// batch:
///
/// ```json
/// { "tan_chau": { "station_id": "tan_chau",
///                 "samples": [ { "timestamp_ms": 1727744400000, "value": 4.12 } ] } }
/// ```
///
/// Decoding is tolerant. A missing `station_id` falls back to the map key,
/// a missing `samples` list is empty, and the chart envelope produced by the
/// browser scraper (`raw_data.data[]` with `timestamp` keys) is accepted as
/// well. An entry that still cannot be decoded becomes a malformed batch for
/// that station only. Only a document that is not an object at all is
/// rejected as a whole.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::model::{PipelineError, Series};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One reading as produced by acquisition: epoch milliseconds and a level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    #[serde(alias = "timestamp")]
    pub timestamp_ms: i64,
    pub value: f64,
}

/// What acquisition delivered for a station.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Samples(Vec<RawSample>),
    /// The entry could not be decoded; carries the decoder's message.
    Malformed(String),
}

/// A raw batch for one station.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBatch {
    pub station_id: String,
    pub payload: RawPayload,
}

impl RawBatch {
    pub fn new(station_id: &str, samples: Vec<RawSample>) -> Self {
        Self {
            station_id: station_id.to_string(),
            payload: RawPayload::Samples(samples),
        }
    }

    pub fn malformed(station_id: &str, reason: impl Into<String>) -> Self {
        Self {
            station_id: station_id.to_string(),
            payload: RawPayload::Malformed(reason.into()),
        }
    }

    /// Re-expresses a built series as a raw batch, e.g. to re-ingest
    /// recorded data.
    pub fn from_series(series: &Series) -> Self {
        let samples = series
            .samples()
            .iter()
            .map(|s| RawSample {
                timestamp_ms: s.timestamp.timestamp_millis(),
                value: s.value,
            })
            .collect();
        Self::new(series.station_id(), samples)
    }
}

/// Raw batches keyed by the id they were submitted under.
pub type RawBatches = BTreeMap<String, RawBatch>;

// ---------------------------------------------------------------------------
// Serde structures for the wire shape
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct WireBatch {
    station_id: Option<String>,
    samples: Option<Vec<RawSample>>,
    raw_data: Option<ChartEnvelope>,
}

#[derive(Deserialize)]
struct ChartEnvelope {
    #[serde(default)]
    data: Vec<RawSample>,
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decodes an already-parsed JSON document into raw batches.
///
/// # Errors
/// `PipelineError::InvalidInput` if `document` is not a JSON object.
pub fn decode_batches(document: &Value) -> Result<RawBatches, PipelineError> {
    let entries = document.as_object().ok_or_else(|| {
        PipelineError::InvalidInput(format!(
            "expected an object of station batches, got {}",
            json_kind(document)
        ))
    })?;

    let batches = entries
        .iter()
        .map(|(key, entry)| (key.clone(), decode_entry(key, entry)))
        .collect();

    Ok(batches)
}

/// Parses JSON text and decodes it into raw batches.
pub fn parse_batches(json: &str) -> Result<RawBatches, PipelineError> {
    let document: Value = serde_json::from_str(json)
        .map_err(|e| PipelineError::InvalidInput(format!("not valid JSON: {}", e)))?;
    decode_batches(&document)
}

fn decode_entry(key: &str, entry: &Value) -> RawBatch {
    let wire = match WireBatch::deserialize(entry) {
        Ok(wire) => wire,
        Err(e) => return RawBatch::malformed(key, e.to_string()),
    };

    let station_id = wire.station_id.unwrap_or_else(|| key.to_string());
    let samples = wire
        .samples
        .or_else(|| wire.raw_data.map(|chart| chart.data))
        .unwrap_or_default();

    RawBatch::new(&station_id, samples)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
