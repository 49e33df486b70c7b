//! ComfyUI response bodies and the parsing rules applied to them

use crate::service::{AssetLocator, JobHandle};
use museum_core::{MuseumError, Result, ServiceFailure};
use serde::Deserialize;
use std::collections::HashMap;

/// Body of a `POST /prompt` response
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    pub prompt_id: Option<String>,
    pub number: Option<u64>,
    #[serde(default)]
    pub node_errors: Option<serde_json::Value>,
}

/// One job's record in a `GET /history` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub outputs: HashMap<String, StageOutput>,
    #[serde(default)]
    pub status: Option<HistoryStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StageOutput {
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageRef {
    pub filename: Option<String>,
    pub subfolder: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryStatus {
    pub status_str: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

impl HistoryStatus {
    pub fn is_error(&self) -> bool {
        self.status_str.as_deref() == Some("error")
    }
}

/// Outcome of one history poll
#[derive(Debug)]
pub enum HistoryPoll {
    /// Queued or still running
    Pending,
    Ready(HistoryEntry),
}

/// Turn a submit body into a job handle for `output_stage`
pub fn parse_submit_response(
    body: serde_json::Value,
    output_stage: &str,
) -> std::result::Result<JobHandle, ServiceFailure> {
    let response: SubmitResponse = serde_json::from_value(body)
        .map_err(|e| ServiceFailure::Malformed(format!("submit response: {}", e)))?;

    if let Some(errors) = response.node_errors.as_ref().filter(|e| has_entries(e)) {
        return Err(ServiceFailure::Malformed(format!(
            "service rejected workflow: {}",
            errors
        )));
    }

    let prompt_id = response
        .prompt_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ServiceFailure::Malformed("submit response has no prompt_id".to_string()))?;

    Ok(JobHandle {
        prompt_id,
        output_stage: output_stage.to_string(),
        queue_number: response.number,
    })
}

/// Select the job record from a history body.
///
/// The service answers with an object keyed by prompt id. No keys means
/// the job has not finished; more than one is a protocol violation.
pub fn select_history_entry(body: serde_json::Value, prompt_id: &str) -> Result<HistoryPoll> {
    let serde_json::Value::Object(map) = body else {
        return Err(MuseumError::Resolution(ServiceFailure::Malformed(
            "history response is not an object".to_string(),
        )));
    };

    if map.len() > 1 {
        return Err(MuseumError::Resolution(ServiceFailure::Malformed(format!(
            "history response has {} root entries, expected one",
            map.len()
        ))));
    }

    let Some((key, record)) = map.into_iter().next() else {
        return Ok(HistoryPoll::Pending);
    };
    if key != prompt_id {
        tracing::warn!(expected = prompt_id, got = %key, "history keyed by a different prompt id");
    }

    let entry: HistoryEntry = serde_json::from_value(record).map_err(|e| {
        MuseumError::Resolution(ServiceFailure::Malformed(format!("history record: {}", e)))
    })?;
    Ok(HistoryPoll::Ready(entry))
}

/// Locator of the first image the output stage produced
pub fn extract_locator(entry: &HistoryEntry, output_stage: &str) -> Result<AssetLocator> {
    if let Some(status) = entry.status.as_ref().filter(|s| s.is_error()) {
        return Err(MuseumError::NoAssetProduced(format!(
            "job failed on the service (status '{}')",
            status.status_str.as_deref().unwrap_or_default()
        )));
    }

    let image = entry
        .outputs
        .get(output_stage)
        .and_then(|out| out.images.first())
        .ok_or_else(|| {
            MuseumError::NoAssetProduced(format!(
                "output stage '{}' produced no images",
                output_stage
            ))
        })?;

    Ok(AssetLocator::from_parts(
        image.filename.as_deref(),
        image.subfolder.as_deref(),
        image.kind.as_deref(),
    ))
}

fn has_entries(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Object(map) => !map.is_empty(),
        serde_json::Value::Array(items) => !items.is_empty(),
        serde_json::Value::Null => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_submit_response() {
        let body = json!({"prompt_id": "abc123", "number": 4, "node_errors": {}});
        let job = parse_submit_response(body, "9").unwrap();
        assert_eq!(job.prompt_id, "abc123");
        assert_eq!(job.output_stage, "9");
        assert_eq!(job.queue_number, Some(4));
    }

    #[test]
    fn test_submit_without_prompt_id() {
        let err = parse_submit_response(json!({"number": 1}), "9").unwrap_err();
        assert!(matches!(err, ServiceFailure::Malformed(_)));
    }

    #[test]
    fn test_submit_with_node_errors() {
        let body = json!({
            "prompt_id": "abc123",
            "node_errors": {"4": {"errors": [{"message": "ckpt not found"}]}}
        });
        let err = parse_submit_response(body, "9").unwrap_err();
        assert!(err.to_string().contains("ckpt not found"));
    }

    #[test]
    fn test_history_pending_when_empty() {
        assert!(matches!(
            select_history_entry(json!({}), "abc123").unwrap(),
            HistoryPoll::Pending
        ));
    }

    #[test]
    fn test_history_with_two_roots_is_rejected() {
        let body = json!({"a": {"outputs": {}}, "b": {"outputs": {}}});
        assert!(matches!(
            select_history_entry(body, "a"),
            Err(MuseumError::Resolution(ServiceFailure::Malformed(_)))
        ));
    }

    #[test]
    fn test_history_key_mismatch_still_used() {
        let body = json!({"other": {"outputs": {"9": {"images": [{"filename": "x.png"}]}}}});
        let HistoryPoll::Ready(entry) = select_history_entry(body, "abc123").unwrap() else {
            panic!("expected a record");
        };
        assert_eq!(extract_locator(&entry, "9").unwrap().name, "x.png");
    }

    #[test]
    fn test_extract_first_image_with_defaults() {
        let body = json!({"abc123": {"outputs": {"9": {"images": [
            {"filename": "out1.png", "subfolder": "", "type": "output"},
            {"filename": "out2.png", "subfolder": "", "type": "output"}
        ]}}}});
        let HistoryPoll::Ready(entry) = select_history_entry(body, "abc123").unwrap() else {
            panic!("expected a record");
        };
        let locator = extract_locator(&entry, "9").unwrap();
        assert_eq!(locator, AssetLocator::from_parts(Some("out1.png"), None, None));
    }

    #[test]
    fn test_extract_no_images() {
        let entry: HistoryEntry =
            serde_json::from_value(json!({"outputs": {"9": {"images": []}}})).unwrap();
        assert!(matches!(
            extract_locator(&entry, "9"),
            Err(MuseumError::NoAssetProduced(_))
        ));

        let entry: HistoryEntry = serde_json::from_value(json!({"outputs": {}})).unwrap();
        assert!(matches!(
            extract_locator(&entry, "9"),
            Err(MuseumError::NoAssetProduced(_))
        ));
    }

    #[test]
    fn test_extract_execution_error() {
        let entry: HistoryEntry = serde_json::from_value(json!({
            "outputs": {"9": {"images": [{"filename": "partial.png"}]}},
            "status": {"status_str": "error", "completed": false}
        }))
        .unwrap();
        assert!(matches!(
            extract_locator(&entry, "9"),
            Err(MuseumError::NoAssetProduced(_))
        ));
    }
}
