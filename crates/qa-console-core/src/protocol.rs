//! Wire classification for the QA server protocol.
//!
//! Classification is a pure function from text to typed events; applying an
//! event to the UI lives behind the surface seam so this module stays
//! testable without any transport.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ClientError, Result};

/// Opaque run identifier assigned by the server at submission time.
///
/// The server may send it as a JSON number or string; both normalize to the
/// same textual id so panes and debug regions key consistently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId(String);

impl RunId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Normalize a JSON id value. Anything other than a number or a
    /// non-empty string is rejected.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => Some(Self(number.to_string())),
            Value::String(id) if !id.trim().is_empty() => Some(Self(id.trim().to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A classified push-channel frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// Incremental output fragment for the current run (HTML text).
    Output(String),
    /// Terminal result for the current run, e.g. "success" or "failure".
    Result(String),
    /// A run is active server-side; no new run, no output routing.
    StatusRunning,
}

/// Classify one push-channel frame.
///
/// Precedence is fixed and first-match-wins: `output`, then `result`, then
/// `status == "running"`. Exactly one branch fires per frame; anything else
/// is a parse error the dispatcher logs and drops.
pub fn classify_frame(raw: &str) -> Result<PushEvent> {
    let value: Value =
        serde_json::from_str(raw).map_err(|error| ClientError::Parse(error.to_string()))?;
    let Some(message) = value.as_object() else {
        return Err(ClientError::Parse("frame is not a JSON object".to_string()));
    };

    if let Some(output) = message.get("output") {
        let Some(html) = output.as_str() else {
            return Err(ClientError::Parse("output is not a string".to_string()));
        };
        return Ok(PushEvent::Output(html.to_string()));
    }
    if let Some(result) = message.get("result") {
        let Some(text) = result.as_str() else {
            return Err(ClientError::Parse("result is not a string".to_string()));
        };
        return Ok(PushEvent::Result(text.to_string()));
    }
    if let Some(status) = message.get("status") {
        if status.as_str() == Some("running") {
            return Ok(PushEvent::StatusRunning);
        }
        return Err(ClientError::Parse(format!("unrecognized status: {status}")));
    }

    Err(ClientError::Parse("frame has no recognized key".to_string()))
}

/// The synchronous HTTP reply to a submission POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionAck {
    /// A new run was accepted; allocate a record and go busy.
    Run(RunId),
    /// A run is already active server-side; go busy without a new record.
    AlreadyRunning,
    /// Anything else; treated as idle, no-op.
    Idle,
}

/// Decode a submission ack body.
///
/// A body that is not a JSON object is a malformed response; a JSON object
/// without a `run` id or `status: "running"` is an idle no-op.
pub fn decode_ack(body: &[u8]) -> Result<SubmissionAck> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|error| ClientError::MalformedResponse(error.to_string()))?;
    let Some(ack) = value.as_object() else {
        return Err(ClientError::MalformedResponse(
            "ack is not a JSON object".to_string(),
        ));
    };

    if let Some(run) = ack.get("run") {
        let id = RunId::from_value(run).ok_or_else(|| {
            ClientError::MalformedResponse(format!("unusable run id: {run}"))
        })?;
        return Ok(SubmissionAck::Run(id));
    }
    if ack.get("status").and_then(Value::as_str) == Some("running") {
        return Ok(SubmissionAck::AlreadyRunning);
    }

    Ok(SubmissionAck::Idle)
}

#[derive(Debug, Deserialize)]
struct FileSelectionResponse {
    files: Vec<String>,
}

/// Decode a `/file_selection` response into the matched file paths.
pub fn decode_file_selection(body: &[u8]) -> Result<Vec<String>> {
    let response: FileSelectionResponse = serde_json::from_slice(body)
        .map_err(|error| ClientError::MalformedResponse(error.to_string()))?;
    Ok(response.files)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn output_frames_classify_with_html_preserved() {
        let event = classify_frame(r#"{"output": "<b>ok</b>"}"#).unwrap();
        assert_eq!(event, PushEvent::Output("<b>ok</b>".to_string()));
    }

    #[test]
    fn output_wins_over_result_in_one_frame() {
        let event = classify_frame(r#"{"output":"x","result":"y"}"#).unwrap();
        assert_eq!(event, PushEvent::Output("x".to_string()));
    }

    #[test]
    fn result_wins_over_status() {
        let event = classify_frame(r#"{"result":"failure","status":"running"}"#).unwrap();
        assert_eq!(event, PushEvent::Result("failure".to_string()));
    }

    #[test]
    fn only_running_status_is_recognized() {
        assert_eq!(
            classify_frame(r#"{"status":"running"}"#).unwrap(),
            PushEvent::StatusRunning
        );
        assert!(classify_frame(r#"{"status":"idle"}"#).is_err());
    }

    #[test]
    fn malformed_frames_are_parse_errors() {
        assert!(matches!(
            classify_frame("not json"),
            Err(ClientError::Parse(_))
        ));
        assert!(matches!(
            classify_frame(r#"{"other": 1}"#),
            Err(ClientError::Parse(_))
        ));
        assert!(matches!(classify_frame("[1,2]"), Err(ClientError::Parse(_))));
    }

    #[test]
    fn ack_with_numeric_run_id_allocates() {
        let ack = decode_ack(br#"{"run": 7}"#).unwrap();
        assert_eq!(ack, SubmissionAck::Run(RunId::new("7")));
    }

    #[test]
    fn ack_with_string_run_id_allocates() {
        let ack = decode_ack(br#"{"run": "build-12"}"#).unwrap();
        assert_eq!(ack, SubmissionAck::Run(RunId::new("build-12")));
    }

    #[test]
    fn ack_running_status_does_not_allocate() {
        assert_eq!(
            decode_ack(br#"{"status":"running"}"#).unwrap(),
            SubmissionAck::AlreadyRunning
        );
    }

    #[test]
    fn unknown_ack_shapes_are_idle() {
        assert_eq!(decode_ack(br"{}").unwrap(), SubmissionAck::Idle);
        assert_eq!(
            decode_ack(br#"{"status":"done"}"#).unwrap(),
            SubmissionAck::Idle
        );
    }

    #[test]
    fn non_json_ack_is_malformed() {
        assert!(matches!(
            decode_ack(b"<html>500</html>"),
            Err(ClientError::MalformedResponse(_))
        ));
        assert!(matches!(
            decode_ack(b"[]"),
            Err(ClientError::MalformedResponse(_))
        ));
    }

    #[test]
    fn file_selection_decodes_paths() {
        let files = decode_file_selection(br#"{"files": ["a/b.xml", "c.json"]}"#).unwrap();
        assert_eq!(files, vec!["a/b.xml".to_string(), "c.json".to_string()]);
    }
}
