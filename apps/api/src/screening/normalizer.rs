//! Response Normalizer: derives a canonical `ScreeningResult` from whatever
//! the agent sent back.
//!
//! The agent's output format is not fixed: the result may sit directly under
//! `response.result`, one level deeper, inside a JSON string in a `text`
//! field, inside a JSON string in `response.message`, or only be recoverable
//! from the raw reply text. Each location is one strategy in `STRATEGIES`,
//! tried in order until one yields a candidate; the candidate is then decoded
//! and validated once.
//!
//! Everything here is pure: the envelope is only read, parse failures are
//! logged and treated as "nothing here".

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::agent::AgentReply;
use crate::screening::result::ScreeningResult;

/// Borrowed view of what the invoker handed back.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeView<'a> {
    pub response: Option<&'a Value>,
    pub raw_response: Option<&'a str>,
}

impl<'a> From<&'a AgentReply> for EnvelopeView<'a> {
    fn from(reply: &'a AgentReply) -> Self {
        Self {
            response: reply.response.as_ref(),
            raw_response: reply.raw_response.as_deref(),
        }
    }
}

type Strategy = fn(&EnvelopeView<'_>) -> Option<Value>;

/// Ordered extraction strategies. A strategy that yields a value ends the
/// search, even if that value later fails validation.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("response.result", from_result_field),
    ("response.message", from_message_field),
    ("raw_response", from_raw_response),
];

/// Normalizes an agent envelope. `None` means no recognisable result shape.
pub fn normalize(envelope: EnvelopeView<'_>) -> Option<ScreeningResult> {
    let (strategy, candidate) = STRATEGIES
        .iter()
        .find_map(|(name, strategy)| strategy(&envelope).map(|value| (*name, value)))?;

    debug!(strategy, "extracted screening candidate");
    let result = ScreeningResult::decode(&candidate);
    if result.is_none() {
        warn!(strategy, "candidate carries neither candidate_name nor fit_status");
    }
    result
}

/// Step 1: `response.result` as a non-empty mapping.
fn from_result_field(envelope: &EnvelopeView<'_>) -> Option<Value> {
    let inner = non_empty_object(envelope.response?.get("result")?)?;

    if has_identity(inner) {
        return Some(Value::Object(inner.clone()));
    }
    if let Some(nested) = inner.get("result").and_then(Value::as_object) {
        if has_identity(nested) {
            return Some(Value::Object(nested.clone()));
        }
    }
    if let Some(text) = inner.get("text").and_then(Value::as_str) {
        // A `text` field decides this step: unparseable text yields nothing
        // rather than falling back to the verbatim mapping.
        return parse_json("response.result.text", text).and_then(unwrap_embedded);
    }
    Some(Value::Object(inner.clone()))
}

/// Step 2: `response.message` holding JSON text.
fn from_message_field(envelope: &EnvelopeView<'_>) -> Option<Value> {
    let message = envelope.response?.get("message")?.as_str()?;
    parse_json("response.message", message).and_then(unwrap_embedded)
}

/// Step 3: the raw reply text, probed at `.response.result`, `.result`, then
/// the top level.
fn from_raw_response(envelope: &EnvelopeView<'_>) -> Option<Value> {
    let parsed = parse_json("raw_response", envelope.raw_response?)?;
    let deep = [
        parsed.get("response").and_then(|r| r.get("result")),
        parsed.get("result"),
    ]
    .into_iter()
    .flatten()
    .find(|v| !v.is_null())
    .unwrap_or(&parsed);

    deep.as_object()
        .filter(|obj| has_identity(obj))
        .map(|obj| Value::Object(obj.clone()))
}

/// Accepts parsed embedded JSON that identifies a candidate or wraps a
/// `result`; the wrapped `result` is preferred when present.
fn unwrap_embedded(parsed: Value) -> Option<Value> {
    let obj = parsed.as_object()?;
    let wrapped = obj.get("result").filter(|v| !v.is_null());
    if !has_identity(obj) && wrapped.map_or(true, |v| !is_truthy(v)) {
        return None;
    }
    match wrapped {
        Some(result) => Some(result.clone()),
        None => Some(parsed),
    }
}

fn non_empty_object(value: &Value) -> Option<&Map<String, Value>> {
    value.as_object().filter(|obj| !obj.is_empty())
}

/// Identity markers: a truthy `candidate_name` or `fit_status`, in either
/// key convention.
fn has_identity(obj: &Map<String, Value>) -> bool {
    ["candidate_name", "candidateName", "fit_status", "fitStatus"]
        .iter()
        .any(|key| obj.get(*key).is_some_and(is_truthy))
}

/// JSON truthiness: not null, false, zero or the empty string.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn parse_json(source: &'static str, text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(strip_json_fences(text)) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(source, "embedded text is not JSON: {e}");
            None
        }
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from agent output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(stripped) = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
    else {
        return text;
    };
    stripped
        .trim_start()
        .strip_suffix("```")
        .map(|s| s.trim())
        .unwrap_or(stripped.trim_start())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(response: Value) -> Option<ScreeningResult> {
        normalize(EnvelopeView {
            response: Some(&response),
            raw_response: None,
        })
    }

    fn run_raw(raw: &str) -> Option<ScreeningResult> {
        normalize(EnvelopeView {
            response: None,
            raw_response: Some(raw),
        })
    }

    fn jane() -> Value {
        json!({"candidate_name": "Jane Doe", "fit_status": "fit", "overall_score": 87})
    }

    #[test]
    fn test_every_documented_shape_yields_the_same_result() {
        let embedded = jane().to_string();
        let wrapped = json!({ "result": jane() }).to_string();
        let envelopes = [
            json!({ "result": jane() }),
            json!({ "result": { "status": "ok", "result": jane() } }),
            json!({ "result": { "text": embedded } }),
            json!({ "result": { "text": wrapped } }),
            json!({ "message": embedded }),
            json!({ "message": wrapped }),
        ];
        let expected = ScreeningResult::decode(&jane()).unwrap();

        for envelope in envelopes {
            assert_eq!(run(envelope.clone()).as_ref(), Some(&expected), "{envelope}");
        }
        assert_eq!(run_raw(&json!({"response": {"result": jane()}}).to_string()), Some(expected.clone()));
        assert_eq!(run_raw(&wrapped), Some(expected.clone()));
        assert_eq!(run_raw(&embedded), Some(expected));
    }

    #[test]
    fn test_text_field_with_snake_case_json() {
        let result = run(json!({
            "result": { "text": "{\"fit_status\":\"fit\",\"overall_score\":90}" }
        }))
        .unwrap();
        assert_eq!(result.fit_status.as_deref(), Some("fit"));
        assert_eq!(result.overall_score, Some(90));
        assert_eq!(result.candidate_name, None);
    }

    #[test]
    fn test_fenced_text_is_unwrapped() {
        let result = run(json!({
            "result": { "text": "```json\n{\"candidate_name\": \"Ada\"}\n```" }
        }))
        .unwrap();
        assert_eq!(result.candidate_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_empty_envelope_yields_nothing() {
        assert_eq!(run(json!({})), None);
        assert_eq!(normalize(EnvelopeView::default()), None);
    }

    #[test]
    fn test_malformed_text_falls_through_to_message() {
        let result = run(json!({
            "result": { "text": "I think Jane is great {" },
            "message": "{\"candidate_name\": \"Jane\"}"
        }))
        .unwrap();
        assert_eq!(result.candidate_name.as_deref(), Some("Jane"));
    }

    #[test]
    fn test_malformed_message_falls_through_to_raw() {
        let raw = json!({"result": jane()}).to_string();
        let response = json!({"message": "Screening complete!"});
        let result = normalize(EnvelopeView {
            response: Some(&response),
            raw_response: Some(&raw),
        })
        .unwrap();
        assert_eq!(result.overall_score, Some(87));
    }

    #[test]
    fn test_verbatim_mapping_without_identity_ends_the_search() {
        // Step 1d claims the envelope, so the message is never consulted and
        // validation rejects the unidentified mapping.
        let response = json!({
            "result": { "overall_score": 90 },
            "message": jane().to_string()
        });
        assert_eq!(run(response), None);
    }

    #[test]
    fn test_empty_result_mapping_is_skipped() {
        let result = run(json!({ "result": {}, "message": jane().to_string() })).unwrap();
        assert_eq!(result.candidate_name.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_falsy_markers_do_not_count() {
        let response = json!({ "message": "{\"candidate_name\": \"\", \"overall_score\": 10}" });
        assert_eq!(run(response), None);
    }

    #[test]
    fn test_raw_response_without_markers_yields_nothing() {
        assert_eq!(run_raw("{\"response\": {\"result\": {\"score\": 3}}}"), None);
        assert_eq!(run_raw("not json at all"), None);
    }

    #[test]
    fn test_raw_response_skips_null_result() {
        let raw = json!({"result": null, "candidate_name": "Top Level"}).to_string();
        assert_eq!(
            run_raw(&raw).unwrap().candidate_name.as_deref(),
            Some("Top Level")
        );
    }

    #[test]
    fn test_normalization_is_idempotent_and_pure() {
        let response = json!({ "result": { "text": jane().to_string() } });
        let before = response.clone();
        let first = run(response.clone());
        let second = run(response.clone());
        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(response, before);
    }

    #[test]
    fn test_builds_from_agent_reply() {
        let reply = AgentReply {
            success: true,
            response: Some(json!({ "result": jane() })),
            raw_response: None,
            error: None,
        };
        assert!(normalize(EnvelopeView::from(&reply)).is_some());
    }

    #[test]
    fn test_strip_json_fences_variants() {
        assert_eq!(strip_json_fences("```json\n{\"k\": 1}\n```"), "{\"k\": 1}");
        assert_eq!(strip_json_fences("```\n{\"k\": 1}\n```"), "{\"k\": 1}");
        assert_eq!(strip_json_fences("  {\"k\": 1} "), "{\"k\": 1}");
    }
}
