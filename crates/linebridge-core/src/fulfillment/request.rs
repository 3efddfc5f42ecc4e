use serde_json::Value;
use tracing::debug;

use crate::types::InboundRequest;

// Candidate locations for each field, first non-empty string wins. Covers the
// flat test shape, Dialogflow CX and the legacy ES `queryResult`.
const TAG_PATHS: &[&str] = &["/tag", "/fulfillmentInfo/tag"];
const UTTERANCE_PATHS: &[&str] = &["/text", "/queryResult/queryText", "/transcript"];
const SESSION_PATHS: &[&str] = &["/sessionId", "/sessionInfo/session", "/session"];
const PAGE_PATHS: &[&str] = &["/currentPage", "/pageInfo/currentPage"];

/// Parse a raw webhook body. Never fails: anything that is not a JSON object
/// yields a request with every field defaulted.
pub fn parse_request(body: &[u8]) -> InboundRequest {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => request_from_value(&value),
        Err(e) => {
            debug!("Webhook body is not JSON ({} bytes): {}", body.len(), e);
            InboundRequest::default()
        }
    }
}

/// Extract routing fields from an already-parsed body.
pub fn request_from_value(value: &Value) -> InboundRequest {
    let mut req = InboundRequest::new(
        first_string(value, TAG_PATHS).as_deref(),
        first_string(value, UTTERANCE_PATHS).unwrap_or_default(),
    );
    req.session_id = first_string(value, SESSION_PATHS);
    req.current_page = first_string(value, PAGE_PATHS);
    req
}

fn first_string(value: &Value, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .filter_map(|p| value.pointer(p).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
