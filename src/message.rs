//! The default JSON codec. This is not part of the core's contract — any
//! type implementing [`Codec`] works — but every caller who doesn't bring
//! their own GraphSON encoder gets this one for free.
//!
//! Wire shape mirrors the Gremlin Server "processor" request envelope and
//! the standard response envelope: `{requestId, status: {code, message,
//! attributes}, result}`. Status code 206 (`PARTIAL_CONTENT`) is the only
//! non-terminating code in the protocol; every other code — success,
//! no-content, or error — ends the response stream.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::codec::{Codec, Response};
use crate::error::{DecodeError, GremlinError};

/// Gremlin response status code meaning "more messages follow".
pub const STATUS_PARTIAL_CONTENT: u16 = 206;

/// A Gremlin Server request, shaped for the `eval` op but general enough
/// for any processor/op pair (e.g. `session` processor ops).
#[derive(Debug, Clone, Serialize)]
pub struct GremlinRequest {
    pub op: String,
    pub processor: String,
    pub args: Value,
}

impl GremlinRequest {
    /// A plain `eval` request with no bindings.
    pub fn eval(gremlin: impl Into<String>) -> Self {
        Self {
            op: "eval".to_string(),
            processor: String::new(),
            args: serde_json::json!({ "gremlin": gremlin.into() }),
        }
    }

    /// An `eval` request carrying a bindings map.
    pub fn eval_with_bindings(gremlin: impl Into<String>, bindings: Value) -> Self {
        Self {
            op: "eval".to_string(),
            processor: String::new(),
            args: serde_json::json!({ "gremlin": gremlin.into(), "bindings": bindings }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseStatus {
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub attributes: Value,
}

/// A decoded Gremlin Server response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct GremlinResponse {
    #[serde(rename = "requestId")]
    pub request_id: Uuid,
    pub status: ResponseStatus,
    #[serde(default)]
    pub result: Option<Value>,
}

impl Response for GremlinResponse {
    fn request_id(&self) -> Uuid {
        self.request_id
    }

    fn terminating(&self) -> bool {
        self.status.code != STATUS_PARTIAL_CONTENT
    }
}

/// Default codec: JSON request/response bodies, with a one-byte
/// content-type length prefix on the request side.
#[derive(Debug, Clone, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub const CONTENT_TYPE: &'static str = "application/vnd.gremlin-v3.0+json";
}

impl Codec for JsonCodec {
    type Request = GremlinRequest;
    type Response = GremlinResponse;

    fn content_type(&self) -> &'static str {
        Self::CONTENT_TYPE
    }

    fn encode_binary(
        &self,
        request_id: Uuid,
        request: &GremlinRequest,
    ) -> Result<Vec<u8>, GremlinError> {
        let envelope = serde_json::json!({
            "requestId": request_id,
            "op": request.op,
            "processor": request.processor,
            "args": request.args,
        });
        let body = serde_json::to_vec(&envelope).map_err(|e| GremlinError::Encode(e.to_string()))?;

        let content_type = self.content_type();
        if content_type.len() > u8::MAX as usize {
            return Err(GremlinError::Encode(
                "content type longer than 255 bytes".to_string(),
            ));
        }
        let mut framed = Vec::with_capacity(1 + content_type.len() + body.len());
        framed.push(content_type.len() as u8);
        framed.extend_from_slice(content_type.as_bytes());
        framed.extend_from_slice(&body);
        Ok(framed)
    }

    fn decode(&self, bytes: &[u8]) -> Result<GremlinResponse, DecodeError> {
        serde_json::from_slice(bytes).map_err(DecodeError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_binary_is_framed_with_content_type_prefix() {
        let codec = JsonCodec;
        let req = GremlinRequest::eval("g.V().count()");
        let id = Uuid::nil();
        let framed = codec.encode_binary(id, &req).unwrap();

        let prefix_len = framed[0] as usize;
        assert_eq!(prefix_len, JsonCodec::CONTENT_TYPE.len());
        let content_type = std::str::from_utf8(&framed[1..1 + prefix_len]).unwrap();
        assert_eq!(content_type, JsonCodec::CONTENT_TYPE);

        let body = &framed[1 + prefix_len..];
        let value: Value = serde_json::from_slice(body).unwrap();
        assert_eq!(value["op"], "eval");
        assert_eq!(value["requestId"], id.to_string());
    }

    #[test]
    fn encode_binary_is_total_order() {
        let codec = JsonCodec;
        let req = GremlinRequest::eval("g.V()");
        let id = Uuid::nil();
        let a = codec.encode_binary(id, &req).unwrap();
        let b = codec.encode_binary(id, &req).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn decode_terminating_on_success_status() {
        let codec = JsonCodec;
        let raw = serde_json::json!({
            "requestId": Uuid::nil(),
            "status": { "code": 200, "message": "", "attributes": {} },
            "result": { "data": [1, 2, 3] }
        })
        .to_string();
        let resp = codec.decode(raw.as_bytes()).unwrap();
        assert!(resp.terminating());
        assert_eq!(resp.request_id(), Uuid::nil());
    }

    #[test]
    fn decode_non_terminating_on_partial_content() {
        let codec = JsonCodec;
        let raw = serde_json::json!({
            "requestId": Uuid::nil(),
            "status": { "code": STATUS_PARTIAL_CONTENT, "message": "", "attributes": {} },
            "result": { "data": [1] }
        })
        .to_string();
        let resp = codec.decode(raw.as_bytes()).unwrap();
        assert!(!resp.terminating());
    }

    #[test]
    fn decode_malformed_json_is_a_decode_error() {
        let codec = JsonCodec;
        let err = codec.decode(b"not json").unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }
}
