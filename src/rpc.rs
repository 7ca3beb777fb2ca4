/// JSON-RPC transport for the Jito block-engine HTTP API.
///
/// One call is one `POST {base_url}{path}[?query][&uuid=token]` carrying a
/// `{"jsonrpc":"2.0","id":1,"method":..,"params":..}` body.  The response
/// envelope must carry exactly one of `result` / `error`; anything else is
/// reported as [`JitoRpcError::MalformedEnvelope`].
///
/// The transport never retries.  Callers decide whether a failure is worth
/// another attempt (the status poller does, submission paths do not).
use reqwest::{header::CONTENT_TYPE, Client, Url};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{JitoRpcError, Result};

/// JSON-RPC protocol version tag.
pub const JSONRPC_VERSION: &str = "2.0";

/// Request id.  The block engine does not multiplex, so it stays constant.
pub const REQUEST_ID: u64 = 1;

/// Header carrying the access token.
pub const AUTH_HEADER: &str = "x-jito-auth";

/// Query parameter carrying the access token.
pub const UUID_QUERY_PARAM: &str = "uuid";

// ─── Envelope ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    /// Serialised as `null` when absent.
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: REQUEST_ID,
            method: method.into(),
            params,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    /// `Some(Value::Null)` when the server sent `"result": null`.
    #[serde(default, deserialize_with = "present")]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcErrorObject>,
}

fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl JsonRpcResponse {
    /// Collapse the envelope into its payload or a typed error.
    pub fn into_result(self, method: &str) -> Result<Value> {
        match (self.result, self.error) {
            (Some(result), None) => Ok(result),
            (None, Some(err)) => Err(JitoRpcError::Rpc {
                method: method.to_string(),
                code: err.code,
                message: err.message,
            }),
            (Some(_), Some(_)) => Err(JitoRpcError::MalformedEnvelope {
                method: method.to_string(),
                detail: "both result and error are set".into(),
            }),
            (None, None) => Err(JitoRpcError::MalformedEnvelope {
                method: method.to_string(),
                detail: "neither result nor error is set".into(),
            }),
        }
    }
}

// ─── Transport ──────────────────────────────────────────────────────────────

/// Owns the HTTP client and the immutable [`ClientConfig`].
#[derive(Clone, Debug)]
pub struct RpcTransport {
    http: Client,
    config: ClientConfig,
}

impl RpcTransport {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build the full request URL.  Extra query pairs come first, the
    /// access token last.
    pub fn endpoint_url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let raw = format!("{}{}", self.config.trimmed_base_url(), path);
        let mut url = Url::parse(&raw).map_err(|e| JitoRpcError::InvalidEndpoint {
            url: raw.clone(),
            reason: e.to_string(),
        })?;

        if !query.is_empty() || self.config.uuid.is_some() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
            if let Some(ref token) = self.config.uuid {
                pairs.append_pair(UUID_QUERY_PARAM, token);
            }
        }

        Ok(url)
    }

    /// Send one JSON-RPC request and return the decoded `result` payload.
    #[instrument(skip(self, query, params))]
    pub async fn send(
        &self,
        path: &str,
        query: &[(&str, &str)],
        method: &str,
        params: Option<Value>,
    ) -> Result<Value> {
        let url = self.endpoint_url(path, query)?;
        let request = JsonRpcRequest::new(method, params);

        debug!(method, authenticated = self.config.uuid.is_some(), "sending JSON-RPC request");

        let mut builder = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(&request);

        if let Some(ref token) = self.config.uuid {
            builder = builder.header(AUTH_HEADER, token.as_str());
        }
        if let Some(timeout) = self.config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(method, error = %e, "JSON-RPC request failed");
            JitoRpcError::Http(e)
        })?;

        let status = response.status();
        let body = response.bytes().await?;
        debug!(method, %status, body_len = body.len(), "received JSON-RPC response");

        let envelope: JsonRpcResponse =
            serde_json::from_slice(&body).map_err(|e| JitoRpcError::MalformedEnvelope {
                method: method.to_string(),
                detail: format!("HTTP {status}: {e}"),
            })?;

        envelope.into_result(method).inspect_err(|e| {
            warn!(method, error = %e, "JSON-RPC call returned an error");
        })
    }
}

/// Pretty-print a payload for humans; falls back to compact JSON.
pub fn prettify_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(base: &str, uuid: Option<&str>) -> RpcTransport {
        RpcTransport::new(ClientConfig::new(
            format!("{base}/api/v1"),
            uuid.map(String::from),
        ))
    }

    #[test]
    fn request_envelope_shape() {
        let req = JsonRpcRequest::new("getTipAccounts", None);
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            json!({ "jsonrpc": "2.0", "id": 1, "method": "getTipAccounts", "params": null })
        );
    }

    #[test]
    fn envelope_result_null_is_a_result() {
        let resp: JsonRpcResponse =
            serde_json::from_value(json!({ "jsonrpc": "2.0", "id": 1, "result": null })).unwrap();
        assert_eq!(resp.into_result("m").unwrap(), Value::Null);
    }

    #[test]
    fn envelope_error_is_surfaced_verbatim() {
        let resp: JsonRpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32600, "message": "rate limited" }
        }))
        .unwrap();
        match resp.into_result("sendBundle") {
            Err(JitoRpcError::Rpc { method, code, message }) => {
                assert_eq!(method, "sendBundle");
                assert_eq!(code, -32600);
                assert_eq!(message, "rate limited");
            }
            other => panic!("expected Rpc error, got {other:?}"),
        }
    }

    #[test]
    fn envelope_without_result_or_error_is_malformed() {
        let resp: JsonRpcResponse =
            serde_json::from_value(json!({ "jsonrpc": "2.0", "id": 1 })).unwrap();
        assert!(matches!(
            resp.into_result("m"),
            Err(JitoRpcError::MalformedEnvelope { .. })
        ));
    }

    #[test]
    fn envelope_with_both_fields_is_malformed() {
        let resp: JsonRpcResponse = serde_json::from_value(json!({
            "result": "x",
            "error": { "code": 1, "message": "y" }
        }))
        .unwrap();
        assert!(matches!(
            resp.into_result("m"),
            Err(JitoRpcError::MalformedEnvelope { .. })
        ));
    }

    #[test]
    fn url_without_token_has_no_query() {
        let t = transport("http://localhost:1234", None);
        let url = t.endpoint_url("/bundles", &[]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:1234/api/v1/bundles");
    }

    #[test]
    fn url_appends_flags_then_token() {
        let t = transport("http://localhost:1234", Some("abc"));
        let url = t
            .endpoint_url("/transactions", &[("bundleOnly", "true")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:1234/api/v1/transactions?bundleOnly=true&uuid=abc"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let t = RpcTransport::new(ClientConfig::new("not a url", None));
        assert!(matches!(
            t.endpoint_url("/bundles", &[]),
            Err(JitoRpcError::InvalidEndpoint { .. })
        ));
    }

    #[tokio::test]
    async fn send_posts_envelope_with_auth() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/bundles"))
            .and(query_param("uuid", "secret"))
            .and(header("x-jito-auth", "secret"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "getTipAccounts",
                "params": null
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": ["A", "B"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let t = transport(&server.uri(), Some("secret"));
        let result = t
            .send("/bundles", &[], "getTipAccounts", None)
            .await
            .unwrap();
        assert_eq!(result, json!(["A", "B"]));
    }

    #[tokio::test]
    async fn send_surfaces_rpc_error_on_http_400() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/bundles"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32602, "message": "bundle must contain at least one transaction" }
            })))
            .mount(&server)
            .await;

        let t = transport(&server.uri(), None);
        let err = t
            .send("/bundles", &[], "sendBundle", Some(json!([[]])))
            .await
            .unwrap_err();
        assert_eq!(err.rpc_code(), Some(-32602));
        assert!(err.to_string().contains("at least one transaction"));
    }

    #[tokio::test]
    async fn send_rejects_non_json_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/bundles"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let t = transport(&server.uri(), None);
        let err = t
            .send("/bundles", &[], "getTipAccounts", None)
            .await
            .unwrap_err();
        assert!(matches!(err, JitoRpcError::MalformedEnvelope { .. }));
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn prettify_indents() {
        let pretty = prettify_json(&json!({ "a": [1, 2] }));
        assert!(pretty.contains('\n'));
        assert!(pretty.contains("\"a\""));
    }
}
