/// Agent Invoker: the single point of entry for calls to the remote screening agent.
///
/// The invoker moves bytes; it never interprets what the agent said. Turning
/// an envelope into a `ScreeningResult` belongs to `screening::normalizer`.
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

pub mod prompts;

/// Context attached to an invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvokeContext {
    /// Asset ids in upload order.
    pub assets: Vec<String>,
}

/// What came back from one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentReply {
    pub success: bool,
    pub response: Option<Value>,
    pub raw_response: Option<String>,
    pub error: Option<String>,
}

impl AgentReply {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Sends an instruction plus asset references to an agent.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn invoke(&self, instruction: &str, agent_id: &str, context: &InvokeContext)
        -> AgentReply;
}

#[derive(Debug, Serialize)]
struct InvokeRequest<'a> {
    user_id: String,
    session_id: String,
    agent_id: &'a str,
    message: &'a str,
    assets: &'a [String],
}

/// Invoker backed by the Lyzr inference endpoint.
#[derive(Clone)]
pub struct LyzrAgentInvoker {
    client: Client,
    agent_url: String,
    api_key: Option<String>,
}

impl LyzrAgentInvoker {
    /// `client` should carry the invocation timeout; none is applied here.
    pub fn new(client: Client, agent_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            agent_url,
            api_key,
        }
    }

    async fn send(
        &self,
        instruction: &str,
        agent_id: &str,
        context: &InvokeContext,
    ) -> Result<AgentReply, reqwest::Error> {
        let request_body = InvokeRequest {
            user_id: Uuid::new_v4().to_string(),
            session_id: format!("{agent_id}-{}", Uuid::new_v4().simple()),
            agent_id,
            message: instruction,
            assets: &context.assets,
        };

        let mut request = self.client.post(&self.agent_url).json(&request_body);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }
        let response = request.send().await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!("Agent API returned {}: {}", status, text);
            let error = if text.trim().is_empty() {
                format!("Agent call failed with status {status}")
            } else {
                text
            };
            return Ok(AgentReply::failed(error));
        }

        debug!("Agent call succeeded ({} bytes)", text.len());
        Ok(assemble_reply(text))
    }
}

#[async_trait]
impl AgentInvoker for LyzrAgentInvoker {
    async fn invoke(
        &self,
        instruction: &str,
        agent_id: &str,
        context: &InvokeContext,
    ) -> AgentReply {
        match self.send(instruction, agent_id, context).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Agent call failed: {e}");
                let message = if e.is_timeout() {
                    "The screening agent did not respond in time".to_string()
                } else {
                    e.to_string()
                };
                AgentReply::failed(message)
            }
        }
    }
}

/// Frames a 2xx body as an envelope without looking inside the result.
///
/// - `{"response": {...}}` → the object is the envelope
/// - `{"response": "text"}` → envelope `{"message": "text"}`
/// - anything else → the whole body
///
/// A body that is not JSON at all still succeeds with only `raw_response`
/// set; the normalizer decides whether anything usable is in it.
fn assemble_reply(text: String) -> AgentReply {
    let Ok(body) = serde_json::from_str::<Value>(&text) else {
        return AgentReply {
            success: true,
            response: None,
            raw_response: Some(text),
            error: None,
        };
    };

    if body.get("success").and_then(Value::as_bool) == Some(false) {
        let error = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("The screening agent reported a failure")
            .to_string();
        return AgentReply::failed(error);
    }

    let raw_response = body
        .get("raw_response")
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| text.clone());

    let response = match body.get("response") {
        Some(Value::Object(envelope)) => Value::Object(envelope.clone()),
        Some(Value::String(message)) => json!({ "message": message }),
        _ => body,
    };

    AgentReply {
        success: true,
        response: Some(response),
        raw_response: Some(raw_response),
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use std::time::Duration;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn invoker(base: &str, client: Client) -> LyzrAgentInvoker {
        LyzrAgentInvoker::new(client, format!("{base}/chat"), Some("key".to_string()))
    }

    fn context() -> InvokeContext {
        InvokeContext {
            assets: vec!["a1".to_string()],
        }
    }

    #[test]
    fn test_object_response_becomes_envelope() {
        let reply = assemble_reply(r#"{"response": {"result": {"fit_status": "fit"}}}"#.into());
        assert!(reply.success);
        assert_eq!(
            reply.response,
            Some(json!({"result": {"fit_status": "fit"}}))
        );
    }

    #[test]
    fn test_string_response_becomes_message() {
        let reply = assemble_reply(r#"{"response": "{\"fit_status\":\"fit\"}"}"#.into());
        assert_eq!(
            reply.response,
            Some(json!({"message": "{\"fit_status\":\"fit\"}"}))
        );
    }

    #[test]
    fn test_raw_response_prefers_relayed_field() {
        let reply = assemble_reply(r#"{"response": {}, "raw_response": "original"}"#.into());
        assert_eq!(reply.raw_response.as_deref(), Some("original"));
    }

    #[test]
    fn test_explicit_failure_flag_is_respected() {
        let reply = assemble_reply(r#"{"success": false, "error": "agent offline"}"#.into());
        assert!(!reply.success);
        assert_eq!(reply.error.as_deref(), Some("agent offline"));
    }

    #[test]
    fn test_non_json_body_keeps_raw_text_only() {
        let reply = assemble_reply("plain words".into());
        assert!(reply.success);
        assert_eq!(reply.response, None);
        assert_eq!(reply.raw_response.as_deref(), Some("plain words"));
    }

    #[tokio::test]
    async fn test_sends_instruction_agent_and_assets() {
        let router = Router::new().route(
            "/chat",
            post(|Json(body): Json<Value>| async move {
                Json(json!({ "response": { "result": body } }))
            }),
        );
        let base = serve(router).await;

        let reply = invoker(&base, Client::new())
            .invoke("screen it", "agent-7", &context())
            .await;
        assert!(reply.success);
        let echoed = &reply.response.unwrap()["result"];
        assert_eq!(echoed["message"], "screen it");
        assert_eq!(echoed["agent_id"], "agent-7");
        assert_eq!(echoed["assets"], json!(["a1"]));
        assert!(echoed["session_id"]
            .as_str()
            .unwrap()
            .starts_with("agent-7-"));
    }

    #[tokio::test]
    async fn test_remote_error_is_converted_not_thrown() {
        let router = Router::new().route(
            "/chat",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream exploded") }),
        );
        let base = serve(router).await;

        let reply = invoker(&base, Client::new())
            .invoke("screen it", "agent-7", &context())
            .await;
        assert!(!reply.success);
        assert_eq!(reply.error.as_deref(), Some("upstream exploded"));
    }

    #[tokio::test]
    async fn test_timeout_is_converted_not_thrown() {
        let router = Router::new().route(
            "/chat",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let base = serve(router).await;
        let client = Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();

        let reply = invoker(&base, client)
            .invoke("screen it", "agent-7", &context())
            .await;
        assert!(!reply.success);
        assert_eq!(
            reply.error.as_deref(),
            Some("The screening agent did not respond in time")
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_converted_not_thrown() {
        let reply = invoker("http://127.0.0.1:9", Client::new())
            .invoke("screen it", "agent-7", &context())
            .await;
        assert!(!reply.success);
        assert!(reply.error.is_some());
    }
}
