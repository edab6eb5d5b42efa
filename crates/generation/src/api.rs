use once_cell::sync::Lazy;
use serde_json::{json, Map, Value};
use std::time::Duration;

use crate::{GenerationConfig, GenerationError};

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(32)
        .build()
        .unwrap_or_default()
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ProviderKind {
    OpenAI,
    Custom,
}

/// Single outbound call to the completion service. The completion text is
/// returned exactly as received.
pub(crate) async fn complete_via_api(
    prompt: &str,
    cfg: &GenerationConfig,
) -> Result<String, GenerationError> {
    let url = cfg
        .api_url
        .as_deref()
        .ok_or_else(|| GenerationError::InvalidConfig("api_url is required for api mode".into()))?;
    let provider = provider_kind(cfg);
    let payload = build_payload(provider, prompt, cfg);

    tracing::debug!(
        provider = ?provider,
        model = %cfg.model_name,
        prompt_chars = prompt.len(),
        "requesting completion"
    );

    let response = send_request(url, cfg, payload).await?;
    extract_completion(provider, response)
}

fn provider_kind(cfg: &GenerationConfig) -> ProviderKind {
    match cfg
        .api_provider
        .as_deref()
        .unwrap_or("custom")
        .to_ascii_lowercase()
        .as_str()
    {
        "openai" | "gpt" => ProviderKind::OpenAI,
        _ => ProviderKind::Custom,
    }
}

fn build_payload(provider: ProviderKind, prompt: &str, cfg: &GenerationConfig) -> Value {
    let mut body = match provider {
        ProviderKind::OpenAI => json!({
            "model": cfg.model_name,
            "messages": [{ "role": "user", "content": prompt }],
        }),
        ProviderKind::Custom => json!({ "model": cfg.model_name, "prompt": prompt }),
    };
    if let Value::Object(ref mut map) = body {
        if let Some(t) = cfg.temperature {
            map.insert("temperature".into(), json!(t));
        }
        if let Some(n) = cfg.max_tokens {
            map.insert("max_tokens".into(), json!(n));
        }
    }
    body
}

async fn send_request(
    url: &str,
    cfg: &GenerationConfig,
    payload: Value,
) -> Result<Value, GenerationError> {
    let timeout_secs = cfg.api_timeout_secs.unwrap_or(60);
    let mut request = HTTP_CLIENT
        .post(url)
        .timeout(Duration::from_secs(timeout_secs))
        .header("Content-Type", "application/json");
    if let Some(header) = cfg.api_auth_header.as_deref() {
        request = request.header("Authorization", header);
    }

    let response = request.json(&payload).send().await.map_err(|e| {
        if e.is_timeout() {
            GenerationError::Timeout(timeout_secs)
        } else {
            GenerationError::Upstream(format!("HTTP request failed: {e}"))
        }
    })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(GenerationError::Upstream(format!("HTTP error {status}: {body}")));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| GenerationError::MalformedResponse(format!("invalid JSON response: {e}")))
}

fn extract_completion(provider: ProviderKind, response: Value) -> Result<String, GenerationError> {
    let text = match (provider, response) {
        (_, Value::String(s)) => s,
        (ProviderKind::OpenAI, Value::Object(map)) => openai_content(map)?,
        (ProviderKind::Custom, Value::Object(mut map)) => {
            let found = ["completion", "text", "output"]
                .iter()
                .find_map(|key| map.remove(*key));
            match found {
                Some(Value::String(s)) => s,
                Some(other) => {
                    return Err(GenerationError::MalformedResponse(format!(
                        "completion must be a string, got {other}"
                    )))
                }
                None => openai_content(map)?,
            }
        }
        (_, other) => {
            return Err(GenerationError::MalformedResponse(format!(
                "unsupported response shape: {other}"
            )))
        }
    };

    if text.trim().is_empty() {
        return Err(GenerationError::EmptyCompletion);
    }
    Ok(text)
}

/// `choices[0].message.content`, falling back to `choices[0].text`.
fn openai_content(mut map: Map<String, Value>) -> Result<String, GenerationError> {
    let first = match map.remove("choices") {
        Some(Value::Array(choices)) => choices.into_iter().next(),
        _ => None,
    }
    .ok_or_else(|| GenerationError::MalformedResponse("response has no choices".into()))?;

    first
        .pointer("/message/content")
        .or_else(|| first.get("text"))
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| GenerationError::MalformedResponse("choice carries no text".into()))
}
