use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::time::Duration;

use crate::types::l2_normalize_in_place;
use crate::{EmbeddingConfig, EmbeddingVector, SemanticError};

// Shared HTTP client with connection pooling; per-call timeouts are applied on
// each request so different configs can share it.
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(32)
        .build()
        .unwrap_or_default()
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ApiProviderKind {
    HuggingFace,
    OpenAI,
    Custom,
}

/// Single outbound call to the embedding service. No retry, no caching.
pub(crate) async fn semanticize_via_api(
    text: &str,
    cfg: &EmbeddingConfig,
) -> Result<EmbeddingVector, SemanticError> {
    let url = cfg
        .api_url
        .as_deref()
        .ok_or_else(|| SemanticError::InvalidConfig("api_url is required for api mode".into()))?;
    let provider = api_provider_kind(cfg);
    let payload = build_api_payload(provider, text, cfg);

    tracing::debug!(
        provider = ?provider,
        model = %cfg.model_name,
        chars = text.len(),
        "requesting embedding"
    );

    let response = send_api_request(url, cfg, payload).await?;
    process_response(cfg, response)
}

fn api_provider_kind(cfg: &EmbeddingConfig) -> ApiProviderKind {
    let provider = cfg
        .api_provider
        .as_deref()
        .unwrap_or("custom")
        .to_ascii_lowercase();
    match provider.as_str() {
        "hf" | "huggingface" => ApiProviderKind::HuggingFace,
        "openai" | "gpt" => ApiProviderKind::OpenAI,
        _ => ApiProviderKind::Custom,
    }
}

fn build_api_payload(provider: ApiProviderKind, text: &str, cfg: &EmbeddingConfig) -> Value {
    match provider {
        ApiProviderKind::HuggingFace => json!({ "inputs": text }),
        ApiProviderKind::OpenAI => json!({ "input": text, "model": cfg.model_name }),
        ApiProviderKind::Custom => json!({ "text": text, "model": cfg.model_name }),
    }
}

async fn send_api_request(
    url: &str,
    cfg: &EmbeddingConfig,
    payload: Value,
) -> Result<Value, SemanticError> {
    let timeout_secs = cfg.api_timeout_secs.unwrap_or(30);
    let mut request = HTTP_CLIENT
        .post(url)
        .timeout(Duration::from_secs(timeout_secs))
        .header("Content-Type", "application/json");
    if let Some(header) = cfg.api_auth_header.as_deref() {
        request = request.header("Authorization", header);
    }

    let response = request.json(&payload).send().await.map_err(|e| {
        if e.is_timeout() {
            SemanticError::Timeout(timeout_secs)
        } else {
            SemanticError::Upstream(format!("HTTP request failed: {e}"))
        }
    })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(SemanticError::Upstream(format!("HTTP error {status}: {body}")));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| SemanticError::malformed(format!("invalid JSON response: {e}")))
}

/// Turn a provider response into a validated [`EmbeddingVector`].
fn process_response(cfg: &EmbeddingConfig, response: Value) -> Result<EmbeddingVector, SemanticError> {
    let mut vectors = parse_embeddings_from_value(response)?;
    if vectors.len() > 1 {
        return Err(SemanticError::malformed(format!(
            "expected one embedding, got {}",
            vectors.len()
        )));
    }
    let mut embedding = vectors
        .pop()
        .ok_or_else(|| SemanticError::malformed("response did not contain an embedding"))?;

    if embedding.is_empty() {
        return Err(SemanticError::malformed("embedding is empty"));
    }
    if let Some(expected) = cfg.expected_dim {
        if embedding.len() != expected {
            return Err(SemanticError::malformed(format!(
                "embedding has dimension {}, expected {expected}",
                embedding.len()
            )));
        }
    }

    if cfg.normalize {
        l2_normalize_in_place(&mut embedding);
    }

    Ok(EmbeddingVector::new(
        embedding,
        cfg.model_name.clone(),
        cfg.normalize,
    ))
}

fn parse_embeddings_from_value(value: Value) -> Result<Vec<Vec<f32>>, SemanticError> {
    match value {
        Value::Object(mut map) => {
            if let Some(embedding) = map.remove("embedding") {
                return parse_embedding_vector(embedding).map(|v| vec![v]);
            }

            if let Some(embeddings) = map.remove("embeddings") {
                return parse_embedding_collection(embeddings);
            }

            if let Some(Value::Array(items)) = map.remove("data") {
                let mut vectors = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Object(mut obj) => match obj.remove("embedding") {
                            Some(embedding) => vectors.push(parse_embedding_vector(embedding)?),
                            None => {
                                return Err(SemanticError::malformed(
                                    "missing `embedding` field in data item",
                                ))
                            }
                        },
                        _ => {
                            return Err(SemanticError::malformed(
                                "unexpected entry inside `data` array",
                            ))
                        }
                    }
                }
                return Ok(vectors);
            }

            Err(SemanticError::malformed("unsupported API response shape"))
        }
        other => parse_embedding_collection(other),
    }
}

fn parse_embedding_collection(value: Value) -> Result<Vec<Vec<f32>>, SemanticError> {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                Ok(Vec::new())
            } else if items.iter().all(|item| matches!(item, Value::Array(_))) {
                items.into_iter().map(parse_embedding_vector).collect()
            } else {
                parse_embedding_vector(Value::Array(items)).map(|vec| vec![vec])
            }
        }
        other => parse_embedding_vector(other).map(|vec| vec![vec]),
    }
}

fn parse_embedding_vector(value: Value) -> Result<Vec<f32>, SemanticError> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|entry| match entry {
                Value::Number(num) => num
                    .as_f64()
                    .map(|f| f as f32)
                    .filter(|f| f.is_finite())
                    .ok_or_else(|| SemanticError::malformed("non-finite embedding value")),
                other => Err(SemanticError::malformed(format!(
                    "embedding entries must be numbers, got {other:?}"
                ))),
            })
            .collect(),
        other => Err(SemanticError::malformed(format!(
            "embedding vector must be an array, got {other:?}"
        ))),
    }
}
