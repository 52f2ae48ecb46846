use std::time::Duration;

use axum::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use crate::config::InferenceConfig;

const IDENTIFY_PROMPT: &str = "Please identify this plant and provide the following information: \
name, scientific name, family, type, care level, and a brief description. Format the response \
as a simple text with each piece of information on a new line.";

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    /// Network failure, timeout or non-success status from the external API.
    #[error("inference service unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
    /// The API answered but the reply carried no usable content.
    #[error("unexpected response format: {0}")]
    Malformed(String),
}

/// External multimodal model. Injected so tests run without the real API.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Submit a plant photo (base64 JPEG) and return the model's free-text reply.
    async fn identify_plant(&self, image_base64: &str) -> Result<String, InferenceError>;

    /// Ask for a short care summary for an already-identified plant.
    async fn generate_care_tips(
        &self,
        plant_name: &str,
        plant_type: &str,
        care_level: &str,
    ) -> Result<String, InferenceError>;
}

/// Together chat-completions client.
#[derive(Clone)]
pub struct TogetherClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl TogetherClient {
    pub fn new(config: &InferenceConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    #[instrument(skip(self, body))]
    async fn chat(&self, body: serde_json::Value) -> Result<String, InferenceError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::Unavailable(e.into()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InferenceError::Unavailable(anyhow::anyhow!(
                "chat completion returned {}",
                status
            )));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::Malformed(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| InferenceError::Malformed("no content in first choice".into()))?;

        debug!(chars = content.len(), "chat completion received");
        Ok(content)
    }
}

#[async_trait]
impl InferenceClient for TogetherClient {
    async fn identify_plant(&self, image_base64: &str) -> Result<String, InferenceError> {
        // Fixed sampling parameters: favor consistent, well-formed output.
        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": IDENTIFY_PROMPT },
                    {
                        "type": "image_url",
                        "image_url": { "url": format!("data:image/jpeg;base64,{}", image_base64) }
                    }
                ]
            }],
            "max_tokens": 512,
            "temperature": 0.7,
            "top_p": 0.7,
            "top_k": 50,
            "repetition_penalty": 1,
            "stop": ["<|eot_id|>", "<|eom_id|>"]
        });
        self.chat(body).await
    }

    async fn generate_care_tips(
        &self,
        plant_name: &str,
        plant_type: &str,
        care_level: &str,
    ) -> Result<String, InferenceError> {
        let prompt = format!(
            "Generate care tips for a {} ({}) with a {} care level. Include information about \
watering, light requirements, soil type, and any special care instructions. No more than 100 words",
            plant_name, plant_type, care_level
        );
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": "You are a helpful plant care assistant." },
                { "role": "user", "content": prompt }
            ],
            "max_tokens": 150,
            "temperature": 0.7
        });
        self.chat(body).await
    }
}
