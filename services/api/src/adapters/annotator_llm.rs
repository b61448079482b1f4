//! services/api/src/adapters/annotator_llm.rs
//!
//! This module contains the adapter for the link-annotation LLM.
//! It implements the `LinkAnnotator` port from the `core` crate.
//!
//! The response is constrained with a strict JSON schema, so the model cannot
//! wrap its output in markdown fences or prose; the reply either decodes into
//! an `Annotation` or the call fails.

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
    },
    Client,
};
use async_trait::async_trait;
use linkstash_core::domain::Annotation;
use linkstash_core::ports::{AnnotationError, LinkAnnotator};
use serde::Deserialize;
use tokio::time::timeout;

const SYSTEM_PROMPT: &str = "You are a bookmarking assistant. Based on the content of the URL \
you are given, provide a concise one-paragraph summary, a suitable title for a bookmark, and a \
list of 3-5 relevant lowercase tags.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `LinkAnnotator` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiAnnotatorAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl OpenAiAnnotatorAdapter {
    /// Creates a new `OpenAiAnnotatorAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String, timeout: Duration) -> Self {
        Self {
            client,
            model,
            timeout,
        }
    }
}

//=========================================================================================
// Response Decoding
//=========================================================================================

/// The wire shape the model is required to produce.
#[derive(Deserialize)]
struct AnnotationPayload {
    title: String,
    summary: String,
    tags: Vec<String>,
}

/// The JSON schema enforced on the model's reply.
fn annotation_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "title": {
                "type": "string",
                "description": "A suitable short title for a bookmark."
            },
            "summary": {
                "type": "string",
                "description": "A concise one-paragraph summary of the content."
            },
            "tags": {
                "type": "array",
                "items": { "type": "string" },
                "description": "3-5 relevant lowercase tags."
            }
        },
        "required": ["title", "summary", "tags"],
        "additionalProperties": false
    })
}

/// Decode-or-fail: the model's reply is untrusted input and must match the
/// required shape exactly, with non-empty title and summary.
fn decode_annotation(content: &str) -> Result<Annotation, AnnotationError> {
    let payload: AnnotationPayload = serde_json::from_str(content)
        .map_err(|e| AnnotationError::MalformedResult(e.to_string()))?;

    if payload.title.trim().is_empty() {
        return Err(AnnotationError::MalformedResult(
            "title is empty".to_string(),
        ));
    }
    if payload.summary.trim().is_empty() {
        return Err(AnnotationError::MalformedResult(
            "summary is empty".to_string(),
        ));
    }

    Ok(Annotation {
        title: payload.title,
        summary: payload.summary,
        tags: payload.tags,
    })
}

//=========================================================================================
// `LinkAnnotator` Trait Implementation
//=========================================================================================

#[async_trait]
impl LinkAnnotator for OpenAiAnnotatorAdapter {
    /// Makes a single, time-bounded annotation attempt for `url`.
    async fn annotate(&self, url: &str) -> Result<Annotation, AnnotationError> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()
                .map_err(|e| AnnotationError::UpstreamFailure(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(format!("Analyze the content of the following URL: {}", url))
                .build()
                .map_err(|e| AnnotationError::UpstreamFailure(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    name: "link_annotation".to_string(),
                    description: Some("Title, summary and tags for a bookmarked URL.".to_string()),
                    schema: Some(annotation_schema()),
                    strict: Some(true),
                },
            })
            .build()
            .map_err(|e| AnnotationError::UpstreamFailure(e.to_string()))?;

        let response = timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| {
                AnnotationError::UpstreamFailure("annotation request timed out".to_string())
            })?
            .map_err(|e: OpenAIError| AnnotationError::UpstreamFailure(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                AnnotationError::UpstreamFailure(
                    "annotation response contained no content".to_string(),
                )
            })?;

        decode_annotation(&content)
    }
}
