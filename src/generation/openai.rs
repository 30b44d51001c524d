//! Chat-completions client for poem and image-prompt generation

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::GenerationConfig;
use crate::error::{AppError, Result};
use crate::generation::traits::PoemGenerator;

/// System prompt for poem generation. The poems this service produces are
/// short Japanese verse, so the instructions are written in Japanese.
const POEM_SYSTEM_PROMPT: &str = "あなたは日本の詩人です。ユーザーの気分やテーマから、短くて美しい詩や句を生成してください。

要件:
- 2-3行の短い形式
- 日本語の美しい表現を使用
- 感情に寄り添う優しい言葉選び
- ひらがな、カタカナ、漢字をバランス良く使用
- 現代的でありながら詩的な表現
- 句読点は自然に、改行で区切る

例:
テーマ「ざわざわ」→「ざわめきの中で / ほんの少し / 風が鳴った」
テーマ「疲れた」→「そっと置いた / 重いカバンの音に / 今日が終わる」";

/// System prompt for image-prompt generation. The downstream image model
/// expects English and rejects prompts outside its content policy.
const IMAGE_PROMPT_SYSTEM_PROMPT: &str = "あなたは画像生成プロンプトの専門家です。日本の詩のテーマから、美しい画像プロンプトを英語で生成してください。

重要な要件:
- 画像生成APIのコンテンツポリシーを遵守
- 抽象的で芸術的な表現のみ
- 自然要素（空、雲、水、光）を中心に
- 優しく美しい色調
- 16:9のアスペクト比
- 人物や具体的なオブジェクトは避ける

安全なフォーマット例:
\"Abstract watercolor painting, soft [color] tones, gentle flowing shapes, peaceful sky, natural lighting, minimalist composition, serene atmosphere, 16:9 aspect ratio\"";

/// HTTP client for an OpenAI-compatible chat completions API
pub struct OpenAiClient {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: u32,
}

impl OpenAiClient {
    /// Create a new client from configuration
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.text_model.clone(),
        })
    }

    async fn chat(&self, request: ChatRequest) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.api_base);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Generation(format!("chat completions request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Chat completions returned error");
            return Err(AppError::Generation(format!(
                "chat completions returned {}: {}",
                status, body
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Generation(format!("failed to parse chat response: {}", e)))?;

        if let Some(usage) = &chat.usage {
            debug!(tokens_used = usage.total_tokens, "Chat completion usage");
        }

        let content = chat
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::trim)
            .unwrap_or_default();

        if content.is_empty() {
            return Err(AppError::Generation("empty completion".to_string()));
        }

        Ok(content.to_string())
    }
}

#[async_trait]
impl PoemGenerator for OpenAiClient {
    async fn generate_poem(&self, theme: &str) -> Result<String> {
        let start = std::time::Instant::now();

        let poem = self
            .chat(ChatRequest {
                model: self.model.clone(),
                messages: vec![
                    ChatMessage {
                        role: "system",
                        content: POEM_SYSTEM_PROMPT.to_string(),
                    },
                    ChatMessage {
                        role: "user",
                        content: format!("テーマ: {}", theme),
                    },
                ],
                max_tokens: 100,
                temperature: 0.8,
                top_p: Some(1.0),
                frequency_penalty: Some(0.3),
                presence_penalty: Some(0.2),
            })
            .await?;

        info!(
            theme = %theme,
            length = poem.chars().count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Poem generated"
        );

        Ok(poem)
    }

    async fn generate_image_prompt(&self, theme: &str, poem: &str) -> Result<String> {
        let start = std::time::Instant::now();

        let prompt = self
            .chat(ChatRequest {
                model: self.model.clone(),
                messages: vec![
                    ChatMessage {
                        role: "system",
                        content: IMAGE_PROMPT_SYSTEM_PROMPT.to_string(),
                    },
                    ChatMessage {
                        role: "user",
                        content: format!(
                            "テーマ: {}\n詩: {}\n\nこの詩に合う画像生成プロンプトを英語で作成してください。",
                            theme, poem
                        ),
                    },
                ],
                max_tokens: 150,
                temperature: 0.7,
                top_p: None,
                frequency_penalty: None,
                presence_penalty: None,
            })
            .await?;

        info!(
            theme = %theme,
            length = prompt.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Image prompt generated"
        );

        Ok(prompt)
    }
}
