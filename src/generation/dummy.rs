//! Canned generation for offline development and API-quota outages

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::generation::traits::{GeneratedImage, ImageGenerator, PoemGenerator};

/// Deterministic poem source keyed by well-known themes
pub struct DummyPoemGenerator;

/// Image "generator" that points at a free stock-image service
pub struct DummyImageGenerator;

fn canned_poem(theme: &str) -> String {
    match theme {
        "ざわざわ" | "ざわざわした気分" => "ざわめきの中で\nほんの少し\n風が鳴った",
        "疲れた" => "そっと置いた\n重いカバンの音に\n今日が終わる",
        "安心したい" => "やわらかな光に\n包まれて\n心が軽やか",
        "寂しい" => "星ひとつ\n窓の向こうで\nそっと光る",
        "嬉しい" => "小さな幸せが\nポケットの中で\n踊ってる",
        _ => return format!("{}の中で\nやわらかな時間が\n流れていく", theme),
    }
    .to_string()
}

fn stock_keywords(theme: &str) -> &'static str {
    match theme {
        "ざわざわ" | "ざわざわした気分" => "abstract,water",
        "疲れた" => "sunset,peaceful",
        "安心したい" => "calm,nature",
        "寂しい" => "minimal,night",
        "嬉しい" => "light,joy",
        _ => "abstract,peaceful",
    }
}

#[async_trait]
impl PoemGenerator for DummyPoemGenerator {
    async fn generate_poem(&self, theme: &str) -> Result<String> {
        debug!(theme = %theme, "Serving canned poem");
        Ok(canned_poem(theme))
    }

    async fn generate_image_prompt(&self, theme: &str, _poem: &str) -> Result<String> {
        Ok(format!(
            "Watercolor painting, abstract representation of \"{}\" emotion, soft brushstrokes, \
             muted earth tones with touches of deep blue, flowing organic shapes suggesting \
             gentle movement and introspection, minimalist composition, peaceful atmosphere, \
             16:9 aspect ratio",
            theme
        ))
    }
}

#[async_trait]
impl ImageGenerator for DummyImageGenerator {
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage> {
        // The prompt ends with the theme keywords appended by the pipeline's
        // dummy path; fall back to a generic landscape otherwise.
        let keywords = prompt
            .split('"')
            .nth(1)
            .map(stock_keywords)
            .unwrap_or("abstract,peaceful");

        Ok(GeneratedImage {
            url: Some(format!(
                "https://source.unsplash.com/1792x1024/?{}",
                keywords
            )),
            b64_json: None,
            revised_prompt: None,
        })
    }
}
