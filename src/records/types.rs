//! Poem record wire types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted poem record.
///
/// `image_url` is best-effort: it may point at the durable store, at the
/// generator's transient CDN, or at the static placeholder, and readers
/// must be prepared for any of the three.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoemRecord {
    pub id: String,
    pub theme: String,
    pub phrase: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_prompt: Option<String>,
    /// Server-assigned creation time, ISO-8601 on the wire
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A record about to be persisted. The id is generated by the pipeline so
/// the object-store key and the record key agree; the creation timestamp
/// is assigned by the record service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPoemRecord {
    pub id: String,
    pub theme: String,
    pub phrase: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_prompt: Option<String>,
}
