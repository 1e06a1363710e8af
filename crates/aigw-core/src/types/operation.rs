//! Logical operations and model modalities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logical operation requested by a calling module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Multi-turn chat over a message list
    Chat,
    /// Single prompt completion
    Complete,
    /// Summarize a block of text
    Summarize,
    /// Extract named fields from text as JSON
    Extract,
    /// Produce an embedding for a block of text
    Embed,
}

impl Operation {
    /// Stable lowercase name, used in ledgers and fingerprints
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Complete => "complete",
            Self::Summarize => "summarize",
            Self::Extract => "extract",
            Self::Embed => "embed",
        }
    }

    /// Modality a model must offer to serve this operation
    pub fn required_modality(&self) -> Modality {
        match self {
            Self::Embed => Modality::Embedding,
            _ => Modality::Text,
        }
    }

    /// Whether responses for this operation may be served from the response cache
    pub fn is_cacheable(&self) -> bool {
        matches!(
            self,
            Self::Chat | Self::Complete | Self::Summarize | Self::Extract
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chat" => Ok(Self::Chat),
            "complete" | "completion" => Ok(Self::Complete),
            "summarize" | "summarise" => Ok(Self::Summarize),
            "extract" => Ok(Self::Extract),
            "embed" | "embedding" => Ok(Self::Embed),
            other => Err(format!("unknown operation: {}", other)),
        }
    }
}

/// Modality offered by a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Text,
    Embedding,
    Image,
    Audio,
    Multimodal,
    Code,
}

impl Modality {
    /// Whether a model of this modality can serve a request requiring `required`.
    ///
    /// Multimodal and code models also serve plain text requests.
    pub fn satisfies(&self, required: Modality) -> bool {
        if *self == required {
            return true;
        }
        required == Modality::Text && matches!(self, Modality::Multimodal | Modality::Code)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Embedding => "embedding",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Multimodal => "multimodal",
            Self::Code => "code",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "embedding" => Ok(Self::Embedding),
            "image" => Ok(Self::Image),
            "audio" => Ok(Self::Audio),
            "multimodal" => Ok(Self::Multimodal),
            "code" => Ok(Self::Code),
            other => Err(format!("unknown modality: {}", other)),
        }
    }
}
