//! Request fingerprints

use crate::types::{ModelId, Operation, Payload};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Stable hash identifying a cacheable request shape
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

/// Everything that distinguishes one cacheable request from another
#[derive(Debug, Clone, Copy)]
pub struct FingerprintInput<'a> {
    pub operation: Operation,
    pub payload: &'a Payload,
    pub max_tokens: u32,
    pub temperature: f32,
    pub module: &'a str,
    pub model_id: ModelId,
}

const SEP: u8 = 0x1f;

impl Fingerprint {
    /// Hash the normalized request
    ///
    /// Whitespace runs in content collapse to one space and temperature is
    /// rounded to `temperature_precision` decimals, so cosmetic differences
    /// map to the same fingerprint.
    pub fn compute(input: &FingerprintInput<'_>, temperature_precision: usize) -> Self {
        let mut hasher = Sha256::new();
        let mut field = |bytes: &[u8]| {
            hasher.update(bytes);
            hasher.update([SEP]);
        };

        field(input.operation.as_str().as_bytes());
        field(input.payload.kind().as_bytes());
        match input.payload {
            Payload::Messages { messages } => {
                for message in messages {
                    field(message.role.as_str().as_bytes());
                    field(normalize(&message.content).as_bytes());
                }
            }
            Payload::Prompt { prompt } => field(normalize(prompt).as_bytes()),
            Payload::Text { text } => field(normalize(text).as_bytes()),
            Payload::Extraction { text, fields } => {
                field(normalize(text).as_bytes());
                for name in fields {
                    field(normalize(name).as_bytes());
                }
            }
        }
        field(input.max_tokens.to_string().as_bytes());
        field(format!("{:.*}", temperature_precision, input.temperature).as_bytes());
        field(input.module.as_bytes());
        field(input.model_id.to_string().as_bytes());

        let digest = hasher.finalize();
        Self(digest.iter().map(|b| format!("{:02x}", b)).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn normalize(content: &str) -> String {
    content.split_whitespace().collect::<Vec<_>>().join(" ")
}
