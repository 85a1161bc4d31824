//! Image leg of the combined prediction. No inference happens here: the
//! upload is handed back base64-encoded for the client-side visual model.

use base64::Engine;
use serde::Serialize;

const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImageStatus {
    ReadyForPrediction {
        image_base64: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
        model_url: String,
        message: String,
    },
    Error {
        message: String,
    },
}

impl ImageStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ImageStatus::ReadyForPrediction { .. })
    }
}

pub fn pass_through(bytes: &[u8], content_type: Option<&str>, model_url: &str) -> ImageStatus {
    if bytes.is_empty() {
        return ImageStatus::Error {
            message: "Error processing image: empty upload".to_string(),
        };
    }
    if let Some(ct) = content_type {
        if !ct.starts_with("image/") {
            return ImageStatus::Error {
                message: format!("Error processing image: unsupported content type {}", ct),
            };
        }
    }
    ImageStatus::ReadyForPrediction {
        image_base64: BASE64.encode(bytes),
        content_type: content_type.map(str::to_string),
        model_url: model_url.to_string(),
        message: "Image received and ready for ML prediction".to_string(),
    }
}
