//! Model definitions for the completion provider

use super::gemini::{GeminiModel, GeminiService};
use super::LlmService;
use std::sync::Arc;

/// Model definition with metadata
#[derive(Debug, Clone)]
pub struct ModelDef {
    /// User-facing model ID (e.g., "gemini-1.5-flash")
    pub id: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Factory function to create the service
    pub factory: fn(&str, Option<&str>) -> Result<Arc<dyn LlmService>, String>,
}

/// Model used when `DEFAULT_MODEL` is not set
pub const DEFAULT_MODEL_ID: &str = "gemini-1.5-flash";

/// Get all available model definitions
pub fn all_models() -> &'static [ModelDef] {
    &[
        ModelDef {
            id: "gemini-1.5-flash",
            description: "Gemini 1.5 Flash (fast, default for diary chats)",
            factory: |api_key, gateway| gemini_factory(api_key, GeminiModel::Gemini15Flash, gateway),
        },
        ModelDef {
            id: "gemini-1.5-pro",
            description: "Gemini 1.5 Pro (slower, more careful summaries)",
            factory: |api_key, gateway| gemini_factory(api_key, GeminiModel::Gemini15Pro, gateway),
        },
    ]
}

fn gemini_factory(
    api_key: &str,
    model: GeminiModel,
    gateway: Option<&str>,
) -> Result<Arc<dyn LlmService>, String> {
    // Accept any non-empty key (including "implicit" for gateway mode)
    if api_key.is_empty() {
        return Err(format!("{} requires GEMINI_API_KEY or gateway", model.model_id()));
    }
    let service = GeminiService::new(api_key.to_string(), model, gateway).map_err(|e| e.message)?;
    Ok(Arc::new(service))
}
