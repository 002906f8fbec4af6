use std::sync::Arc;

use crate::config::AssistConfig;
use crate::error::AssistError;
use crate::provider::CompletionProvider;

mod openrouter;
mod scripted;

pub use openrouter::OpenRouterProvider;
pub use scripted::{ScriptedProvider, ScriptedReply};

pub const DEFAULT_PROVIDER_ID: &str = openrouter::PROVIDER_ID;

pub fn provider_for_id(
    provider_id: &str,
    config: &AssistConfig,
) -> Result<Arc<dyn CompletionProvider>, AssistError> {
    match provider_id.trim() {
        openrouter::PROVIDER_ID => Ok(Arc::new(OpenRouterProvider::new(
            config.openrouter_config(),
        )?)),
        unknown => Err(AssistError::validation(format!(
            "Unsupported provider '{unknown}'. Available providers: {DEFAULT_PROVIDER_ID}"
        ))),
    }
}
