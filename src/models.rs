//! Model registry: ordered built-ins plus user-added entries.

use serde::{Deserialize, Serialize};

use crate::error::AssistError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub display_name: String,
}

impl ModelDescriptor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

const BUILTIN_MODELS: [(&str, &str); 4] = [
    ("openrouter/qwen/qwen-2-7b-instruct:free", "Qwen 2 7B (Free)"),
    ("mistralai/mixtral-8x7b-instruct", "Mixtral 8x7B"),
    ("anthropic/claude-3-opus:beta", "Claude 3 Opus"),
    ("anthropic/claude-3-sonnet:beta", "Claude 3 Sonnet"),
];

/// Insertion-ordered, never empty, ids unique. Entries are never removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRegistry {
    models: Vec<ModelDescriptor>,
    selected: usize,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModelRegistry {
    pub fn builtin() -> Self {
        Self {
            models: BUILTIN_MODELS
                .iter()
                .map(|(id, name)| ModelDescriptor::new(*id, *name))
                .collect(),
            selected: 0,
        }
    }

    pub fn models(&self) -> &[ModelDescriptor] {
        &self.models
    }

    pub fn get(&self, id: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|model| model.id == id)
    }

    pub fn selected(&self) -> &ModelDescriptor {
        &self.models[self.selected]
    }

    /// Appends a user model and selects it.
    pub fn add(
        &mut self,
        id: &str,
        display_name: &str,
    ) -> Result<&ModelDescriptor, AssistError> {
        let id = id.trim();
        let display_name = display_name.trim();
        if id.is_empty() || display_name.is_empty() {
            return Err(AssistError::validation(
                "both a model id and a display name are required",
            ));
        }
        if self.get(id).is_some() {
            return Err(AssistError::validation(format!(
                "model '{id}' is already registered"
            )));
        }

        self.models.push(ModelDescriptor::new(id, display_name));
        self.selected = self.models.len() - 1;
        Ok(self.selected())
    }

    pub fn select(&mut self, id: &str) -> Result<&ModelDescriptor, AssistError> {
        let Some(index) = self.models.iter().position(|model| model.id == id.trim()) else {
            return Err(AssistError::validation(format!("unknown model '{}'", id.trim())));
        };
        self.selected = index;
        Ok(self.selected())
    }
}
