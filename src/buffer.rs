//! Editor buffer identities and the collaborator interface used to reach them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

/// One of the three independent editor buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferId {
    Markup,
    Style,
    Script,
}

impl BufferId {
    pub const ALL: [BufferId; 3] = [BufferId::Markup, BufferId::Style, BufferId::Script];

    /// Canonical fence language tag for this buffer.
    pub fn language(self) -> &'static str {
        match self {
            Self::Markup => "html",
            Self::Style => "css",
            Self::Script => "javascript",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Markup => "HTML",
            Self::Style => "CSS",
            Self::Script => "JavaScript",
        }
    }

    /// File name used when the buffer is exported to disk.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Markup => "index.html",
            Self::Style => "styles.css",
            Self::Script => "script.js",
        }
    }

    /// Resolve a canonical (already normalized) language tag.
    pub fn from_language(language: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|buffer| buffer.language() == language)
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for BufferId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "html" | "markup" => Ok(Self::Markup),
            "css" | "style" => Ok(Self::Style),
            "js" | "javascript" | "script" => Ok(Self::Script),
            other => Err(format!(
                "unknown buffer '{other}'; expected html, css, or js"
            )),
        }
    }
}

/// Which buffers an agent invocation may modify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionScope {
    Single(BufferId),
    All,
}

impl ActionScope {
    pub fn includes(self, buffer: BufferId) -> bool {
        match self {
            Self::Single(target) => target == buffer,
            Self::All => true,
        }
    }

    pub fn buffers(self) -> Vec<BufferId> {
        BufferId::ALL
            .into_iter()
            .filter(|buffer| self.includes(*buffer))
            .collect()
    }

    pub fn describe(self) -> String {
        match self {
            Self::Single(buffer) => format!("the {} file only", buffer.display_name()),
            Self::All => "all three files (HTML, CSS, and JavaScript)".to_owned(),
        }
    }
}

impl FromStr for ActionScope {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        value.parse::<BufferId>().map(Self::Single)
    }
}

/// Editor widget seam. The core only ever reads whole buffers, replaces them
/// wholesale, or appends while streaming.
pub trait EditorBuffers: Send + Sync + 'static {
    fn read_all(&self, buffer: BufferId) -> String;
    fn replace_all(&self, buffer: BufferId, text: &str);
    fn append(&self, buffer: BufferId, text: &str);
}

/// Headless buffer store backing the CLI and tests.
#[derive(Debug, Default)]
pub struct InMemoryBuffers {
    contents: Mutex<BTreeMap<BufferId, String>>,
}

impl InMemoryBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(markup: &str, style: &str, script: &str) -> Self {
        let buffers = Self::default();
        buffers.replace_all(BufferId::Markup, markup);
        buffers.replace_all(BufferId::Style, style);
        buffers.replace_all(BufferId::Script, script);
        buffers
    }

    pub fn snapshot(&self) -> BTreeMap<BufferId, String> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<BufferId, String>> {
        crate::lock_unpoisoned(&self.contents)
    }
}

impl EditorBuffers for InMemoryBuffers {
    fn read_all(&self, buffer: BufferId) -> String {
        self.lock().get(&buffer).cloned().unwrap_or_default()
    }

    fn replace_all(&self, buffer: BufferId, text: &str) {
        self.lock().insert(buffer, text.to_owned());
    }

    fn append(&self, buffer: BufferId, text: &str) {
        self.lock().entry(buffer).or_default().push_str(text);
    }
}

/// Point-in-time copy of all three buffers, embedded into prompts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeSnapshot {
    pub markup: String,
    pub style: String,
    pub script: String,
}

impl CodeSnapshot {
    pub fn capture(buffers: &dyn EditorBuffers) -> Self {
        Self {
            markup: buffers.read_all(BufferId::Markup),
            style: buffers.read_all(BufferId::Style),
            script: buffers.read_all(BufferId::Script),
        }
    }

    pub fn get(&self, buffer: BufferId) -> &str {
        match buffer {
            BufferId::Markup => &self.markup,
            BufferId::Style => &self.style,
            BufferId::Script => &self.script,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ActionScope, BufferId, EditorBuffers, InMemoryBuffers};

    #[test]
    fn scope_parsing_accepts_editor_target_values() {
        assert_eq!("all".parse::<ActionScope>(), Ok(ActionScope::All));
        assert_eq!(
            "css".parse::<ActionScope>(),
            Ok(ActionScope::Single(BufferId::Style))
        );
        assert_eq!(
            "js".parse::<ActionScope>(),
            Ok(ActionScope::Single(BufferId::Script))
        );
        assert!("python".parse::<ActionScope>().is_err());
    }

    #[test]
    fn single_scope_covers_exactly_one_buffer() {
        let scope = ActionScope::Single(BufferId::Style);
        assert_eq!(scope.buffers(), vec![BufferId::Style]);
        assert!(!scope.includes(BufferId::Markup));
        assert_eq!(ActionScope::All.buffers(), BufferId::ALL.to_vec());
    }

    #[test]
    fn language_tags_round_trip_to_buffers() {
        for buffer in BufferId::ALL {
            assert_eq!(BufferId::from_language(buffer.language()), Some(buffer));
        }
        assert_eq!(BufferId::from_language("js"), None);
    }

    #[test]
    fn in_memory_buffers_replace_and_append() {
        let buffers = InMemoryBuffers::new();
        assert_eq!(buffers.read_all(BufferId::Script), "");

        buffers.replace_all(BufferId::Script, "let a = 1;");
        buffers.append(BufferId::Script, "\nlet b = 2;");
        assert_eq!(buffers.read_all(BufferId::Script), "let a = 1;\nlet b = 2;");

        buffers.replace_all(BufferId::Script, "");
        assert_eq!(buffers.read_all(BufferId::Script), "");
    }
}
