//! Task Block Payloads
//!
//! Content variants of the block canvas attached to a task.

use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::item::{ItemKind, Payload};

/// Block type determines the payload shape and how it renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Heading,
    #[default]
    Text,
    Checklist,
    Code,
    Quote,
    Link,
    Image,
    List,
}

impl BlockKind {
    pub const ALL: [BlockKind; 8] = [
        BlockKind::Heading,
        BlockKind::Text,
        BlockKind::Checklist,
        BlockKind::Code,
        BlockKind::Quote,
        BlockKind::Link,
        BlockKind::Image,
        BlockKind::List,
    ];
}

impl ItemKind for BlockKind {
    fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Heading => "heading",
            BlockKind::Text => "text",
            BlockKind::Checklist => "checklist",
            BlockKind::Code => "code",
            BlockKind::Quote => "quote",
            BlockKind::Link => "link",
            BlockKind::Image => "image",
            BlockKind::List => "list",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        BlockKind::ALL.into_iter().find(|kind| kind.as_str() == s)
    }
}

/// One row of a checklist block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistEntry {
    /// Sub-identifier, stable across edits of the row
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub checked: bool,
}

impl ChecklistEntry {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            checked: false,
        }
    }
}

/// Block content, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BlockPayload {
    Heading {
        text: String,
        level: u8,
    },
    Text {
        text: String,
    },
    Checklist {
        entries: Vec<ChecklistEntry>,
    },
    Code {
        code: String,
        #[serde(default)]
        language: Option<String>,
    },
    Quote {
        text: String,
        #[serde(default)]
        attribution: Option<String>,
    },
    Link {
        url: String,
        #[serde(default)]
        label: Option<String>,
    },
    Image {
        url: String,
        #[serde(default)]
        caption: Option<String>,
    },
    List {
        entries: Vec<String>,
        #[serde(default)]
        ordered: bool,
    },
}

impl BlockPayload {
    /// Append a checklist row, returning its sub-id. No-op for other variants.
    pub fn push_entry(&mut self, text: impl Into<String>) -> Option<String> {
        match self {
            BlockPayload::Checklist { entries } => {
                let entry = ChecklistEntry::new(text);
                let id = entry.id.clone();
                entries.push(entry);
                Some(id)
            }
            _ => None,
        }
    }

    /// Flip the checked flag of a checklist row
    pub fn toggle_entry(&mut self, entry_id: &str) -> bool {
        if let BlockPayload::Checklist { entries } = self {
            if let Some(entry) = entries.iter_mut().find(|e| e.id == entry_id) {
                entry.checked = !entry.checked;
                return true;
            }
        }
        false
    }

    pub fn remove_entry(&mut self, entry_id: &str) -> bool {
        if let BlockPayload::Checklist { entries } = self {
            let before = entries.len();
            entries.retain(|e| e.id != entry_id);
            return entries.len() != before;
        }
        false
    }

    /// Main text of text-like blocks
    pub fn text(&self) -> Option<&str> {
        match self {
            BlockPayload::Heading { text, .. }
            | BlockPayload::Text { text }
            | BlockPayload::Quote { text, .. } => Some(text),
            BlockPayload::Code { code, .. } => Some(code),
            _ => None,
        }
    }
}

fn check_url(kind: &'static str, url: &str) -> Result<(), ValidationError> {
    if url.is_empty() || url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(ValidationError::new(kind, format!("url must be http(s): {}", url)))
    }
}

impl Payload for BlockPayload {
    type Kind = BlockKind;

    fn kind(&self) -> BlockKind {
        match self {
            BlockPayload::Heading { .. } => BlockKind::Heading,
            BlockPayload::Text { .. } => BlockKind::Text,
            BlockPayload::Checklist { .. } => BlockKind::Checklist,
            BlockPayload::Code { .. } => BlockKind::Code,
            BlockPayload::Quote { .. } => BlockKind::Quote,
            BlockPayload::Link { .. } => BlockKind::Link,
            BlockPayload::Image { .. } => BlockKind::Image,
            BlockPayload::List { .. } => BlockKind::List,
        }
    }

    fn empty(kind: BlockKind) -> Self {
        match kind {
            BlockKind::Heading => BlockPayload::Heading {
                text: String::new(),
                level: 2,
            },
            BlockKind::Text => BlockPayload::Text {
                text: String::new(),
            },
            BlockKind::Checklist => BlockPayload::Checklist {
                entries: Vec::new(),
            },
            BlockKind::Code => BlockPayload::Code {
                code: String::new(),
                language: None,
            },
            BlockKind::Quote => BlockPayload::Quote {
                text: String::new(),
                attribution: None,
            },
            BlockKind::Link => BlockPayload::Link {
                url: String::new(),
                label: None,
            },
            BlockKind::Image => BlockPayload::Image {
                url: String::new(),
                caption: None,
            },
            BlockKind::List => BlockPayload::List {
                entries: Vec::new(),
                ordered: false,
            },
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let kind = self.kind().as_str();
        match self {
            BlockPayload::Heading { level, .. } if !(1..=3).contains(level) => Err(
                ValidationError::new(kind, format!("heading level {} out of range 1-3", level)),
            ),
            BlockPayload::Checklist { entries } => {
                let mut seen = std::collections::HashSet::new();
                for entry in entries {
                    if entry.id.is_empty() {
                        return Err(ValidationError::new(kind, "checklist row without id"));
                    }
                    if !seen.insert(entry.id.as_str()) {
                        return Err(ValidationError::new(
                            kind,
                            format!("duplicate checklist row id {}", entry.id),
                        ));
                    }
                }
                Ok(())
            }
            BlockPayload::Link { url, .. } | BlockPayload::Image { url, .. } => {
                check_url(kind, url)
            }
            _ => Ok(()),
        }
    }
}
