use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one code collection across builds: `(type, lang, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CodeCollectionKey {
    pub kind: String,
    pub lang: String,
    pub name: String,
}

impl CodeCollectionKey {
    pub fn new(kind: impl Into<String>, lang: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            lang: lang.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for CodeCollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.kind, self.lang, self.name)
    }
}

/// Result computed by the engine for one fragment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FragmentOutput {
    pub inline: bool,
    pub attr_hash: String,
    pub code_hash: String,
    pub output: Vec<String>,
}

/// One position in a collection's output list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSlot {
    /// Computed by the current run.
    Fresh(FragmentOutput),
    /// Carried over by position from the previous generation.
    Stale(FragmentOutput),
    /// Nothing known yet for this position.
    Placeholder,
}

impl OutputSlot {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, OutputSlot::Placeholder)
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, OutputSlot::Stale(_))
    }

    pub fn output(&self) -> Option<&FragmentOutput> {
        match self {
            OutputSlot::Fresh(out) | OutputSlot::Stale(out) => Some(out),
            OutputSlot::Placeholder => None,
        }
    }

    /// Copy of this slot as seen from the next generation.
    pub fn carried_forward(&self) -> OutputSlot {
        match self {
            OutputSlot::Fresh(out) | OutputSlot::Stale(out) => OutputSlot::Stale(out.clone()),
            OutputSlot::Placeholder => OutputSlot::Placeholder,
        }
    }
}
