//! Two-generation store of code-execution output.
//!
//! `current` is filled by the run in progress, `old` is the last completed
//! generation. New announcements are seeded from `old` purely by position:
//! slot `i` of a collection is copied from slot `i` of the previous
//! generation whether or not the fragment behind it changed.

mod slot;

pub use slot::{CodeCollectionKey, FragmentOutput, OutputSlot};

use crate::error::ProtocolError;
use log::debug;
use std::collections::BTreeMap;

pub type Generation = BTreeMap<CodeCollectionKey, Vec<OutputSlot>>;

/// A collection as declared by an index announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncedCollection {
    pub key: CodeCollectionKey,
    pub length: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionCache {
    current: Generation,
    old: Generation,
    announced: BTreeMap<CodeCollectionKey, usize>,
    processing: BTreeMap<CodeCollectionKey, bool>,
    placeholder_langs: BTreeMap<String, String>,
}

impl ExecutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &Generation {
        &self.current
    }

    pub fn old(&self) -> &Generation {
        &self.old
    }

    /// Start a new generation.
    pub fn begin_run(&mut self) {
        self.old = std::mem::take(&mut self.current);
        self.announced.clear();
        self.processing.clear();
    }

    /// Rebuild `current` from an index announcement, seeding each
    /// collection from `old` by position and padding with placeholders.
    pub fn on_index_announcement(
        &mut self,
        collections: &[AnnouncedCollection],
        placeholder_langs: BTreeMap<String, String>,
    ) {
        self.current.clear();
        self.announced.clear();
        self.processing.clear();

        for collection in collections {
            let mut slots = Vec::with_capacity(collection.length);
            if let Some(previous) = self.old.get(&collection.key) {
                slots.extend(
                    previous
                        .iter()
                        .take(collection.length)
                        .map(OutputSlot::carried_forward),
                );
            }
            slots.resize(collection.length, OutputSlot::Placeholder);

            debug!(
                "announced {} with {} slots ({} carried)",
                collection.key,
                collection.length,
                slots.iter().filter(|s| s.is_stale()).count()
            );

            self.current.insert(collection.key.clone(), slots);
            self.announced
                .insert(collection.key.clone(), collection.length);
            self.processing
                .insert(collection.key.clone(), collection.length > 0);
        }

        self.placeholder_langs = placeholder_langs;
    }

    /// Store a freshly computed fragment at its 1-indexed position.
    /// Returns whether the collection is now fully processed.
    pub fn on_output_fragment(
        &mut self,
        key: &CodeCollectionKey,
        position: usize,
        declared_length: usize,
        output: FragmentOutput,
    ) -> Result<bool, ProtocolError> {
        let announced = *self
            .announced
            .get(key)
            .ok_or_else(|| ProtocolError::UnknownCollection(key.clone()))?;

        if declared_length != announced {
            return Err(ProtocolError::LengthMismatch {
                key: key.clone(),
                announced,
                declared: declared_length,
            });
        }
        if position == 0 || position > announced {
            return Err(ProtocolError::PositionOutOfRange {
                key: key.clone(),
                position,
                length: announced,
            });
        }

        let slots = self
            .current
            .get_mut(key)
            .ok_or_else(|| ProtocolError::UnknownCollection(key.clone()))?;
        slots[position - 1] = OutputSlot::Fresh(output);

        let finished = position == declared_length;
        if finished {
            self.processing.insert(key.clone(), false);
        }
        Ok(finished)
    }

    /// Output for `key`: the running generation first, then the last
    /// completed one.
    pub fn render(&self, key: &CodeCollectionKey) -> &[OutputSlot] {
        self.current
            .get(key)
            .or_else(|| self.old.get(key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every key that `render` has output for, in sorted order.
    pub fn keys(&self) -> Vec<&CodeCollectionKey> {
        let mut keys: Vec<&CodeCollectionKey> = self.current.keys().collect();
        keys.extend(self.old.keys().filter(|k| !self.current.contains_key(*k)));
        keys.sort();
        keys
    }

    /// Discard the partial generation after a failed run.
    pub fn rollback(&mut self) {
        self.current = self.old.clone();
        self.finish_run();
    }

    /// Clear per-run status once the engine has exited.
    pub fn finish_run(&mut self) {
        self.announced.clear();
        self.processing.clear();
    }

    pub fn is_processing(&self, key: &CodeCollectionKey) -> bool {
        self.processing.get(key).copied().unwrap_or(false)
    }

    pub fn processing(&self) -> &BTreeMap<CodeCollectionKey, bool> {
        &self.processing
    }

    pub fn placeholder_langs(&self) -> &BTreeMap<String, String> {
        &self.placeholder_langs
    }
}
