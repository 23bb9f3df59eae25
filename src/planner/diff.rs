//! Diff engine for comparing desired vs observed disk state.
//!
//! Only the fields that can change after creation are compared: size,
//! description and labels. The rendered diff is a line diff of the
//! key-sorted, 2-space indented JSON of both sides.

use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::collections::BTreeMap;
use tracing::debug;

use crate::cloud::Disk;
use crate::config::DiskSpec;

/// Engine for computing diffs between desired and observed disks.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiffEngine;

/// The mutable subset of a disk.
#[derive(Debug, Serialize, PartialEq, Eq)]
struct MutableFields<'a> {
    description: &'a str,
    labels: &'a BTreeMap<String, String>,
    size: String,
}

impl<'a> MutableFields<'a> {
    fn observed(disk: &'a Disk) -> Self {
        Self {
            description: &disk.description,
            labels: &disk.labels,
            size: disk.size.clone(),
        }
    }

    fn desired(spec: &'a DiskSpec, observed: &Disk) -> Self {
        Self {
            description: &spec.description,
            labels: &spec.labels,
            // An unset size never triggers a resize.
            size: spec
                .size
                .map_or_else(|| observed.size.clone(), |size| size.to_string()),
        }
    }

    fn to_json(&self) -> String {
        // Round-trip through `Value` so object keys come out sorted.
        serde_json::to_value(self)
            .and_then(|value| serde_json::to_string_pretty(&value))
            .unwrap_or_default()
    }
}

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Returns true if any mutable field differs.
    ///
    /// Sizes compare as decimal strings; labels compare as sorted maps, so
    /// insertion order never matters.
    #[must_use]
    pub fn needs_update(&self, desired: &DiskSpec, observed: &Disk) -> bool {
        let needs = MutableFields::desired(desired, observed) != MutableFields::observed(observed);
        debug!("Disk '{}' needs update: {needs}", desired.name);
        needs
    }

    /// Renders a line diff of the mutable fields.
    ///
    /// Lines are prefixed with `"  "` when shared, `"- "` when only observed
    /// and `"+ "` when only desired. Returns an empty string when nothing
    /// would be updated.
    #[must_use]
    pub fn render(&self, desired: &DiskSpec, observed: &Disk) -> String {
        if !self.needs_update(desired, observed) {
            return String::new();
        }

        let before = MutableFields::observed(observed).to_json();
        let after = MutableFields::desired(desired, observed).to_json();
        let diff = TextDiff::from_lines(&before, &after);

        let mut rendered = String::with_capacity(before.len() + after.len());
        for change in diff.iter_all_changes() {
            let prefix = match change.tag() {
                ChangeTag::Equal => "  ",
                ChangeTag::Delete => "- ",
                ChangeTag::Insert => "+ ",
            };
            rendered.push_str(prefix);
            rendered.push_str(change.value());
            if change.missing_newline() && change.tag() != ChangeTag::Equal {
                rendered.push('\n');
            }
        }
        rendered
    }
}
