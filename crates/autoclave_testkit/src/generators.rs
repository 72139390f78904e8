//! Property-based test generators using proptest.
//!
//! Records are compact single-line JSON objects, so they always start with
//! `{`, end with `}`, and never contain a raw newline.

use crate::fixtures::{ArchiveBuilder, BuiltArchive};
use proptest::prelude::*;
use serde_json::{Map, Value};
use std::ops::Range;

/// Strategy for a scalar JSON value.
fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        ".{0,48}".prop_map(Value::from),
    ]
}

/// Strategy for a serialized JSON record.
pub fn record_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::btree_map("[a-z_]{1,12}", scalar_strategy(), 0..8).prop_map(|fields| {
        let object: Map<String, Value> = fields.into_iter().collect();
        serde_json::to_vec(&Value::Object(object)).expect("serialize JSON object")
    })
}

/// How a report is laid out inside an archive.
#[derive(Debug, Clone)]
pub struct ArchiveLayout {
    /// Records from an earlier report, sharing the first report frame.
    pub leading: Vec<Vec<u8>>,
    /// Close a frame between the leading records and the report.
    pub leading_break: bool,
    /// The report's records.
    pub members: Vec<Vec<u8>>,
    /// Close a frame after member `i` (the last entry is ignored).
    pub breaks: Vec<bool>,
    /// Leave out the last member's newline.
    pub omit_final_newline: bool,
    /// Records from a later report, in frames after the report.
    pub trailing: Vec<Vec<u8>>,
}

impl ArchiveLayout {
    /// Packs the layout into an archive.
    ///
    /// Returns the archive and the index range of the report's members in
    /// [`BuiltArchive::records`].
    pub fn build(&self, path: &str) -> (BuiltArchive, Range<usize>) {
        let mut builder = ArchiveBuilder::new(path);
        for json in &self.leading {
            builder = builder.record(json);
        }
        if self.leading_break {
            builder = builder.frame();
        }

        let last = self.members.len() - 1;
        for (i, json) in self.members.iter().enumerate() {
            if i == last {
                builder = if self.omit_final_newline {
                    builder.record_unterminated(json)
                } else {
                    builder.record(json)
                };
            } else {
                builder = builder.record(json);
                if self.breaks.get(i).copied().unwrap_or(false) {
                    builder = builder.frame();
                }
            }
        }

        builder = builder.frame();
        for json in &self.trailing {
            builder = builder.record(json);
        }

        let start = self.leading.len();
        (builder.build(), start..start + self.members.len())
    }
}

/// Strategy for report layouts.
pub fn layout_strategy() -> impl Strategy<Value = ArchiveLayout> {
    (
        prop::collection::vec(record_strategy(), 0..3),
        any::<bool>(),
        prop::collection::vec(record_strategy(), 1..12),
        any::<bool>(),
        prop::collection::vec(record_strategy(), 0..3),
    )
        .prop_flat_map(|(leading, leading_break, members, omit_final_newline, trailing)| {
            let breaks = prop::collection::vec(any::<bool>(), members.len());
            (
                Just(leading),
                Just(leading_break),
                Just(members),
                breaks,
                Just(omit_final_newline),
                Just(trailing),
            )
        })
        .prop_map(
            |(leading, leading_break, members, breaks, omit_final_newline, trailing)| ArchiveLayout {
                leading,
                leading_break,
                members,
                breaks,
                omit_final_newline,
                trailing,
            },
        )
}
