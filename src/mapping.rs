//! Flattening of source units into one text stream with an offset map.
//!
//! Every position handed to the chunker is a character index (Unicode scalar values,
//! not bytes) into the flattened text. [`OffsetMap::resolve`] turns such an index back
//! into the source position of the unit that contains it.

use crate::source::{SourcePosition, SourceUnit};
use serde::{Deserialize, Serialize};

/// Separator inserted between consecutive units.
pub const UNIT_SEPARATOR: char = ' ';

/// A single `(char_position, source_position)` breakpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    /// Character index in the flattened text where the unit starts.
    pub char_position: usize,
    /// Source position of the unit.
    pub source_position: SourcePosition,
}

/// Ordered breakpoints with strictly increasing `char_position`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OffsetMap {
    breakpoints: Vec<Breakpoint>,
}

impl OffsetMap {
    /// All breakpoints, in order.
    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.breakpoints.len()
    }

    /// Source position of the unit containing character `position`.
    ///
    /// Uses the nearest preceding breakpoint and never looks ahead, so the separator
    /// after a unit resolves to that unit. Positions past the end resolve to the last
    /// unit. Returns `None` only for an empty map.
    pub fn resolve(&self, position: usize) -> Option<&SourcePosition> {
        // The first breakpoint is always at 0, so this is only `None` when empty.
        let idx = self
            .breakpoints
            .partition_point(|b| b.char_position <= position)
            .checked_sub(1)?;
        Some(&self.breakpoints[idx].source_position)
    }
}

/// Flattened text together with its offset map.
#[derive(Debug, Clone, Default)]
pub struct Flattened {
    /// The concatenated text.
    pub text: String,
    /// Character-to-source mapping.
    pub map: OffsetMap,
    char_len: usize,
}

impl Flattened {
    /// Length of the text in characters.
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    pub fn is_empty(&self) -> bool {
        self.char_len == 0
    }

    /// Resolve a character index to a source position.
    pub fn resolve(&self, position: usize) -> Option<&SourcePosition> {
        self.map.resolve(position)
    }
}

/// Flatten units into one text stream.
///
/// Unit texts are trimmed and empty units are skipped. Units are joined with
/// [`UNIT_SEPARATOR`], which is counted as part of the preceding unit.
pub fn flatten(units: &[SourceUnit]) -> Flattened {
    let mut text = String::new();
    let mut breakpoints = Vec::with_capacity(units.len());
    let mut char_len = 0usize;

    for unit in units {
        let piece = unit.text.trim();
        if piece.is_empty() {
            continue;
        }

        if !breakpoints.is_empty() {
            text.push(UNIT_SEPARATOR);
            char_len += 1;
        }

        breakpoints.push(Breakpoint {
            char_position: char_len,
            source_position: unit.position.clone(),
        });

        text.push_str(piece);
        char_len += piece.chars().count();
    }

    Flattened {
        text,
        map: OffsetMap { breakpoints },
        char_len,
    }
}
