//! Opaque tag bitsets and the quality gate derived from them.
//!
//! Images carry two bitsets: `ctags` (content tags) and `rtags`
//! (rights/review tags). Both are opaque to this pipeline except for
//! the quality tri-state encoded in the two highest-order bits of the
//! low byte of `rtags`.

use serde::{Deserialize, Serialize};

/// Quality tri-state read from a tag bitset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    /// `00` -- content is fine, show it.
    Ok,
    /// `01` -- deprecated but still shown.
    Deprecated,
    /// `10` -- hidden from readers.
    Hidden,
}

/// An opaque tag bitset stored as an INTEGER column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagBits(pub i32);

/// Mask covering the two highest-order bits of the low byte.
const QUALITY_MASK: i32 = 0xC0;

/// Quality bit meaning "deprecated" (low-byte bit 6).
pub const QUALITY_DEPRECATED: i32 = 0x40;

/// Quality bit meaning "hidden" (low-byte bit 7).
pub const QUALITY_HIDDEN: i32 = 0x80;

impl TagBits {
    /// Read the quality tri-state from the high bits of the low byte.
    ///
    /// The `11` combination has no observed meaning upstream; it is
    /// treated as [`Quality::Hidden`] pending clarification.
    pub fn quality(self) -> Quality {
        match self.0 & QUALITY_MASK {
            0 => Quality::Ok,
            QUALITY_DEPRECATED => Quality::Deprecated,
            _ => Quality::Hidden,
        }
    }

    /// Whether readers should be shown an image carrying this bitset.
    pub fn img_show(self) -> bool {
        !matches!(self.quality(), Quality::Hidden)
    }

    pub fn has(self, tag: i32) -> bool {
        self.0 & tag == tag
    }

    #[must_use]
    pub fn with(self, tag: i32) -> Self {
        Self(self.0 | tag)
    }

    #[must_use]
    pub fn without(self, tag: i32) -> Self {
        Self(self.0 & !tag)
    }
}

impl From<i32> for TagBits {
    fn from(bits: i32) -> Self {
        Self(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_truth_table() {
        assert_eq!(TagBits(0).quality(), Quality::Ok);
        assert_eq!(TagBits(QUALITY_DEPRECATED).quality(), Quality::Deprecated);
        assert_eq!(TagBits(QUALITY_HIDDEN).quality(), Quality::Hidden);
        // Unobserved fourth combination: assumed hidden.
        assert_eq!(
            TagBits(QUALITY_DEPRECATED | QUALITY_HIDDEN).quality(),
            Quality::Hidden
        );
    }

    #[test]
    fn img_show_gate() {
        assert!(TagBits(0).img_show());
        assert!(TagBits(QUALITY_DEPRECATED).img_show());
        assert!(!TagBits(QUALITY_HIDDEN).img_show());
        assert!(!TagBits(QUALITY_DEPRECATED | QUALITY_HIDDEN).img_show());
    }

    #[test]
    fn low_bits_do_not_affect_quality() {
        assert_eq!(TagBits(0x3F).quality(), Quality::Ok);
        assert!(TagBits(0x3F).img_show());
    }

    #[test]
    fn bit_helpers() {
        let bits = TagBits(0).with(0x04).with(0x10);
        assert!(bits.has(0x04));
        assert!(!bits.has(0x08));
        assert!(!bits.without(0x04).has(0x04));
    }
}
