use crate::shape::Shape;
use crate::{Error, Result, POSITION_MASK};
use std::fmt;

/// One 32-bit half of a strip line.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct ClusterWord(u32);

impl ClusterWord {
    pub const fn from_bits(bits: u32) -> ClusterWord {
        ClusterWord(bits)
    }

    pub fn new(position: u16, shape_code: u8, passthrough_id: u16) -> ClusterWord {
        ClusterWord(
            ((position & POSITION_MASK) as u32) << 19
                | ((shape_code & 0b111) as u32) << 16
                | passthrough_id as u32,
        )
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// all-zero words carry no hit
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// MSB of the half, the per-half continuation marker.
    pub const fn last(self) -> bool {
        self.0 >> 31 == 1
    }

    pub const fn position(self) -> u16 {
        ((self.0 >> 19) as u16) & POSITION_MASK
    }

    pub const fn shape_code(self) -> u8 {
        ((self.0 >> 16) & 0b111) as u8
    }

    pub const fn passthrough_id(self) -> u16 {
        self.0 as u16
    }
}

impl fmt::Debug for ClusterWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterWord")
            .field("bits", &format!("{:08X}", self.0))
            .field("position", &self.position())
            .field("shape_code", &self.shape_code())
            .field("passthrough_id", &format!("{:04X}", self.passthrough_id()))
            .finish()
    }
}

/// A single hit expanded from a cluster word.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DecodedHit {
    /// raw chip/strip address, 12 bits
    pub position: u16,
    /// number of contiguous strips, 1..=4
    pub size: u8,
    pub passthrough_id: u16,
}

/// Expand one cluster word into its primary hit and, for split shapes, a
/// secondary hit. Secondary positions wrap within the 12-bit position field.
#[inline(always)]
pub fn decode_cluster(word: ClusterWord) -> (DecodedHit, Option<DecodedHit>) {
    let position = word.position();
    let passthrough_id = word.passthrough_id();
    let shape = Shape::from_code(word.shape_code());
    let primary = DecodedHit {
        position,
        size: shape.primary_size,
        passthrough_id,
    };
    let secondary = shape.secondary.map(|secondary| DecodedHit {
        position: (position + secondary.offset) & POSITION_MASK,
        size: secondary.size,
        passthrough_id,
    });
    trace!("decode {word:?} -> {primary:?}, {secondary:?}");
    (primary, secondary)
}

/// Decode a module's pending clusters in order, primary before secondary.
pub fn decode_module(queue: Vec<ClusterWord>) -> Vec<DecodedHit> {
    let capacity = queue
        .iter()
        .filter(|word| !word.is_empty())
        .map(|word| Shape::from_code(word.shape_code()).hit_count())
        .sum();
    let mut hits = Vec::with_capacity(capacity);
    for word in queue {
        if word.is_empty() {
            trace!("skip empty cluster word");
            continue;
        }
        let (primary, secondary) = decode_cluster(word);
        hits.push(primary);
        hits.extend(secondary);
    }
    hits
}

/// Check whether `second` starts exactly where `first` ends.
///
/// Returns `Ok(false)` when there is a gap between the two hits, and
/// [`Error::OverlapDetected`] when `first` reaches past the start of `second`.
pub fn check_adjacency(first: &DecodedHit, second: &DecodedHit) -> Result<bool> {
    let end = first.position + first.size as u16;
    if end > second.position {
        return Err(Error::OverlapDetected {
            first_position: first.position,
            first_size: first.size,
            second_position: second.position,
        });
    }
    Ok(end == second.position)
}
