use crate::{POSITION_MASK, STRIPS_PER_ROW};

/// Linear sensor address of a raw chip/strip position.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct StripAddress {
    pub strip_index: u16,
    pub row: bool,
}

/// Unroll a 12-bit position `CCCC SSSS SSSS` (chip, strip) into a strip index.
///
/// Strips 128..=255 of a chip belong to the second row and fold back onto
/// the same index range as strips 0..=127.
#[inline(always)]
pub fn unroll(position: u16) -> StripAddress {
    let position = position & POSITION_MASK;
    let chip_id = position >> 8;
    let strip_id = position & 0xFF;
    let row = strip_id >= STRIPS_PER_ROW;
    let strip_index = (strip_id % STRIPS_PER_ROW) + chip_id * STRIPS_PER_ROW;
    StripAddress { strip_index, row }
}
