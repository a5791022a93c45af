use crate::cluster::DecodedHit;
use crate::unroll::unroll;
use std::{fmt, io};

/// 32-bit output record, see the crate docs for the layout.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct EncodedRecord(u32);

impl EncodedRecord {
    pub const fn from_bits(bits: u32) -> EncodedRecord {
        EncodedRecord(bits)
    }

    /// Build the record for `hit`. Only the low 2 bits of the hit size are
    /// kept, so a 4-strip hit encodes as `n_strips == 0`.
    pub fn encode(hit: &DecodedHit, last: bool) -> EncodedRecord {
        let address = unroll(hit.position);
        let n_strips = hit.size & 0b11;
        EncodedRecord(
            (last as u32) << 31
                | (address.row as u32) << 30
                | (n_strips as u32) << 28
                | ((address.strip_index & 0xFFF) as u32) << 16
                | hit.passthrough_id as u32,
        )
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn last(self) -> bool {
        self.0 >> 31 == 1
    }

    pub const fn row(self) -> bool {
        (self.0 >> 30) & 1 == 1
    }

    pub const fn n_strips(self) -> u8 {
        ((self.0 >> 28) & 0b11) as u8
    }

    pub const fn strip_index(self) -> u16 {
        ((self.0 >> 16) & 0xFFF) as u16
    }

    pub const fn passthrough_id(self) -> u16 {
        self.0 as u16
    }
}

impl fmt::Debug for EncodedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedRecord")
            .field("last", &self.last())
            .field("row", &self.row())
            .field("n_strips", &self.n_strips())
            .field("strip_index", &self.strip_index())
            .field("passthrough_id", &format!("{:04X}", self.passthrough_id()))
            .finish()
    }
}

/// Encode a module's hits in order, marking the final one as `last`.
pub fn encode_module(hits: &[DecodedHit]) -> Vec<EncodedRecord> {
    let count = hits.len();
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            let record = EncodedRecord::encode(hit, i + 1 == count);
            trace!("encode {hit:?} -> {record:?}");
            record
        })
        .collect()
}

/// Packs records two per 64-bit word and writes each word big-endian.
pub struct Packer<W> {
    upper: Option<EncodedRecord>,
    words: usize,
    writer: W,
}

impl<W: io::Write> Packer<W> {
    pub fn new(writer: W) -> Packer<W> {
        Packer {
            upper: None,
            words: 0,
            writer,
        }
    }

    #[inline(always)]
    pub fn update(&mut self, record: EncodedRecord) -> io::Result<()> {
        match self.upper.take() {
            None => self.upper = Some(record),
            Some(upper) => {
                let word = (upper.bits() as u64) << 32 | record.bits() as u64;
                self.write_word(word)?;
            }
        }
        Ok(())
    }

    #[inline(always)]
    fn write_word(&mut self, word: u64) -> io::Result<()> {
        trace!("pack: 0x{word:016X}");
        self.writer.write_all(&word.to_be_bytes())?;
        self.words += 1;
        Ok(())
    }

    /// Flush an unpaired trailing record into the upper half of a final word.
    ///
    /// Returns the number of words written.
    pub fn finalize(mut self) -> io::Result<usize> {
        if let Some(upper) = self.upper.take() {
            let word = (upper.bits() as u64) << 32;
            if word != 0 {
                self.write_word(word)?;
            }
        }
        Ok(self.words)
    }
}

/// Recover the record sequence of one module from its packed words.
///
/// Only the lower half of the final word may be padding.
pub fn unpack_words(words: &[u64]) -> Vec<EncodedRecord> {
    let mut records = Vec::with_capacity(words.len() * 2);
    for (i, word) in words.iter().enumerate() {
        records.push(EncodedRecord((word >> 32) as u32));
        let lower = *word as u32;
        if lower != 0 || i + 1 != words.len() {
            records.push(EncodedRecord(lower));
        }
    }
    records
}
