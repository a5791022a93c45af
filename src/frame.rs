use crate::cluster::{check_adjacency, decode_module, ClusterWord};
use crate::pack::{encode_module, Packer};
use crate::{Config, Error, Result, ERROR_WORD};
use std::{fmt, io, mem};

/// One 64-bit word of module payload, holding two cluster words.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct StripLine(pub u64);

impl StripLine {
    pub const fn upper(self) -> ClusterWord {
        ClusterWord::from_bits((self.0 >> 32) as u32)
    }

    pub const fn lower(self) -> ClusterWord {
        ClusterWord::from_bits(self.0 as u32)
    }

    /// The module ends on this line if either half carries its LAST bit.
    pub const fn ends_module(self) -> bool {
        self.upper().last() || self.lower().last()
    }
}

impl fmt::Debug for StripLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripLine")
            .field("upper", &self.upper())
            .field("lower", &self.lower())
            .field("ends_module", &self.ends_module())
            .finish()
    }
}

/// Streaming frame decoder.
///
/// Header and footer words and module headers are copied through, strip
/// lines are decoded and repacked one module at a time. Output words are
/// written big-endian to `writer`.
pub struct HitProcessor<W> {
    status: FrameStatus,
    config: Config,
    v_size: usize,
    received: usize,
    pending: Vec<ClusterWord>,
    writer: W,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum FrameStatus {
    Header,
    ModuleHeader,
    StripLines,
    Footer,
    Done,
}

impl<W: io::Write> HitProcessor<W> {
    /// Fails with [`Error::InvalidLength`] if `v_size` cannot hold the
    /// header and footer regions.
    pub fn new(writer: W, config: &Config, v_size: usize) -> Result<HitProcessor<W>> {
        match config.min_frame_len() {
            Some(min) if v_size >= min => {}
            _ => {
                return Err(Error::InvalidLength {
                    v_size,
                    header_size: config.header_size,
                    footer_size: config.footer_size,
                })
            }
        }
        let mut processor = HitProcessor {
            status: FrameStatus::Header,
            config: *config,
            v_size,
            received: 0,
            pending: Vec::new(),
            writer,
        };
        if config.header_size == 0 {
            processor.status = processor.next_region();
        }
        trace!("start in {:?}", processor.status);
        Ok(processor)
    }

    fn payload_end(&self) -> usize {
        self.v_size - self.config.footer_size
    }

    /// Region following a completed header or module.
    fn next_region(&self) -> FrameStatus {
        if self.received < self.payload_end() {
            FrameStatus::ModuleHeader
        } else if self.received < self.v_size {
            FrameStatus::Footer
        } else {
            FrameStatus::Done
        }
    }

    /// Fails with [`Error::Overrun`] once all `v_size` words were fed.
    pub fn update(&mut self, word: u64) -> Result<()> {
        self.received += 1;
        trace!("update word 0x{word:016X} in {:?}", self.status);
        match self.status {
            FrameStatus::Header => {
                self.write_word(word)?;
                if self.received == self.config.header_size {
                    self.status = self.next_region();
                    trace!("transit to {:?}", self.status);
                }
            }
            FrameStatus::ModuleHeader => {
                self.write_word(word)?;
                self.status = if self.received < self.payload_end() {
                    FrameStatus::StripLines
                } else {
                    self.next_region()
                };
                trace!("transit to {:?}", self.status);
            }
            FrameStatus::StripLines => {
                let line = StripLine(word);
                for cluster in [line.upper(), line.lower()] {
                    if !cluster.is_empty() {
                        self.pending.push(cluster);
                    }
                }
                if line.ends_module() {
                    self.flush_module()?;
                    self.status = self.next_region();
                    trace!("transit to {:?}", self.status);
                } else if self.received == self.payload_end() {
                    warn!(
                        "module not terminated before footer, flushing {} clusters",
                        self.pending.len()
                    );
                    self.flush_module()?;
                    self.status = self.next_region();
                    trace!("transit to {:?}", self.status);
                }
            }
            FrameStatus::Footer => {
                self.write_word(word)?;
                if self.received == self.v_size {
                    self.status = FrameStatus::Done;
                    trace!("transit to {:?}", self.status);
                }
            }
            FrameStatus::Done => {
                return Err(Error::Overrun {
                    v_size: self.v_size,
                })
            }
        }
        Ok(())
    }

    /// Decode and pack the pending clusters, or emit [`ERROR_WORD`] when
    /// the overlap check rejects the module.
    fn flush_module(&mut self) -> Result<()> {
        let hits = decode_module(mem::take(&mut self.pending));
        if self.config.check_overlap {
            let checked = hits
                .windows(2)
                .try_for_each(|pair| check_adjacency(&pair[0], &pair[1]).map(|_| ()));
            if let Err(err) = checked {
                warn!("module rejected: {err}");
                return self.write_word(ERROR_WORD);
            }
        }
        let records = encode_module(&hits);
        let mut packer = Packer::new(&mut self.writer);
        for record in records {
            packer.update(record)?;
        }
        let words = packer.finalize()?;
        debug!("module flushed: {} hits, {} words", hits.len(), words);
        Ok(())
    }

    #[inline(always)]
    fn write_word(&mut self, word: u64) -> Result<()> {
        self.writer.write_all(&word.to_be_bytes())?;
        Ok(())
    }

    /// Fails with [`Error::Truncated`] if fewer than `v_size` words were fed.
    pub fn finalize(mut self) -> Result<()> {
        if self.status != FrameStatus::Done {
            return Err(Error::Truncated {
                expected: self.v_size,
                received: self.received,
            });
        }
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: io::Write> io::Write for HitProcessor<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !buf.is_empty() && buf.len() < 8 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "HitProcessor only accepts whole 64-bit words",
            ));
        }
        let iter = buf.chunks_exact(8);
        let rem = iter.remainder().len();
        for bytes in iter {
            let mut word = [0u8; 8];
            word.copy_from_slice(bytes);
            self.update(u64::from_be_bytes(word))?;
        }
        Ok(buf.len() - rem)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        if buf.len() % 8 != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "HitProcessor only accepts whole 64-bit words",
            ));
        }
        self.write(buf)?;
        Ok(())
    }
}

/// Decode a whole frame held in memory.
pub fn process_hits(input: &[u64], config: &Config) -> Result<Vec<u64>> {
    let mut out = Vec::with_capacity(input.len() * 8);
    let mut processor = HitProcessor::new(&mut out, config, input.len())?;
    for &word in input {
        processor.update(word)?;
    }
    processor.finalize()?;
    Ok(out
        .chunks_exact(8)
        .map(|bytes| {
            let mut word = [0u8; 8];
            word.copy_from_slice(bytes);
            u64::from_be_bytes(word)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{process_hits, HitProcessor, StripLine};
    use crate::{unpack_words, ClusterWord, Config, Error, ERROR_WORD};
    use std::io::{self, Write};
    use std::sync::Once;

    const TEST_VECTOR: [(&str, &str); 3] = [
        (
            "0101010101010101020202020202020203030303030303030000AAAA0000000A\
             802800AB00000000F1F1F1F1F1F1F1F1F2F2F2F2F2F2F2F2F3F3F3F3F3F3F3F3",
            "0101010101010101020202020202020203030303030303030000AAAA0000000A\
             900500AB00000000F1F1F1F1F1F1F1F1F2F2F2F2F2F2F2F2F3F3F3F3F3F3F3F3",
        ),
        (
            "0101010101010101020202020202020203030303030303030000AAAA00000001\
             005300CD002812340000000080400077000BBBB0000000028C2F004200000000\
             F1F1F1F1F1F1F1F1F2F2F2F2F2F2F2F2F3F3F3F3F3F3F3F3",
            "0101010101010101020202020202020203030303030303030000AAAA00000001\
             100A00CD200C00CD1005123490080077000BBBB000000002C085004200000000\
             F1F1F1F1F1F1F1F1F2F2F2F2F2F2F2F2F3F3F3F3F3F3F3F3",
        ),
        (
            "0101010101010101020202020202020203030303030303030000AAAA0000000A\
             F1F1F1F1F1F1F1F1F2F2F2F2F2F2F2F2F3F3F3F3F3F3F3F3",
            "0101010101010101020202020202020203030303030303030000AAAA0000000A\
             F1F1F1F1F1F1F1F1F2F2F2F2F2F2F2F2F3F3F3F3F3F3F3F3",
        ),
    ];

    static INIT: Once = Once::new();

    /// Setup function that is only run once, even if called multiple times.
    fn setup() {
        INIT.call_once(|| {
            pretty_env_logger::init();
        });
    }

    fn words(hex: &str) -> Vec<u64> {
        hex::decode(hex)
            .unwrap()
            .chunks_exact(8)
            .map(|b| u64::from_be_bytes(b.try_into().unwrap()))
            .collect()
    }

    fn line(upper: ClusterWord, lower: ClusterWord, last: bool) -> u64 {
        (upper.bits() as u64) << 32 | lower.bits() as u64 | (last as u64) << 63
    }

    const HEADER: [u64; 3] = [0x01, 0x02, 0x03];
    const FOOTER: [u64; 3] = [0xF1, 0xF2, 0xF3];

    fn frame(payload: &[u64]) -> Vec<u64> {
        HEADER
            .iter()
            .chain(payload)
            .chain(FOOTER.iter())
            .copied()
            .collect()
    }

    #[test]
    fn test_process_vectors() {
        setup();
        for (input, expected) in TEST_VECTOR.into_iter() {
            let out = process_hits(&words(input), &Config::default()).unwrap();
            assert_eq!(out, words(expected));
        }
    }

    #[test]
    fn test_single_hit() {
        setup();
        let strip = line(ClusterWord::new(5, 0, 0xAB), ClusterWord::default(), true);
        let out = process_hits(&frame(&[0xAAAA, strip]), &Config::default()).unwrap();
        assert_eq!(out.len(), 8);
        assert_eq!(out[3], 0xAAAA);
        let records = unpack_words(&out[4..5]);
        assert_eq!(records.len(), 1);
        let record = records[0];
        assert!(record.last());
        assert!(!record.row());
        assert_eq!(record.n_strips(), 1);
        assert_eq!(record.strip_index(), 5);
        assert_eq!(record.passthrough_id(), 0xAB);
        assert_eq!(out[4] & 0xFFFF_FFFF, 0);
    }

    #[test]
    fn test_split_cluster_fills_one_word() {
        setup();
        let strip = line(ClusterWord::new(10, 3, 0x0C), ClusterWord::default(), true);
        let out = process_hits(&frame(&[0xAAAA, strip]), &Config::default()).unwrap();
        assert_eq!(out, frame(&[0xAAAA, 0x100A_000C_A00C_000C]));
    }

    #[test]
    fn test_invalid_length() {
        setup();
        let config = Config::default();
        match process_hits(&[0; 5], &config) {
            Err(Error::InvalidLength {
                v_size,
                header_size,
                footer_size,
            }) => assert_eq!((v_size, header_size, footer_size), (5, 3, 3)),
            other => panic!("expected invalid length, got {other:?}"),
        }
        assert!(HitProcessor::new(Vec::<u8>::new(), &config, 5).is_err());

        let config = Config {
            header_size: usize::MAX,
            footer_size: 2,
            check_overlap: false,
        };
        assert!(matches!(
            process_hits(&[0; 4], &config),
            Err(Error::InvalidLength {
                v_size: 4,
                header_size: usize::MAX,
                footer_size: 2
            })
        ));
        assert_eq!(process_hits(&[7; 6], &config).unwrap(), [7; 6]);
    }

    #[test]
    fn test_overlap_replaced_by_error_word() {
        setup();
        let config = Config {
            check_overlap: true,
            ..Config::default()
        };
        let bad = line(ClusterWord::new(10, 6, 1), ClusterWord::new(11, 0, 2), true);
        let good = line(ClusterWord::new(20, 0, 3), ClusterWord::new(22, 0, 4), true);
        let input = frame(&[0xAAAA, bad, 0xBBBB, good]);
        let out = process_hits(&input, &config).unwrap();
        assert_eq!(
            out,
            frame(&[0xAAAA, ERROR_WORD, 0xBBBB, 0x1014_0003_9016_0004])
        );

        // unchecked, the same module packs normally
        let out = process_hits(&input, &Config::default()).unwrap();
        assert_eq!(out[4], 0x300A_0001_900B_0002);
    }

    #[test]
    fn test_unterminated_module_flushed_before_footer() {
        setup();
        let strip = line(ClusterWord::new(5, 0, 0xAB), ClusterWord::default(), false);
        let out = process_hits(&frame(&[0xAAAA, strip]), &Config::default()).unwrap();
        assert_eq!(out, frame(&[0xAAAA, 0x9005_00AB_0000_0000]));
    }

    #[test]
    fn test_last_bit_alone_decodes_as_hit() {
        setup();
        let out = process_hits(&frame(&[0xAAAA, 0, 0, 1 << 63, 0xBBBB]), &Config::default());
        assert_eq!(out.unwrap(), frame(&[0xAAAA, 0x9000_0000_0000_0000, 0xBBBB]));
    }

    #[test]
    fn test_module_without_hits() {
        setup();
        let out = process_hits(&frame(&[0xAAAA, 0, 0]), &Config::default()).unwrap();
        assert_eq!(out, frame(&[0xAAAA]));
    }

    #[test]
    fn test_frame_geometry() {
        setup();
        let config = Config {
            header_size: 0,
            footer_size: 1,
            check_overlap: false,
        };
        let strip = line(ClusterWord::new(5, 0, 0xAB), ClusterWord::default(), true);
        let out = process_hits(&[0xAAAA, strip, 0xF1], &config).unwrap();
        assert_eq!(out, [0xAAAA, 0x9005_00AB_0000_0000, 0xF1]);
    }

    #[test]
    fn test_truncated_and_overrun() {
        setup();
        let config = Config::default();
        let mut out: Vec<u8> = vec![];
        let mut processor = HitProcessor::new(&mut out, &config, 6).unwrap();
        for word in 0..5 {
            processor.update(word).unwrap();
        }
        assert!(matches!(
            processor.finalize(),
            Err(Error::Truncated {
                expected: 6,
                received: 5
            })
        ));

        let mut out: Vec<u8> = vec![];
        let mut processor = HitProcessor::new(&mut out, &config, 6).unwrap();
        for word in 0..6 {
            processor.update(word).unwrap();
        }
        assert!(matches!(
            processor.update(6),
            Err(Error::Overrun { v_size: 6 })
        ));
    }

    #[test]
    fn test_io_write() {
        setup();
        let (input, expected) = TEST_VECTOR[1];
        let input = hex::decode(input).unwrap();
        let mut out: Vec<u8> = vec![];
        let mut processor = HitProcessor::new(&mut out, &Config::default(), input.len() / 8).unwrap();
        processor.write_all(&input).unwrap();
        processor.finalize().unwrap();
        assert_eq!(out, hex::decode(expected).unwrap());

        let mut out: Vec<u8> = vec![];
        let mut processor = HitProcessor::new(&mut out, &Config::default(), 6).unwrap();
        let err = processor.write_all(&[0; 12]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        let err = processor.write(&[0; 4]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(processor.write(&[]).unwrap(), 0);
    }

    #[test]
    fn test_strip_line_last() {
        assert!(StripLine(1 << 63).ends_module());
        assert!(StripLine(1 << 31).ends_module());
        assert!(!StripLine(0x7FFF_FFFF_7FFF_FFFF).ends_module());
        let line = StripLine(0x8028_00AB_0000_0000);
        assert!(line.upper().last());
        assert!(!line.lower().last());
        assert_eq!(line.upper().position(), 5);
    }
}
