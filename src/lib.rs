//! # Strip Line Layout
//!
//! The input is a sequence of 64-bit words:
//!
//! ```text
//! ┌────────────┬───────────────┬────────────┬─────┬───────────────┬────────────┐
//! │ header × H │ module header │ strip line │ ... │ module header │ footer × F │
//! └────────────┴───────────────┴────────────┴─────┴───────────────┴────────────┘
//! ```
//!
//! A strip line carries two cluster words, one in each 32-bit half:
//!
//! ```text
//!          63        32 31         0
//!           │          │ │          │
//!           ▼          ▼ ▼          ▼
//!          [ cluster 0 ] [ cluster 1 ]
//! ```
//!
//! # Cluster Word
//!
//! ```text
//!          MSB                                       LSB
//!           │                                         │
//!           ▼                                         ▼
//!           L PPPP PPPP PPPP SSS   IIII IIII IIII IIII
//!           ▲ └─ position ─┘ └┴─ shape code
//!  LAST ────┘                      └─ passthrough id ─┘
//! ```
//!
//! A cluster word of all zeros carries no hit and is dropped.
//! The module ends on the strip line where either half has its LAST bit set.
//!
//! The 3-bit shape code expands a cluster into one or two hits, see [`Shape`].
//!
//! # Encoded Record
//!
//! ```text
//!          MSB                                       LSB
//!           │                                         │
//!           ▼                                         ▼
//!           L R NN XXXX XXXX XXXX   IIII IIII IIII IIII
//!           ▲ ▲ ▲  └ strip index ┘  └─ passthrough id ─┘
//!  LAST ────┘ │ └─ strips (size, truncated to 2 bits)
//!       ROW ──┘
//! ```
//!
//! Records are packed two per output word, the first one in the upper half.
//! An odd trailing record leaves the lower half zero.
//!
//! A module that fails the overlap check is replaced by [`ERROR_WORD`].

#[macro_use]
extern crate log;

mod cluster;
mod config;
mod error;
mod frame;
mod pack;
mod shape;
mod unroll;

pub use cluster::{check_adjacency, decode_cluster, decode_module, ClusterWord, DecodedHit};
pub use config::Config;
pub use error::{Error, Result};
pub use frame::{process_hits, HitProcessor, StripLine};
pub use pack::{encode_module, unpack_words, EncodedRecord, Packer};
pub use shape::{Secondary, Shape};
pub use unroll::{unroll, StripAddress};

/// emitted in place of a module's records when its hits overlap
pub const ERROR_WORD: u64 = 0xFFFF_FFFF_FFFF_FFFF;

const POSITION_MASK: u16 = 0xFFF;
const STRIPS_PER_ROW: u16 = 128;
