use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("frame of {v_size} words cannot hold {header_size} header and {footer_size} footer words")]
    InvalidLength {
        v_size: usize,
        header_size: usize,
        footer_size: usize,
    },

    /// Recoverable: the module is replaced by [`crate::ERROR_WORD`].
    #[error("hit at {first_position} (size {first_size}) overlaps hit at {second_position}")]
    OverlapDetected {
        first_position: u16,
        first_size: u8,
        second_position: u16,
    },

    #[error("frame truncated: expected {expected} words, received {received}")]
    Truncated { expected: usize, received: usize },

    #[error("frame overrun: more than {v_size} words fed")]
    Overrun { v_size: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        match err {
            Error::Io(err) => err,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
