use serde::{Deserialize, Serialize};

/// Frame geometry and decoding options.
///
/// Usually built once at the application boundary (JSON, YAML, ...) and
/// handed to [`crate::HitProcessor`] by reference.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default, rename_all = "snake_case")]
pub struct Config {
    /// words copied verbatim before the first module
    pub header_size: usize,
    /// words copied verbatim after the last module
    pub footer_size: usize,
    /// Run the adjacency check on consecutive hits of a module and replace
    /// the module with [`crate::ERROR_WORD`] when two hits overlap.
    pub check_overlap: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            header_size: 3,
            footer_size: 3,
            check_overlap: false,
        }
    }
}

impl Config {
    /// Smallest frame that can hold the header and footer regions, `None`
    /// if no frame length can.
    pub fn min_frame_len(&self) -> Option<usize> {
        self.header_size.checked_add(self.footer_size)
    }
}
