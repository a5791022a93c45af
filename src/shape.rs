/// Expansion rule selected by a cluster's 3-bit shape code.
///
/// ```text
/// code  primary  secondary
///  0       1        -
///  1       1      +3, 1
///  2       1      +2, 1
///  3       1      +2, 2
///  4       2        -
///  5       2      +3, 1
///  6       3        -
///  7       4        -
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Shape {
    pub primary_size: u8,
    pub secondary: Option<Secondary>,
}

/// Second hit of a split cluster, relative to the cluster position.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Secondary {
    pub offset: u16,
    pub size: u8,
}

impl Shape {
    /// Only the low 3 bits of `code` are used.
    #[inline(always)]
    pub fn from_code(code: u8) -> Shape {
        let (primary_size, secondary) = match code & 0b111 {
            0 => (1, None),
            1 => (1, Some((3, 1))),
            2 => (1, Some((2, 1))),
            3 => (1, Some((2, 2))),
            4 => (2, None),
            5 => (2, Some((3, 1))),
            6 => (3, None),
            _ => (4, None),
        };
        Shape {
            primary_size,
            secondary: secondary.map(|(offset, size)| Secondary { offset, size }),
        }
    }

    pub fn hit_count(&self) -> usize {
        1 + self.secondary.is_some() as usize
    }
}
