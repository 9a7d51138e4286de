//! Small shared value types: resolutions, query units, and orientation.

/// Base pairs per bin at a given resolution level. Only strictly positive,
/// stored resolutions are represented by this type; base-pair quantities are
/// tracked separately (see [`QueryUnit::Bp`]) rather than through a
/// synthetic zero resolution.
pub type Resolution = u32;

/// The unit a position or length is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryUnit {
    Bp,
    Bins,
    Pixels,
}

/// Orientation of a contig, or of a stripe slice within an ATU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Reversed,
}

impl Direction {
    pub fn flipped(self) -> Self {
        match self {
            Direction::Forward => Direction::Reversed,
            Direction::Reversed => Direction::Forward,
        }
    }

    pub fn flip_in_place(&mut self) {
        *self = self.flipped();
    }

    pub fn xor(self, other: Direction) -> Direction {
        if self == other {
            Direction::Forward
        } else {
            Direction::Reversed
        }
    }
}

/// A position expressed both in base pairs and, optionally, in bins/pixels
/// at some resolution — the return shape of `get_px_by_bp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasePairInPixelPosition {
    pub bp: u64,
    pub bins: u64,
    pub pixels: u64,
}
