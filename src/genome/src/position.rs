use std::{hash::{Hash, Hasher}, fmt::{self, Display, Formatter}, str::FromStr, cmp::Ordering, ops::{Add, AddAssign}};

mod error;
use error::ParsePositionError;

/// A 0-based byte offset, either within a contig's reference bytes or within the
/// concatenated output stream a sample iterator produces.
///
/// Generalized from a `u32` newtype to `u64`: a single contig or a multi-sample
/// concatenated haplotype stream can exceed 4 GiB even though individual dictionary
/// rank ids (§C6, `.parse`) stay within `u32`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Position(pub u64);

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Position {
    type Err = ParsePositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse::<u64>()?))
    }
}

impl From<u64> for Position {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Position> for u64 {
    fn from(value: Position) -> Self {
        value.0
    }
}

impl Add<u64> for Position {
    type Output = Position;
    fn add(self, rhs: u64) -> Position {
        Position(self.0 + rhs)
    }
}

impl AddAssign<u64> for Position {
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}

impl Hash for Position {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq<Self> for Position {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Position {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let pos = 139_543_000_001;
        let want = format!("{pos:_^16}");
        let got = format!("{:_^16}", Position(pos));
        assert_eq!(want, got);
    }

    #[test]
    fn ordering() {
        assert!(Position(10) < Position(20));
        assert_eq!(Position(10) + 5, Position(15));
    }

    #[test]
    fn from_str_ok() {
        assert_eq!("42".parse::<Position>().unwrap(), Position(42));
        assert!("nope".parse::<Position>().is_err());
    }
}
