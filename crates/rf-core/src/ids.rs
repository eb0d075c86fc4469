use core::fmt;
use core::num::NonZeroU32;

/// Compact, stable identifier for model objects (cells, wells).
///
/// - `u32` keeps memory small
/// - `NonZero` enables `Option<Id>` to be pointer-optimized
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(NonZeroU32);

impl Id {
    /// Create an Id from a 0-based index by storing index+1.
    pub fn from_index(index: u32) -> Self {
        Self(NonZeroU32::MIN.saturating_add(index))
    }

    /// Recover the 0-based index.
    pub fn index(self) -> u32 {
        self.0.get() - 1
    }

    /// 0-based index as `usize`, for slice access.
    pub fn slot(self) -> usize {
        self.index() as usize
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.index())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Domain-specific ID aliases for clarity (no runtime cost).
pub type CellId = Id;
pub type WellId = Id;

/// Ordered identifier of a development phase (control period).
///
/// Numbered from 1 and strictly increasing without gaps, so the period with
/// id `n` lives at position `n - 1` of the model's period list.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct PeriodId(NonZeroU32);

impl PeriodId {
    /// First development phase.
    pub const FIRST: PeriodId = PeriodId(NonZeroU32::MIN);

    /// Build from a 1-based period number; `None` for zero.
    pub fn new(number: u32) -> Option<Self> {
        NonZeroU32::new(number).map(Self)
    }

    /// 1-based period number.
    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// Position of this period in a 0-based list.
    pub fn position(self) -> usize {
        (self.0.get() - 1) as usize
    }

    /// The id following this one.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Debug for PeriodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeriodId({})", self.get())
    }
}

impl fmt::Display for PeriodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_round_trip_index() {
        for i in [0_u32, 1, 2, 42, 10_000] {
            let id = Id::from_index(i);
            assert_eq!(id.index(), i);
            assert_eq!(id.slot(), i as usize);
        }
    }

    #[test]
    fn option_id_is_small() {
        assert_eq!(
            core::mem::size_of::<Id>(),
            core::mem::size_of::<Option<Id>>()
        );
    }

    #[test]
    fn period_ids_are_one_based() {
        assert!(PeriodId::new(0).is_none());
        let p1 = PeriodId::new(1).unwrap();
        assert_eq!(p1, PeriodId::FIRST);
        assert_eq!(p1.position(), 0);
        assert_eq!(p1.next().get(), 2);
        assert!(p1 < p1.next());
    }
}
