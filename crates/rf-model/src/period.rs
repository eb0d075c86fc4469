//! Development phases (control periods).

use rf_core::PeriodId;

use crate::well::WellControl;

/// The well set and targets active during one development phase.
///
/// Built once by the model builder; never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlPeriod {
    id: PeriodId,
    producers: Vec<WellControl>,
    injectors: Vec<WellControl>,
}

impl ControlPeriod {
    /// Split `wells` into producers and injectors, preserving declaration order.
    pub(crate) fn new(id: PeriodId, wells: Vec<WellControl>) -> Self {
        let (producers, injectors) = wells.into_iter().partition(WellControl::is_producer);
        Self {
            id,
            producers,
            injectors,
        }
    }

    pub fn id(&self) -> PeriodId {
        self.id
    }

    pub fn producers(&self) -> &[WellControl] {
        &self.producers
    }

    pub fn injectors(&self) -> &[WellControl] {
        &self.injectors
    }

    /// Producers first, then injectors.
    pub fn active_wells(&self) -> impl Iterator<Item = &WellControl> {
        self.producers.iter().chain(self.injectors.iter())
    }

    pub fn well_count(&self) -> usize {
        self.producers.len() + self.injectors.len()
    }

    /// No active wells: the reservoir is closed for this period.
    pub fn is_shut_in(&self) -> bool {
        self.well_count() == 0
    }
}
