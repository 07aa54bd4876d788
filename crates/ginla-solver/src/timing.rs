//! Optional per-phase profiling of the Krylov iterations.
//!
//! Solvers report elapsed time to a [`TimingSink`]. The default sink is
//! [`NullTimer`], which discards everything.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Phases of a MINRES iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Setup,
    ApplyOperator,
    Lanczos,
    Reorthogonalize,
    ApplyPreconditioner,
    ExtendBasis,
    StoreBasis,
    ImplicitQr,
    UpdateSolution,
    UpdateResidual,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::ApplyOperator => "apply Ml*A*Mr",
            Self::Lanczos => "Lanczos",
            Self::Reorthogonalize => "reortho",
            Self::ApplyPreconditioner => "apply prec",
            Self::ExtendBasis => "extend Krylov",
            Self::StoreBasis => "construct full basis",
            Self::ImplicitQr => "implicit QR",
            Self::UpdateSolution => "update solution",
            Self::UpdateResidual => "update residual",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Receiver of phase timings.
pub trait TimingSink {
    fn record(&self, phase: Phase, elapsed: Duration);
}

/// Discards all timings.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTimer;

impl TimingSink for NullTimer {
    fn record(&self, _phase: Phase, _elapsed: Duration) {}
}

/// Accumulated time and sample count of one phase.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseStats {
    pub total: Duration,
    pub count: usize,
}

/// Accumulates time per phase.
#[derive(Debug, Default)]
pub struct PhaseTimer {
    stats: RefCell<BTreeMap<Phase, PhaseStats>>,
}

impl PhaseTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, phase: Phase) -> Option<PhaseStats> {
        self.stats.borrow().get(&phase).copied()
    }

    /// Snapshot of all recorded phases, ordered by phase.
    pub fn summary(&self) -> Vec<(Phase, PhaseStats)> {
        self.stats.borrow().iter().map(|(&p, &s)| (p, s)).collect()
    }
}

impl TimingSink for PhaseTimer {
    fn record(&self, phase: Phase, elapsed: Duration) {
        let mut stats = self.stats.borrow_mut();
        let entry = stats.entry(phase).or_default();
        entry.total += elapsed;
        entry.count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_timer_accumulates() {
        let timer = PhaseTimer::new();
        timer.record(Phase::Lanczos, Duration::from_millis(2));
        timer.record(Phase::Lanczos, Duration::from_millis(3));
        timer.record(Phase::Setup, Duration::from_millis(1));

        let lanczos = timer.get(Phase::Lanczos).unwrap();
        assert_eq!(lanczos.count, 2);
        assert_eq!(lanczos.total, Duration::from_millis(5));
        assert_eq!(timer.summary()[0].0, Phase::Setup);
        assert!(timer.get(Phase::ImplicitQr).is_none());
    }

    #[test]
    fn null_timer_is_a_sink() {
        let sink: &dyn TimingSink = &NullTimer;
        sink.record(Phase::Setup, Duration::from_secs(1));
    }
}
