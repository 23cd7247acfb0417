//! Wall-clock instrumentation of the frequency sweeps, enabled with the
//! `timing` feature. Without it every function here compiles to a no-op.

#![allow(unused)]
use std::cell::RefCell;
use std::time::{Duration, Instant};

/// Part of a frequency sweep being timed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SweepPhase {
    /// Assembly and factorization of A or Aᵗ at every frequency.
    Factorization,
    /// Back-substitutions at every frequency.
    Solve,
}

#[derive(Default, Clone)]
pub struct TimingStats {
    pub factorization_sweeps: Vec<Duration>,
    pub solve_sweeps: Vec<Duration>,
}

impl TimingStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, phase: SweepPhase, elapsed: Duration) {
        match phase {
            SweepPhase::Factorization => self.factorization_sweeps.push(elapsed),
            SweepPhase::Solve => self.solve_sweeps.push(elapsed),
        }
    }

    #[cfg(feature = "timing")]
    pub fn print_summary(&self) {
        if self.factorization_sweeps.is_empty() && self.solve_sweeps.is_empty() {
            return;
        }

        println!("\n{}", "=".repeat(60));
        println!("{:^60}", "FREQUENCY SWEEP TIMING SUMMARY");
        println!("{}", "=".repeat(60));
        for (label, sweeps) in [
            ("Assembly + factorization", &self.factorization_sweeps),
            ("Solves", &self.solve_sweeps),
        ] {
            let total: Duration = sweeps.iter().sum();
            let ms = total.as_secs_f64() * 1000.0;
            println!(
                "  {:<26} {:>9.3}ms  ({} sweeps, avg: {:>9.3}ms)",
                label,
                ms,
                sweeps.len(),
                ms / sweeps.len().max(1) as f64
            );
        }
        println!("{}\n", "=".repeat(60));
    }

    #[cfg(not(feature = "timing"))]
    pub fn print_summary(&self) {}
}

#[cfg(feature = "timing")]
thread_local! {
    static SWEEP_STATS: RefCell<TimingStats> = RefCell::new(TimingStats::new());
}

/// Run `f`, charging its duration to `phase`.
#[cfg(feature = "timing")]
pub fn record<R>(phase: SweepPhase, f: impl FnOnce() -> R) -> R {
    let start = Instant::now();
    let result = f();
    let elapsed = start.elapsed();
    SWEEP_STATS.with(|stats| stats.borrow_mut().push(phase, elapsed));
    result
}

#[cfg(not(feature = "timing"))]
#[inline]
pub fn record<R>(_phase: SweepPhase, f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(feature = "timing")]
pub fn reset_timing() {
    SWEEP_STATS.with(|stats| *stats.borrow_mut() = TimingStats::new());
}

#[cfg(not(feature = "timing"))]
pub fn reset_timing() {}

#[cfg(feature = "timing")]
pub fn print_timing() {
    SWEEP_STATS.with(|stats| stats.borrow().print_summary());
}

#[cfg(not(feature = "timing"))]
pub fn print_timing() {}
