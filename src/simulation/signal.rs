//! Traffic signal scheduling
//!
//! A signal is a cyclic list of phases declared at one coordinate. The
//! active phase is a pure function of the pattern and the simulated time,
//! so nothing here is mutated while the simulation runs.
//!
//! Two views are kept apart. Gating always asks the coordinate that declares
//! the pattern. The render projection spreads each signal's general colour
//! over its 3x3 block for display and is never consulted by vehicles.

use log::warn;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use super::types::Cell;

/// Direction token carrying the general (through traffic) colour
pub const GENERAL_TOKEN: &str = "N";

/// Direction token of a dedicated left-turn arrow
pub const LEFT_TURN_TOKEN: &str = "L";

/// Colour shown by a signal for one direction token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalColor {
    Red,
    Yellow,
    Green,
}

impl SignalColor {
    pub fn from_name(name: &str) -> Option<SignalColor> {
        match name.trim().to_ascii_lowercase().as_str() {
            "red" => Some(SignalColor::Red),
            "yellow" => Some(SignalColor::Yellow),
            "green" => Some(SignalColor::Green),
            _ => None,
        }
    }

    /// Green or yellow
    pub fn permits_entry(&self) -> bool {
        matches!(self, SignalColor::Green | SignalColor::Yellow)
    }
}

impl fmt::Display for SignalColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalColor::Red => "red",
            SignalColor::Yellow => "yellow",
            SignalColor::Green => "green",
        };
        f.write_str(name)
    }
}

/// One time-bounded segment of a signal cycle
#[derive(Debug, Clone, PartialEq)]
pub struct SignalPhase {
    colors: Vec<(String, SignalColor)>,
    pub duration_secs: u32,
}

impl SignalPhase {
    pub fn new(colors: Vec<(String, SignalColor)>, duration_secs: u32) -> Self {
        Self {
            colors,
            duration_secs,
        }
    }

    /// Parse a `;`-joined list of `direction-color` tokens such as
    /// `N-green;L-red`. Tokens that do not parse are dropped.
    pub fn parse(descriptor: &str, duration_secs: u32) -> Self {
        let colors = descriptor
            .split(';')
            .filter_map(|token| {
                let (direction, color) = token.split_once('-')?;
                let color = SignalColor::from_name(color)?;
                Some((direction.trim().to_string(), color))
            })
            .collect();
        Self::new(colors, duration_secs)
    }

    pub fn color_of(&self, token: &str) -> Option<SignalColor> {
        self.colors
            .iter()
            .find(|(direction, _)| direction == token)
            .map(|(_, color)| *color)
    }

    /// Colour of the general direction slot; a phase without one reads red
    pub fn general_color(&self) -> SignalColor {
        self.color_of(GENERAL_TOKEN).unwrap_or(SignalColor::Red)
    }

    fn has_left_arrow(&self) -> bool {
        self.color_of(LEFT_TURN_TOKEN)
            .is_some_and(|color| color.permits_entry())
    }
}

/// Time-driven phase evaluator for every signalised coordinate
#[derive(Debug, Clone, Default)]
pub struct SignalScheduler {
    patterns: BTreeMap<Cell, Vec<SignalPhase>>,

    /// Signals with at least one phase showing a green or yellow left arrow
    protected_left: BTreeSet<Cell>,
}

impl SignalScheduler {
    pub fn new(patterns: BTreeMap<Cell, Vec<SignalPhase>>) -> Self {
        for (cell, phases) in &patterns {
            if cycle_length(phases) == 0 {
                warn!("Signal at {} has a zero-length cycle; treating it as unsignaled", cell);
            }
        }

        let protected_left = patterns
            .iter()
            .filter(|(_, phases)| phases.iter().any(SignalPhase::has_left_arrow))
            .map(|(cell, _)| *cell)
            .collect();

        Self {
            patterns,
            protected_left,
        }
    }

    /// Coordinates that declare a pattern with a non-zero cycle
    pub fn signal_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.patterns
            .iter()
            .filter(|(_, phases)| cycle_length(phases) > 0)
            .map(|(cell, _)| *cell)
    }

    pub fn is_signaled(&self, cell: Cell) -> bool {
        self.cycle_length(cell).is_some_and(|length| length > 0)
    }

    pub fn cycle_length(&self, cell: Cell) -> Option<u64> {
        self.patterns.get(&cell).map(|phases| cycle_length(phases))
    }

    /// The phase in force at `now` (seconds) for the signal at `cell`
    pub fn active_phase(&self, cell: Cell, now: f64) -> Option<&SignalPhase> {
        let phases = self.patterns.get(&cell)?;
        let total = cycle_length(phases);
        if total == 0 {
            return None;
        }

        let offset = now.rem_euclid(total as f64);
        let mut start = 0.0;
        for phase in phases {
            let end = start + phase.duration_secs as f64;
            if offset >= start && offset < end {
                return Some(phase);
            }
            start = end;
        }

        // Only reachable through float rounding at the very end of the cycle
        phases.iter().rev().find(|phase| phase.duration_secs > 0)
    }

    /// General colour of the signal declared at exactly `cell`, or `None`
    /// when `cell` carries no signal
    pub fn active_state(&self, cell: Cell, now: f64) -> Option<SignalColor> {
        self.active_phase(cell, now).map(SignalPhase::general_color)
    }

    /// Whether the signal at `cell` ever gives a dedicated left-turn arrow
    pub fn has_protected_left(&self, cell: Cell) -> bool {
        self.protected_left.contains(&cell)
    }

    /// The signal that controls entry into `cell`: the cell itself when it
    /// declares a pattern, otherwise the first signalised coordinate of its
    /// 3x3 neighbourhood in row-major order.
    pub fn governing_signal(&self, cell: Cell) -> Option<Cell> {
        if self.is_signaled(cell) {
            return Some(cell);
        }
        (-1..=1)
            .flat_map(|d_row| (-1..=1).filter_map(move |d_col| cell.offset(d_row, d_col)))
            .find(|candidate| self.is_signaled(*candidate))
    }

    /// Evaluate every signal once for a whole tick
    pub fn snapshot(&self, now: f64) -> SignalSnapshot<'_> {
        let colors = self
            .signal_cells()
            .filter_map(|cell| Some((cell, self.active_state(cell, now)?)))
            .collect();

        SignalSnapshot {
            scheduler: self,
            now,
            colors,
        }
    }

    /// Display-only projection: each signal's general colour painted over
    /// its 3x3 block. Overlapping blocks take the later signal's colour.
    pub fn render_projection(&self, now: f64) -> BTreeMap<Cell, SignalColor> {
        let mut projection = BTreeMap::new();
        for cell in self.signal_cells() {
            if let Some(color) = self.active_state(cell, now) {
                for d_row in -1..=1 {
                    for d_col in -1..=1 {
                        if let Some(block_cell) = cell.offset(d_row, d_col) {
                            projection.insert(block_cell, color);
                        }
                    }
                }
            }
        }
        projection
    }
}

/// Total cycle time in seconds, saturating at `u64::MAX`
fn cycle_length(phases: &[SignalPhase]) -> u64 {
    phases
        .iter()
        .fold(0u64, |total, phase| total.saturating_add(u64::from(phase.duration_secs)))
}

/// Signal colours frozen at one instant, shared by every vehicle in a tick
#[derive(Debug, Clone)]
pub struct SignalSnapshot<'a> {
    scheduler: &'a SignalScheduler,
    now: f64,
    colors: HashMap<Cell, SignalColor>,
}

impl SignalSnapshot<'_> {
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Colour at a signal-bearing coordinate
    pub fn color_at(&self, signal: Cell) -> Option<SignalColor> {
        self.colors.get(&signal).copied()
    }

    /// Colour of the signal governing entry into `cell`, `None` if unsignaled
    pub fn governing_color(&self, cell: Cell) -> Option<SignalColor> {
        self.scheduler
            .governing_signal(cell)
            .and_then(|signal| self.color_at(signal))
    }

    /// Whether the signal governing `cell` has a protected left phase
    pub fn governing_has_protected_left(&self, cell: Cell) -> bool {
        self.scheduler
            .governing_signal(cell)
            .is_some_and(|signal| self.scheduler.has_protected_left(signal))
    }
}
