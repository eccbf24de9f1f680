//! Successor-generation rule engine.
//!
//! [`RuleEngine::step`] reads the whole current generation and writes its
//! successor into a separate buffer. No cell's new value is visible while
//! the step runs, so every neighbor count sees the same generation.
//!
//! The grid is finite: neighbors outside the bounds are simply not counted
//! (a corner cell has 3 neighbors, an edge cell 5, an interior cell 8).
//!
//! Rule variants are a [`RulePolicy`] value rather than a type hierarchy.
//! [`RulePolicy::Conway`] is the classic four-rule automaton; any other
//! outer-totalistic rule can be written in `B/S` notation and parsed with
//! [`RulePolicy::from_notation`].

use std::fmt;
use std::str::FromStr;

use lifegrid_types::GridState;
use serde::{Deserialize, Serialize};

/// All 8 offsets: N, S, W, E, NW, NE, SW, SE.
const OFFSETS_8: [(isize, isize); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
    (1, 1),
];

/// Highest possible live-neighbor count.
pub const MAX_NEIGHBORS: u8 = 8;

/// Birth mask of Conway's rule (`B3`).
const CONWAY_BIRTH: u16 = 0b0_0000_1000;

/// Survival mask of Conway's rule (`S23`).
const CONWAY_SURVIVAL: u16 = 0b0_0000_1100;

/// Errors raised by the rule engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// The output buffer does not have the shape of the input generation.
    #[error(
        "buffer shape mismatch: current is {current_width}x{current_height}, \
         next is {next_width}x{next_height}"
    )]
    ShapeMismatch {
        /// Width of the current generation.
        current_width: usize,
        /// Height of the current generation.
        current_height: usize,
        /// Width of the output buffer.
        next_width: usize,
        /// Height of the output buffer.
        next_height: usize,
    },

    /// A rule string could not be parsed.
    #[error("invalid rule notation {notation:?}: {reason}")]
    InvalidNotation {
        /// The rejected notation.
        notation: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// How a cell's next state follows from its state and neighbor count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RulePolicy {
    /// `B3/S23`: underpopulation, overpopulation, reproduction, otherwise
    /// unchanged.
    #[default]
    Conway,

    /// Any outer-totalistic rule. Bit `n` of each mask covers a neighbor
    /// count of `n`.
    LifeLike {
        /// Counts at which a dead cell becomes alive.
        birth: u16,
        /// Counts at which a live cell stays alive.
        survival: u16,
    },
}

impl RulePolicy {
    /// Next state of a cell that is `alive` with `neighbors` live neighbors.
    pub fn next_state(self, alive: bool, neighbors: u8) -> bool {
        match self {
            Self::Conway => match (alive, neighbors) {
                // Underpopulation.
                (true, n) if n < 2 => false,
                // Overpopulation.
                (true, n) if n > 3 => false,
                // Reproduction.
                (false, 3) => true,
                (state, _) => state,
            },
            Self::LifeLike { birth, survival } => {
                let mask = if alive { survival } else { birth };
                1_u16
                    .checked_shl(u32::from(neighbors))
                    .is_some_and(|bit| mask & bit != 0)
            }
        }
    }

    /// Birth and survival masks of this policy.
    pub const fn masks(self) -> (u16, u16) {
        match self {
            Self::Conway => (CONWAY_BIRTH, CONWAY_SURVIVAL),
            Self::LifeLike { birth, survival } => (birth, survival),
        }
    }

    /// Parse `B<digits>/S<digits>` notation (case-insensitive, either
    /// order). `B3/S23` yields [`RulePolicy::Conway`].
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidNotation`] for anything else.
    pub fn from_notation(notation: &str) -> Result<Self, RuleError> {
        let invalid = |reason: &str| RuleError::InvalidNotation {
            notation: notation.to_owned(),
            reason: reason.to_owned(),
        };

        let mut birth: Option<u16> = None;
        let mut survival: Option<u16> = None;

        for part in notation.trim().split('/') {
            let mut chars = part.trim().chars();
            let slot = match chars.next().map(|c| c.to_ascii_uppercase()) {
                Some('B') => &mut birth,
                Some('S') => &mut survival,
                _ => return Err(invalid("each part must start with B or S")),
            };
            if slot.is_some() {
                return Err(invalid("duplicate B or S part"));
            }
            *slot = Some(parse_counts(chars.as_str()).ok_or_else(|| {
                invalid("neighbor counts must be digits 0-8")
            })?);
        }

        match (birth, survival) {
            (Some(CONWAY_BIRTH), Some(CONWAY_SURVIVAL)) => Ok(Self::Conway),
            (Some(birth), Some(survival)) => Ok(Self::LifeLike { birth, survival }),
            _ => Err(invalid("both B and S parts are required")),
        }
    }

    /// Canonical `B/S` notation of this policy.
    pub fn notation(self) -> String {
        let (birth, survival) = self.masks();
        format!("B{}/S{}", mask_digits(birth), mask_digits(survival))
    }
}

impl fmt::Display for RulePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.notation())
    }
}

impl FromStr for RulePolicy {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_notation(s)
    }
}

impl TryFrom<String> for RulePolicy {
    type Error = RuleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_notation(&value)
    }
}

impl From<RulePolicy> for String {
    fn from(policy: RulePolicy) -> Self {
        policy.notation()
    }
}

/// Digits `0..=8` into a bitmask; `None` on any other character.
fn parse_counts(digits: &str) -> Option<u16> {
    digits.chars().try_fold(0_u16, |mask, c| {
        let n = c.to_digit(10).filter(|n| *n <= u32::from(MAX_NEIGHBORS))?;
        Some(mask | 1_u16.checked_shl(n)?)
    })
}

/// Bitmask back into ascending digits.
fn mask_digits(mask: u16) -> String {
    (0..=MAX_NEIGHBORS)
        .filter(|n| 1_u16.checked_shl(u32::from(*n)).is_some_and(|bit| mask & bit != 0))
        .map(|n| char::from(b'0'.saturating_add(n)))
        .collect()
}

/// Count the live cells among the up-to-8 in-bounds neighbors of
/// `(row, column)`.
pub fn live_neighbors(grid: &GridState, row: usize, column: usize) -> u8 {
    OFFSETS_8
        .iter()
        .filter(|(dr, dc)| {
            match (row.checked_add_signed(*dr), column.checked_add_signed(*dc)) {
                (Some(r), Some(c)) => grid.is_alive(r, c),
                _ => false,
            }
        })
        .fold(0_u8, |count, _| count.saturating_add(1))
}

/// Computes successor generations under a fixed [`RulePolicy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleEngine {
    policy: RulePolicy,
}

impl RuleEngine {
    /// Create an engine for `policy`.
    pub const fn new(policy: RulePolicy) -> Self {
        Self { policy }
    }

    /// The policy this engine applies.
    pub const fn policy(&self) -> RulePolicy {
        self.policy
    }

    /// Write the successor of `current` into `next`.
    ///
    /// Every neighbor count is taken from `current`; `next` is fully
    /// overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::ShapeMismatch`] if the buffers differ in shape.
    pub fn step(&self, current: &GridState, next: &mut GridState) -> Result<(), RuleError> {
        if !current.same_shape(next) {
            return Err(RuleError::ShapeMismatch {
                current_width: current.width(),
                current_height: current.height(),
                next_width: next.width(),
                next_height: next.height(),
            });
        }

        self.write_successor(current, next);
        Ok(())
    }

    /// Compute the successor of `current` into a fresh grid.
    pub fn successor(&self, current: &GridState) -> GridState {
        let mut next = current.clone();
        self.write_successor(current, &mut next);
        next
    }

    /// Shared transition; `next` must have the shape of `current`.
    fn write_successor(&self, current: &GridState, next: &mut GridState) {
        let policy = self.policy;
        next.fill_with(|row, column| {
            policy.next_state(
                current.is_alive(row, column),
                live_neighbors(current, row, column),
            )
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn grid(rows: &[&[u8]]) -> GridState {
        let cells: Vec<Vec<u8>> = rows.iter().map(|r| r.to_vec()).collect();
        let width = cells.first().map_or(0, Vec::len);
        GridState::new(width, cells.len(), cells).unwrap()
    }

    #[test]
    fn conway_four_rules() {
        let rule = RulePolicy::Conway;
        // Underpopulation.
        assert!(!rule.next_state(true, 0));
        assert!(!rule.next_state(true, 1));
        // Survival.
        assert!(rule.next_state(true, 2));
        assert!(rule.next_state(true, 3));
        // Overpopulation.
        assert!(!rule.next_state(true, 4));
        assert!(!rule.next_state(true, 8));
        // Reproduction.
        assert!(rule.next_state(false, 3));
        // Otherwise unchanged.
        assert!(!rule.next_state(false, 2));
        assert!(!rule.next_state(false, 4));
    }

    #[test]
    fn conway_matches_its_life_like_masks() {
        let (birth, survival) = RulePolicy::Conway.masks();
        let life_like = RulePolicy::LifeLike { birth, survival };
        for n in 0..=MAX_NEIGHBORS {
            for alive in [false, true] {
                assert_eq!(
                    RulePolicy::Conway.next_state(alive, n),
                    life_like.next_state(alive, n),
                    "alive={alive} n={n}"
                );
            }
        }
    }

    #[test]
    fn parses_conway_notation() {
        assert_eq!(RulePolicy::from_notation("B3/S23").unwrap(), RulePolicy::Conway);
        assert_eq!(RulePolicy::from_notation("s23/b3").unwrap(), RulePolicy::Conway);
        assert_eq!(RulePolicy::Conway.notation(), "B3/S23");
    }

    #[test]
    fn parses_highlife_notation() {
        let rule: RulePolicy = "B36/S23".parse().unwrap();
        assert_eq!(
            rule,
            RulePolicy::LifeLike {
                birth: 0b0_0100_1000,
                survival: 0b0_0000_1100,
            }
        );
        assert!(rule.next_state(false, 6));
        assert_eq!(rule.to_string(), "B36/S23");
    }

    #[test]
    fn empty_survival_is_allowed() {
        let rule = RulePolicy::from_notation("B2/S").unwrap();
        assert!(!rule.next_state(true, 2));
        assert!(rule.next_state(false, 2));
    }

    #[test]
    fn rejects_bad_notation() {
        for bad in ["", "B3", "X3/S23", "B9/S23", "B3/S2a", "B3/B3"] {
            assert!(
                matches!(
                    RulePolicy::from_notation(bad),
                    Err(RuleError::InvalidNotation { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn corner_cell_never_wraps() {
        // Opposite corners alive: without wraparound neither sees the other.
        let g = grid(&[&[1, 0, 0], &[0, 0, 0], &[0, 0, 1]]);
        assert_eq!(live_neighbors(&g, 0, 0), 0);
        assert_eq!(live_neighbors(&g, 2, 2), 0);
    }

    #[test]
    fn corner_counts_at_most_three() {
        let g = grid(&[&[1, 1, 1], &[1, 1, 1], &[1, 1, 1]]);
        assert_eq!(live_neighbors(&g, 0, 0), 3);
        assert_eq!(live_neighbors(&g, 0, 1), 5);
        assert_eq!(live_neighbors(&g, 1, 1), 8);
    }

    #[test]
    fn lonely_corner_cell_dies() {
        let g = grid(&[&[1, 0, 0, 0], &[0, 0, 0, 0], &[0, 0, 0, 0], &[0, 0, 0, 0]]);
        let next = RuleEngine::default().successor(&g);
        assert_eq!(next.alive_count(), 0);
    }

    #[test]
    fn corner_with_one_neighbor_dies() {
        let g = grid(&[&[1, 1, 0], &[0, 0, 0], &[0, 0, 0]]);
        let next = RuleEngine::default().successor(&g);
        assert!(!next.is_alive(0, 0));
    }

    #[test]
    fn step_reads_only_the_previous_generation() {
        // A vertical blinker in a 5x5 grid. If updates leaked into the
        // neighbor counts mid-pass, the result would not be a clean
        // horizontal line.
        let g = grid(&[
            &[0, 0, 0, 0, 0],
            &[0, 0, 1, 0, 0],
            &[0, 0, 1, 0, 0],
            &[0, 0, 1, 0, 0],
            &[0, 0, 0, 0, 0],
        ]);
        let mut next = GridState::dead(5, 5).unwrap();
        RuleEngine::default().step(&g, &mut next).unwrap();

        let expected = grid(&[
            &[0, 0, 0, 0, 0],
            &[0, 0, 0, 0, 0],
            &[0, 1, 1, 1, 0],
            &[0, 0, 0, 0, 0],
            &[0, 0, 0, 0, 0],
        ]);
        assert_eq!(next, expected);
    }

    #[test]
    fn step_rejects_mismatched_buffers() {
        let g = GridState::dead(4, 4).unwrap();
        let mut next = GridState::dead(4, 5).unwrap();
        let err = RuleEngine::default().step(&g, &mut next).unwrap_err();
        assert!(matches!(err, RuleError::ShapeMismatch { next_height: 5, .. }));
    }

    #[test]
    fn successor_is_deterministic() {
        let g = grid(&[
            &[0, 1, 1, 0],
            &[1, 0, 0, 1],
            &[0, 1, 1, 0],
            &[1, 1, 0, 1],
        ]);
        let engine = RuleEngine::default();
        assert_eq!(engine.successor(&g), engine.successor(&g));
    }

    #[test]
    fn successor_matches_step_into_a_dirty_buffer() {
        let g = grid(&[
            &[1, 1, 0, 0],
            &[1, 0, 0, 1],
            &[0, 0, 1, 1],
            &[0, 1, 1, 0],
        ]);
        let engine = RuleEngine::new(RulePolicy::from_notation("B36/S23").unwrap());
        let mut next = GridState::dead(4, 4).unwrap();
        next.fill_with(|_, _| true);
        engine.step(&g, &mut next).unwrap();
        assert_eq!(engine.successor(&g), next);
    }

    #[test]
    fn policy_round_trips_through_serde_string() {
        let text: String = RulePolicy::Conway.into();
        assert_eq!(text, "B3/S23");
        let back = RulePolicy::try_from(String::from("B36/S23")).unwrap();
        assert_eq!(back.notation(), "B36/S23");
    }
}
