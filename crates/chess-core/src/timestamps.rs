//! Clock readings to video-relative elapsed time.
//!
//! Time spent on a ply is the mover's previous reading minus the current one
//! plus the increment; each side starts from the base budget. The video runs
//! continuously, so elapsed time sums over both sides.

use serde::{Deserialize, Serialize};

use crate::game_data::GameRecord;

/// Why a ply's timing is less trustworthy than its neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClockAnomaly {
    /// The reading implied negative time spent (lag compensation, desync).
    /// Clamped to zero.
    NegativeDelta { delta: f64 },
    /// No reading at all; the ply was given the game's average pace so far.
    MissingReading { estimate: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlyTiming {
    /// Seconds attributed to this ply, never negative.
    pub spent: f64,
    /// Seconds since the first move, after this ply. Non-decreasing.
    pub elapsed: f64,
    pub anomaly: Option<ClockAnomaly>,
}

impl PlyTiming {
    pub fn is_low_confidence(&self) -> bool {
        self.anomaly.is_some()
    }
}

/// Compute per-ply timings for a whole game.
pub fn compute_timings(game: &GameRecord) -> Vec<PlyTiming> {
    let base = f64::from(game.time_control.base_seconds);
    let increment = f64::from(game.time_control.increment_seconds);

    // Last known clock per side, white first.
    let mut last_clock = [base, base];
    let mut elapsed = 0.0_f64;
    let mut measured_total = 0.0_f64;
    let mut measured_plies = 0u32;

    let mut timings = Vec::with_capacity(game.plies.len());

    for (index, ply) in game.plies.iter().enumerate() {
        let side = index % 2;

        let (spent, anomaly) = match ply.clock_remaining {
            Some(clock) => {
                let delta = last_clock[side] - clock + increment;
                last_clock[side] = clock;
                if delta < 0.0 {
                    (0.0, Some(ClockAnomaly::NegativeDelta { delta }))
                } else {
                    measured_total += delta;
                    measured_plies += 1;
                    (delta, None)
                }
            }
            None => {
                let estimate = if measured_plies > 0 {
                    measured_total / f64::from(measured_plies)
                } else {
                    0.0
                };
                // Advance the projected clock so the next real reading is not counted twice.
                last_clock[side] = (last_clock[side] - estimate + increment).max(0.0);
                (estimate, Some(ClockAnomaly::MissingReading { estimate }))
            }
        };

        elapsed = (elapsed + spent).max(elapsed);
        timings.push(PlyTiming {
            spent,
            elapsed,
            anomaly,
        });
    }

    timings
}

/// Whole-second video offset: URL start + configured anchor + elapsed game time.
pub fn video_offset(start_seconds: u32, anchor_offset: f64, elapsed: f64) -> u32 {
    let offset = (f64::from(start_seconds) + anchor_offset + elapsed).floor();
    if offset.is_finite() && offset > 0.0 {
        offset.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}
