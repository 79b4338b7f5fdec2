//! Points, attempts and the scorer.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use podium_core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Points in tenths, so equal scores compare exactly.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Points(i64);

impl Points {
    /// Zero points.
    pub const ZERO: Self = Self(0);

    /// Builds points from tenths.
    #[must_use]
    pub const fn from_tenths(tenths: i64) -> Self {
        Self(tenths)
    }

    /// Builds points from whole points.
    #[must_use]
    pub const fn from_whole(points: i64) -> Self {
        Self(points * 10)
    }

    /// Rounds a raw score to the nearest tenth.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_f64(points: f64) -> Self {
        Self((points * 10.0).round() as i64)
    }

    /// Value in tenths.
    #[must_use]
    pub const fn tenths(self) -> i64 {
        self.0
    }
}

impl Add for Points {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Points {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sum for Points {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{}", abs / 10, abs % 10)
    }
}

/// A raw attempt as submitted or simulated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    /// Distance in meters.
    pub distance: f64,
    /// Style marks, one per judge.
    pub judge_marks: Vec<f64>,
    /// Wind compensation points (negative for tailwind bonus removal).
    pub wind_compensation: f64,
    /// Gate compensation points.
    pub gate_compensation: f64,
}

impl Attempt {
    /// An attempt with marks and no compensation.
    #[must_use]
    pub fn new(distance: f64, judge_marks: Vec<f64>) -> Self {
        Self {
            distance,
            judge_marks,
            wind_compensation: 0.0,
            gate_compensation: 0.0,
        }
    }

    fn validate(&self) -> Result<(), DomainError> {
        if !self.distance.is_finite() || self.distance < 0.0 {
            return Err(DomainError::Validation(format!(
                "invalid distance {}",
                self.distance
            )));
        }
        if self
            .judge_marks
            .iter()
            .any(|mark| !mark.is_finite() || !(0.0..=20.0).contains(mark))
        {
            return Err(DomainError::Validation(
                "judge marks must be between 0 and 20".to_owned(),
            ));
        }
        if !self.wind_compensation.is_finite() || !self.gate_compensation.is_finite() {
            return Err(DomainError::Validation(
                "compensation must be finite".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Round context handed to the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundContext {
    /// Zero-based round index.
    pub round_index: usize,
}

/// Pure scoring function of an attempt in its round context.
pub trait Scorer: Send + Sync {
    /// Scores `attempt`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a malformed attempt.
    fn score(&self, attempt: &Attempt, context: &RoundContext) -> Result<Points, DomainError>;
}

/// Hill geometry and point values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HillProfile {
    /// Construction point in meters.
    pub k_point: f64,
    /// Points per meter away from the K point.
    pub meter_value: f64,
    /// Points for a jump landing exactly on the K point.
    pub base_points: f64,
}

impl HillProfile {
    /// A large hill (K120).
    pub const LARGE_HILL: Self = Self {
        k_point: 120.0,
        meter_value: 1.8,
        base_points: 60.0,
    };

    /// A normal hill (K90).
    pub const NORMAL_HILL: Self = Self {
        k_point: 90.0,
        meter_value: 2.0,
        base_points: 60.0,
    };
}

impl Default for HillProfile {
    fn default() -> Self {
        Self::LARGE_HILL
    }
}

/// Ski-jumping scorer: distance points from the K point, the middle style
/// marks (highest and lowest dropped once at least three are given), and
/// compensation. Totals are floored at zero.
#[derive(Debug, Clone, Copy)]
pub struct HillScorer {
    profile: HillProfile,
}

impl HillScorer {
    /// Scorer for the given hill.
    #[must_use]
    pub fn new(profile: HillProfile) -> Self {
        Self { profile }
    }

    fn style_points(marks: &[f64]) -> f64 {
        if marks.len() < 3 {
            return marks.iter().sum();
        }
        let mut sorted = marks.to_vec();
        sorted.sort_by(f64::total_cmp);
        sorted[1..sorted.len() - 1].iter().sum()
    }
}

impl Scorer for HillScorer {
    fn score(&self, attempt: &Attempt, _context: &RoundContext) -> Result<Points, DomainError> {
        attempt.validate()?;
        let distance_points = self.profile.base_points
            + (attempt.distance - self.profile.k_point) * self.profile.meter_value;
        let total = distance_points
            + Self::style_points(&attempt.judge_marks)
            + attempt.wind_compensation
            + attempt.gate_compensation;
        Ok(Points::from_f64(total.max(0.0)))
    }
}
