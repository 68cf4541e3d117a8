//! IQR-based anomaly flags for aggregated footprints and footprint instances.

mod detector;

pub use detector::{AnomalyDetector, Detection};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Bands at 1, 2 and 3 IQR beyond the bound.
    pub fn from_score(score: f64) -> Self {
        if score > 3.0 {
            Severity::Critical
        } else if score > 2.0 {
            Severity::High
        } else if score > 1.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyReason {
    WithinBounds,
    AboveUpperBound,
    BelowLowerBound,
    InsufficientSamples,
    MetricUnavailable,
    NonPositiveDuration,
}

impl AnomalyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyReason::WithinBounds => "within_bounds",
            AnomalyReason::AboveUpperBound => "above_upper_bound",
            AnomalyReason::BelowLowerBound => "below_lower_bound",
            AnomalyReason::InsufficientSamples => "insufficient_samples",
            AnomalyReason::MetricUnavailable => "metric_unavailable",
            AnomalyReason::NonPositiveDuration => "non_positive_duration",
        }
    }
}

/// Verdict for one record, kept beside (never inside) the record it describes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyFlag {
    pub is_anomalous: bool,
    /// Distance beyond the nearer bound in IQR units; 0 when not anomalous
    pub score: f64,
    pub reason: AnomalyReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

impl AnomalyFlag {
    pub fn clear(reason: AnomalyReason) -> Self {
        Self {
            is_anomalous: false,
            score: 0.0,
            reason,
            severity: None,
        }
    }

    pub fn anomalous(reason: AnomalyReason, score: f64) -> Self {
        Self {
            is_anomalous: true,
            score,
            reason,
            severity: Some(Severity::from_score(score)),
        }
    }
}

/// Tukey fences of a population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
    /// Population mean, for reference lines
    pub mean: f64,
}

impl Thresholds {
    /// None for an empty population.
    pub fn from_population(values: &[f64], k: f64) -> Option<Self> {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let q1 = crate::kpi::quantile_sorted(&sorted, 0.25)?;
        let q3 = crate::kpi::quantile_sorted(&sorted, 0.75)?;
        let iqr = q3 - q1;
        Some(Self {
            q1,
            q3,
            iqr,
            lower: q1 - k * iqr,
            upper: q3 + k * iqr,
            mean: sorted.iter().sum::<f64>() / sorted.len() as f64,
        })
    }

    /// Flag a single value against the fences.
    pub fn classify(&self, value: f64) -> AnomalyFlag {
        let (reason, bound, distance) = if value > self.upper {
            (AnomalyReason::AboveUpperBound, self.upper, value - self.upper)
        } else if value < self.lower {
            (AnomalyReason::BelowLowerBound, self.lower, self.lower - value)
        } else {
            return AnomalyFlag::clear(AnomalyReason::WithinBounds);
        };
        let scale = if self.iqr > 0.0 { self.iqr } else { bound.abs().max(1.0) };
        AnomalyFlag::anomalous(reason, distance / scale)
    }
}
