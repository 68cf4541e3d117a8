//! Population statistics over duration samples.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationStats {
    /// Number of samples that entered the statistics
    pub samples: usize,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation; 0 for a single sample
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl DurationStats {
    /// None when there are no samples. Input order does not affect the result.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let var = sorted.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
        Some(Self {
            samples: sorted.len(),
            mean,
            median: quantile_sorted(&sorted, 0.5)?,
            std: var.sqrt(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        })
    }
}

/// Linear interpolation between closest ranks. `sorted` must be ascending.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}
