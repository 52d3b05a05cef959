//! Transient-response metrics extracted from a sampled curve.

use serde::Serialize;

/// Fraction of the peak magnitude that bounds the settled response.
pub const SETTLING_BAND: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResponseMetrics {
    /// Largest magnitude reached after the first zero crossing.
    pub peak_overshoot: f64,
    /// Mean oscillation frequency from zero-crossing spacing [Hz].
    pub oscillation_frequency_hz: Option<f64>,
    /// Last instant the response leaves the settling band [s].
    /// `None` when it is still outside the band at the end of the horizon.
    pub settling_time_s: Option<f64>,
    pub final_value: f64,
    pub zero_crossings: usize,
}

impl ResponseMetrics {
    pub fn from_curve(time: &[f64], values: &[f64]) -> Self {
        let n = time.len().min(values.len());
        let time = &time[..n];
        let values = &values[..n];

        let crossings = zero_crossings(time, values);
        let peak_overshoot = match crossings.first() {
            Some(&(idx, _)) => values[idx..].iter().fold(0.0_f64, |acc, v| acc.max(v.abs())),
            None => 0.0,
        };

        Self {
            peak_overshoot,
            oscillation_frequency_hz: oscillation_frequency(&crossings),
            settling_time_s: settling_time(time, values),
            final_value: values.last().copied().unwrap_or(0.0),
            zero_crossings: crossings.len(),
        }
    }
}

/// Sign changes of `values` as `(index after the change, interpolated time)`.
/// Samples that are exactly zero only count when the signs on either side
/// of them differ.
pub fn zero_crossings(time: &[f64], values: &[f64]) -> Vec<(usize, f64)> {
    let n = time.len().min(values.len());
    let mut out = Vec::new();
    let mut last_nonzero: Option<usize> = None;

    for idx in 0..n {
        let y1 = values[idx];
        if y1 == 0.0 {
            continue;
        }

        if let Some(prev) = last_nonzero {
            let y0 = values[prev];
            if (y0 > 0.0) != (y1 > 0.0) {
                let t = if prev + 1 == idx {
                    let (t0, t1) = (time[prev], time[idx]);
                    t0 + (t1 - t0) * y0 / (y0 - y1)
                } else {
                    time[prev + 1]
                };
                out.push((idx, t));
            }
        }
        last_nonzero = Some(idx);
    }

    out
}

fn oscillation_frequency(crossings: &[(usize, f64)]) -> Option<f64> {
    if crossings.len() < 2 {
        return None;
    }

    let first = crossings[0].1;
    let last = crossings[crossings.len() - 1].1;
    let half_period = (last - first) / (crossings.len() - 1) as f64;
    if half_period <= 0.0 {
        return None;
    }

    Some(1.0 / (2.0 * half_period))
}

fn settling_time(time: &[f64], values: &[f64]) -> Option<f64> {
    let peak = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if peak == 0.0 {
        return time.first().copied();
    }

    let band = SETTLING_BAND * peak;
    let last_outside = values.iter().rposition(|v| v.abs() > band);
    match last_outside {
        None => time.first().copied(),
        Some(idx) if idx + 1 == values.len() => None,
        Some(idx) => Some(time[idx + 1]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::linspace;
    use approx::assert_relative_eq;

    #[test]
    fn cosine_frequency_is_recovered() {
        let time = linspace(0.0, 10.0, 2001);
        let values: Vec<f64> = time
            .iter()
            .map(|t| (2.0 * std::f64::consts::PI * 0.5 * t).cos())
            .collect();

        let metrics = ResponseMetrics::from_curve(&time, &values);
        assert_relative_eq!(metrics.oscillation_frequency_hz.unwrap(), 0.5, epsilon = 1e-3);
        assert_eq!(metrics.zero_crossings, 10);
        assert_eq!(metrics.settling_time_s, None);
    }

    #[test]
    fn monotone_decay_has_no_overshoot() {
        let time = linspace(0.0, 10.0, 101);
        let values: Vec<f64> = time.iter().map(|t| 20.0 * (-t).exp()).collect();

        let metrics = ResponseMetrics::from_curve(&time, &values);
        assert_eq!(metrics.peak_overshoot, 0.0);
        assert_eq!(metrics.oscillation_frequency_hz, None);
        // 20 e^{-t} drops below 0.4 at t = ln 50
        let settle = metrics.settling_time_s.unwrap();
        assert!(settle > 50.0_f64.ln() && settle < 50.0_f64.ln() + 0.11);
    }

    #[test]
    fn crossing_time_is_interpolated() {
        let crossings = zero_crossings(&[0.0, 1.0, 2.0], &[1.0, -1.0, -1.0]);
        assert_eq!(crossings, vec![(1, 0.5)]);
    }

    #[test]
    fn zero_sample_is_counted_once() {
        let crossings = zero_crossings(&[0.0, 1.0, 2.0], &[1.0, 0.0, -1.0]);
        assert_eq!(crossings, vec![(2, 1.0)]);
    }

    #[test]
    fn touching_zero_is_not_a_crossing() {
        assert!(zero_crossings(&[0.0, 1.0, 2.0], &[1.0, 0.0, 1.0]).is_empty());
        assert!(zero_crossings(&[0.0, 1.0, 2.0, 3.0], &[-2.0, 0.0, 0.0, -1.0]).is_empty());

        let metrics = ResponseMetrics::from_curve(&[0.0, 1.0, 2.0, 3.0], &[1.0, 0.0, 1.0, 0.0]);
        assert_eq!(metrics.zero_crossings, 0);
        assert_eq!(metrics.oscillation_frequency_hz, None);
    }

    #[test]
    fn settling_band_is_relative_to_peak_magnitude() {
        // starts at zero, so only the peak gives a meaningful band (0.2 here)
        let time = [0.0, 1.0, 2.0, 3.0, 4.0];
        let values = [0.0, 10.0, 5.0, 0.1, 0.1];
        let metrics = ResponseMetrics::from_curve(&time, &values);
        assert_eq!(metrics.settling_time_s, Some(3.0));
    }

    #[test]
    fn flat_curve_is_settled_immediately() {
        let metrics = ResponseMetrics::from_curve(&[0.0, 1.0], &[0.0, 0.0]);
        assert_eq!(metrics.settling_time_s, Some(0.0));
        assert_eq!(metrics.final_value, 0.0);
    }
}
