//! Fixed or randomized delays.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingMode {
    #[default]
    Fixed,
    Range,
}

/// A declared delay in seconds. `b` only matters in [`TimingMode::Range`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimingSpec {
    pub mode: TimingMode,
    pub a: f64,
    pub b: f64,
}

impl TimingSpec {
    pub fn fixed(secs: f64) -> Self {
        Self {
            mode: TimingMode::Fixed,
            a: secs,
            b: secs,
        }
    }

    pub fn range(a: f64, b: f64) -> Self {
        Self {
            mode: TimingMode::Range,
            a,
            b,
        }
    }

    /// Draw a delay in seconds. Never negative.
    pub fn sample(&self) -> f64 {
        self.sample_with(&mut rand::thread_rng())
    }

    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let v = match self.mode {
            TimingMode::Fixed => self.a,
            TimingMode::Range => {
                let lo = self.a.min(self.b).max(0.0);
                let hi = self.a.max(self.b).max(0.0);
                if hi > lo {
                    rng.gen_range(lo..=hi)
                } else {
                    lo
                }
            }
        };
        if v.is_finite() {
            v.max(0.0)
        } else {
            0.0
        }
    }

    pub fn sample_duration(&self) -> Duration {
        Duration::from_secs_f64(self.sample())
    }

    pub fn is_zero(&self) -> bool {
        self.a <= 0.0 && (self.mode == TimingMode::Fixed || self.b <= 0.0)
    }
}

impl Default for TimingSpec {
    fn default() -> Self {
        Self::fixed(0.0)
    }
}

/// Accepts partial or malformed objects: unknown modes read as fixed,
/// a missing `a` as zero and a missing `b` as `a`.
impl<'de> Deserialize<'de> for TimingSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

impl TimingSpec {
    pub(crate) fn from_value(value: &serde_json::Value) -> Self {
        if let Some(secs) = value.as_f64() {
            return Self::fixed(secs);
        }
        let num = |key: &str| value.get(key).and_then(crate::wire::as_f64).unwrap_or(0.0);
        let mode = match value.get("mode").and_then(|m| m.as_str()) {
            Some("range") => TimingMode::Range,
            _ => TimingMode::Fixed,
        };
        let a = num("a");
        Self {
            mode,
            a,
            b: value.get("b").and_then(crate::wire::as_f64).unwrap_or(a),
        }
    }
}

impl std::fmt::Display for TimingSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.mode {
            TimingMode::Fixed => write!(f, "{:.3}s", self.a),
            TimingMode::Range => {
                write!(f, "{:.3}..{:.3}s (random)", self.a.min(self.b), self.a.max(self.b))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn fixed_returns_a() {
        let spec = TimingSpec::fixed(0.25);
        for _ in 0..100 {
            assert_eq!(spec.sample(), 0.25);
        }
    }

    #[test]
    fn negative_fixed_is_zero() {
        assert_eq!(TimingSpec::fixed(-1.0).sample(), 0.0);
    }

    #[test]
    fn range_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let spec = TimingSpec::range(0.9, 0.3);
        let samples: Vec<f64> = (0..10_000).map(|_| spec.sample_with(&mut rng)).collect();
        assert!(samples.iter().all(|v| (0.3..=0.9).contains(v)));
        let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!(max - min > 0.5, "degenerate spread {}..{}", min, max);
    }

    #[test]
    fn degenerate_range() {
        assert_eq!(TimingSpec::range(0.4, 0.4).sample(), 0.4);
    }

    #[test]
    fn lenient_parse() {
        let spec: TimingSpec = serde_json::from_str(r#"{"mode":"bogus","a":"1.5"}"#).unwrap();
        assert_eq!(spec, TimingSpec::fixed(1.5));
        let spec: TimingSpec = serde_json::from_str(r#"{"mode":"range","a":0.1,"b":0.3}"#).unwrap();
        assert_eq!(spec, TimingSpec::range(0.1, 0.3));
        let spec: TimingSpec = serde_json::from_str("{}").unwrap();
        assert_eq!(spec, TimingSpec::fixed(0.0));
    }

    #[test]
    fn serializes_wire_shape() {
        let json = serde_json::to_value(TimingSpec::range(0.1, 0.2)).unwrap();
        assert_eq!(json, serde_json::json!({"mode": "range", "a": 0.1, "b": 0.2}));
    }
}
