use crate::dataset::Dataset;
use crate::query::TrendPoint;
use serde::{Deserialize, Serialize};

/// Relative change (in percent) a series must exceed before it counts as
/// moving rather than stable.
pub const STABLE_BAND_PERCENT: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increase,
    Decrease,
    Stable,
}

/// Change between the earliest and latest observed week of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChangeStats {
    pub trend: Trend,
    pub percentage: f64,
    pub change: f64,
    pub initial_value: Option<f64>,
    pub current_value: Option<f64>,
    pub initial_week: Option<u32>,
    pub current_week: Option<u32>,
}

impl ChangeStats {
    fn flat() -> Self {
        Self {
            trend: Trend::Stable,
            percentage: 0.0,
            change: 0.0,
            initial_value: None,
            current_value: None,
            initial_week: None,
            current_week: None,
        }
    }
}

/// Classify the move from `initial` to `current`, returning the trend and
/// the percentage change relative to `|initial|`.
///
/// A zero baseline reports 0% and takes the trend from the sign of
/// `current`.
pub fn classify_change(initial: f64, current: f64) -> (Trend, f64) {
    if initial == 0.0 {
        let trend = if current > 0.0 {
            Trend::Increase
        } else if current < 0.0 {
            Trend::Decrease
        } else {
            Trend::Stable
        };
        return (trend, 0.0);
    }
    let percentage = (current - initial) / initial.abs() * 100.0;
    let trend = if percentage > STABLE_BAND_PERCENT {
        Trend::Increase
    } else if percentage < -STABLE_BAND_PERCENT {
        Trend::Decrease
    } else {
        Trend::Stable
    };
    (trend, percentage)
}

/// Stats over an already tracked series (earliest week first).
pub fn change_stats_from_points(points: &[TrendPoint]) -> ChangeStats {
    let [first, .., last] = points else {
        return ChangeStats::flat();
    };
    let (trend, percentage) = classify_change(first.value, last.value);
    ChangeStats {
        trend,
        percentage,
        change: last.value - first.value,
        initial_value: Some(first.value),
        current_value: Some(last.value),
        initial_week: Some(first.week),
        current_week: Some(last.week),
    }
}

impl Dataset {
    pub fn change_stats(&self, batch: &str, buffer: &str, test: &str, field: &str) -> ChangeStats {
        change_stats_from_points(&self.track_over_weeks(batch, buffer, test, field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture;

    fn points(values: &[(u32, f64)]) -> Vec<TrendPoint> {
        values
            .iter()
            .map(|&(week, value)| TrendPoint { week, value })
            .collect()
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} vs {b}");
    }

    #[test]
    fn short_series_are_stable() {
        for series in [points(&[]), points(&[(1, 42.0)])] {
            let stats = change_stats_from_points(&series);
            assert_eq!(stats.trend, Trend::Stable);
            assert_eq!(stats.percentage, 0.0);
            assert_eq!(stats.initial_value, None);
            assert_eq!(stats.current_value, None);
        }
    }

    #[test]
    fn zero_baseline_reports_zero_percent() {
        let stats = change_stats_from_points(&points(&[(1, 0.0), (4, 5.0)]));
        assert_eq!(stats.trend, Trend::Increase);
        assert_eq!(stats.percentage, 0.0);
        assert_eq!(stats.current_value, Some(5.0));

        assert_eq!(classify_change(0.0, -2.0), (Trend::Decrease, 0.0));
        assert_eq!(classify_change(0.0, 0.0), (Trend::Stable, 0.0));
    }

    #[test]
    fn small_moves_fall_in_the_stable_band() {
        let stats = change_stats_from_points(&points(&[(1, 100.0), (2, 100.5)]));
        assert_close(stats.percentage, 0.5);
        assert_eq!(stats.trend, Trend::Stable);
    }

    #[test]
    fn drops_are_decreases() {
        let stats = change_stats_from_points(&points(&[(1, 100.0), (3, 90.0), (6, 80.0)]));
        assert_close(stats.percentage, -20.0);
        assert_close(stats.change, -20.0);
        assert_eq!(stats.trend, Trend::Decrease);
        assert_eq!(stats.initial_week, Some(1));
        assert_eq!(stats.current_week, Some(6));
    }

    #[test]
    fn negative_baseline_uses_magnitude() {
        let (trend, percentage) = classify_change(-50.0, -25.0);
        assert_eq!(trend, Trend::Increase);
        assert_close(percentage, 50.0);
    }

    #[test]
    fn dataset_stats_use_first_and_last_week() {
        let dataset = fixture();
        let stats = dataset.change_stats("1", "buffer 1", "UVVIS", "c_avg");
        assert_eq!(stats.initial_value, Some(100.0));
        assert_eq!(stats.current_value, Some(80.0));
        assert_eq!(stats.trend, Trend::Decrease);

        let dls = dataset.change_stats("1", "buffer 1", "DLS", "Z-AVG");
        assert_eq!(dls.trend, Trend::Increase);
        assert_eq!(dls.percentage, 0.0);

        let elisa = dataset.change_stats("1", "buffer 1", "ELISA", "positive");
        assert_eq!(elisa.trend, Trend::Stable);
        assert_eq!(elisa.initial_value, None);
    }

    #[test]
    fn trend_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Trend::Increase).unwrap(), "\"increase\"");
    }
}
