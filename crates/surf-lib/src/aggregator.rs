//! Multi-source reconciliation
//!
//! Merges partially populated, possibly conflicting readings into one
//! consensus [`Observation`]:
//! - numeric fields: mean of the values supplied, rounded to natural precision
//! - directions and cloud state: mode, first-seen value wins ties
//! - wave height range: re-derived around the final average
//! - wave height average: capped by the swell-height face multiplier
//!
//! Absent values never count as zero.

use crate::models::{
    round1, truncate_to_hour, HourlyTimeline, Observation, Reading, Swell, TimelineEntry,
    WaveHeight,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default half-width of the derived wave height range (meters)
pub const DEFAULT_RANGE_HALF_WIDTH: f64 = 0.1;

/// Beach-break face height relative to swell height
pub const DEFAULT_SWELL_FACE_MULTIPLIER: f64 = 1.4;

/// Tunable reconciliation constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub range_half_width: f64,
    pub swell_face_multiplier: f64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            range_half_width: DEFAULT_RANGE_HALF_WIDTH,
            swell_face_multiplier: DEFAULT_SWELL_FACE_MULTIPLIER,
        }
    }
}

/// Reconciles readings into observations and timelines
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    config: AggregatorConfig,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AggregatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Consensus of current conditions across readings
    pub fn reconcile(&self, readings: &[Reading]) -> Observation {
        let observations: Vec<&Observation> = readings.iter().map(|r| &r.conditions).collect();
        self.reconcile_observations(&observations)
    }

    /// Consensus per forecast hour across every reading's hourly series
    pub fn reconcile_timeline(&self, readings: &[Reading]) -> HourlyTimeline {
        let mut by_hour: BTreeMap<NaiveDateTime, Vec<&Observation>> = BTreeMap::new();
        for reading in readings {
            for hour in &reading.hourly {
                by_hour
                    .entry(truncate_to_hour(hour.timestamp))
                    .or_default()
                    .push(&hour.conditions);
            }
        }

        let entries = by_hour
            .into_iter()
            .map(|(timestamp, observations)| TimelineEntry {
                timestamp,
                observation: self.reconcile_observations(&observations),
            })
            .collect();

        HourlyTimeline::new(entries)
    }

    /// Apply the per-field rules to any set of observations, in order
    pub fn reconcile_observations(&self, observations: &[&Observation]) -> Observation {
        let swell = reconcile_swell(observations);

        let cap = swell
            .and_then(|s| s.height)
            .map(|h| h * self.config.swell_face_multiplier);
        // Cap against the unrounded mean so rounding never hides an overshoot
        let naive = mean(observations.iter().map(|o| o.wave_height.avg));
        let avg = naive.map(|naive| match cap {
            Some(cap) if naive > cap => cap,
            _ => round1(naive),
        });

        Observation {
            wave_height: self.wave_range(observations, avg),
            wave_period: mean(observations.iter().map(|o| o.wave_period)).map(f64::round),
            wave_direction: mode(observations.iter().map(|o| o.wave_direction)),
            swell,
            wind_speed: mean(observations.iter().map(|o| o.wind_speed)).map(f64::round),
            wind_direction: mode(observations.iter().map(|o| o.wind_direction)),
            wind_gust: mean(observations.iter().map(|o| o.wind_gust)).map(f64::round),
            air_temperature: mean(observations.iter().map(|o| o.air_temperature))
                .map(f64::round),
            water_temperature: mean(observations.iter().map(|o| o.water_temperature))
                .map(f64::round),
            cloud_cover: mode(observations.iter().map(|o| o.cloud_cover)),
        }
    }

    /// Derive min/max around the final average.
    ///
    /// A range every supplier agrees on is kept verbatim when it still
    /// brackets the average; anything else is rebuilt as avg ± half-width
    /// so independently averaged ends can never invert.
    fn wave_range(&self, observations: &[&Observation], avg: Option<f64>) -> WaveHeight {
        let Some(avg) = avg else {
            return WaveHeight::default();
        };

        let mut ranges = observations.iter().filter_map(|o| o.wave_height.range());
        if let Some(first) = ranges.next() {
            let unanimous = ranges.all(|r| r == first);
            let (min, max) = first;
            if unanimous && min <= avg && avg <= max {
                return WaveHeight {
                    min: Some(min),
                    max: Some(max),
                    avg: Some(avg),
                };
            }
        }

        let half = self.config.range_half_width;
        WaveHeight {
            min: Some(round1((avg - half).max(0.0))),
            max: Some(round1(avg + half)),
            avg: Some(avg),
        }
    }
}

/// Swell sub-record, present only when some observation reports a swell height
fn reconcile_swell(observations: &[&Observation]) -> Option<Swell> {
    let swells: Vec<&Swell> = observations.iter().filter_map(|o| o.swell.as_ref()).collect();
    if !swells.iter().any(|s| s.height.is_some()) {
        return None;
    }

    Some(Swell {
        height: mean(swells.iter().map(|s| s.height)).map(round1),
        period: mean(swells.iter().map(|s| s.period)).map(f64::round),
        direction: mode(swells.iter().map(|s| s.direction)),
    })
}

/// Arithmetic mean of the supplied values
pub fn mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .flatten()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Most frequent supplied value; the earliest one wins a tie
pub fn mode<T: PartialEq + Copy>(values: impl Iterator<Item = Option<T>>) -> Option<T> {
    let mut counts: Vec<(T, usize)> = Vec::new();
    for value in values.flatten() {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(T, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CloudCover, Compass, HourlyReading};
    use chrono::NaiveDate;

    fn reading(source: &str, conditions: Observation) -> Reading {
        Reading::new(source, conditions)
    }

    fn hour(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn full_observation() -> Observation {
        Observation {
            wave_height: WaveHeight {
                min: Some(1.0),
                max: Some(1.5),
                avg: Some(1.2),
            },
            wave_period: Some(11.0),
            wave_direction: Some(Compass::W),
            swell: Some(Swell {
                height: Some(1.0),
                period: Some(13.0),
                direction: Some(Compass::NW),
            }),
            wind_speed: Some(9.0),
            wind_direction: Some(Compass::E),
            wind_gust: Some(14.0),
            air_temperature: Some(19.0),
            water_temperature: Some(16.0),
            cloud_cover: Some(CloudCover::PartlyCloudy),
        }
    }

    #[test]
    fn test_single_reading_is_reproduced() {
        let obs = full_observation();
        let result = Aggregator::new().reconcile(&[reading("a", obs.clone())]);
        assert_eq!(result, obs);
    }

    #[test]
    fn test_identical_readings_are_reproduced() {
        let obs = full_observation();
        let readings: Vec<_> = (0..4)
            .map(|i| reading(&format!("s{}", i), obs.clone()))
            .collect();
        assert_eq!(Aggregator::new().reconcile(&readings), obs);
    }

    #[test]
    fn test_empty_input_yields_empty_observation() {
        assert_eq!(Aggregator::new().reconcile(&[]), Observation::default());
    }

    #[test]
    fn test_absent_values_are_excluded_not_zero() {
        let readings = vec![
            reading(
                "a",
                Observation {
                    wind_speed: Some(10.0),
                    ..Default::default()
                },
            ),
            reading("b", Observation::default()),
            reading(
                "c",
                Observation {
                    wind_speed: Some(20.0),
                    ..Default::default()
                },
            ),
        ];
        let result = Aggregator::new().reconcile(&readings);
        assert_eq!(result.wind_speed, Some(15.0));
        assert_eq!(result.air_temperature, None);
        assert_eq!(result.wave_height, WaveHeight::default());
    }

    #[test]
    fn test_numeric_rounding_precision() {
        let readings = vec![
            reading(
                "a",
                Observation {
                    wave_height: WaveHeight::avg(1.0),
                    wave_period: Some(10.0),
                    ..Default::default()
                },
            ),
            reading(
                "b",
                Observation {
                    wave_height: WaveHeight::avg(1.25),
                    wave_period: Some(11.0),
                    ..Default::default()
                },
            ),
        ];
        let result = Aggregator::new().reconcile(&readings);
        // mean 1.125 -> one decimal, mean 10.5 -> integer
        assert_eq!(result.wave_height.avg, Some(1.1));
        assert_eq!(result.wave_period, Some(11.0));
    }

    #[test]
    fn test_swell_cap_scenario() {
        let readings = vec![
            reading(
                "a",
                Observation {
                    wave_height: WaveHeight::avg(1.2),
                    wave_period: Some(10.0),
                    swell: Some(Swell {
                        height: Some(1.0),
                        period: Some(11.0),
                        direction: None,
                    }),
                    ..Default::default()
                },
            ),
            reading(
                "b",
                Observation {
                    wave_height: WaveHeight::avg(1.8),
                    ..Default::default()
                },
            ),
        ];

        let result = Aggregator::new().reconcile(&readings);
        assert_eq!(result.wave_height.avg, Some(1.0 * 1.4));
        let swell = result.swell.unwrap();
        assert_eq!(swell.height, Some(1.0));
        assert_eq!(swell.period, Some(11.0));
    }

    #[test]
    fn test_cap_equals_multiplier_times_swell_exactly() {
        let swell_height = 0.7;
        let readings = vec![reading(
            "a",
            Observation {
                wave_height: WaveHeight::avg(2.0),
                swell: Some(Swell {
                    height: Some(swell_height),
                    ..Default::default()
                }),
                ..Default::default()
            },
        )];
        let result = Aggregator::new().reconcile(&readings);
        assert_eq!(result.wave_height.avg, Some(swell_height * 1.4));
    }

    #[test]
    fn test_cap_applies_before_rounding() {
        // 0.44 rounds to 0.4, under the 0.42 cap, but the raw mean is over it
        let readings = vec![reading(
            "a",
            Observation {
                wave_height: WaveHeight::avg(0.44),
                swell: Some(Swell {
                    height: Some(0.3),
                    ..Default::default()
                }),
                ..Default::default()
            },
        )];
        let result = Aggregator::new().reconcile(&readings);
        assert_eq!(result.wave_height.avg, Some(0.3 * 1.4));
    }

    #[test]
    fn test_cap_not_applied_below_limit() {
        let readings = vec![reading(
            "a",
            Observation {
                wave_height: WaveHeight::avg(1.2),
                swell: Some(Swell {
                    height: Some(1.0),
                    ..Default::default()
                }),
                ..Default::default()
            },
        )];
        let result = Aggregator::new().reconcile(&readings);
        assert_eq!(result.wave_height.avg, Some(1.2));
    }

    #[test]
    fn test_range_rederived_when_sources_disagree() {
        let readings = vec![
            reading(
                "a",
                Observation {
                    wave_height: WaveHeight {
                        min: Some(1.9),
                        max: Some(2.1),
                        avg: Some(2.0),
                    },
                    ..Default::default()
                },
            ),
            reading(
                "b",
                Observation {
                    wave_height: WaveHeight {
                        min: Some(0.5),
                        max: Some(0.7),
                        avg: Some(0.6),
                    },
                    ..Default::default()
                },
            ),
        ];
        let result = Aggregator::new().reconcile(&readings);
        let wh = result.wave_height;
        assert_eq!(wh.avg, Some(1.3));
        assert_eq!(wh.min, Some(1.2));
        assert_eq!(wh.max, Some(1.4));
        assert!(wh.min <= wh.max);
    }

    #[test]
    fn test_unanimous_range_kept_when_it_brackets_avg() {
        let ranged = |avg| Observation {
            wave_height: WaveHeight {
                min: Some(1.0),
                max: Some(2.0),
                avg: Some(avg),
            },
            ..Default::default()
        };
        let readings = vec![
            reading("a", ranged(1.2)),
            reading("b", ranged(1.6)),
            reading(
                "c",
                Observation {
                    wave_height: WaveHeight::avg(1.4),
                    ..Default::default()
                },
            ),
        ];
        let wh = Aggregator::new().reconcile(&readings).wave_height;
        assert_eq!(wh.avg, Some(1.4));
        assert_eq!(wh.min, Some(1.0));
        assert_eq!(wh.max, Some(2.0));

        // Same shared range, but the mean falls outside it
        let readings = vec![reading("a", ranged(2.6)), reading("b", ranged(2.8))];
        let wh = Aggregator::new().reconcile(&readings).wave_height;
        assert_eq!(wh.avg, Some(2.7));
        assert_eq!(wh.min, Some(2.6));
        assert_eq!(wh.max, Some(2.8));
    }

    #[test]
    fn test_range_clamped_at_zero() {
        let readings = vec![reading(
            "a",
            Observation {
                wave_height: WaveHeight::avg(0.0),
                ..Default::default()
            },
        )];
        let wh = Aggregator::new().reconcile(&readings).wave_height;
        assert_eq!(wh.min, Some(0.0));
        assert_eq!(wh.max, Some(0.1));
    }

    #[test]
    fn test_direction_mode_and_tie_break() {
        let dirs = [Compass::SW, Compass::W, Compass::W, Compass::SW, Compass::N];
        let readings: Vec<_> = dirs
            .iter()
            .map(|d| {
                reading(
                    "x",
                    Observation {
                        wind_direction: Some(*d),
                        ..Default::default()
                    },
                )
            })
            .collect();
        // SW and W both appear twice; SW was seen first
        assert_eq!(
            Aggregator::new().reconcile(&readings).wind_direction,
            Some(Compass::SW)
        );

        assert_eq!(mode(vec![None, Some(1), Some(2), Some(2)].into_iter()), Some(2));
        assert_eq!(mode::<u8>(vec![None, None].into_iter()), None);
    }

    #[test]
    fn test_swell_scoped_to_readings_with_swell() {
        let readings = vec![
            reading(
                "a",
                Observation {
                    swell: Some(Swell {
                        height: Some(1.0),
                        period: Some(12.0),
                        direction: Some(Compass::S),
                    }),
                    ..Default::default()
                },
            ),
            reading(
                "b",
                Observation {
                    swell: Some(Swell {
                        height: None,
                        period: Some(8.0),
                        direction: Some(Compass::SW),
                    }),
                    ..Default::default()
                },
            ),
            reading("c", Observation::default()),
        ];
        let swell = Aggregator::new().reconcile(&readings).swell.unwrap();
        assert_eq!(swell.height, Some(1.0));
        assert_eq!(swell.period, Some(10.0));
        assert_eq!(swell.direction, Some(Compass::S));
    }

    #[test]
    fn test_swell_absent_without_height() {
        let readings = vec![reading(
            "a",
            Observation {
                swell: Some(Swell {
                    height: None,
                    period: Some(14.0),
                    direction: None,
                }),
                ..Default::default()
            },
        )];
        assert!(Aggregator::new().reconcile(&readings).swell.is_none());
    }

    #[test]
    fn test_timeline_merges_same_hour_across_sources() {
        let obs = |speed: f64| Observation {
            wind_speed: Some(speed),
            ..Default::default()
        };
        let a = reading("a", Observation::default()).with_hourly(vec![
            HourlyReading {
                timestamp: hour(7, 0),
                conditions: obs(10.0),
            },
            HourlyReading {
                timestamp: hour(6, 0),
                conditions: obs(4.0),
            },
        ]);
        let b = reading("b", Observation::default()).with_hourly(vec![HourlyReading {
            timestamp: hour(7, 30),
            conditions: obs(20.0),
        }]);
        let c = reading("c", Observation::default());

        let timeline = Aggregator::new().reconcile_timeline(&[a, b, c]);
        let entries = timeline.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].timestamp, hour(6, 0));
        assert_eq!(entries[0].observation.wind_speed, Some(4.0));
        assert_eq!(entries[1].timestamp, hour(7, 0));
        assert_eq!(entries[1].observation.wind_speed, Some(15.0));
    }

    #[test]
    fn test_timeline_applies_cap_per_hour() {
        let a = reading("a", Observation::default()).with_hourly(vec![HourlyReading {
            timestamp: hour(9, 0),
            conditions: Observation {
                wave_height: WaveHeight::avg(3.0),
                swell: Some(Swell {
                    height: Some(1.5),
                    ..Default::default()
                }),
                ..Default::default()
            },
        }]);
        let timeline = Aggregator::new().reconcile_timeline(&[a]);
        assert_eq!(
            timeline.entries()[0].observation.wave_height.avg,
            Some(1.5 * 1.4)
        );
    }

    #[test]
    fn test_custom_config() {
        let aggregator = Aggregator::with_config(AggregatorConfig {
            range_half_width: 0.3,
            swell_face_multiplier: 1.2,
        });
        let readings = vec![reading(
            "a",
            Observation {
                wave_height: WaveHeight::avg(2.0),
                swell: Some(Swell {
                    height: Some(1.0),
                    ..Default::default()
                }),
                ..Default::default()
            },
        )];
        let wh = aggregator.reconcile(&readings).wave_height;
        assert_eq!(wh.avg, Some(1.2));
        assert_eq!(wh.min, Some(0.9));
        assert_eq!(wh.max, Some(1.5));
    }
}
