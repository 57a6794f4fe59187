//! Per-factor scoring curves
//!
//! Each curve maps one condition to 0-100. Breakpoints are tuned by eye
//! against typical beach-break sessions; only the shapes are load-bearing.

use crate::models::{Compass, Observation};
use crate::spot::{Band, SpotProfile};

/// Heights at or below this many meters count as flat
pub const FLAT_THRESHOLD_M: f64 = 0.1;

/// Score for a factor whose input no source reported
pub const UNKNOWN_SCORE: f64 = 40.0;

/// Direction scores for preferred / one-hop neighbor / anything else
pub const DIRECTION_MATCH: f64 = 100.0;
pub const DIRECTION_ADJACENT: f64 = 65.0;
pub const DIRECTION_MISS: f64 = 25.0;

/// Linear interpolation of x over [x0, x1] onto [y0, y1], clamped
fn lerp(x: f64, x0: f64, x1: f64, y0: f64, y1: f64) -> f64 {
    if x1 <= x0 {
        return y1;
    }
    let t = ((x - x0) / (x1 - x0)).clamp(0.0, 1.0);
    y0 + (y1 - y0) * t
}

pub fn is_flat(height: Option<f64>) -> bool {
    height.map_or(false, |h| h <= FLAT_THRESHOLD_M)
}

/// Wave height against the spot's height band
pub fn wave_height(height: Option<f64>, band: &Band) -> f64 {
    let Some(h) = height else {
        return UNKNOWN_SCORE;
    };
    if h <= FLAT_THRESHOLD_M {
        return 0.0;
    }
    if band.min > 0.0 && h < band.min {
        // Power curve: small surf loses value faster than linearly
        return 90.0 * (h / band.min).powi(2);
    }
    if h <= band.ideal {
        return lerp(h, band.min, band.ideal, 90.0, 100.0);
    }
    if h <= band.max {
        return lerp(h, band.ideal, band.max, 100.0, 90.0);
    }
    // Zero at one and a half times the band maximum
    let overshoot = (h - band.max) / band.max.max(FLAT_THRESHOLD_M);
    (90.0 - 180.0 * overshoot).max(0.0)
}

/// Wave period against the spot's period band; long period is never punished much
pub fn wave_period(period: Option<f64>, band: &Band) -> f64 {
    let Some(p) = period else {
        return UNKNOWN_SCORE;
    };
    if p <= 0.0 {
        return 0.0;
    }
    if band.min > 0.0 && p < band.min {
        return 40.0 * (p / band.min).powf(1.5);
    }
    if p <= band.ideal {
        return lerp(p, band.min, band.ideal, 40.0, 100.0);
    }
    if p <= band.max {
        return lerp(p, band.ideal, band.max, 100.0, 90.0);
    }
    90.0
}

/// Groundswell vs wind swell adjustment by period
fn period_adjustment(period: f64) -> f64 {
    if period >= 13.0 {
        30.0
    } else if period >= 10.0 {
        20.0
    } else if period >= 8.0 {
        5.0
    } else {
        -20.0
    }
}

/// Quality of the underlying swell; general wave period is a weaker proxy
pub fn swell_quality(obs: &Observation, profile: &SpotProfile) -> f64 {
    let mut score = 50.0;

    match obs.swell {
        Some(swell) if swell.height.is_some() || swell.period.is_some() => {
            if let Some(h) = swell.height {
                if profile.wave_height.contains(h) {
                    score += 10.0;
                } else if h < profile.wave_height.min {
                    score -= 10.0;
                }
            }
            match (swell.period, obs.wave_period) {
                (Some(p), _) => score += period_adjustment(p),
                (None, Some(p)) => score += period_adjustment(p) * 0.5,
                (None, None) => {}
            }
            if swell.direction.map_or(false, |d| profile.is_best_swell(d)) {
                score += 10.0;
            }
        }
        _ => {
            if let Some(p) = obs.wave_period {
                score += period_adjustment(p) * 0.5;
            }
        }
    }

    score.clamp(0.0, 100.0)
}

/// Sustained wind with gust penalties
pub fn wind_speed(speed: Option<f64>, gust: Option<f64>) -> f64 {
    let Some(w) = speed else {
        return UNKNOWN_SCORE;
    };
    let w = w.max(0.0);

    // Light, moderate, strong, blown-out: each band wider and steeper
    let base = if w <= 5.0 {
        100.0
    } else if w <= 12.0 {
        lerp(w, 5.0, 12.0, 100.0, 90.0)
    } else if w <= 20.0 {
        lerp(w, 12.0, 20.0, 90.0, 70.0)
    } else if w <= 30.0 {
        lerp(w, 20.0, 30.0, 70.0, 35.0)
    } else {
        (35.0 - 4.0 * (w - 30.0)).max(0.0)
    };

    (base - gust_penalty(w, gust)).clamp(0.0, 100.0)
}

fn gust_penalty(sustained: f64, gust: Option<f64>) -> f64 {
    let Some(g) = gust else {
        return 0.0;
    };
    if g <= sustained {
        return 0.0;
    }

    let mut penalty = 0.0;
    if sustained >= 1.0 {
        let ratio = g / sustained;
        penalty += if ratio > 2.0 {
            20.0
        } else if ratio > 1.5 {
            12.0
        } else if ratio > 1.3 {
            6.0
        } else {
            0.0
        };
    }
    penalty += if g > 50.0 {
        20.0
    } else if g > 35.0 {
        10.0
    } else if g > 25.0 {
        5.0
    } else {
        0.0
    };
    penalty
}

/// Match against a preferred set with one-hop adjacency
pub fn direction(direction: Option<Compass>, preferred: &[Compass]) -> f64 {
    match direction {
        None => UNKNOWN_SCORE,
        Some(d) if preferred.contains(&d) => DIRECTION_MATCH,
        Some(d) if preferred.iter().any(|p| d.is_adjacent_to(*p)) => DIRECTION_ADJACENT,
        Some(_) => DIRECTION_MISS,
    }
}

/// More corroborating sources, more confidence; capped at five
pub fn confidence(source_count: usize) -> f64 {
    match source_count {
        0 => 0.0,
        1 => 40.0,
        2 => 60.0,
        3 => 75.0,
        4 => 90.0,
        _ => 100.0,
    }
}
