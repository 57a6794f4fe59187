//! Templated score explanations
//!
//! Fragments are picked by which band each sub-score landed in, so the same
//! inputs always produce the same text.

use super::{Breakdown, Factor};
use crate::models::Observation;
use crate::spot::SpotProfile;

fn factor(breakdown: &Breakdown, f: Factor) -> u8 {
    breakdown.get(&f).copied().unwrap_or(0)
}

fn height_phrase(obs: &Observation, profile: &SpotProfile) -> String {
    let band = &profile.wave_height;
    match obs.wave_height.avg {
        None => "Wave size unknown".to_string(),
        Some(h) if h < band.min * 0.5 => format!("Tiny {:.1}m surf", h),
        Some(h) if h < band.min => format!("Small {:.1}m surf", h),
        Some(h) if h <= band.ideal => format!("Rideable {:.1}m waves", h),
        Some(h) if h <= band.max => format!("Solid {:.1}m waves", h),
        Some(h) => format!("Oversized {:.1}m surf", h),
    }
}

fn swell_phrase(obs: &Observation, breakdown: &Breakdown) -> String {
    let quality = factor(breakdown, Factor::SwellQuality);
    let label = if quality >= 80 {
        "clean groundswell"
    } else if quality >= 60 {
        "decent swell"
    } else if quality >= 40 {
        "mixed swell"
    } else {
        "weak wind swell"
    };

    match obs.effective_period() {
        Some(p) => format!("with {} at {:.0}s", label, p),
        None => format!("with {}", label),
    }
}

fn wind_phrase(obs: &Observation, breakdown: &Breakdown) -> String {
    let Some(speed) = obs.wind_speed else {
        return "Wind unknown".to_string();
    };

    let strength = factor(breakdown, Factor::WindSpeed);
    let strength = if strength >= 90 {
        "Light"
    } else if strength >= 70 {
        "Moderate"
    } else if strength >= 40 {
        "Strong"
    } else {
        "Blown-out"
    };

    match obs.wind_direction {
        Some(dir) => {
            let relation = match factor(breakdown, Factor::WindDirection) {
                100 => "offshore",
                65 => "cross-offshore",
                _ => "onshore",
            };
            format!("{} {} winds ({} {:.0} km/h)", strength, relation, dir, speed)
        }
        None => format!("{} winds ({:.0} km/h), direction unknown", strength, speed),
    }
}

/// Build the explanation for a scored observation
pub fn explain(obs: &Observation, profile: &SpotProfile, breakdown: &Breakdown) -> String {
    let mut text = format!(
        "{} {}. {}.",
        height_phrase(obs, profile),
        swell_phrase(obs, breakdown),
        wind_phrase(obs, breakdown)
    );

    if factor(breakdown, Factor::Confidence) < 60 {
        text.push_str(" Limited source agreement.");
    }
    text
}

/// Explanation when there is nothing to ride
pub fn flat(height: f64) -> String {
    format!("Flat: no rideable surf ({:.1}m).", height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Compass, WaveHeight};

    fn breakdown(pairs: &[(Factor, u8)]) -> Breakdown {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_explain_full_conditions() {
        let obs = Observation {
            wave_height: WaveHeight::avg(1.4),
            wave_period: Some(13.0),
            wind_speed: Some(6.0),
            wind_direction: Some(Compass::E),
            ..Default::default()
        };
        let b = breakdown(&[
            (Factor::SwellQuality, 85),
            (Factor::WindSpeed, 98),
            (Factor::WindDirection, 100),
            (Factor::Confidence, 100),
        ]);

        let text = explain(&obs, &SpotProfile::default(), &b);
        assert_eq!(
            text,
            "Rideable 1.4m waves with clean groundswell at 13s. Light offshore winds (E 6 km/h)."
        );
    }

    #[test]
    fn test_explain_sparse_conditions() {
        let b = breakdown(&[(Factor::SwellQuality, 50), (Factor::Confidence, 40)]);
        let text = explain(&Observation::default(), &SpotProfile::default(), &b);
        assert_eq!(
            text,
            "Wave size unknown with mixed swell. Wind unknown. Limited source agreement."
        );
    }

    #[test]
    fn test_explain_is_deterministic() {
        let obs = Observation {
            wave_height: WaveHeight::avg(3.2),
            wind_speed: Some(28.0),
            ..Default::default()
        };
        let b = breakdown(&[(Factor::WindSpeed, 45), (Factor::Confidence, 75)]);
        let first = explain(&obs, &SpotProfile::default(), &b);
        let second = explain(&obs, &SpotProfile::default(), &b);
        assert_eq!(first, second);
        assert!(first.starts_with("Oversized 3.2m surf"));
        assert!(first.contains("Strong winds (28 km/h), direction unknown"));
    }

    #[test]
    fn test_flat_phrase() {
        assert_eq!(flat(0.0), "Flat: no rideable surf (0.0m).");
    }
}
