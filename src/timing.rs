//! Timing synchronizer (spec §4.1): derives dot/dash/space durations from
//! user-level parameters according to the PARIS calibration.

use crate::error::CwError;

pub const MIN_SPEED_WPM: u32 = 4;
pub const MAX_SPEED_WPM: u32 = 60;
pub const MIN_FREQUENCY_HZ: u32 = 0;
pub const MAX_FREQUENCY_HZ: u32 = 4000;
pub const MIN_VOLUME_PERCENT: u32 = 0;
pub const MAX_VOLUME_PERCENT: u32 = 100;
pub const MIN_GAP: u32 = 0;
pub const MAX_GAP: u32 = 60;
pub const MIN_WEIGHTING: u32 = 20;
pub const MAX_WEIGHTING: u32 = 80;

/// Durations (microseconds) derived from `(send_speed, weighting, gap)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timing {
    pub dot_len_us: i64,
    pub dash_len_us: i64,
    pub eom_space_len_us: i64,
    pub eoc_space_len_us: i64,
    pub eow_space_len_us: i64,
    pub additional_space_len_us: i64,
    pub adjustment_space_len_us: i64,
}

impl Timing {
    /// Recompute from scratch. Mirrors the integer arithmetic in spec §4.1
    /// exactly, including truncating division, so downstream callers get
    /// bit-for-bit the same durations the reference implementation would.
    pub fn compute(send_speed: u32, weighting: u32, gap: u32) -> Timing {
        let unit = 1_200_000i64 / send_speed as i64;
        let weight_adj = (2 * (weighting as i64 - 50) * unit) / 100;
        let dot_len_us = unit + weight_adj;
        let dash_len_us = 3 * dot_len_us;
        let eom_space_len_us = unit - (28 * weight_adj) / 22;
        let eoc_space_len_us = 3 * unit - eom_space_len_us;
        let eow_space_len_us = 7 * unit - eoc_space_len_us;
        let additional_space_len_us = gap as i64 * unit;
        let adjustment_space_len_us = (7 * additional_space_len_us) / 3;

        Timing {
            dot_len_us,
            dash_len_us,
            eom_space_len_us,
            eoc_space_len_us,
            eow_space_len_us,
            additional_space_len_us,
            adjustment_space_len_us,
        }
    }
}

pub fn validate_speed(wpm: u32) -> Result<u32, CwError> {
    if !(MIN_SPEED_WPM..=MAX_SPEED_WPM).contains(&wpm) {
        return Err(CwError::Invalid(format!(
            "speed {wpm} wpm out of range [{MIN_SPEED_WPM}, {MAX_SPEED_WPM}]"
        )));
    }
    Ok(wpm)
}

pub fn validate_frequency(hz: u32) -> Result<u32, CwError> {
    if !(MIN_FREQUENCY_HZ..=MAX_FREQUENCY_HZ).contains(&hz) {
        return Err(CwError::Invalid(format!(
            "frequency {hz} hz out of range [{MIN_FREQUENCY_HZ}, {MAX_FREQUENCY_HZ}]"
        )));
    }
    Ok(hz)
}

pub fn validate_volume(percent: u32) -> Result<u32, CwError> {
    if !(MIN_VOLUME_PERCENT..=MAX_VOLUME_PERCENT).contains(&percent) {
        return Err(CwError::Invalid(format!(
            "volume {percent}% out of range [{MIN_VOLUME_PERCENT}, {MAX_VOLUME_PERCENT}]"
        )));
    }
    Ok(percent)
}

pub fn validate_gap(gap: u32) -> Result<u32, CwError> {
    if !(MIN_GAP..=MAX_GAP).contains(&gap) {
        return Err(CwError::Invalid(format!(
            "gap {gap} out of range [{MIN_GAP}, {MAX_GAP}]"
        )));
    }
    Ok(gap)
}

pub fn validate_weighting(weighting: u32) -> Result<u32, CwError> {
    if !(MIN_WEIGHTING..=MAX_WEIGHTING).contains(&weighting) {
        return Err(CwError::Invalid(format!(
            "weighting {weighting}% out of range [{MIN_WEIGHTING}, {MAX_WEIGHTING}]"
        )));
    }
    Ok(weighting)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_at_weighting_50_gap_0() {
        let t = Timing::compute(20, 50, 0);
        let unit = 1_200_000 / 20;
        assert_eq!(t.dot_len_us, unit);
        assert_eq!(t.dash_len_us, 3 * unit);
        assert_eq!(t.eom_space_len_us, unit);
        assert_eq!(t.eoc_space_len_us, 2 * unit);
        assert_eq!(t.eow_space_len_us, 4 * unit);
    }

    #[test]
    fn dot_len_at_20_wpm() {
        // PARIS calibration: one dot-unit at 20 wpm is 60ms.
        let t = Timing::compute(20, 50, 0);
        assert_eq!(t.dot_len_us, 60_000);
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(validate_speed(3).is_err());
        assert!(validate_speed(61).is_err());
        assert!(validate_frequency(4001).is_err());
        assert!(validate_volume(101).is_err());
        assert!(validate_gap(61).is_err());
        assert!(validate_weighting(19).is_err());
        assert!(validate_weighting(81).is_err());
    }

    #[test]
    fn accepts_boundaries() {
        assert!(validate_speed(4).is_ok());
        assert!(validate_speed(60).is_ok());
        assert!(validate_weighting(20).is_ok());
        assert!(validate_weighting(80).is_ok());
    }
}
