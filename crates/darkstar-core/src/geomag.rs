//! First-order geomagnetic model for magnetic declination.
//!
//! Evaluates the dipole (degree 1) terms of the IGRF-13 field at the given
//! position and time. Bearings read to a pilot must be magnetic, so every
//! reported bearing is corrected by the declination computed here. The dipole
//! truncation is coarse next to the full spherical-harmonic model but stays
//! within a few degrees over the mid-latitude theaters the simulator covers.

use chrono::{DateTime, Datelike, Utc};
use thiserror::Error;

use crate::spatial::Point;

// IGRF-13 epoch 2020.0 degree-1 Gauss coefficients (nT) and their secular
// variation (nT/yr).
const EPOCH: f64 = 2020.0;
const G10: f64 = -29_404.8;
const G11: f64 = -1_450.9;
const H11: f64 = 4_652.5;
const G10_DOT: f64 = 5.7;
const G11_DOT: f64 = 7.4;
const H11_DOT: f64 = -25.9;

// Coefficients are extrapolated linearly; past this horizon the secular
// variation is no longer trustworthy.
const VALID_YEARS: std::ops::Range<f64> = 2020.0..2035.0;

// Below this horizontal field strength (nT) the compass direction is
// undefined (blackout zone around the geomagnetic poles).
const MIN_HORIZONTAL_NT: f64 = 1_000.0;

#[derive(Debug, Error)]
pub enum DeclinationError {
    #[error("date {0:.1} is outside the geomagnetic model validity window")]
    DateOutOfRange(f64),
    #[error("horizontal field too weak at {lat:.2}, {lon:.2} to define declination")]
    BlackoutZone { lat: f64, lon: f64 },
    #[error("non-finite position")]
    InvalidPosition,
}

/// Magnetic declination in degrees at a point and time, positive east.
///
/// `magnetic = true - declination`.
pub fn declination(point: Point, time: DateTime<Utc>) -> Result<f64, DeclinationError> {
    if !point.lat.is_finite() || !point.lon.is_finite() {
        return Err(DeclinationError::InvalidPosition);
    }

    let year = decimal_year(time);
    if !VALID_YEARS.contains(&year) {
        return Err(DeclinationError::DateOutOfRange(year));
    }
    let dt = year - EPOCH;
    let g10 = G10 + G10_DOT * dt;
    let g11 = G11 + G11_DOT * dt;
    let h11 = H11 + H11_DOT * dt;

    let colat = (90.0 - point.lat).to_radians();
    let phi = point.lon.to_radians();

    // Field components at the surface from the dipole potential:
    // north X = -B_theta, east Y = B_phi.
    let sectoral = g11 * phi.cos() + h11 * phi.sin();
    let x = -g10 * colat.sin() + sectoral * colat.cos();
    let y = g11 * phi.sin() - h11 * phi.cos();

    if (x * x + y * y).sqrt() < MIN_HORIZONTAL_NT {
        return Err(DeclinationError::BlackoutZone {
            lat: point.lat,
            lon: point.lon,
        });
    }

    Ok(y.atan2(x).to_degrees())
}

fn decimal_year(time: DateTime<Utc>) -> f64 {
    time.year() as f64 + (time.ordinal0() as f64) / 365.25
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn mission_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn declination_is_finite_at_mid_latitudes() {
        let d = declination(Point::new(40.0, 30.0), mission_time()).unwrap();
        assert!(d.is_finite());
        assert!(d.abs() < 30.0, "dipole declination should be modest: {d}");
    }

    #[test]
    fn declination_small_near_dipole_meridian() {
        // The dipole axis sits near 72.7W; along that meridian at mid
        // latitude the dipole field points almost true north.
        let d = declination(Point::new(40.0, -72.7), mission_time()).unwrap();
        assert!(d.abs() < 3.0, "d={d}");
    }

    #[test]
    fn date_outside_validity_is_rejected() {
        let t = Utc.with_ymd_and_hms(1995, 1, 1, 0, 0, 0).unwrap();
        let err = declination(Point::new(40.0, 30.0), t).unwrap_err();
        assert!(matches!(err, DeclinationError::DateOutOfRange(_)));
    }

    #[test]
    fn geomagnetic_pole_is_a_blackout_zone() {
        // Dipole north pole, where the horizontal field vanishes.
        let err = declination(Point::new(80.6, -72.7), mission_time());
        assert!(matches!(err, Err(DeclinationError::BlackoutZone { .. })));
    }

    #[test]
    fn non_finite_position_is_rejected() {
        let err = declination(Point::new(f64::NAN, 0.0), mission_time());
        assert!(matches!(err, Err(DeclinationError::InvalidPosition)));
    }
}
