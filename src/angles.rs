use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

use crate::error::Result;
use crate::types::{GeoTime, Orientation, SolarPosition};

pub const EARTH_AXIAL_TILT: f64 = 23.45;
pub const DEGREES_PER_HOUR: f64 = 15.0;

/// Below this sin(zenith) the sun is treated as overhead and azimuth as 0.
const ZENITH_SINGULARITY: f64 = 1e-3;

pub fn deg_to_rad(deg: f64) -> f64 {
    deg * (std::f64::consts::PI / 180.0)
}

pub fn rad_to_deg(rad: f64) -> f64 {
    rad * (180.0 / std::f64::consts::PI)
}

pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid rounds tiny negatives up to exactly 360.0
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

pub fn leap_year(year: i32) -> bool {
    (year % 400 == 0) || (year % 4 == 0 && year % 100 != 0)
}

pub fn days_in_months(year: i32) -> [u32; 12] {
    [
        31,
        if leap_year(year) { 29 } else { 28 },
        31, 30, 31, 30, 31, 31, 30, 31, 30, 31,
    ]
}

/// `month` is 1-based; values outside 1..=12 are clamped to January or
/// December.
pub fn day_of_year(year: i32, month: u32, day: u32) -> i32 {
    let dim = days_in_months(year);
    let month = month.clamp(1, 12);
    let sum: u32 = dim[..(month - 1) as usize].iter().sum();
    sum.saturating_add(day).min(i32::MAX as u32) as i32
}

pub fn intermediate_angle_b(n: i32) -> f64 {
    deg_to_rad((n - 1) as f64 * (360.0 / 365.0))
}

/// Equation of time in minutes.
pub fn equation_of_time(n: i32) -> f64 {
    let b = intermediate_angle_b(n);
    229.18
        * (0.000075
            + 0.001868 * b.cos()
            - 0.032077 * b.sin()
            - 0.014615 * (2.0 * b).cos()
            - 0.040849 * (2.0 * b).sin())
}

/// Hours to add to UTC to get local solar time.
pub fn utc_lst_correction(longitude: f64, eot: f64) -> f64 {
    (4.0 * longitude + eot) / 60.0
}

pub fn hour_angle(local_solar_time: f64) -> f64 {
    DEGREES_PER_HOUR * (local_solar_time - 12.0)
}

pub fn solar_declination(n: i32) -> f64 {
    EARTH_AXIAL_TILT * deg_to_rad(360.0 * ((284 + n) as f64 / 365.0)).sin()
}

pub fn solar_zenith_angle(latitude: f64, declination: f64, hour_angle: f64) -> f64 {
    let lat_rad = deg_to_rad(latitude);
    let dec_rad = deg_to_rad(declination);
    let ha_rad = deg_to_rad(hour_angle);
    let cos_zenith =
        lat_rad.sin() * dec_rad.sin() + lat_rad.cos() * dec_rad.cos() * ha_rad.cos();
    rad_to_deg(cos_zenith.clamp(-1.0, 1.0).acos())
}

pub fn solar_altitude(zenith_angle: f64) -> f64 {
    90.0 - zenith_angle
}

/// Solar azimuth, clockwise from north. The arccos only covers [0, 180], so
/// afternoon positions (positive hour angle) are mirrored into the western
/// half.
pub fn solar_azimuth(latitude: f64, declination: f64, hour_angle: f64) -> f64 {
    let lat_rad = deg_to_rad(latitude);
    let dec_rad = deg_to_rad(declination);
    let ha_rad = deg_to_rad(hour_angle);
    let zenith_rad = deg_to_rad(solar_zenith_angle(latitude, declination, hour_angle));
    let sin_zenith = zenith_rad.sin();
    if sin_zenith < ZENITH_SINGULARITY {
        return 0.0;
    }
    let cos_az = (dec_rad.sin() * lat_rad.cos() - dec_rad.cos() * lat_rad.sin() * ha_rad.cos())
        / sin_zenith;
    let az = rad_to_deg(cos_az.clamp(-1.0, 1.0).acos());
    if hour_angle > 0.0 {
        normalize_angle(360.0 - az)
    } else {
        normalize_angle(az)
    }
}

pub fn solar_angles_at(
    latitude: f64,
    decl: f64,
    correction: f64,
    utc_hours: f64,
) -> (f64, f64, f64, f64, f64) {
    let lst = (utc_hours + correction).rem_euclid(24.0);
    let ha = hour_angle(lst);
    let z = solar_zenith_angle(latitude, decl, ha);
    let alt = solar_altitude(z);
    let azim = solar_azimuth(latitude, decl, ha);
    (lst, ha, z, alt, azim)
}

pub fn solar_position<Tz: TimeZone>(
    latitude: f64,
    longitude: f64,
    dt: &DateTime<Tz>,
) -> SolarPosition {
    let utc = dt.with_timezone(&Utc);
    let utc_hours = utc.hour() as f64 + utc.minute() as f64 / 60.0 + utc.second() as f64 / 3600.0;
    let n = day_of_year(utc.year(), utc.month(), utc.day());
    let eot = equation_of_time(n);
    let decl = solar_declination(n);
    let correction = utc_lst_correction(longitude, eot);
    let (lst, ha, zenith, alt, azim) = solar_angles_at(latitude, decl, correction, utc_hours);
    SolarPosition {
        day_of_year: n,
        declination: decl,
        equation_of_time: eot,
        local_solar_time: lst,
        hour_angle: ha,
        zenith,
        altitude: alt,
        azimuth: azim,
    }
}

/// Dual-axis pose that faces the sun: tilt equals the zenith angle and the
/// panel azimuth follows the solar azimuth.
pub fn tracking_target(pos: &SolarPosition) -> Orientation {
    Orientation::new(pos.zenith, pos.azimuth)
}

pub fn optimal_fixed_tilt(latitude: f64) -> f64 {
    0.76 * latitude.abs() + 3.1
}

/// Stateless solar geometry for one tracker site.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolarGeometryModel;

impl SolarGeometryModel {
    pub fn new() -> Self {
        Self
    }

    /// Sun position for `geo`. Deterministic: identical input gives
    /// bit-identical output.
    pub fn compute(&self, geo: &GeoTime) -> Result<SolarPosition> {
        geo.validate()?;
        Ok(solar_position(geo.latitude, geo.longitude, &geo.timestamp))
    }

    /// Astronomical target, or `None` when the sun is below the horizon and
    /// azimuth is meaningless for tracking.
    pub fn nominal_target(&self, pos: &SolarPosition) -> Option<Orientation> {
        pos.is_above_horizon().then(|| tracking_target(pos))
    }
}
