//! Angle normalization and small spherical helpers shared by the tiler.
//!
//! Tile centers are produced by averaging bounding-box edges, which can push a
//! right ascension past 0°/360° or a declination past a pole. The helpers in
//! this module bring such values back into their canonical ranges:
//!
//! - right ascension wraps cyclically into `[0, 360)`;
//! - declination reflects at the crossed pole into `[-90, 90]`.
//!
//! Both operations are single-excursion: a value more than one range width
//! outside the bounds is not folded repeatedly and will stay out of range.
//! Callers only ever feed box midpoints, which are at most one field of view
//! away from a valid coordinate.

/// One full revolution in degrees.
pub const FULL_TURN_DEG: f64 = 360.0;

/// Canonical right ascension bounds, half-open on the upper side.
pub const RA_RANGE: (f64, f64) = (0.0, 360.0);

/// Canonical declination bounds.
pub const DEC_RANGE: (f64, f64) = (-90.0, 90.0);

/// Cosine values below this are treated as a pole singularity.
pub const POLE_COS_EPSILON: f64 = 1e-9;

/// Normalize `value` into `[min_val, max_val]` with one wrap or reflection.
///
/// Ranges spanning a full turn (right ascension) are cyclic and half-open, so
/// a value equal to `max_val` maps to `min_val`. Narrower ranges
/// (declination) are mirrored at the crossed boundary, which is what happens
/// to a pointing that is pushed over a pole.
///
/// # Examples
///
/// ```
/// use gw_tiler::core::geometry::wrap_to_range;
///
/// assert_eq!(wrap_to_range(395.25, 0.0, 360.0), 35.25);
/// assert_eq!(wrap_to_range(-115.0, -90.0, 90.0), -65.0);
/// assert_eq!(wrap_to_range(42.0, 0.0, 360.0), 42.0);
/// ```
pub fn wrap_to_range(value: f64, min_val: f64, max_val: f64) -> f64 {
    if max_val - min_val >= FULL_TURN_DEG {
        wrap_cyclic(value, min_val, max_val)
    } else {
        reflect_into(value, min_val, max_val)
    }
}

/// Cyclic single wrap into the half-open range `[min_val, max_val)`.
pub fn wrap_cyclic(value: f64, min_val: f64, max_val: f64) -> f64 {
    let wrapped = if value < min_val {
        max_val - (min_val - value)
    } else if value >= max_val {
        min_val + (value - max_val)
    } else {
        value
    };

    // A tiny negative input rounds to exactly `max_val` after subtraction.
    if wrapped >= max_val && value < max_val {
        min_val
    } else {
        wrapped
    }
}

/// Single reflection into the closed range `[min_val, max_val]`.
pub fn reflect_into(value: f64, min_val: f64, max_val: f64) -> f64 {
    if value < min_val {
        min_val + (min_val - value)
    } else if value > max_val {
        max_val - (value - max_val)
    } else {
        value
    }
}

/// Normalize a right ascension into `[0, 360)`.
pub fn normalize_ra(ra_deg: f64) -> f64 {
    wrap_to_range(ra_deg, RA_RANGE.0, RA_RANGE.1)
}

/// Normalize a declination into `[-90, 90]`.
pub fn normalize_dec(dec_deg: f64) -> f64 {
    wrap_to_range(dec_deg, DEC_RANGE.0, DEC_RANGE.1)
}

/// Right ascension scaled by `cos(dec)`.
///
/// This flattens the sphere locally so that RA differences approximate
/// angular distances near the candidate's declination.
pub fn corrected_ra(ra_deg: f64, dec_deg: f64) -> f64 {
    ra_deg * dec_deg.to_radians().cos()
}

/// Great-circle separation between two sky positions, in degrees.
pub fn angular_separation_deg(ra1: f64, dec1: f64, ra2: f64, dec2: f64) -> f64 {
    let (ra1, dec1, ra2, dec2) = (
        ra1.to_radians(),
        dec1.to_radians(),
        ra2.to_radians(),
        dec2.to_radians(),
    );
    let sin_ddec = ((dec2 - dec1) / 2.0).sin();
    let sin_dra = ((ra2 - ra1) / 2.0).sin();
    let h = sin_ddec * sin_ddec + dec1.cos() * dec2.cos() * sin_dra * sin_dra;
    2.0 * h.sqrt().min(1.0).asin().to_degrees()
}

/// Format a position as a sexagesimal `"HHhMMmSS.SSs +DDdMMmSS.Ss"` string.
pub fn format_hms_dms(ra_deg: f64, dec_deg: f64) -> String {
    let ra_cs = (normalize_ra(ra_deg) / 15.0 * 360_000.0).round() as i64;
    let ra_cs = ra_cs.rem_euclid(24 * 360_000);
    let (h, rem) = (ra_cs / 360_000, ra_cs % 360_000);
    let (m, s_cs) = (rem / 6_000, rem % 6_000);

    let sign = if dec_deg < 0.0 { '-' } else { '+' };
    let dec_ds = (dec_deg.abs() * 36_000.0).round() as i64;
    let (d, rem) = (dec_ds / 36_000, dec_ds % 36_000);
    let (am, as_ds) = (rem / 600, rem % 600);

    format!(
        "{:02}h{:02}m{:05.2}s {}{:02}d{:02}m{:04.1}s",
        h,
        m,
        s_cs as f64 / 100.0,
        sign,
        d,
        am,
        as_ds as f64 / 10.0
    )
}
