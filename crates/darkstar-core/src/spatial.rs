//! Spatial math for track correlation and tactical queries.

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub const METERS_PER_NM: f64 = 1_852.0;
pub const FEET_PER_METER: f64 = 3.280_839_895;
/// Meters per second to knots.
pub const MPS_TO_KNOTS: f64 = 1.943_844_49;

/// A geographic point in decimal degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

impl Point {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// The exact origin is used as a sentinel for "no position" and is
    /// filtered from every query result.
    pub fn is_zero(&self) -> bool {
        self.lat == 0.0 && self.lon == 0.0
    }
}

/// Great-circle distance between two points in meters (haversine).
pub fn haversine_distance(a: Point, b: Point) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lon - a.lon).to_radians();
    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Great-circle distance in nautical miles.
pub fn distance_nm(a: Point, b: Point) -> f64 {
    haversine_distance(a, b) / METERS_PER_NM
}

/// Initial true bearing from `a` to `b` in degrees, normalized to [0, 360).
pub fn bearing_deg(a: Point, b: Point) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let delta_lambda = (b.lon - a.lon).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    normalize_deg(x.atan2(y).to_degrees())
}

/// Normalize an angle in degrees to [0, 360).
pub fn normalize_deg(deg: f64) -> f64 {
    deg.rem_euclid(360.0)
}

/// Signed smallest difference `a - b` in degrees, in (-180, 180].
pub fn angular_delta_deg(a: f64, b: f64) -> f64 {
    let d = normalize_deg(a - b);
    if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

/// Reciprocal of a bearing in degrees.
pub fn reciprocal_deg(deg: f64) -> f64 {
    normalize_deg(deg + 180.0)
}

/// Mean of headings resolved across the 360/0 wrap boundary.
///
/// Averages the headings as unit vectors so that e.g. 350 and 010 yield 0,
/// not 180. Returns 0 for an empty slice.
pub fn mean_heading_deg(headings: &[f64]) -> f64 {
    if headings.is_empty() {
        return 0.0;
    }
    let (mut x, mut y) = (0.0, 0.0);
    for h in headings {
        let r = h.to_radians();
        x += r.sin();
        y += r.cos();
    }
    if x.abs() < f64::EPSILON && y.abs() < f64::EPSILON {
        return 0.0;
    }
    normalize_deg(x.atan2(y).to_degrees())
}

/// Geographic centroid (arithmetic mean of coordinates).
///
/// Good enough at theater scale; groups are at most a few nautical miles
/// across so the spherical error is negligible.
pub fn centroid(points: &[Point]) -> Point {
    if points.is_empty() {
        return Point::default();
    }
    let n = points.len() as f64;
    Point {
        lat: points.iter().map(|p| p.lat).sum::<f64>() / n,
        lon: points.iter().map(|p| p.lon).sum::<f64>() / n,
    }
}
