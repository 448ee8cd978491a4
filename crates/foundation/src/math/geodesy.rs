/// WGS84 semi-major axis (meters).
pub const WGS84_A: f64 = 6_378_137.0;

/// Sphere radius used for great-circle distances (meters).
///
/// Matches the default radius of the hosted map provider's spherical
/// geometry library, so locally computed distances agree with it.
pub const SPHERE_RADIUS_M: f64 = WGS84_A;

/// Geographic coordinate in degrees.
///
/// Latitude is clamped to `[-90, 90]` and longitude wrapped to `[-180, 180)`
/// on construction.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LatLng {
    lat_deg: f64,
    lng_deg: f64,
}

impl LatLng {
    pub fn new(lat_deg: f64, lng_deg: f64) -> Self {
        Self {
            lat_deg: lat_deg.clamp(-90.0, 90.0),
            lng_deg: wrap_longitude(lng_deg),
        }
    }

    pub fn lat(self) -> f64 {
        self.lat_deg
    }

    pub fn lng(self) -> f64 {
        self.lng_deg
    }

    pub fn is_finite(self) -> bool {
        self.lat_deg.is_finite() && self.lng_deg.is_finite()
    }
}

impl std::fmt::Display for LatLng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.lat_deg, self.lng_deg)
    }
}

fn wrap_longitude(lng_deg: f64) -> f64 {
    if (-180.0..180.0).contains(&lng_deg) {
        lng_deg
    } else {
        (lng_deg + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Central angle between two coordinates (radians), haversine form.
pub fn central_angle_rad(a: LatLng, b: LatLng) -> f64 {
    let lat1 = a.lat().to_radians();
    let lat2 = b.lat().to_radians();
    let dlat = lat2 - lat1;
    let dlng = (b.lng() - a.lng()).to_radians();

    let s_lat = (dlat * 0.5).sin();
    let s_lng = (dlng * 0.5).sin();
    let h = s_lat * s_lat + lat1.cos() * lat2.cos() * s_lng * s_lng;
    2.0 * h.sqrt().min(1.0).asin()
}

/// Great-circle distance on a sphere of radius [`SPHERE_RADIUS_M`] (meters).
pub fn spherical_distance_m(a: LatLng, b: LatLng) -> f64 {
    central_angle_rad(a, b) * SPHERE_RADIUS_M
}
