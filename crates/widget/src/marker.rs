use foundation::math::LatLng;
use mapservice::MarkerHandle;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MarkerKind {
    Home,
    Point,
}

/// A marker the coordinator placed on its map.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedMarker {
    pub handle: MarkerHandle,
    pub position: LatLng,
    pub kind: MarkerKind,
    /// Reverse-geocoded address; `None` for the home marker.
    pub address: Option<String>,
}

/// Outcome of a successful reverse geocode.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl ResolvedLocation {
    pub fn new(address: impl Into<String>, at: LatLng) -> Self {
        Self {
            address: address.into(),
            latitude: at.lat(),
            longitude: at.lng(),
        }
    }

    pub fn coordinate(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }
}

/// Whole kilometers between a marker and home; `-1` until first computed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DistanceKm(i64);

impl DistanceKm {
    pub const UNSET: DistanceKm = DistanceKm(-1);

    /// Rounds to the nearest kilometer. Negative or NaN input reads as 0.
    pub fn from_meters(meters: f64) -> Self {
        let km = (meters.max(0.0) / 1000.0).round();
        DistanceKm(km as i64)
    }

    pub fn value(self) -> i64 {
        self.0
    }

    pub fn is_set(self) -> bool {
        self.0 > -1
    }
}

impl Default for DistanceKm {
    fn default() -> Self {
        DistanceKm::UNSET
    }
}

impl std::fmt::Display for DistanceKm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Home marker plus user-placed markers, in placement order.
///
/// Append-only: markers live for the whole session.
#[derive(Debug, Default)]
pub struct MarkerSet {
    home: Option<PlacedMarker>,
    points: Vec<PlacedMarker>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the home marker. Returns `false` if one is already recorded.
    pub fn set_home(&mut self, handle: MarkerHandle, position: LatLng) -> bool {
        if self.home.is_some() {
            return false;
        }
        self.home = Some(PlacedMarker {
            handle,
            position,
            kind: MarkerKind::Home,
            address: None,
        });
        true
    }

    pub fn push_point(&mut self, handle: MarkerHandle, location: &ResolvedLocation) {
        self.points.push(PlacedMarker {
            handle,
            position: location.coordinate(),
            kind: MarkerKind::Point,
            address: Some(location.address.clone()),
        });
    }

    pub fn home(&self) -> Option<&PlacedMarker> {
        self.home.as_ref()
    }

    pub fn points(&self) -> &[PlacedMarker] {
        &self.points
    }

    pub fn get(&self, handle: MarkerHandle) -> Option<&PlacedMarker> {
        self.home
            .iter()
            .chain(self.points.iter())
            .find(|m| m.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.points.len() + usize::from(self.home.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
