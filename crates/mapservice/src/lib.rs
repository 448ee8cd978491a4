//! Contract for the hosted map provider.
//!
//! The widget never touches the provider directly; it talks to a
//! [`MapService`] (maps, markers, geocoding, distance) and a [`ScriptHost`]
//! (loading the provider's script). The browser build implements both over
//! the Google Maps JavaScript API; [`headless`] implements both in memory.

use foundation::handles::Handle;
use foundation::math::LatLng;
use runtime::Ticket;
use serde::{Deserialize, Serialize};

pub mod binding;
pub mod headless;

pub use binding::*;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MapHandle(pub Handle);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerHandle(pub Handle);

impl std::fmt::Display for MapHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "map:{}", self.0)
    }
}

impl std::fmt::Display for MarkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "marker:{}", self.0)
    }
}

/// `{ lat, lng }` literal as the provider accepts it.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLngLiteral {
    pub lat: f64,
    pub lng: f64,
}

impl From<LatLng> for LatLngLiteral {
    fn from(p: LatLng) -> Self {
        Self {
            lat: p.lat(),
            lng: p.lng(),
        }
    }
}

impl From<LatLngLiteral> for LatLng {
    fn from(p: LatLngLiteral) -> Self {
        LatLng::new(p.lat, p.lng)
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapType {
    #[default]
    Roadmap,
    Satellite,
    Hybrid,
    Terrain,
}

/// Map construction options, serialized with the provider's field names.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapOptions {
    pub zoom: u8,
    pub center: LatLngLiteral,
    pub map_type_control: bool,
    pub street_view_control: bool,
    pub rotate_control: bool,
    pub scale_control: bool,
    pub fullscreen_control: bool,
    pub pan_control: bool,
    pub zoom_control: bool,
    pub gesture_handling: String,
    #[serde(rename = "mapTypeId")]
    pub map_type: MapType,
    pub draggable_cursor: String,
}

impl MapOptions {
    /// The widget's fixed chrome: scale and zoom controls only, cooperative
    /// gestures, pointer cursor.
    pub fn widget(center: LatLng, zoom: u8, map_type_control: bool) -> Self {
        Self {
            zoom,
            center: center.into(),
            map_type_control,
            street_view_control: false,
            rotate_control: false,
            scale_control: true,
            fullscreen_control: false,
            pan_control: false,
            zoom_control: true,
            gesture_handling: "cooperative".to_string(),
            map_type: MapType::Roadmap,
            draggable_cursor: "pointer".to_string(),
        }
    }
}

/// SVG path of the point-marker pin (outline plus inner dot).
pub const PIN_PATH: &str = "M11.0639 15.3003L26.3642 2.47559e-05L41.6646 15.3003L26.3638 51.3639L11.0639 15.3003 M22,17.5a4.5,4.5 0 1,0 9,0a4.5,4.5 0 1,0 -9,0Z";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IconSpec {
    Image {
        url: String,
    },
    #[serde(rename_all = "camelCase")]
    Symbol {
        path: String,
        fill_color: String,
        fill_opacity: f64,
        stroke_color: String,
        stroke_weight: f64,
        /// Pixel anchor; the provider needs a `Point` object, so adapters
        /// attach it after serialization.
        #[serde(skip)]
        anchor: (f64, f64),
    },
}

impl IconSpec {
    pub fn image(url: impl Into<String>) -> Self {
        IconSpec::Image { url: url.into() }
    }

    pub fn pin(fill_color: impl Into<String>) -> Self {
        IconSpec::Symbol {
            path: PIN_PATH.to_string(),
            fill_color: fill_color.into(),
            fill_opacity: 0.8,
            stroke_color: "pink".to_string(),
            stroke_weight: 2.0,
            anchor: (30.0, 50.0),
        }
    }

    pub fn anchor(&self) -> Option<(f64, f64)> {
        match self {
            IconSpec::Image { .. } => None,
            IconSpec::Symbol { anchor, .. } => Some(*anchor),
        }
    }
}

/// Status code delivered with a reverse-geocode completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeocodeStatus {
    Ok,
    ZeroResults,
    OverQueryLimit,
    OverDailyLimit,
    RequestDenied,
    InvalidRequest,
    UnknownError,
    Error,
    Other(String),
}

impl GeocodeStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "OK" => GeocodeStatus::Ok,
            "ZERO_RESULTS" => GeocodeStatus::ZeroResults,
            "OVER_QUERY_LIMIT" => GeocodeStatus::OverQueryLimit,
            "OVER_DAILY_LIMIT" => GeocodeStatus::OverDailyLimit,
            "REQUEST_DENIED" => GeocodeStatus::RequestDenied,
            "INVALID_REQUEST" => GeocodeStatus::InvalidRequest,
            "UNKNOWN_ERROR" => GeocodeStatus::UnknownError,
            "ERROR" => GeocodeStatus::Error,
            other => GeocodeStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            GeocodeStatus::Ok => "OK",
            GeocodeStatus::ZeroResults => "ZERO_RESULTS",
            GeocodeStatus::OverQueryLimit => "OVER_QUERY_LIMIT",
            GeocodeStatus::OverDailyLimit => "OVER_DAILY_LIMIT",
            GeocodeStatus::RequestDenied => "REQUEST_DENIED",
            GeocodeStatus::InvalidRequest => "INVALID_REQUEST",
            GeocodeStatus::UnknownError => "UNKNOWN_ERROR",
            GeocodeStatus::Error => "ERROR",
            GeocodeStatus::Other(s) => s,
        }
    }

    pub fn is_ok(&self) -> bool {
        *self == GeocodeStatus::Ok
    }
}

impl std::fmt::Display for GeocodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocodeResult {
    pub formatted_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocodeResponse {
    pub status: GeocodeStatus,
    pub results: Vec<GeocodeResult>,
}

impl GeocodeResponse {
    pub fn ok(address: impl Into<String>) -> Self {
        Self {
            status: GeocodeStatus::Ok,
            results: vec![GeocodeResult {
                formatted_address: address.into(),
            }],
        }
    }

    pub fn failed(status: GeocodeStatus) -> Self {
        Self {
            status,
            results: Vec::new(),
        }
    }

    /// Address of the best match, when the request succeeded.
    pub fn best_address(&self) -> Option<&str> {
        if !self.status.is_ok() {
            return None;
        }
        self.results.first().map(|r| r.formatted_address.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// No element with this id exists to host the map.
    ContainerMissing(String),
    UnknownMap(MapHandle),
    UnknownMarker(MarkerHandle),
    /// Failure reported by the provider's script.
    Provider(String),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::ContainerMissing(id) => write!(f, "map container `{id}` not found"),
            ServiceError::UnknownMap(h) => write!(f, "unknown {h}"),
            ServiceError::UnknownMarker(h) => write!(f, "unknown {h}"),
            ServiceError::Provider(msg) => write!(f, "map provider error: {msg}"),
        }
    }
}

impl std::error::Error for ServiceError {}

/// Operations the widget needs from the map provider.
///
/// Events flow the other way: the host forwards map clicks, marker clicks
/// and geocode completions for subscribed targets back into the shell.
pub trait MapService {
    fn create_map(&mut self, container: &str, options: &MapOptions)
    -> Result<MapHandle, ServiceError>;

    fn create_marker(
        &mut self,
        map: MapHandle,
        position: LatLng,
        icon: &IconSpec,
    ) -> Result<MarkerHandle, ServiceError>;

    fn marker_position(&self, marker: MarkerHandle) -> Option<LatLng>;

    fn subscribe_map_clicks(&mut self, map: MapHandle) -> Result<(), ServiceError>;

    fn subscribe_marker_clicks(&mut self, marker: MarkerHandle) -> Result<(), ServiceError>;

    /// Starts a reverse-geocode; the completion is delivered exactly once,
    /// tagged with `ticket`.
    fn request_geocode(&mut self, ticket: Ticket, coordinate: LatLng);

    fn compute_distance_m(&self, a: LatLng, b: LatLng) -> f64;

    fn pan_to(&mut self, map: MapHandle, center: LatLng) -> Result<(), ServiceError>;

    fn set_zoom(&mut self, map: MapHandle, zoom: u8) -> Result<(), ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::{GeocodeResponse, GeocodeStatus, IconSpec, MapOptions};
    use foundation::math::LatLng;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn map_options_use_provider_field_names() {
        let opts = MapOptions::widget(LatLng::new(65.166013499, 13.3698147), 4, true);
        let v = serde_json::to_value(&opts).unwrap();
        assert_eq!(
            v,
            json!({
                "zoom": 4,
                "center": { "lat": 65.166013499, "lng": 13.3698147 },
                "mapTypeControl": true,
                "streetViewControl": false,
                "rotateControl": false,
                "scaleControl": true,
                "fullscreenControl": false,
                "panControl": false,
                "zoomControl": true,
                "gestureHandling": "cooperative",
                "mapTypeId": "roadmap",
                "draggableCursor": "pointer"
            })
        );
    }

    #[test]
    fn pin_icon_serializes_without_anchor() {
        let icon = IconSpec::pin("#000000");
        let v = serde_json::to_value(&icon).unwrap();
        assert_eq!(v["fillColor"], "#000000");
        assert_eq!(v["strokeColor"], "pink");
        assert_eq!(v["fillOpacity"], 0.8);
        assert!(v.get("anchor").is_none());
        assert_eq!(icon.anchor(), Some((30.0, 50.0)));
    }

    #[test]
    fn image_icon_is_a_bare_url() {
        let v = serde_json::to_value(IconSpec::image("/home.png")).unwrap();
        assert_eq!(v, json!({ "url": "/home.png" }));
    }

    #[test]
    fn status_parse_round_trips_known_and_unknown_codes() {
        assert_eq!(GeocodeStatus::parse("OK"), GeocodeStatus::Ok);
        assert_eq!(GeocodeStatus::parse("ZERO_RESULTS"), GeocodeStatus::ZeroResults);
        let odd = GeocodeStatus::parse("SOMETHING_NEW");
        assert_eq!(odd, GeocodeStatus::Other("SOMETHING_NEW".to_string()));
        assert_eq!(odd.as_str(), "SOMETHING_NEW");
    }

    #[test]
    fn best_address_requires_ok_and_a_result() {
        assert_eq!(GeocodeResponse::ok("Bodø").best_address(), Some("Bodø"));
        assert_eq!(
            GeocodeResponse::failed(GeocodeStatus::ZeroResults).best_address(),
            None
        );
        let empty_ok = GeocodeResponse {
            status: GeocodeStatus::Ok,
            results: Vec::new(),
        };
        assert_eq!(empty_ok.best_address(), None);
    }
}
