use foundation::math::LatLng;
use mapservice::{BindingRequest, IconSpec, LatLngLiteral, MapOptions, MapType};
use runtime::ReleaseOrder;
use serde::Deserialize;

/// Environment variable holding the provider API key.
pub const API_KEY_ENV: &str = "PINPOINT_MAPS_API_KEY";
/// Optional `lat,lng` override for the home coordinate.
pub const HOME_ENV: &str = "PINPOINT_HOME";

pub const DEFAULT_HOME: LatLngLiteral = LatLngLiteral {
    lat: 65.166013499,
    lng: 13.3698147,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingApiKey,
    InvalidHome(String),
    InvalidZoom(u8),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingApiKey => {
                write!(f, "map provider API key missing (set {API_KEY_ENV})")
            }
            ConfigError::InvalidHome(s) => write!(f, "invalid home coordinate `{s}`"),
            ConfigError::InvalidZoom(z) => write!(f, "zoom level {z} out of range 0..=22"),
            ConfigError::Parse(msg) => write!(f, "config parse error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeocodeOrder {
    /// Place markers in the order the map was clicked.
    #[default]
    Click,
    /// Place markers in the order geocodes complete.
    Completion,
}

impl From<GeocodeOrder> for ReleaseOrder {
    fn from(order: GeocodeOrder) -> Self {
        match order {
            GeocodeOrder::Click => ReleaseOrder::Issue,
            GeocodeOrder::Completion => ReleaseOrder::Completion,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WidgetConfig {
    pub api_key: String,
    pub home: LatLngLiteral,
    pub default_zoom: u8,
    /// Zoom applied when the home marker is clicked.
    pub home_zoom: u8,
    pub container_id: String,
    pub map_type: MapType,
    pub map_type_control: bool,
    pub libraries: Vec<String>,
    pub language: String,
    pub region: String,
    pub version: String,
    pub home_icon_url: String,
    pub point_icon_color: String,
    pub geocode_order: GeocodeOrder,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        let binding = BindingRequest::new("");
        Self {
            api_key: String::new(),
            home: DEFAULT_HOME,
            default_zoom: 4,
            home_zoom: 10,
            container_id: "map".to_string(),
            map_type: MapType::Roadmap,
            map_type_control: true,
            libraries: binding.libraries,
            language: binding.language,
            region: binding.region,
            version: binding.version,
            home_icon_url: "/assets/images/homeAddressMarker.png".to_string(),
            point_icon_color: "#000000".to_string(),
            geocode_order: GeocodeOrder::Click,
        }
    }
}

impl WidgetConfig {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads [`API_KEY_ENV`] and [`HOME_ENV`] from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Same as [`WidgetConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        cfg.apply_lookup(lookup)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Overlays environment values on top of this config.
    pub fn apply_lookup(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.api_key = key.trim().to_string();
        }
        if let Some(home) = lookup(HOME_ENV) {
            self.home = parse_lat_lng(&home)?.into();
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        for zoom in [self.default_zoom, self.home_zoom] {
            if zoom > 22 {
                return Err(ConfigError::InvalidZoom(zoom));
            }
        }
        if !LatLng::from(self.home).is_finite() {
            return Err(ConfigError::InvalidHome(format!(
                "{},{}",
                self.home.lat, self.home.lng
            )));
        }
        Ok(())
    }

    pub fn home(&self) -> LatLng {
        self.home.into()
    }

    pub fn binding_request(&self) -> BindingRequest {
        BindingRequest {
            api_key: self.api_key.clone(),
            libraries: self.libraries.clone(),
            language: self.language.clone(),
            region: self.region.clone(),
            version: self.version.clone(),
            ..BindingRequest::new("")
        }
    }

    pub fn map_options(&self) -> MapOptions {
        MapOptions {
            map_type: self.map_type,
            ..MapOptions::widget(self.home(), self.default_zoom, self.map_type_control)
        }
    }

    pub fn home_icon(&self) -> IconSpec {
        IconSpec::image(self.home_icon_url.clone())
    }

    pub fn point_icon(&self) -> IconSpec {
        IconSpec::pin(self.point_icon_color.clone())
    }
}

/// Parses `lat,lng` in degrees.
pub fn parse_lat_lng(s: &str) -> Result<LatLng, ConfigError> {
    let invalid = || ConfigError::InvalidHome(s.to_string());
    let (lat, lng) = s.split_once(',').ok_or_else(invalid)?;
    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;
    if !lat.is_finite() || !lng.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(invalid());
    }
    Ok(LatLng::new(lat, lng))
}

#[cfg(test)]
mod tests {
    use super::{API_KEY_ENV, ConfigError, GeocodeOrder, HOME_ENV, WidgetConfig, parse_lat_lng};
    use mapservice::MapType;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_the_widget() {
        let cfg = WidgetConfig::with_api_key("k");
        assert_eq!(cfg.home().lat(), 65.166013499);
        assert_eq!(cfg.home().lng(), 13.3698147);
        assert_eq!(cfg.default_zoom, 4);
        assert_eq!(cfg.home_zoom, 10);
        assert_eq!(cfg.geocode_order, GeocodeOrder::Click);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn missing_key_is_rejected() {
        assert_eq!(
            WidgetConfig::from_lookup(|_| None),
            Err(ConfigError::MissingApiKey)
        );
        assert_eq!(
            WidgetConfig::from_json_str(r#"{ "api_key": "  " }"#),
            Err(ConfigError::MissingApiKey)
        );
    }

    #[test]
    fn lookup_reads_key_and_home() {
        let cfg = WidgetConfig::from_lookup(|k| match k {
            API_KEY_ENV => Some("secret".to_string()),
            HOME_ENV => Some("59.91, 10.75".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.api_key, "secret");
        assert_eq!(cfg.home().lat(), 59.91);
        assert_eq!(cfg.home().lng(), 10.75);
    }

    #[test]
    fn json_overrides_selected_fields() {
        let cfg = WidgetConfig::from_json_str(
            r#"{ "api_key": "k", "home_zoom": 12, "geocode_order": "completion" }"#,
        )
        .unwrap();
        assert_eq!(cfg.home_zoom, 12);
        assert_eq!(cfg.geocode_order, GeocodeOrder::Completion);
        assert_eq!(cfg.container_id, "map");
    }

    #[test]
    fn map_type_reaches_map_options() {
        assert_eq!(WidgetConfig::with_api_key("k").map_options().map_type, MapType::Roadmap);

        let cfg = WidgetConfig::from_json_str(r#"{ "api_key": "k", "map_type": "terrain" }"#)
            .unwrap();
        let opts = cfg.map_options();
        assert_eq!(opts.map_type, MapType::Terrain);
        assert_eq!(opts.zoom, 4);
        assert!(opts.map_type_control);
    }

    #[test]
    fn json_rejects_unknown_fields_and_bad_zoom() {
        assert!(matches!(
            WidgetConfig::from_json_str(r#"{ "api_key": "k", "zooom": 3 }"#),
            Err(ConfigError::Parse(_))
        ));
        assert_eq!(
            WidgetConfig::from_json_str(r#"{ "api_key": "k", "default_zoom": 30 }"#),
            Err(ConfigError::InvalidZoom(30))
        );
    }

    #[test]
    fn binding_request_follows_config() {
        let mut cfg = WidgetConfig::with_api_key("k");
        cfg.language = "en".to_string();
        let url = cfg.binding_request().url();
        assert!(url.contains("key=k&"));
        assert!(url.contains("language=en&"));
        assert!(url.ends_with("v=quarterly"));
    }

    #[test]
    fn parse_lat_lng_rejects_garbage() {
        assert!(parse_lat_lng("1.5,2.5").is_ok());
        assert!(parse_lat_lng("1.5").is_err());
        assert!(parse_lat_lng("north,east").is_err());
        assert!(parse_lat_lng("91,0").is_err());
        assert!(parse_lat_lng("NaN,0").is_err());
    }
}
