//! Headless replay of a scripted click session.
//!
//! A session is a JSON list of steps. Map clicks carry the answer the
//! geocoder should give and how many further steps it takes to arrive, which
//! makes out-of-order completions reproducible:
//!
//! ```json
//! { "steps": [
//!     { "type": "map_click", "lat": 65.0, "lng": 13.0,
//!       "geocode": { "status": "OK", "address": "Misvær" }, "delay": 1 },
//!     { "type": "map_click", "lat": 64.0, "lng": 12.0 },
//!     { "type": "marker_click", "point": 0 },
//!     { "type": "home_click" }
//! ] }
//! ```

use foundation::math::LatLng;
use mapservice::headless::{HeadlessDocument, HeadlessMapService};
use mapservice::{GeocodeResponse, GeocodeStatus};
use runtime::{Event, Ticket};
use serde::Deserialize;
use widget::{Shell, ShellView, WidgetConfig, WidgetError};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Session {
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    MapClick {
        lat: f64,
        lng: f64,
        #[serde(default)]
        geocode: GeocodeAnswer,
        /// Steps that pass before the geocode completes.
        #[serde(default)]
        delay: u32,
    },
    /// Click the n-th placed point marker (0-based, placement order).
    MarkerClick { point: usize },
    HomeClick,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeocodeAnswer {
    #[serde(default = "ok_status")]
    pub status: String,
    #[serde(default)]
    pub address: Option<String>,
}

fn ok_status() -> String {
    "OK".to_string()
}

impl Default for GeocodeAnswer {
    fn default() -> Self {
        Self {
            status: ok_status(),
            address: None,
        }
    }
}

impl GeocodeAnswer {
    fn to_response(&self, at: LatLng) -> GeocodeResponse {
        let status = GeocodeStatus::parse(&self.status);
        if !status.is_ok() {
            return GeocodeResponse::failed(status);
        }
        let address = self
            .address
            .clone()
            .unwrap_or_else(|| format!("{:.5}, {:.5}", at.lat(), at.lng()));
        GeocodeResponse::ok(address)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplayError {
    Parse(String),
    NoSuchMarker(usize),
    Widget(WidgetError),
}

impl std::fmt::Display for ReplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplayError::Parse(msg) => write!(f, "session parse error: {msg}"),
            ReplayError::NoSuchMarker(n) => write!(f, "no point marker #{n} placed yet"),
            ReplayError::Widget(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ReplayError {}

impl From<WidgetError> for ReplayError {
    fn from(e: WidgetError) -> Self {
        ReplayError::Widget(e)
    }
}

impl Session {
    pub fn from_json_str(s: &str) -> Result<Self, ReplayError> {
        serde_json::from_str(s).map_err(|e| ReplayError::Parse(e.to_string()))
    }
}

#[derive(Debug)]
pub struct Replay {
    pub events: Vec<Event>,
    pub view: ShellView,
    pub point_markers: usize,
}

struct PendingGeocode {
    remaining: u32,
    ticket: Ticket,
    response: GeocodeResponse,
}

pub fn run_session(config: WidgetConfig, session: &Session) -> Result<Replay, ReplayError> {
    let mut doc = HeadlessDocument::new();
    let mut svc = HeadlessMapService::with_container(config.container_id.clone());
    let mut shell = Shell::new(config);

    shell.init(&mut doc)?;
    shell.on_binding_loaded();
    shell.mount(&mut svc)?;

    let mut pending: Vec<PendingGeocode> = Vec::new();
    for step in &session.steps {
        match step {
            Step::MapClick {
                lat,
                lng,
                geocode,
                delay,
            } => {
                let at = LatLng::new(*lat, *lng);
                if let Some(ticket) = shell.on_map_click(&mut svc, at) {
                    pending.push(PendingGeocode {
                        remaining: *delay,
                        ticket,
                        response: geocode.to_response(at),
                    });
                }
                // The replay answers geocodes itself.
                svc.take_geocode_requests();
            }
            Step::MarkerClick { point } => {
                let markers = shell.point_markers()?;
                let marker = *markers.get(*point).ok_or(ReplayError::NoSuchMarker(*point))?;
                shell.on_marker_click(&mut svc, marker)?;
            }
            Step::HomeClick => {
                let home = shell
                    .coordinator()
                    .and_then(|c| c.markers().home())
                    .map(|m| m.handle)
                    .ok_or(WidgetError::NotMounted)?;
                shell.on_marker_click(&mut svc, home)?;
            }
        }
        deliver_due(&mut shell, &mut svc, &mut pending)?;
    }

    // Whatever is still in flight arrives after the script ends.
    pending.sort_by_key(|p| p.remaining);
    for p in pending {
        shell.on_geocoded(&mut svc, p.ticket, p.response)?;
    }

    Ok(Replay {
        events: shell.events().events().to_vec(),
        view: shell.view(),
        point_markers: shell.point_markers()?.len(),
    })
}

fn deliver_due(
    shell: &mut Shell,
    svc: &mut HeadlessMapService,
    pending: &mut Vec<PendingGeocode>,
) -> Result<(), ReplayError> {
    let (due, waiting): (Vec<_>, Vec<_>) = pending.drain(..).partition(|p| p.remaining == 0);
    for p in due {
        shell.on_geocoded(svc, p.ticket, p.response)?;
    }
    pending.extend(waiting.into_iter().map(|mut p| {
        p.remaining -= 1;
        p
    }));
    Ok(())
}
