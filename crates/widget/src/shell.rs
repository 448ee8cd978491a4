//! Application shell: loads the provider binding once, mounts the
//! coordinator when the binding is ready, and keeps the last reported
//! distance for display.

use foundation::math::LatLng;
use mapservice::{
    BindingLoad, GeocodeResponse, MapService, MarkerHandle, ScriptHost, load_binding,
};
use runtime::{EventLog, Latch, Ticket};
use tracing::{debug, warn};

use crate::config::WidgetConfig;
use crate::coordinator::{Coordinator, MarkerClick};
use crate::error::WidgetError;
use crate::marker::DistanceKm;

/// What the page should currently show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellView {
    pub show_map: bool,
    pub distance_sentence: Option<String>,
}

pub fn distance_sentence(km: DistanceKm) -> Option<String> {
    km.is_set()
        .then(|| format!("Distance between selected marker and home address is {km} km."))
}

#[derive(Debug)]
pub struct Shell {
    config: WidgetConfig,
    loaded: Latch<()>,
    script: Option<BindingLoad>,
    binding_failure: Option<String>,
    distance_km: DistanceKm,
    coordinator: Option<Coordinator>,
    log: EventLog,
}

impl Shell {
    pub fn new(config: WidgetConfig) -> Self {
        Self {
            config,
            loaded: Latch::new(),
            script: None,
            binding_failure: None,
            distance_km: DistanceKm::UNSET,
            coordinator: None,
            log: EventLog::new(),
        }
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    /// Requests the provider binding. Only the first call touches `host`.
    pub fn init(&mut self, host: &mut dyn ScriptHost) -> Result<BindingLoad, WidgetError> {
        if let Some(load) = self.script {
            debug!("binding already requested");
            return Ok(load);
        }
        match load_binding(host, &self.config.binding_request()) {
            Ok(load) => {
                self.script = Some(load);
                self.log
                    .emit("binding.requested", format!("script {}", load.script().0));
                Ok(load)
            }
            Err(err) => {
                self.record_binding_failure(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Signal that fires once the binding has loaded. Awaiting it after it
    /// fired resolves immediately.
    pub fn load_signal(&self) -> Latch<()> {
        self.loaded.clone()
    }

    pub fn on_binding_loaded(&mut self) {
        if self.loaded.fire(()) {
            self.log.emit("binding.loaded", "");
        } else {
            debug!("duplicate binding load notification ignored");
        }
    }

    /// The binding reported an error; the widget will never mount.
    pub fn on_binding_failed(&mut self, reason: impl Into<String>) {
        self.record_binding_failure(reason.into());
    }

    fn record_binding_failure(&mut self, reason: String) {
        warn!("map binding failed to load, widget disabled: {reason}");
        self.log.emit("binding.failed", reason.clone());
        self.binding_failure = Some(reason);
    }

    pub fn binding_failure(&self) -> Option<&str> {
        self.binding_failure.as_deref()
    }

    pub fn script_loaded(&self) -> bool {
        self.loaded.is_fired()
    }

    /// Mounts the coordinator into the configured container.
    pub fn mount(&mut self, svc: &mut dyn MapService) -> Result<(), WidgetError> {
        if !self.script_loaded() {
            return Err(WidgetError::BindingNotLoaded);
        }
        let coordinator = self
            .coordinator
            .get_or_insert_with(|| Coordinator::new(&self.config));
        coordinator.mount(svc, &self.config.container_id, &mut self.log)
    }

    pub fn coordinator(&self) -> Option<&Coordinator> {
        self.coordinator.as_ref()
    }

    pub fn on_map_click(&mut self, svc: &mut dyn MapService, at: LatLng) -> Option<Ticket> {
        let Some(coordinator) = self.coordinator.as_mut() else {
            self.log.emit("click.ignored", format!("{at}: not mounted"));
            return None;
        };
        coordinator.on_map_click(svc, at, &mut self.log)
    }

    pub fn on_geocoded(
        &mut self,
        svc: &mut dyn MapService,
        ticket: Ticket,
        response: GeocodeResponse,
    ) -> Result<Vec<MarkerHandle>, WidgetError> {
        let coordinator = self.coordinator.as_mut().ok_or(WidgetError::NotMounted)?;
        coordinator.on_geocoded(svc, ticket, response, &mut self.log)
    }

    /// Routes a marker click; a computed distance is stored verbatim.
    pub fn on_marker_click(
        &mut self,
        svc: &mut dyn MapService,
        marker: MarkerHandle,
    ) -> Result<MarkerClick, WidgetError> {
        let coordinator = self.coordinator.as_mut().ok_or(WidgetError::NotMounted)?;
        let outcome = coordinator.on_marker_click(svc, marker, &mut self.log)?;
        if let MarkerClick::Distance(km) = outcome {
            self.distance_km = km;
        }
        Ok(outcome)
    }

    pub fn distance_km(&self) -> DistanceKm {
        self.distance_km
    }

    pub fn view(&self) -> ShellView {
        ShellView {
            show_map: self.script_loaded(),
            distance_sentence: distance_sentence(self.distance_km),
        }
    }

    pub fn events(&self) -> &EventLog {
        &self.log
    }

    pub fn events_mut(&mut self) -> &mut EventLog {
        &mut self.log
    }

    /// Point markers in placement order.
    pub fn point_markers(&self) -> Result<Vec<MarkerHandle>, WidgetError> {
        let coordinator = self.coordinator.as_ref().ok_or(WidgetError::NotMounted)?;
        Ok(coordinator
            .markers()
            .points()
            .iter()
            .map(|m| m.handle)
            .collect())
    }
}
