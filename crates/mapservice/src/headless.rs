//! In-memory provider used by tests and the replay tool.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use foundation::Arena;
use foundation::math::{LatLng, spherical_distance_m};
use runtime::Ticket;

use crate::binding::{ScriptHost, ScriptId};
use crate::{IconSpec, MapHandle, MapOptions, MapService, MarkerHandle, ServiceError};

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessMap {
    pub container: String,
    pub options: MapOptions,
    pub center: LatLng,
    pub zoom: u8,
    pub clicks_subscribed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessMarker {
    pub map: MapHandle,
    /// `None` models a provider marker whose position is not (yet) readable.
    pub position: Option<LatLng>,
    pub icon: IconSpec,
    pub clicks_subscribed: bool,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeocodeRequest {
    pub ticket: Ticket,
    pub coordinate: LatLng,
}

/// Provider calls that can be made to fail on demand.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Fault {
    CreateMarker,
    SubscribeMapClicks,
    SubscribeMarkerClicks,
}

/// Records every provider call; geocode requests queue up until the caller
/// takes them and decides how they complete.
#[derive(Debug, Default)]
pub struct HeadlessMapService {
    containers: BTreeSet<String>,
    maps: Arena<HeadlessMap>,
    markers: Arena<HeadlessMarker>,
    pending: VecDeque<GeocodeRequest>,
    faults: BTreeMap<Fault, usize>,
}

impl HeadlessMapService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Service whose document already has an element with id `container`.
    pub fn with_container(container: impl Into<String>) -> Self {
        let mut svc = Self::new();
        svc.add_container(container);
        svc
    }

    pub fn add_container(&mut self, container: impl Into<String>) {
        self.containers.insert(container.into());
    }

    pub fn map(&self, map: MapHandle) -> Option<&HeadlessMap> {
        self.maps.get(map.0)
    }

    pub fn map_count(&self) -> usize {
        self.maps.len()
    }

    pub fn marker(&self, marker: MarkerHandle) -> Option<&HeadlessMarker> {
        self.markers.get(marker.0)
    }

    pub fn markers(&self) -> impl Iterator<Item = (MarkerHandle, &HeadlessMarker)> + '_ {
        self.markers.iter().map(|(h, m)| (MarkerHandle(h), m))
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Makes `marker` report no position, as the provider does for markers
    /// that have not been positioned yet.
    pub fn clear_position(&mut self, marker: MarkerHandle) {
        if let Some(m) = self.markers.get_mut(marker.0) {
            m.position = None;
        }
    }

    pub fn pending_geocodes(&self) -> usize {
        self.pending.len()
    }

    /// Takes all queued geocode requests, oldest first.
    pub fn take_geocode_requests(&mut self) -> Vec<GeocodeRequest> {
        self.pending.drain(..).collect()
    }

    pub fn take_next_geocode_request(&mut self) -> Option<GeocodeRequest> {
        self.pending.pop_front()
    }

    /// Makes the next `times` calls of `fault` fail with a provider error.
    pub fn fail_next(&mut self, fault: Fault, times: usize) {
        *self.faults.entry(fault).or_default() += times;
    }

    fn trip(&mut self, fault: Fault) -> Result<(), ServiceError> {
        match self.faults.get_mut(&fault) {
            Some(left) if *left > 0 => {
                *left -= 1;
                Err(ServiceError::Provider(format!("{fault:?} failed")))
            }
            _ => Ok(()),
        }
    }

    pub fn accepts_map_clicks(&self, map: MapHandle) -> bool {
        self.map(map).is_some_and(|m| m.clicks_subscribed)
    }

    pub fn accepts_marker_clicks(&self, marker: MarkerHandle) -> bool {
        self.marker(marker).is_some_and(|m| m.clicks_subscribed)
    }
}

impl MapService for HeadlessMapService {
    fn create_map(
        &mut self,
        container: &str,
        options: &MapOptions,
    ) -> Result<MapHandle, ServiceError> {
        if !self.containers.contains(container) {
            return Err(ServiceError::ContainerMissing(container.to_string()));
        }
        let handle = self.maps.alloc(HeadlessMap {
            container: container.to_string(),
            options: options.clone(),
            center: options.center.into(),
            zoom: options.zoom,
            clicks_subscribed: false,
        });
        Ok(MapHandle(handle))
    }

    fn create_marker(
        &mut self,
        map: MapHandle,
        position: LatLng,
        icon: &IconSpec,
    ) -> Result<MarkerHandle, ServiceError> {
        if self.maps.get(map.0).is_none() {
            return Err(ServiceError::UnknownMap(map));
        }
        self.trip(Fault::CreateMarker)?;
        let handle = self.markers.alloc(HeadlessMarker {
            map,
            position: Some(position),
            icon: icon.clone(),
            clicks_subscribed: false,
        });
        Ok(MarkerHandle(handle))
    }

    fn marker_position(&self, marker: MarkerHandle) -> Option<LatLng> {
        self.markers.get(marker.0).and_then(|m| m.position)
    }

    fn subscribe_map_clicks(&mut self, map: MapHandle) -> Result<(), ServiceError> {
        self.trip(Fault::SubscribeMapClicks)?;
        let m = self
            .maps
            .get_mut(map.0)
            .ok_or(ServiceError::UnknownMap(map))?;
        m.clicks_subscribed = true;
        Ok(())
    }

    fn subscribe_marker_clicks(&mut self, marker: MarkerHandle) -> Result<(), ServiceError> {
        self.trip(Fault::SubscribeMarkerClicks)?;
        let m = self
            .markers
            .get_mut(marker.0)
            .ok_or(ServiceError::UnknownMarker(marker))?;
        m.clicks_subscribed = true;
        Ok(())
    }

    fn request_geocode(&mut self, ticket: Ticket, coordinate: LatLng) {
        self.pending.push_back(GeocodeRequest { ticket, coordinate });
    }

    fn compute_distance_m(&self, a: LatLng, b: LatLng) -> f64 {
        spherical_distance_m(a, b)
    }

    fn pan_to(&mut self, map: MapHandle, center: LatLng) -> Result<(), ServiceError> {
        let m = self
            .maps
            .get_mut(map.0)
            .ok_or(ServiceError::UnknownMap(map))?;
        m.center = center;
        Ok(())
    }

    fn set_zoom(&mut self, map: MapHandle, zoom: u8) -> Result<(), ServiceError> {
        let m = self
            .maps
            .get_mut(map.0)
            .ok_or(ServiceError::UnknownMap(map))?;
        m.zoom = zoom;
        Ok(())
    }
}

/// Script list standing in for a browser document.
#[derive(Debug, Default)]
pub struct HeadlessDocument {
    scripts: Vec<String>,
}

impl HeadlessDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a script as if the page had shipped with it.
    pub fn preload(&mut self, src: impl Into<String>) {
        self.scripts.push(src.into());
    }

    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }
}

impl ScriptHost for HeadlessDocument {
    fn script_sources(&self) -> Vec<(ScriptId, String)> {
        self.scripts
            .iter()
            .enumerate()
            .map(|(idx, src)| (ScriptId(idx as u32), src.clone()))
            .collect()
    }

    fn insert_script(&mut self, src: &str) -> Result<ScriptId, ServiceError> {
        self.scripts.push(src.to_string());
        Ok(ScriptId((self.scripts.len() - 1) as u32))
    }
}
