//! Map coordinator: owns one map, its home marker and the markers placed by
//! clicking, and turns click → geocode → marker → distance.
//!
//! Lifecycle: `Uninitialized` → `MapReady` → `Active`. Every transition is
//! driven by [`Coordinator::mount`]; once `Active` the coordinator only reacts
//! to events. Events are recorded in the caller's [`EventLog`].

use std::collections::BTreeMap;

use foundation::math::LatLng;
use mapservice::{GeocodeResponse, IconSpec, MapHandle, MapService, MarkerHandle};
use runtime::{EventLog, ReleaseOrder, Sequencer, Ticket};
use tracing::{debug, info, warn};

use crate::config::WidgetConfig;
use crate::error::WidgetError;
use crate::marker::{DistanceKm, MarkerKind, MarkerSet, ResolvedLocation};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CoordinatorState {
    Uninitialized,
    MapReady { map: MapHandle },
    Active { map: MapHandle, home: MarkerHandle },
}

/// What a marker click did.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MarkerClick {
    /// Home marker: camera moved to home.
    PannedHome,
    /// Point marker: distance to home computed.
    Distance(DistanceKm),
    /// Point marker, but the home position could not be read.
    HomeUnavailable,
    /// Not a marker this coordinator placed.
    Ignored,
}

#[derive(Debug, Clone)]
struct Settings {
    home: LatLng,
    home_zoom: u8,
    home_icon: IconSpec,
    point_icon: IconSpec,
    map_options: mapservice::MapOptions,
}

#[derive(Debug)]
pub struct Coordinator {
    settings: Settings,
    state: CoordinatorState,
    markers: MarkerSet,
    home_subscribed: bool,
    last_resolved: Option<ResolvedLocation>,
    geocodes: Sequencer<GeocodeResponse>,
    requested: BTreeMap<Ticket, LatLng>,
}

impl Coordinator {
    pub fn new(config: &WidgetConfig) -> Self {
        Self {
            settings: Settings {
                home: config.home(),
                home_zoom: config.home_zoom,
                home_icon: config.home_icon(),
                point_icon: config.point_icon(),
                map_options: config.map_options(),
            },
            state: CoordinatorState::Uninitialized,
            markers: MarkerSet::new(),
            home_subscribed: false,
            last_resolved: None,
            geocodes: Sequencer::new(ReleaseOrder::from(config.geocode_order)),
            requested: BTreeMap::new(),
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, CoordinatorState::Active { .. })
    }

    pub fn home(&self) -> LatLng {
        self.settings.home
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    /// Latest successful geocode (by application order).
    pub fn last_resolved(&self) -> Option<&ResolvedLocation> {
        self.last_resolved.as_ref()
    }

    /// Geocode requests issued but not yet applied.
    pub fn in_flight(&self) -> usize {
        self.geocodes.in_flight()
    }

    /// Drives the coordinator as far towards `Active` as it can get.
    ///
    /// Safe to call repeatedly: the map and the home marker are each created
    /// at most once.
    pub fn mount(
        &mut self,
        svc: &mut dyn MapService,
        container: &str,
        log: &mut EventLog,
    ) -> Result<(), WidgetError> {
        if self.state == CoordinatorState::Uninitialized {
            match svc.create_map(container, &self.settings.map_options) {
                Ok(map) => {
                    self.state = CoordinatorState::MapReady { map };
                    log.emit("map.created", format!("{map} in `{container}`"));
                }
                Err(err) => {
                    warn!("map not created, widget stays inactive: {err}");
                    log.emit("map.unavailable", err.to_string());
                    return Err(err.into());
                }
            }
        }

        if let CoordinatorState::MapReady { map } = self.state {
            if let Err(err) = self.activate(svc, map, log) {
                warn!("{map} not activated, mount can be retried: {err}");
                log.emit("mount.incomplete", err.to_string());
                return Err(err);
            }
        }
        Ok(())
    }

    fn activate(
        &mut self,
        svc: &mut dyn MapService,
        map: MapHandle,
        log: &mut EventLog,
    ) -> Result<(), WidgetError> {
        let home = self.place_home(svc, map, log)?;
        svc.subscribe_map_clicks(map)?;
        self.state = CoordinatorState::Active { map, home };
        info!("map coordinator active, home marker {home}");
        log.emit("coordinator.active", format!("{map}"));
        Ok(())
    }

    fn place_home(
        &mut self,
        svc: &mut dyn MapService,
        map: MapHandle,
        log: &mut EventLog,
    ) -> Result<MarkerHandle, WidgetError> {
        let existing = self.markers.home().map(|placed| placed.handle);
        let handle = match existing {
            Some(handle) => handle,
            None => {
                let home = self.settings.home;
                let handle = svc.create_marker(map, home, &self.settings.home_icon)?;
                self.markers.set_home(handle, home);
                log.emit("marker.home", format!("{handle} at {home}"));
                handle
            }
        };
        // The marker survives a failed subscription; only the handler is retried.
        if !self.home_subscribed {
            svc.subscribe_marker_clicks(handle)?;
            self.home_subscribed = true;
        }
        Ok(handle)
    }

    /// Starts resolving a clicked coordinate. Ignored until `Active`.
    pub fn on_map_click(
        &mut self,
        svc: &mut dyn MapService,
        at: LatLng,
        log: &mut EventLog,
    ) -> Option<Ticket> {
        if !self.is_active() {
            debug!("map click at {at} before coordinator is active");
            log.emit("click.ignored", format!("{at}: not active"));
            return None;
        }
        if !at.is_finite() {
            warn!("map click with non-finite coordinate ignored");
            log.emit("click.ignored", format!("{at}: not finite"));
            return None;
        }

        let ticket = self.geocodes.issue();
        self.requested.insert(ticket, at);
        svc.request_geocode(ticket, at);
        log.emit("geocode.requested", format!("{ticket} for {at}"));
        Some(ticket)
    }

    /// Applies a geocode completion and returns the markers it placed.
    ///
    /// Under click ordering a completion may be held back (no markers
    /// returned) until earlier clicks complete, and may then release several.
    pub fn on_geocoded(
        &mut self,
        svc: &mut dyn MapService,
        ticket: Ticket,
        response: GeocodeResponse,
        log: &mut EventLog,
    ) -> Result<Vec<MarkerHandle>, WidgetError> {
        let CoordinatorState::Active { map, .. } = self.state else {
            return Err(WidgetError::NotMounted);
        };

        let released = self.geocodes.complete(ticket, response)?;
        if released.is_empty() {
            log.emit("geocode.buffered", format!("{ticket}"));
        }

        let mut placed = Vec::new();
        for (t, response) in released {
            let Some(at) = self.requested.remove(&t) else {
                continue;
            };
            if let Some(handle) = self.apply_geocode(svc, map, t, at, &response, log) {
                placed.push(handle);
            }
        }
        Ok(placed)
    }

    fn apply_geocode(
        &mut self,
        svc: &mut dyn MapService,
        map: MapHandle,
        ticket: Ticket,
        at: LatLng,
        response: &GeocodeResponse,
        log: &mut EventLog,
    ) -> Option<MarkerHandle> {
        // TODO: surface geocode failures to the user once the UX for it is settled.
        let Some(address) = response.best_address() else {
            warn!(
                "reverse geocode {ticket} at {at} failed with {}, click dropped",
                response.status
            );
            log.emit(
                "geocode.dropped",
                format!("{ticket} status {}", response.status),
            );
            return None;
        };

        let location = ResolvedLocation::new(address, at);
        log.emit("geocode.resolved", format!("{ticket} -> {address}"));

        let handle = match svc.create_marker(map, location.coordinate(), &self.settings.point_icon) {
            Ok(h) => h,
            Err(err) => {
                warn!("marker for {ticket} not placed: {err}");
                log.emit("marker.failed", format!("{ticket}: {err}"));
                return None;
            }
        };
        if let Err(err) = svc.subscribe_marker_clicks(handle) {
            warn!("marker {handle} placed without click handler: {err}");
            log.emit("marker.unsubscribed", format!("{handle}: {err}"));
        }
        self.markers.push_point(handle, &location);
        self.last_resolved = Some(location);
        log.emit("marker.point", format!("{handle} at {at}"));
        Some(handle)
    }

    pub fn on_marker_click(
        &mut self,
        svc: &mut dyn MapService,
        marker: MarkerHandle,
        log: &mut EventLog,
    ) -> Result<MarkerClick, WidgetError> {
        let CoordinatorState::Active { map, home } = self.state else {
            return Ok(MarkerClick::Ignored);
        };
        let Some(placed) = self.markers.get(marker) else {
            debug!("click on unknown {marker}");
            return Ok(MarkerClick::Ignored);
        };

        match placed.kind {
            MarkerKind::Home => {
                svc.pan_to(map, self.settings.home)?;
                svc.set_zoom(map, self.settings.home_zoom)?;
                log.emit("camera.home", format!("zoom {}", self.settings.home_zoom));
                Ok(MarkerClick::PannedHome)
            }
            MarkerKind::Point => {
                let (Some(home_pos), Some(marker_pos)) =
                    (svc.marker_position(home), svc.marker_position(marker))
                else {
                    debug!("distance for {marker} skipped, position unavailable");
                    log.emit("distance.skipped", format!("{marker}"));
                    return Ok(MarkerClick::HomeUnavailable);
                };
                let meters = svc.compute_distance_m(home_pos, marker_pos);
                let km = DistanceKm::from_meters(meters);
                log.emit("distance", format!("{marker} is {km} km from home"));
                Ok(MarkerClick::Distance(km))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Coordinator, CoordinatorState, MarkerClick};
    use crate::config::{GeocodeOrder, WidgetConfig};
    use crate::error::WidgetError;
    use crate::marker::DistanceKm;
    use foundation::math::LatLng;
    use mapservice::headless::{Fault, HeadlessMapService};
    use mapservice::{GeocodeResponse, GeocodeStatus, IconSpec, MapService, ServiceError};
    use runtime::{EventLog, SequenceError};

    fn setup(order: GeocodeOrder) -> (Coordinator, HeadlessMapService, EventLog) {
        let mut cfg = WidgetConfig::with_api_key("k");
        cfg.geocode_order = order;
        let mut coord = Coordinator::new(&cfg);
        let mut svc = HeadlessMapService::with_container("map");
        let mut log = EventLog::new();
        coord.mount(&mut svc, "map", &mut log).unwrap();
        (coord, svc, log)
    }

    #[test]
    fn mount_creates_map_and_home_marker() {
        let (coord, svc, log) = setup(GeocodeOrder::Click);
        let CoordinatorState::Active { map, home } = coord.state() else {
            panic!("expected active state");
        };
        let m = svc.map(map).unwrap();
        assert_eq!(m.zoom, 4);
        assert_eq!(m.center, coord.home());
        assert!(m.clicks_subscribed);

        let h = svc.marker(home).unwrap();
        assert_eq!(h.icon, IconSpec::image("/assets/images/homeAddressMarker.png"));
        assert!(h.clicks_subscribed);
        assert_eq!(
            log.kinds(),
            vec!["map.created", "marker.home", "coordinator.active"]
        );
    }

    #[test]
    fn repeated_mount_keeps_single_home_marker() {
        let (mut coord, mut svc, mut log) = setup(GeocodeOrder::Click);
        coord.mount(&mut svc, "map", &mut log).unwrap();
        coord.mount(&mut svc, "map", &mut log).unwrap();
        assert_eq!(svc.map_count(), 1);
        assert_eq!(svc.marker_count(), 1);
        assert_eq!(log.count("marker.home"), 1);
    }

    #[test]
    fn missing_container_stays_uninitialized() {
        let mut coord = Coordinator::new(&WidgetConfig::with_api_key("k"));
        let mut svc = HeadlessMapService::new();
        let mut log = EventLog::new();

        let err = coord.mount(&mut svc, "map", &mut log).unwrap_err();
        assert_eq!(
            err,
            WidgetError::Service(ServiceError::ContainerMissing("map".to_string()))
        );
        assert_eq!(coord.state(), CoordinatorState::Uninitialized);
        assert_eq!(coord.on_map_click(&mut svc, LatLng::new(1.0, 1.0), &mut log), None);
        assert_eq!(svc.pending_geocodes(), 0);

        svc.add_container("map");
        coord.mount(&mut svc, "map", &mut log).unwrap();
        assert!(coord.is_active());
    }

    #[test]
    fn ok_geocode_places_point_marker() {
        let (mut coord, mut svc, mut log) = setup(GeocodeOrder::Click);
        let at = LatLng::new(65.0, 13.0);
        let ticket = coord.on_map_click(&mut svc, at, &mut log).unwrap();
        let req = svc.take_next_geocode_request().unwrap();
        assert_eq!(req.ticket, ticket);
        assert_eq!(req.coordinate, at);

        let placed = coord
            .on_geocoded(&mut svc, ticket, GeocodeResponse::ok("8100 Misvær"), &mut log)
            .unwrap();
        assert_eq!(placed.len(), 1);
        let marker = svc.marker(placed[0]).unwrap();
        assert_eq!(marker.position, Some(at));
        assert_eq!(marker.icon, IconSpec::pin("#000000"));
        assert!(marker.clicks_subscribed);

        let last = coord.last_resolved().unwrap();
        assert_eq!(last.address, "8100 Misvær");
        assert_eq!(last.coordinate(), at);
        assert_eq!(coord.markers().points().len(), 1);
        assert_eq!(coord.in_flight(), 0);
    }

    #[test]
    fn failed_geocode_is_dropped() {
        let (mut coord, mut svc, mut log) = setup(GeocodeOrder::Click);
        let ticket = coord
            .on_map_click(&mut svc, LatLng::new(0.0, -30.0), &mut log)
            .unwrap();
        let placed = coord
            .on_geocoded(
                &mut svc,
                ticket,
                GeocodeResponse::failed(GeocodeStatus::ZeroResults),
                &mut log,
            )
            .unwrap();
        assert!(placed.is_empty());
        assert!(coord.markers().points().is_empty());
        assert!(coord.last_resolved().is_none());
        assert_eq!(log.count("geocode.dropped"), 1);
        assert_eq!(coord.in_flight(), 0);
    }

    #[test]
    fn click_order_holds_back_out_of_order_completions() {
        let (mut coord, mut svc, mut log) = setup(GeocodeOrder::Click);
        let first = coord.on_map_click(&mut svc, LatLng::new(60.0, 10.0), &mut log).unwrap();
        let second = coord.on_map_click(&mut svc, LatLng::new(61.0, 11.0), &mut log).unwrap();

        let held = coord
            .on_geocoded(&mut svc, second, GeocodeResponse::ok("second"), &mut log)
            .unwrap();
        assert!(held.is_empty());
        assert_eq!(log.count("geocode.buffered"), 1);

        let released = coord
            .on_geocoded(&mut svc, first, GeocodeResponse::ok("first"), &mut log)
            .unwrap();
        assert_eq!(released.len(), 2);
        let addresses: Vec<_> = coord
            .markers()
            .points()
            .iter()
            .map(|m| m.address.clone().unwrap())
            .collect();
        assert_eq!(addresses, vec!["first", "second"]);
        assert_eq!(coord.last_resolved().unwrap().address, "second");
    }

    #[test]
    fn completion_order_applies_as_they_arrive() {
        let (mut coord, mut svc, mut log) = setup(GeocodeOrder::Completion);
        let first = coord.on_map_click(&mut svc, LatLng::new(60.0, 10.0), &mut log).unwrap();
        let second = coord.on_map_click(&mut svc, LatLng::new(61.0, 11.0), &mut log).unwrap();

        coord
            .on_geocoded(&mut svc, second, GeocodeResponse::ok("second"), &mut log)
            .unwrap();
        coord
            .on_geocoded(&mut svc, first, GeocodeResponse::ok("first"), &mut log)
            .unwrap();
        let addresses: Vec<_> = coord
            .markers()
            .points()
            .iter()
            .map(|m| m.address.clone().unwrap())
            .collect();
        assert_eq!(addresses, vec!["second", "first"]);
        assert_eq!(coord.last_resolved().unwrap().address, "first");
    }

    #[test]
    fn duplicate_completion_is_an_error() {
        let (mut coord, mut svc, mut log) = setup(GeocodeOrder::Click);
        let t = coord.on_map_click(&mut svc, LatLng::new(1.0, 1.0), &mut log).unwrap();
        coord
            .on_geocoded(&mut svc, t, GeocodeResponse::ok("a"), &mut log)
            .unwrap();
        let err = coord
            .on_geocoded(&mut svc, t, GeocodeResponse::ok("a"), &mut log)
            .unwrap_err();
        assert_eq!(err, WidgetError::Sequence(SequenceError::UnknownTicket(t)));
        assert_eq!(coord.markers().points().len(), 1);
    }

    #[test]
    fn home_click_pans_and_zooms() {
        let (mut coord, mut svc, mut log) = setup(GeocodeOrder::Click);
        let CoordinatorState::Active { map, home } = coord.state() else {
            panic!("expected active state");
        };
        svc.pan_to(map, LatLng::new(0.0, 0.0)).unwrap();

        let outcome = coord.on_marker_click(&mut svc, home, &mut log).unwrap();
        assert_eq!(outcome, MarkerClick::PannedHome);
        let m = svc.map(map).unwrap();
        assert_eq!(m.center, coord.home());
        assert_eq!(m.zoom, 10);
    }

    #[test]
    fn point_click_reports_rounded_distance() {
        let (mut coord, mut svc, mut log) = setup(GeocodeOrder::Click);
        let t = coord.on_map_click(&mut svc, LatLng::new(65.0, 13.0), &mut log).unwrap();
        let placed = coord
            .on_geocoded(&mut svc, t, GeocodeResponse::ok("x"), &mut log)
            .unwrap();

        let outcome = coord.on_marker_click(&mut svc, placed[0], &mut log).unwrap();
        assert_eq!(outcome, MarkerClick::Distance(DistanceKm::from_meters(25_344.5)));
    }

    #[test]
    fn point_at_home_is_zero_km() {
        let (mut coord, mut svc, mut log) = setup(GeocodeOrder::Click);
        let t = coord.on_map_click(&mut svc, coord.home(), &mut log).unwrap();
        let placed = coord
            .on_geocoded(&mut svc, t, GeocodeResponse::ok("home"), &mut log)
            .unwrap();
        let outcome = coord.on_marker_click(&mut svc, placed[0], &mut log).unwrap();
        assert_eq!(outcome, MarkerClick::Distance(DistanceKm::from_meters(0.0)));
    }

    #[test]
    fn unreadable_home_position_is_a_no_op() {
        let (mut coord, mut svc, mut log) = setup(GeocodeOrder::Click);
        let CoordinatorState::Active { home, .. } = coord.state() else {
            panic!("expected active state");
        };
        let t = coord.on_map_click(&mut svc, LatLng::new(64.0, 12.0), &mut log).unwrap();
        let placed = coord
            .on_geocoded(&mut svc, t, GeocodeResponse::ok("x"), &mut log)
            .unwrap();
        svc.clear_position(home);

        let outcome = coord.on_marker_click(&mut svc, placed[0], &mut log).unwrap();
        assert_eq!(outcome, MarkerClick::HomeUnavailable);
        assert_eq!(log.count("distance"), 0);
    }

    #[test]
    fn home_subscription_is_retried_on_next_mount() {
        let mut coord = Coordinator::new(&WidgetConfig::with_api_key("k"));
        let mut svc = HeadlessMapService::with_container("map");
        let mut log = EventLog::new();
        svc.fail_next(Fault::SubscribeMarkerClicks, 1);

        let err = coord.mount(&mut svc, "map", &mut log).unwrap_err();
        assert!(matches!(err, WidgetError::Service(ServiceError::Provider(_))));
        assert!(matches!(coord.state(), CoordinatorState::MapReady { .. }));
        assert_eq!(log.count("mount.incomplete"), 1);

        coord.mount(&mut svc, "map", &mut log).unwrap();
        let CoordinatorState::Active { map, home } = coord.state() else {
            panic!("expected active state");
        };
        assert!(svc.accepts_marker_clicks(home));
        assert!(svc.accepts_map_clicks(map));
        assert_eq!(svc.marker_count(), 1);
        assert_eq!(log.count("marker.home"), 1);
    }

    #[test]
    fn map_click_subscription_is_retried_without_second_home_marker() {
        let mut coord = Coordinator::new(&WidgetConfig::with_api_key("k"));
        let mut svc = HeadlessMapService::with_container("map");
        let mut log = EventLog::new();
        svc.fail_next(Fault::SubscribeMapClicks, 1);

        coord.mount(&mut svc, "map", &mut log).unwrap_err();
        coord.mount(&mut svc, "map", &mut log).unwrap();
        let CoordinatorState::Active { map, .. } = coord.state() else {
            panic!("expected active state");
        };
        assert!(svc.accepts_map_clicks(map));
        assert_eq!(svc.marker_count(), 1);
    }

    #[test]
    fn failed_marker_creation_still_releases_later_clicks() {
        let (mut coord, mut svc, mut log) = setup(GeocodeOrder::Click);
        let first = coord.on_map_click(&mut svc, LatLng::new(60.0, 10.0), &mut log).unwrap();
        let second = coord.on_map_click(&mut svc, LatLng::new(61.0, 11.0), &mut log).unwrap();
        coord
            .on_geocoded(&mut svc, second, GeocodeResponse::ok("second"), &mut log)
            .unwrap();

        svc.fail_next(Fault::CreateMarker, 1);
        let placed = coord
            .on_geocoded(&mut svc, first, GeocodeResponse::ok("first"), &mut log)
            .unwrap();

        assert_eq!(placed.len(), 1);
        let addresses: Vec<_> = coord
            .markers()
            .points()
            .iter()
            .map(|m| m.address.clone().unwrap())
            .collect();
        assert_eq!(addresses, vec!["second"]);
        assert_eq!(log.count("marker.failed"), 1);
        assert_eq!(coord.in_flight(), 0);
    }

    #[test]
    fn point_marker_without_click_handler_is_kept() {
        let (mut coord, mut svc, mut log) = setup(GeocodeOrder::Click);
        let t = coord.on_map_click(&mut svc, LatLng::new(64.0, 12.0), &mut log).unwrap();
        svc.fail_next(Fault::SubscribeMarkerClicks, 1);

        let placed = coord
            .on_geocoded(&mut svc, t, GeocodeResponse::ok("x"), &mut log)
            .unwrap();
        assert_eq!(placed.len(), 1);
        assert!(!svc.accepts_marker_clicks(placed[0]));
        assert_eq!(coord.markers().points().len(), 1);
        assert_eq!(log.count("marker.unsubscribed"), 1);
    }
}
