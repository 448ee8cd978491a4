//! `MapService` over the Google Maps JavaScript API.

use foundation::Arena;
use foundation::math::{LatLng, spherical_distance_m};
use mapservice::{
    GeocodeResponse, GeocodeResult, GeocodeStatus, IconSpec, LatLngLiteral, MapHandle, MapOptions,
    MapService, MarkerHandle, ServiceError,
};
use runtime::Ticket;
use serde::Serialize;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlElement};

use crate::{dispatch_geocoded, dispatch_map_click, dispatch_marker_click};

mod sys {
    use wasm_bindgen::prelude::*;
    use web_sys::HtmlElement;

    #[wasm_bindgen]
    extern "C" {
        #[wasm_bindgen(js_namespace = ["google", "maps"])]
        pub type Map;

        #[wasm_bindgen(constructor, catch, js_namespace = ["google", "maps"])]
        pub fn new(container: &HtmlElement, options: &JsValue) -> Result<Map, JsValue>;

        #[wasm_bindgen(method, js_name = panTo)]
        pub fn pan_to(this: &Map, center: &LatLng);

        #[wasm_bindgen(method, js_name = setZoom)]
        pub fn set_zoom(this: &Map, zoom: f64);

        #[wasm_bindgen(js_namespace = ["google", "maps"])]
        pub type Marker;

        #[wasm_bindgen(constructor, catch, js_namespace = ["google", "maps"])]
        pub fn new(options: &JsValue) -> Result<Marker, JsValue>;

        #[wasm_bindgen(method, js_name = getPosition)]
        pub fn get_position(this: &Marker) -> Option<LatLng>;

        #[wasm_bindgen(method, js_name = addListener)]
        pub fn add_listener(this: &Marker, event: &str, handler: &js_sys::Function) -> JsValue;

        #[wasm_bindgen(js_namespace = ["google", "maps"])]
        pub type LatLng;

        #[wasm_bindgen(constructor, catch, js_namespace = ["google", "maps"])]
        pub fn new(lat: f64, lng: f64) -> Result<LatLng, JsValue>;

        #[wasm_bindgen(method)]
        pub fn lat(this: &LatLng) -> f64;

        #[wasm_bindgen(method)]
        pub fn lng(this: &LatLng) -> f64;

        #[wasm_bindgen(js_namespace = ["google", "maps"])]
        pub type Point;

        #[wasm_bindgen(constructor, catch, js_namespace = ["google", "maps"])]
        pub fn new(x: f64, y: f64) -> Result<Point, JsValue>;

        #[wasm_bindgen(js_namespace = ["google", "maps"])]
        pub type Geocoder;

        #[wasm_bindgen(constructor, catch, js_namespace = ["google", "maps"])]
        pub fn new() -> Result<Geocoder, JsValue>;

        #[wasm_bindgen(method, catch)]
        pub fn geocode(
            this: &Geocoder,
            request: &JsValue,
            callback: &js_sys::Function,
        ) -> Result<JsValue, JsValue>;

        #[wasm_bindgen(js_namespace = ["google", "maps", "event"], js_name = addListener)]
        pub fn add_map_listener(
            instance: &JsValue,
            event: &str,
            handler: &js_sys::Function,
        ) -> JsValue;

        #[wasm_bindgen(catch, js_namespace = ["google", "maps", "geometry", "spherical"], js_name = computeDistanceBetween)]
        pub fn compute_distance_between(a: &LatLng, b: &LatLng) -> Result<f64, JsValue>;
    }
}

fn provider_err(err: JsValue) -> ServiceError {
    ServiceError::Provider(
        err.as_string()
            .unwrap_or_else(|| format!("{err:?}")),
    )
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, ServiceError> {
    let json = serde_json::to_string(value).map_err(|e| ServiceError::Provider(e.to_string()))?;
    js_sys::JSON::parse(&json).map_err(provider_err)
}

fn set(target: &JsValue, key: &str, value: &JsValue) -> Result<(), ServiceError> {
    js_sys::Reflect::set(target, &JsValue::from_str(key), value)
        .map(|_| ())
        .map_err(provider_err)
}

fn to_sys(p: LatLng) -> Result<sys::LatLng, ServiceError> {
    sys::LatLng::new(p.lat(), p.lng()).map_err(provider_err)
}

fn from_sys(p: &sys::LatLng) -> LatLng {
    LatLng::new(p.lat(), p.lng())
}

fn icon_to_js(icon: &IconSpec) -> Result<JsValue, ServiceError> {
    let js = to_js(icon)?;
    if let Some((x, y)) = icon.anchor() {
        let anchor = sys::Point::new(x, y).map_err(provider_err)?;
        set(&js, "anchor", &anchor)?;
    }
    Ok(js)
}

/// Reads `latLng` off a map mouse event.
fn click_position(event: &JsValue) -> Option<LatLng> {
    let v = js_sys::Reflect::get(event, &JsValue::from_str("latLng")).ok()?;
    if v.is_undefined() || v.is_null() {
        return None;
    }
    Some(from_sys(v.unchecked_ref::<sys::LatLng>()))
}

fn parse_geocode(results: &JsValue, status: &JsValue) -> GeocodeResponse {
    let status = GeocodeStatus::parse(&status.as_string().unwrap_or_else(|| "ERROR".to_string()));
    let mut out = Vec::new();
    if js_sys::Array::is_array(results) {
        for item in js_sys::Array::from(results).iter() {
            let address = js_sys::Reflect::get(&item, &JsValue::from_str("formatted_address"))
                .ok()
                .and_then(|v| v.as_string());
            if let Some(formatted_address) = address {
                out.push(GeocodeResult { formatted_address });
            }
        }
    }
    GeocodeResponse {
        status,
        results: out,
    }
}

pub struct GoogleMapsService {
    document: Document,
    maps: Arena<sys::Map>,
    markers: Arena<sys::Marker>,
    geocoder: Option<sys::Geocoder>,
}

impl GoogleMapsService {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            maps: Arena::new(),
            markers: Arena::new(),
            geocoder: None,
        }
    }

    fn map(&self, map: MapHandle) -> Result<&sys::Map, ServiceError> {
        self.maps.get(map.0).ok_or(ServiceError::UnknownMap(map))
    }

    fn geocoder(&mut self) -> Result<&sys::Geocoder, ServiceError> {
        if self.geocoder.is_none() {
            self.geocoder = Some(sys::Geocoder::new().map_err(provider_err)?);
        }
        self.geocoder
            .as_ref()
            .ok_or_else(|| ServiceError::Provider("geocoder unavailable".to_string()))
    }
}

impl MapService for GoogleMapsService {
    fn create_map(
        &mut self,
        container: &str,
        options: &MapOptions,
    ) -> Result<MapHandle, ServiceError> {
        let element = self
            .document
            .get_element_by_id(container)
            .ok_or_else(|| ServiceError::ContainerMissing(container.to_string()))?
            .dyn_into::<HtmlElement>()
            .map_err(|_| ServiceError::ContainerMissing(container.to_string()))?;
        let map = sys::Map::new(&element, &to_js(options)?).map_err(provider_err)?;
        Ok(MapHandle(self.maps.alloc(map)))
    }

    fn create_marker(
        &mut self,
        map: MapHandle,
        position: LatLng,
        icon: &IconSpec,
    ) -> Result<MarkerHandle, ServiceError> {
        let opts: JsValue = js_sys::Object::new().into();
        set(&opts, "position", &to_js(&LatLngLiteral::from(position))?)?;
        set(&opts, "map", self.map(map)?)?;
        set(&opts, "icon", &icon_to_js(icon)?)?;
        let marker = sys::Marker::new(&opts).map_err(provider_err)?;
        Ok(MarkerHandle(self.markers.alloc(marker)))
    }

    fn marker_position(&self, marker: MarkerHandle) -> Option<LatLng> {
        self.markers
            .get(marker.0)?
            .get_position()
            .map(|p| from_sys(&p))
    }

    fn subscribe_map_clicks(&mut self, map: MapHandle) -> Result<(), ServiceError> {
        let target = self.map(map)?;
        let handler = Closure::<dyn FnMut(JsValue)>::new(move |event: JsValue| {
            if let Some(at) = click_position(&event) {
                dispatch_map_click(at);
            }
        });
        sys::add_map_listener(target, "click", handler.as_ref().unchecked_ref());
        // Listeners live as long as the page.
        handler.forget();
        Ok(())
    }

    fn subscribe_marker_clicks(&mut self, marker: MarkerHandle) -> Result<(), ServiceError> {
        let target = self
            .markers
            .get(marker.0)
            .ok_or(ServiceError::UnknownMarker(marker))?;
        let handler = Closure::<dyn FnMut()>::new(move || dispatch_marker_click(marker));
        target.add_listener("click", handler.as_ref().unchecked_ref());
        handler.forget();
        Ok(())
    }

    fn request_geocode(&mut self, ticket: Ticket, coordinate: LatLng) {
        let started = (|| -> Result<(), ServiceError> {
            let request: JsValue = js_sys::Object::new().into();
            set(&request, "location", &to_js(&LatLngLiteral::from(coordinate))?)?;
            let callback = Closure::once_into_js(move |results: JsValue, status: JsValue| {
                dispatch_geocoded(ticket, parse_geocode(&results, &status));
            });
            let returned = self
                .geocoder()?
                .geocode(&request, callback.unchecked_ref())
                .map_err(provider_err)?;
            // The callback already sees every status; awaiting the promise
            // keeps its rejection on non-OK statuses from going unhandled.
            if let Ok(promise) = returned.dyn_into::<js_sys::Promise>() {
                wasm_bindgen_futures::spawn_local(async move {
                    if let Err(err) = wasm_bindgen_futures::JsFuture::from(promise).await {
                        tracing::debug!("geocode {ticket} promise rejected: {err:?}");
                    }
                });
            }
            Ok(())
        })();

        if let Err(err) = started {
            tracing::warn!("geocode {ticket} could not start: {err}");
            // Deliver the failure after the current event handler returns.
            wasm_bindgen_futures::spawn_local(async move {
                dispatch_geocoded(ticket, GeocodeResponse::failed(GeocodeStatus::Error));
            });
        }
    }

    fn compute_distance_m(&self, a: LatLng, b: LatLng) -> f64 {
        let provider = to_sys(a)
            .and_then(|a_js| Ok((a_js, to_sys(b)?)))
            .ok()
            .and_then(|(a_js, b_js)| sys::compute_distance_between(&a_js, &b_js).ok());
        // The geometry library is optional; fall back to the same formula.
        provider.unwrap_or_else(|| spherical_distance_m(a, b))
    }

    fn pan_to(&mut self, map: MapHandle, center: LatLng) -> Result<(), ServiceError> {
        self.map(map)?.pan_to(&to_sys(center)?);
        Ok(())
    }

    fn set_zoom(&mut self, map: MapHandle, zoom: u8) -> Result<(), ServiceError> {
        self.map(map)?.set_zoom(f64::from(zoom));
        Ok(())
    }
}
