//! Browser entry point: wires the Google Maps binding, the DOM and the
//! widget shell together.
//!
//! JS event handlers (script load, map clicks, marker clicks, geocode
//! callbacks) all land in the `dispatch_*` functions, which borrow the
//! single thread-local widget state for the duration of one event.

use std::cell::RefCell;

use foundation::math::LatLng;
use mapservice::{GeocodeResponse, MarkerHandle};
use runtime::Ticket;
use tracing::{info, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::Document;
use widget::{Shell, WidgetConfig};

mod dom;
mod google;
mod logging;

use dom::DomScriptHost;
use google::GoogleMapsService;

struct WebState {
    document: Document,
    shell: Shell,
    service: GoogleMapsService,
}

thread_local! {
    static STATE: RefCell<Option<WebState>> = const { RefCell::new(None) };
}

fn with_state<R>(f: impl FnOnce(&mut WebState) -> R) -> Option<R> {
    STATE.with(|state| match state.try_borrow_mut() {
        Ok(mut guard) => guard.as_mut().map(f),
        Err(_) => {
            warn!("re-entrant widget event dropped");
            None
        }
    })
}

fn render(st: &WebState) {
    let view = st.shell.view();
    if let Err(err) = dom::render_view(&st.document, &st.shell.config().container_id, &view) {
        warn!("render failed: {err:?}");
    }
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    logging::init();
}

/// Loads the map binding and mounts the widget into `container_id` once it
/// is ready. Calling it again is a no-op.
#[wasm_bindgen]
pub fn mount_widget(api_key: &str, container_id: &str) -> Result<(), JsValue> {
    if STATE.with(|s| s.borrow().is_some()) {
        info!("widget already mounted");
        return Ok(());
    }

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let origin = window.location().origin()?;

    let mut config = WidgetConfig::with_api_key(api_key);
    config.container_id = container_id.to_string();
    config.home_icon_url = format!("{origin}{}", config.home_icon_url);
    config
        .validate()
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let url = config.binding_request().url();
    let mut shell = Shell::new(config);
    shell
        .init(&mut DomScriptHost {
            document: &document,
        })
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let signal = shell.load_signal();
    let state = WebState {
        service: GoogleMapsService::new(document.clone()),
        document: document.clone(),
        shell,
    };
    render(&state);
    STATE.with(|s| *s.borrow_mut() = Some(state));

    if dom::binding_present() {
        // The script loaded before we were asked; its load event is gone.
        dispatch_binding_loaded();
    } else if let Some(script) = dom::find_script(&document, &url) {
        let on_load = Closure::once_into_js(dispatch_binding_loaded);
        script.add_event_listener_with_callback("load", on_load.unchecked_ref())?;
        let on_error = Closure::once_into_js(|_: JsValue| {
            with_state(|st| st.shell.on_binding_failed("script failed to load"));
        });
        script.add_event_listener_with_callback("error", on_error.unchecked_ref())?;
    } else {
        warn!("map binding script not found after insertion");
    }

    spawn_local(async move {
        signal.wait().await;
        with_state(|st| {
            render(st);
            if let Err(err) = st.shell.mount(&mut st.service) {
                warn!("widget not mounted: {err}");
            }
        });
    });
    Ok(())
}

/// Last computed distance in kilometers, `-1` if none yet.
#[wasm_bindgen]
pub fn distance_km() -> i64 {
    with_state(|st| st.shell.distance_km().value()).unwrap_or(-1)
}

#[wasm_bindgen]
pub fn distance_sentence() -> Option<String> {
    with_state(|st| st.shell.view().distance_sentence).flatten()
}

fn dispatch_binding_loaded() {
    with_state(|st| st.shell.on_binding_loaded());
}

pub(crate) fn dispatch_map_click(at: LatLng) {
    with_state(|st| st.shell.on_map_click(&mut st.service, at));
}

pub(crate) fn dispatch_geocoded(ticket: Ticket, response: GeocodeResponse) {
    with_state(|st| {
        if let Err(err) = st.shell.on_geocoded(&mut st.service, ticket, response) {
            warn!("geocode {ticket} not applied: {err}");
        }
    });
}

pub(crate) fn dispatch_marker_click(marker: MarkerHandle) {
    with_state(|st| match st.shell.on_marker_click(&mut st.service, marker) {
        Ok(_) => render(st),
        Err(err) => warn!("marker click on {marker} failed: {err}"),
    });
}
