//! Map engine adapter: builds the mapbox map, its sources and layers, and
//! routes pointer events into the hover tracker and popup manager.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use dominica_shared::{BuildingProperties, DamageCategory};
use js_sys::{Array, Reflect};
use leptos::prelude::*;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use wasm_bindgen_futures::spawn_local;

use crate::api;
use crate::config::{
    BUILDING_DATA_URL, BUILDING_LAYER, BUILDING_SOURCE_ID, DETAIL_ZOOM, HEXAGON_DATA_URL,
    HEXAGON_FILL_COLOR, HEXAGON_FILL_LAYER, HEXAGON_OUTLINE_COLOR, HEXAGON_OUTLINE_LAYER,
    HEXAGON_SOURCE_ID, MAP_CONTAINER_ID, MAP_STYLE_URL, MAPBOX_ACCESS_TOKEN,
    RESET_VIEW_DURATION_MS,
};
use crate::hover::{FeatureId, FeatureStateTarget, HoverTracker};
use crate::mapbox::{self, LngLat, MapboxMap, MapboxPopup, to_js};
use crate::popup::{PopupHost, PopupManager, PopupOptions};

/// Camera position captured when the map finishes loading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub center: LngLat,
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
}

/// Hands out increasing tickets so a slow response can tell whether a newer
/// interaction has superseded it.
#[derive(Debug, Default)]
pub struct RequestGeneration {
    latest: Cell<u64>,
}

impl RequestGeneration {
    pub fn begin(&self) -> u64 {
        let next = self.latest.get().wrapping_add(1);
        self.latest.set(next);
        next
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.latest.get() == ticket
    }
}

pub struct MapboxPopups {
    map: MapboxMap,
}

impl PopupHost for MapboxPopups {
    type Popup = MapboxPopup;

    fn open(&mut self, at: LngLat, html: &str, options: &PopupOptions) -> MapboxPopup {
        MapboxPopup::new(&to_js(options))
            .set_lng_lat(&to_js(&[at.lng, at.lat]))
            .set_html(html)
            .add_to(&self.map)
    }

    fn close(&mut self, popup: MapboxPopup) {
        popup.remove();
    }
}

struct HexagonFeatureStates<'a>(&'a MapboxMap);

impl FeatureStateTarget for HexagonFeatureStates<'_> {
    fn set_hover(&mut self, id: FeatureId, hovered: bool) {
        self.0.set_feature_state(
            &to_js(&json!({ "source": HEXAGON_SOURCE_ID, "id": id })),
            &to_js(&json!({ "hover": hovered })),
        );
    }
}

type Listener = Closure<dyn FnMut(JsValue)>;

/// Everything one map instance needs while it is on screen. Handlers hold a
/// `Weak` back-reference, so dropping the session releases the listeners.
pub struct MapSession {
    map: MapboxMap,
    hover: RefCell<HoverTracker>,
    popups: RefCell<PopupManager<MapboxPopups>>,
    initial_view: Cell<Option<ViewState>>,
    popup_requests: RequestGeneration,
    listeners: RefCell<Vec<Listener>>,
}

impl MapSession {
    pub fn start(
        on_loaded: impl Fn() + 'static,
        on_error: impl Fn(String) + 'static,
    ) -> Result<Rc<Self>, String> {
        let mapboxgl = mapbox::mapboxgl_global();
        if let Some(message) = bootstrap_error(mapboxgl.is_some(), MAPBOX_ACCESS_TOKEN) {
            return Err(message.to_string());
        }
        if let Some(mapboxgl) = mapboxgl {
            mapbox::set_access_token(&mapboxgl, MAPBOX_ACCESS_TOKEN)
                .map_err(|_| "Mapbox access token is required".to_string())?;
        }

        let map = MapboxMap::new(&to_js(&json!({
            "container": MAP_CONTAINER_ID,
            "style": MAP_STYLE_URL,
        })))
        .map_err(|e| format!("Map failed to load: {}", js_error_message(&e)))?;

        let session = Rc::new(Self {
            popups: RefCell::new(PopupManager::new(MapboxPopups { map: map.clone() })),
            map,
            hover: RefCell::new(HoverTracker::default()),
            initial_view: Cell::new(None),
            popup_requests: RequestGeneration::default(),
            listeners: RefCell::new(Vec::new()),
        });

        session.listen("load", None, move |session, _| {
            session.on_load();
            on_loaded();
        });
        session.listen("error", None, move |_, ev| {
            let message = Reflect::get(&ev, &JsValue::from_str("error"))
                .map(|err| js_error_message(&err))
                .unwrap_or_else(|_| "Unknown error".to_string());
            on_error(format!("Map failed to load: {message}"));
        });

        Ok(session)
    }

    /// Fly back to the camera captured at load.
    pub fn reset_view(&self) {
        let Some(view) = self.initial_view.get() else {
            return;
        };
        self.map.fly_to(&to_js(&json!({
            "center": [view.center.lng, view.center.lat],
            "zoom": view.zoom,
            "pitch": view.pitch,
            "bearing": view.bearing,
            "duration": RESET_VIEW_DURATION_MS,
        })));
    }

    fn listen(
        self: &Rc<Self>,
        event: &'static str,
        layer: Option<&'static str>,
        handler: impl Fn(&Rc<Self>, JsValue) + 'static,
    ) {
        let weak: Weak<Self> = Rc::downgrade(self);
        let listener = Listener::new(move |ev: JsValue| {
            if let Some(session) = weak.upgrade() {
                handler(&session, ev);
            }
        });
        match layer {
            Some(layer) => self
                .map
                .on_layer(event, layer, listener.as_ref().unchecked_ref()),
            None => self.map.on(event, listener.as_ref().unchecked_ref()),
        }
        self.listeners.borrow_mut().push(listener);
    }

    fn on_load(self: &Rc<Self>) {
        let center = serde_wasm_bindgen::from_value::<LngLat>(self.map.get_center()).ok();
        if let Some(center) = center {
            self.initial_view.set(Some(ViewState {
                center,
                zoom: self.map.get_zoom(),
                pitch: self.map.get_pitch(),
                bearing: self.map.get_bearing(),
            }));
        }

        web_sys::console::info_1(&"Setting up map sources and layers".into());
        self.map
            .add_source(HEXAGON_SOURCE_ID, &to_js(&geojson_source(HEXAGON_DATA_URL)));
        self.map
            .add_source(BUILDING_SOURCE_ID, &to_js(&geojson_source(BUILDING_DATA_URL)));
        for layer in [
            hexagon_fill_layer(),
            hexagon_outline_layer(),
            building_layer(),
        ] {
            self.map.add_layer(&to_js(&layer));
        }

        for layer in [HEXAGON_FILL_LAYER, BUILDING_LAYER] {
            self.listen("mouseenter", Some(layer), |session, _| {
                session.set_cursor("pointer");
            });
            self.listen("mouseleave", Some(layer), |session, _| {
                session.set_cursor("");
            });
        }
        self.listen("mousemove", Some(HEXAGON_FILL_LAYER), |session, ev| {
            let id = first_feature(&ev).and_then(|feature| feature_id(&feature));
            let mut states = HexagonFeatureStates(&session.map);
            session.hover.borrow_mut().pointer_move(&mut states, id);
        });
        self.listen("mouseleave", Some(HEXAGON_FILL_LAYER), |session, _| {
            let mut states = HexagonFeatureStates(&session.map);
            session.hover.borrow_mut().pointer_leave(&mut states);
        });
        self.listen("click", Some(HEXAGON_FILL_LAYER), |session, ev| {
            session.on_hexagon_click(&ev);
        });
        self.listen("click", Some(BUILDING_LAYER), |session, ev| {
            session.on_building_click(&ev);
        });
    }

    fn on_hexagon_click(self: &Rc<Self>, ev: &JsValue) {
        let Some(at) = event_lng_lat(ev) else {
            return;
        };
        self.map.fly_to(&to_js(&json!({
            "center": [at.lng, at.lat],
            "zoom": DETAIL_ZOOM,
        })));
        self.set_cursor("crosshair");

        let Some(hexagon_id) = first_feature(ev).and_then(|feature| hexagon_key(&feature)) else {
            return;
        };
        let ticket = self.popup_requests.begin();
        let weak = Rc::downgrade(self);
        spawn_local(async move {
            let result = api::fetch_hexagon_stats(&hexagon_id).await;
            let Some(session) = weak.upgrade() else {
                return;
            };
            if !session.popup_requests.is_current(ticket) {
                web_sys::console::info_1(
                    &format!("Discarding stale stats for hexagon {hexagon_id}").into(),
                );
                return;
            }
            let stats = match result {
                Ok(stats) => Some(stats),
                Err(e) => {
                    web_sys::console::warn_1(
                        &format!("Failed to fetch hexagon stats for {hexagon_id}: {e}").into(),
                    );
                    None
                }
            };
            session
                .popups
                .borrow_mut()
                .show_hexagon_popup(at, stats.as_ref());
        });
    }

    fn on_building_click(&self, ev: &JsValue) {
        let Some(at) = event_lng_lat(ev) else {
            return;
        };
        // A building popup supersedes any hexagon lookup still in flight.
        self.popup_requests.begin();
        let building = first_feature(ev)
            .and_then(|feature| feature_properties::<BuildingProperties>(&feature))
            .unwrap_or_default();
        self.popups.borrow_mut().show_building_popup(at, &building);
    }

    fn set_cursor(&self, cursor: &str) {
        let canvas = self.map.get_canvas();
        web_sys::HtmlElement::style(&canvas)
            .set_property("cursor", cursor)
            .ok();
    }
}

impl Drop for MapSession {
    fn drop(&mut self) {
        let popups = self.popups.get_mut();
        if popups.has_active_popups() {
            popups.close_all_popups();
        }
        // The JS map must stop dispatching before `listeners` frees the closures.
        self.map.remove();
    }
}

/// Reason the map cannot be created at all, shown in the error banner.
pub fn bootstrap_error(library_loaded: bool, access_token: &str) -> Option<&'static str> {
    if !library_loaded {
        Some("Failed to load Mapbox GL JS")
    } else if access_token.trim().is_empty() {
        Some("Mapbox access token is required")
    } else {
        None
    }
}

pub fn geojson_source(url: &str) -> Value {
    json!({
        "type": "geojson",
        "data": url,
        "generateId": true,
    })
}

pub fn hexagon_fill_layer() -> Value {
    json!({
        "id": HEXAGON_FILL_LAYER,
        "type": "fill",
        "source": HEXAGON_SOURCE_ID,
        "layout": {},
        "paint": {
            "fill-color": HEXAGON_FILL_COLOR,
            "fill-opacity": [
                "case",
                ["boolean", ["feature-state", "hover"], false],
                1.0,
                0.5
            ]
        },
        "maxzoom": DETAIL_ZOOM,
    })
}

pub fn hexagon_outline_layer() -> Value {
    json!({
        "id": HEXAGON_OUTLINE_LAYER,
        "type": "line",
        "source": HEXAGON_SOURCE_ID,
        "layout": {},
        "paint": { "line-color": HEXAGON_OUTLINE_COLOR },
    })
}

pub fn building_layer() -> Value {
    json!({
        "id": BUILDING_LAYER,
        "type": "circle",
        "source": BUILDING_SOURCE_ID,
        "paint": {
            "circle-color": building_color_expression(),
            "circle-radius": 5,
            "circle-stroke-width": 0.5,
            "circle-stroke-color": "#ffffff",
        },
        "minzoom": DETAIL_ZOOM,
    })
}

/// `match` expression colouring buildings by `Category_i`; anything outside
/// 1..=4 falls through to the no-data colour.
pub fn building_color_expression() -> Value {
    let mut expression = vec![json!("match"), json!(["get", "Category_i"])];
    for category in DamageCategory::all().filter(|c| c.has_data()) {
        expression.push(json!(category.value()));
        expression.push(json!(category.color_hex()));
    }
    expression.push(json!(DamageCategory::NO_DATA.color_hex()));
    Value::Array(expression)
}

fn event_lng_lat(ev: &JsValue) -> Option<LngLat> {
    let raw = Reflect::get(ev, &JsValue::from_str("lngLat")).ok()?;
    serde_wasm_bindgen::from_value(raw).ok()
}

fn first_feature(ev: &JsValue) -> Option<JsValue> {
    let features = Reflect::get(ev, &JsValue::from_str("features")).ok()?;
    let features = features.dyn_into::<Array>().ok()?;
    let first = features.get(0);
    (!first.is_undefined()).then_some(first)
}

fn feature_id(feature: &JsValue) -> Option<FeatureId> {
    Reflect::get(feature, &JsValue::from_str("id"))
        .ok()?
        .as_f64()
        .filter(|id| id.is_finite() && *id >= 0.0 && id.fract() == 0.0)
        .map(|id| id as FeatureId)
}

fn feature_properties<T: DeserializeOwned>(feature: &JsValue) -> Option<T> {
    let raw = Reflect::get(feature, &JsValue::from_str("properties")).ok()?;
    serde_wasm_bindgen::from_value(raw).ok()
}

/// Identifier the damage API knows a hexagon by: its `id` property when the
/// source carries one, otherwise the engine-assigned feature id.
fn hexagon_key(feature: &JsValue) -> Option<String> {
    let from_property = feature_properties::<serde_json::Map<String, Value>>(feature)
        .and_then(|props| hexagon_key_from_properties(&props));
    from_property.or_else(|| feature_id(feature).map(|id| id.to_string()))
}

pub fn hexagon_key_from_properties(props: &serde_json::Map<String, Value>) -> Option<String> {
    match props.get("id")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn js_error_message(err: &JsValue) -> String {
    if let Some(message) = Reflect::get(err, &JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
    {
        return message;
    }
    err.as_string().unwrap_or_else(|| "Unknown error".to_string())
}

/// Full-viewport map plus the reset-view control.
#[component]
pub fn MapView(map_ready: RwSignal<bool>, map_error: RwSignal<Option<String>>) -> impl IntoView {
    let container = NodeRef::<leptos::html::Div>::new();
    let session = StoredValue::new_local(None::<Rc<MapSession>>);

    Effect::new(move |_| {
        if container.get().is_none() || session.with_value(Option::is_some) {
            return;
        }
        let started = MapSession::start(
            move || map_ready.set(true),
            move |message| {
                web_sys::console::error_1(&message.clone().into());
                map_error.set(Some(message));
            },
        );
        match started {
            Ok(started) => session.set_value(Some(started)),
            Err(message) => {
                web_sys::console::error_1(&message.clone().into());
                map_error.set(Some(message));
            }
        }
    });

    view! {
        <div id=MAP_CONTAINER_ID class="map-container" node_ref=container></div>
        <button
            id="resetMapBtn"
            class="reset-button"
            title="Reset view"
            on:click=move |_| {
                session.with_value(|s| {
                    if let Some(s) = s {
                        s.reset_view();
                    }
                });
            }
        >
            "Reset view"
        </button>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_requires_library_then_token() {
        assert_eq!(
            bootstrap_error(false, "pk.token"),
            Some("Failed to load Mapbox GL JS")
        );
        assert_eq!(
            bootstrap_error(true, "  "),
            Some("Mapbox access token is required")
        );
        assert_eq!(bootstrap_error(true, "pk.token"), None);
    }

    #[test]
    fn newer_request_supersedes_older() {
        let requests = RequestGeneration::default();
        let first = requests.begin();
        assert!(requests.is_current(first));
        let second = requests.begin();
        assert!(!requests.is_current(first));
        assert!(requests.is_current(second));
    }

    #[test]
    fn sources_request_generated_ids() {
        let source = geojson_source(HEXAGON_DATA_URL);
        assert_eq!(source["generateId"], true);
        assert_eq!(source["type"], "geojson");
    }

    #[test]
    fn hexagon_fill_opacity_follows_hover_state() {
        let layer = hexagon_fill_layer();
        assert_eq!(
            layer["paint"]["fill-opacity"],
            json!(["case", ["boolean", ["feature-state", "hover"], false], 1.0, 0.5])
        );
        assert_eq!(layer["maxzoom"], json!(DETAIL_ZOOM));
        assert_eq!(layer["source"], HEXAGON_SOURCE_ID);
    }

    #[test]
    fn building_colors_match_palette_with_no_data_fallback() {
        assert_eq!(
            building_color_expression(),
            json!([
                "match",
                ["get", "Category_i"],
                1, "#2a630e",
                2, "#d1d569",
                3, "#d57438",
                4, "#cd2667",
                "#cccccc"
            ])
        );
        assert_eq!(building_layer()["minzoom"], json!(DETAIL_ZOOM));
    }

    #[test]
    fn hexagon_key_prefers_id_property() {
        let props = json!({"id": " 12 ", "other": 1});
        let Value::Object(props) = props else {
            panic!("fixture is an object");
        };
        assert_eq!(hexagon_key_from_properties(&props), Some("12".to_string()));

        let numeric = json!({"id": 7});
        let Value::Object(numeric) = numeric else {
            panic!("fixture is an object");
        };
        assert_eq!(hexagon_key_from_properties(&numeric), Some("7".to_string()));

        let empty = serde_json::Map::new();
        assert_eq!(hexagon_key_from_properties(&empty), None);
    }
}
