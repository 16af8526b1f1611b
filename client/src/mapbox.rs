//! Bindings to the `mapboxgl` global loaded by `index.html`.
//!
//! Thin wrappers only: no state, no logic.

use js_sys::{Function, Reflect};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = mapboxgl, js_name = Map)]
    #[derive(Clone)]
    pub type MapboxMap;

    #[wasm_bindgen(constructor, js_namespace = mapboxgl, js_class = "Map", catch)]
    pub fn new(options: &JsValue) -> Result<MapboxMap, JsValue>;

    #[wasm_bindgen(method, js_name = addSource)]
    pub fn add_source(this: &MapboxMap, id: &str, source: &JsValue);

    #[wasm_bindgen(method, js_name = addLayer)]
    pub fn add_layer(this: &MapboxMap, layer: &JsValue);

    #[wasm_bindgen(method, js_name = on)]
    pub fn on(this: &MapboxMap, event: &str, listener: &Function);

    #[wasm_bindgen(method, js_name = on)]
    pub fn on_layer(this: &MapboxMap, event: &str, layer_id: &str, listener: &Function);

    #[wasm_bindgen(method, js_name = setFeatureState)]
    pub fn set_feature_state(this: &MapboxMap, feature: &JsValue, state: &JsValue);

    #[wasm_bindgen(method, js_name = flyTo)]
    pub fn fly_to(this: &MapboxMap, options: &JsValue);

    #[wasm_bindgen(method, js_name = getCenter)]
    pub fn get_center(this: &MapboxMap) -> JsValue;

    #[wasm_bindgen(method, js_name = getZoom)]
    pub fn get_zoom(this: &MapboxMap) -> f64;

    #[wasm_bindgen(method, js_name = getPitch)]
    pub fn get_pitch(this: &MapboxMap) -> f64;

    #[wasm_bindgen(method, js_name = getBearing)]
    pub fn get_bearing(this: &MapboxMap) -> f64;

    #[wasm_bindgen(method, js_name = getCanvas)]
    pub fn get_canvas(this: &MapboxMap) -> web_sys::HtmlCanvasElement;

    /// Tears down the map and every listener registered on it.
    #[wasm_bindgen(method)]
    pub fn remove(this: &MapboxMap);

    #[wasm_bindgen(js_namespace = mapboxgl, js_name = Popup)]
    #[derive(Clone)]
    pub type MapboxPopup;

    #[wasm_bindgen(constructor, js_namespace = mapboxgl, js_class = "Popup")]
    pub fn new(options: &JsValue) -> MapboxPopup;

    #[wasm_bindgen(method, js_name = setLngLat)]
    pub fn set_lng_lat(this: &MapboxPopup, lng_lat: &JsValue) -> MapboxPopup;

    #[wasm_bindgen(method, js_name = setHTML)]
    pub fn set_html(this: &MapboxPopup, html: &str) -> MapboxPopup;

    #[wasm_bindgen(method, js_name = addTo)]
    pub fn add_to(this: &MapboxPopup, map: &MapboxMap) -> MapboxPopup;

    #[wasm_bindgen(method)]
    pub fn remove(this: &MapboxPopup);
}

/// The `mapboxgl` global, if the library script loaded.
pub fn mapboxgl_global() -> Option<JsValue> {
    Reflect::get(&js_sys::global(), &JsValue::from_str("mapboxgl"))
        .ok()
        .filter(|value| !value.is_undefined() && !value.is_null())
}

pub fn set_access_token(mapboxgl: &JsValue, token: &str) -> Result<(), JsValue> {
    Reflect::set(
        mapboxgl,
        &JsValue::from_str("accessToken"),
        &JsValue::from_str(token),
    )
    .map(|_| ())
}

/// Convert any serializable value into a plain JS object (not a JS `Map`).
pub fn to_js<T: Serialize + ?Sized>(value: &T) -> JsValue {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .unwrap_or(JsValue::UNDEFINED)
}
