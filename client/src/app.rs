use dominica_shared::DamageSummary;
use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::api;
use crate::dashboard::DamageDashboard;
use crate::map::MapView;

#[component]
pub fn App() -> impl IntoView {
    let map_error: RwSignal<Option<String>> = RwSignal::new(None);
    let map_ready = RwSignal::new(false);
    let summary: RwSignal<Option<DamageSummary>> = RwSignal::new(None);

    // The dashboard loads once the map has finished its own setup.
    Effect::new(move |_| {
        if !map_ready.get() {
            return;
        }
        spawn_local(async move {
            match api::fetch_damage_summary().await {
                Ok(data) => {
                    if data.has_discrepancy() {
                        web_sys::console::warn_1(
                            &format!(
                                "Damage summary total {} differs from category sum {}",
                                data.total_buildings,
                                data.counted_total()
                            )
                            .into(),
                        );
                    }
                    summary.set(Some(data));
                }
                Err(e) => {
                    web_sys::console::error_1(
                        &format!("Failed to load damage summary: {e}").into(),
                    );
                }
            }
        });
    });

    view! {
        <div
            id="error"
            class="error-banner"
            style:display=move || if map_error.get().is_some() { "block" } else { "none" }
        >
            {move || map_error.get().unwrap_or_default()}
        </div>
        <MapView map_ready=map_ready map_error=map_error />
        {move || summary.get().map(|summary| view! { <DamageDashboard summary=summary /> })}
    }
}
