use std::f64::consts::{PI, TAU};

use dominica_shared::{DamageSummary, PieSlice, format_count, format_percentage, pie_slices};
use leptos::prelude::*;

const CHART_WIDTH: f64 = 250.0;
const CHART_HEIGHT: f64 = 200.0;
const WEDGE_INSET: f64 = 10.0;
const LABEL_INSET: f64 = 40.0;

/// One drawable wedge: SVG path relative to the chart centre plus the label
/// anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct Wedge {
    pub slice: PieSlice,
    pub path: String,
    pub label_at: (f64, f64),
}

/// Lay out wedges clockwise from 12 o'clock in the order given. Angles are
/// proportional to counts; zero-count slices produce no wedge.
pub fn pie_wedges(slices: &[PieSlice], outer_radius: f64, label_radius: f64) -> Vec<Wedge> {
    let sum: u64 = slices.iter().map(|s| s.count).sum();
    if sum == 0 {
        return Vec::new();
    }

    let mut wedges = Vec::with_capacity(slices.len());
    let mut start = 0.0_f64;
    for slice in slices {
        let sweep = slice.count as f64 / sum as f64 * TAU;
        let end = start + sweep;
        if slice.count > 0 {
            let mid = (start + end) / 2.0;
            wedges.push(Wedge {
                slice: *slice,
                path: wedge_path(start, end, outer_radius),
                label_at: polar(mid, label_radius),
            });
        }
        start = end;
    }
    wedges
}

fn polar(angle: f64, radius: f64) -> (f64, f64) {
    (radius * angle.sin(), -radius * angle.cos())
}

fn wedge_path(start: f64, end: f64, r: f64) -> String {
    let (x0, y0) = polar(start, r);
    if end - start >= TAU - 1e-9 {
        // A single arc cannot describe a full circle; split it in two.
        let (xm, ym) = polar(start + PI, r);
        return format!(
            "M{x0:.3},{y0:.3}A{r},{r} 0 1,1 {xm:.3},{ym:.3}A{r},{r} 0 1,1 {x0:.3},{y0:.3}Z"
        );
    }
    let (x1, y1) = polar(end, r);
    let large_arc = u8::from(end - start > PI);
    format!("M{x0:.3},{y0:.3}A{r},{r} 0 {large_arc},1 {x1:.3},{y1:.3}L0,0Z")
}

#[derive(Debug, Clone, PartialEq)]
struct ChartTooltip {
    slice: PieSlice,
    x: f64,
    y: f64,
}

/// Pie chart of buildings per damage category, one wedge per category in
/// ascending category order.
#[component]
pub fn DamagePieChart(summary: DamageSummary) -> impl IntoView {
    let radius = CHART_WIDTH.min(CHART_HEIGHT) / 2.0;
    let wedges = pie_wedges(&pie_slices(&summary), radius - WEDGE_INSET, radius - LABEL_INSET);

    if wedges.is_empty() {
        return view! { <div class="chart-empty">"No buildings assessed"</div> }.into_any();
    }

    let hovered: RwSignal<Option<usize>> = RwSignal::new(None);
    // Only one tooltip exists at a time: entering a wedge replaces it,
    // leaving clears it.
    let tooltip: RwSignal<Option<ChartTooltip>> = RwSignal::new(None);

    let paths = wedges
        .iter()
        .cloned()
        .enumerate()
        .map(|(i, wedge)| {
            let slice = wedge.slice;
            view! {
                <path
                    d=wedge.path
                    fill=slice.category.color_hex()
                    stroke="#fff"
                    stroke-width="2"
                    style="transition: transform 200ms, opacity 200ms; cursor: pointer;"
                    style:opacity=move || if hovered.get() == Some(i) { "1" } else { "0.8" }
                    transform=move || if hovered.get() == Some(i) { "scale(1.1)" } else { "scale(1)" }
                    on:mouseenter=move |ev| {
                        hovered.set(Some(i));
                        tooltip.set(Some(ChartTooltip {
                            slice,
                            x: f64::from(ev.client_x()),
                            y: f64::from(ev.client_y()),
                        }));
                    }
                    on:mousemove=move |ev| {
                        tooltip.update(|t| {
                            if let Some(t) = t {
                                t.x = f64::from(ev.client_x());
                                t.y = f64::from(ev.client_y());
                            }
                        });
                    }
                    on:mouseleave=move |_| {
                        hovered.set(None);
                        tooltip.set(None);
                    }
                />
            }
        })
        .collect_view();

    let labels = wedges
        .into_iter()
        .map(|wedge| {
            let (x, y) = wedge.label_at;
            view! {
                <text
                    transform=format!("translate({x:.3},{y:.3})")
                    text-anchor="middle"
                    style="font-size: 12px; font-weight: bold; fill: #333; pointer-events: none;"
                >
                    {format_percentage(wedge.slice.percentage)}
                </text>
            }
        })
        .collect_view();

    view! {
        <svg width={CHART_WIDTH.to_string()} height={CHART_HEIGHT.to_string()}>
            <g transform=format!("translate({}, {})", CHART_WIDTH / 2.0, CHART_HEIGHT / 2.0)>
                {paths}
                {labels}
            </g>
        </svg>
        {move || tooltip.get().map(|t| view! {
            <div
                class="chart-tooltip"
                style="position: fixed; pointer-events: none; z-index: 100; opacity: 0.9;"
                style:left=format!("{}px", t.x + 10.0)
                style:top=format!("{}px", t.y - 28.0)
            >
                <strong>{t.slice.category.label()}</strong>
                <br />
                {format!("{} buildings", format_count(t.slice.count))}
                <br />
                {format_percentage(t.slice.percentage)}
            </div>
        })}
    }
    .into_any()
}
