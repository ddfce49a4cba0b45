//! Presentation outputs: static SVG plots and interactive HTML maps.

pub mod colormap;
pub mod map;
pub mod svg;

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::instrument;

use crate::network::{DegreeClasses, RouteScore, TransitNetwork};
use crate::output::write_artifact;

pub const NETWORK_PLOT: &str = "network_routes.svg";
pub const DEGREE_PLOT: &str = "network_degrees.svg";
pub const ROUTE_MAP: &str = "bus_routes_map.html";
pub const SCORE_MAP: &str = "optimized_routes_map.html";
pub const HEATMAP: &str = "bus_stops_heatmap.html";

/// Escapes text for use in XML/HTML content and attribute values.
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Writes the two static plots. `network` is drawn as it stands (after any
/// merge); `classes` should come from the network as originally built.
#[instrument(skip_all, fields(output_dir = %output_dir.display()))]
pub fn render_plots(
    network: &TransitNetwork,
    classes: &DegreeClasses,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let routes = output_dir.join(NETWORK_PLOT);
    write_artifact(
        &routes,
        &svg::network_svg(network, "Bus Network Graph with Color-coded Routes"),
    )?;

    let degrees = output_dir.join(DEGREE_PLOT);
    write_artifact(
        &degrees,
        &svg::degree_svg(&network.graph, classes, "Adjusted Bus Network in Savona"),
    )?;

    Ok(vec![routes, degrees])
}

/// Writes the route map, the score map and the heatmap.
#[instrument(skip_all, fields(output_dir = %output_dir.display()))]
pub fn render_maps(
    network: &TransitNetwork,
    scores: &[RouteScore],
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let routes = output_dir.join(ROUTE_MAP);
    write_artifact(&routes, &map::route_map_html(network))?;

    let scored = output_dir.join(SCORE_MAP);
    write_artifact(&scored, &map::score_map_html(network, scores))?;

    let heat = output_dir.join(HEATMAP);
    write_artifact(&heat, &map::heatmap_html(network))?;

    Ok(vec![routes, scored, heat])
}
