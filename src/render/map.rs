//! Interactive Leaflet maps as standalone HTML pages.
//!
//! Map data is embedded as a JSON literal; the page pulls Leaflet (and the
//! heat plugin) from a CDN.

use serde::Serialize;
use std::collections::HashMap;

use super::colormap::{LinearColormap, SET1, YLGNBU};
use super::escape_xml;
use crate::network::{RouteScore, TransitNetwork};
use crate::records::Coordinates;

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
const LEAFLET_HEAT_JS: &str = "https://unpkg.com/leaflet.heat@0.2.0/dist/leaflet-heat.js";
const ZOOM_START: u8 = 12;

#[derive(Serialize)]
struct MapStop<'a> {
    name: &'a str,
    lat: f64,
    lon: f64,
}

#[derive(Serialize)]
struct MapRoute<'a> {
    id: &'a str,
    color: String,
    stops: Vec<MapStop<'a>>,
}

#[derive(Serialize)]
struct ScoredRoute<'a> {
    id: &'a str,
    color: String,
    score_km: f64,
    points: Vec<[f64; 2]>,
}

/// Serializes `value` for inclusion inside a `<script>` element.
fn script_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/")
}

fn page(title: &str, center: Option<Coordinates>, extra_scripts: &[&str], script: &str) -> String {
    let (lat, lon, zoom) = match center {
        Some(c) => (c.latitude, c.longitude, ZOOM_START),
        None => (0.0, 0.0, 2),
    };
    let extra: String = extra_scripts
        .iter()
        .map(|src| format!("<script src=\"{src}\"></script>\n"))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<link rel="stylesheet" href="{LEAFLET_CSS}">
<script src="{LEAFLET_JS}"></script>
{extra}<style>
html, body, #map {{ height: 100%; margin: 0; }}
.legend {{ background: white; padding: 6px 8px; font: 12px sans-serif; }}
.legend .bar {{ width: 200px; height: 10px; }}
</style>
</head>
<body>
<div id="map"></div>
<script>
var map = L.map('map').setView([{lat}, {lon}], {zoom});
L.tileLayer('https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png', {{
  maxZoom: 19,
  attribution: '&copy; OpenStreetMap contributors'
}}).addTo(map);
{script}
</script>
</body>
</html>
"#,
        title = escape_xml(title),
    )
}

fn map_routes(network: &TransitNetwork) -> Vec<MapRoute<'_>> {
    let colormap = LinearColormap::new(SET1, 0.0, network.routes.len() as f64);
    network
        .routes
        .iter()
        .enumerate()
        .map(|(i, route)| MapRoute {
            id: &route.id,
            color: colormap.color(i as f64),
            stops: route
                .stops
                .iter()
                .map(|s| MapStop {
                    name: &s.name,
                    lat: s.coordinates.latitude,
                    lon: s.coordinates.longitude,
                })
                .collect(),
        })
        .collect()
}

const ROUTE_LAYER_JS: &str = r#"routes.forEach(function (route) {
  route.stops.forEach(function (stop) {
    L.circleMarker([stop.lat, stop.lon], {
      radius: 5, color: route.color, fill: true, fillColor: route.color, fillOpacity: 0.7
    }).bindPopup(stop.name + ' (' + route.id + ')').addTo(map);
  });
  for (var i = 0; i + 1 < route.stops.length; i++) {
    var a = route.stops[i], b = route.stops[i + 1];
    L.polyline([[a.lat, a.lon], [b.lat, b.lon]], { color: route.color, weight: 2 }).addTo(map);
  }
});
"#;

/// Every route in its own colour: stop markers with popups and a polyline
/// between consecutive stops.
pub fn route_map_html(network: &TransitNetwork) -> String {
    let script = format!(
        "var routes = {};\n{ROUTE_LAYER_JS}",
        script_json(&map_routes(network))
    );
    page("Bus routes", network.centroid(), &[], &script)
}

/// The route map overlaid with one polyline per route coloured by its score
/// on a yellow-green-blue scale, with a legend.
pub fn score_map_html(network: &TransitNetwork, scores: &[RouteScore]) -> String {
    let max = scores
        .iter()
        .map(|s| s.mean_distance_km)
        .fold(0.0, f64::max);
    let colormap = LinearColormap::new(YLGNBU, 0.0, max);
    let by_route: HashMap<&str, f64> = scores
        .iter()
        .map(|s| (s.route_id.as_str(), s.mean_distance_km))
        .collect();

    let scored: Vec<ScoredRoute<'_>> = network
        .routes
        .iter()
        .filter_map(|route| {
            let score = *by_route.get(route.id.as_str())?;
            Some(ScoredRoute {
                id: &route.id,
                color: colormap.color(score),
                score_km: score,
                points: route
                    .stops
                    .iter()
                    .map(|s| [s.coordinates.latitude, s.coordinates.longitude])
                    .collect(),
            })
        })
        .collect();

    let gradient = colormap.hex_stops().join(", ");
    let script = format!(
        r#"var routes = {routes};
{ROUTE_LAYER_JS}var scored = {scored};
scored.forEach(function (route) {{
  L.polyline(route.points, {{ color: route.color, weight: 3, opacity: 1 }})
    .bindPopup(route.id + ': ' + route.score_km.toFixed(3) + ' km')
    .addTo(map);
}});
var legend = L.control({{ position: 'topright' }});
legend.onAdd = function () {{
  var div = L.DomUtil.create('div', 'legend');
  div.innerHTML = '<div>Optimization Score</div>'
    + '<div class="bar" style="background: linear-gradient(to right, {gradient})"></div>'
    + '<div>{min:.2} &ndash; {max:.2} km</div>';
  return div;
}};
legend.addTo(map);
"#,
        routes = script_json(&map_routes(network)),
        scored = script_json(&scored),
        min = colormap.min(),
        max = colormap.max(),
    );
    page("Optimized routes", network.centroid(), &[], &script)
}

/// Density heatmap over every route-stop position.
pub fn heatmap_html(network: &TransitNetwork) -> String {
    let points: Vec<[f64; 2]> = network
        .stop_positions()
        .iter()
        .map(|c| [c.latitude, c.longitude])
        .collect();
    let script = format!(
        "var points = {};\nL.heatLayer(points).addTo(map);\n",
        script_json(&points)
    );
    page("Bus stop density", network.centroid(), &[LEAFLET_HEAT_JS], &script)
}
