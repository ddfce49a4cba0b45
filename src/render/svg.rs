//! Static network plots as standalone SVG documents.

use std::fmt::Write;

use super::colormap::hsv_palette;
use super::escape_xml;
use crate::network::{DegreeClasses, NetworkGraph, TransitNetwork};
use crate::records::Coordinates;

const WIDTH: f64 = 1500.0;
const HEIGHT: f64 = 1000.0;
const MARGIN: f64 = 60.0;

/// Equirectangular mapping of the graph's bounding box onto the canvas.
struct Projection {
    min_lon: f64,
    max_lat: f64,
    scale: f64,
}

impl Projection {
    fn fit(points: impl Iterator<Item = Coordinates>) -> Self {
        let (mut min_lon, mut max_lon) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_lat, mut max_lat) = (f64::INFINITY, f64::NEG_INFINITY);
        for c in points {
            min_lon = min_lon.min(c.longitude);
            max_lon = max_lon.max(c.longitude);
            min_lat = min_lat.min(c.latitude);
            max_lat = max_lat.max(c.latitude);
        }
        if !min_lon.is_finite() {
            return Projection {
                min_lon: 0.0,
                max_lat: 0.0,
                scale: 1.0,
            };
        }

        let lon_span = (max_lon - min_lon).max(1e-9);
        let lat_span = (max_lat - min_lat).max(1e-9);
        let scale = ((WIDTH - 2.0 * MARGIN) / lon_span).min((HEIGHT - 2.0 * MARGIN) / lat_span);
        Projection {
            min_lon,
            max_lat,
            scale,
        }
    }

    fn project(&self, c: Coordinates) -> (f64, f64) {
        (
            MARGIN + (c.longitude - self.min_lon) * self.scale,
            MARGIN + (self.max_lat - c.latitude) * self.scale,
        )
    }
}

struct Canvas {
    body: String,
}

impl Canvas {
    fn new(title: &str) -> Self {
        let mut body = String::new();
        let _ = writeln!(
            body,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif">"#
        );
        let _ = writeln!(body, r#"<rect width="100%" height="100%" fill="white"/>"#);
        let _ = writeln!(
            body,
            r#"<text x="{}" y="30" font-size="22" text-anchor="middle">{}</text>"#,
            WIDTH / 2.0,
            escape_xml(title)
        );
        Canvas { body }
    }

    fn line(&mut self, a: (f64, f64), b: (f64, f64), color: &str, width: f64) {
        let _ = writeln!(
            self.body,
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{color}" stroke-width="{width}"/>"#,
            a.0, a.1, b.0, b.1
        );
    }

    fn circle(&mut self, at: (f64, f64), radius: f64, fill: &str) {
        let _ = writeln!(
            self.body,
            r#"<circle cx="{:.1}" cy="{:.1}" r="{radius}" fill="{fill}" stroke="black" stroke-width="0.5"/>"#,
            at.0, at.1
        );
    }

    fn label(&mut self, at: (f64, f64), text: &str, size: u32) {
        let _ = writeln!(
            self.body,
            r#"<text x="{:.1}" y="{:.1}" font-size="{size}">{}</text>"#,
            at.0 + 5.0,
            at.1 - 5.0,
            escape_xml(text)
        );
    }

    fn legend(&mut self, entries: &[(String, String)]) {
        for (i, (label, color)) in entries.iter().enumerate() {
            let y = 60.0 + i as f64 * 18.0;
            let _ = writeln!(
                self.body,
                r#"<rect x="{}" y="{y}" width="12" height="12" fill="{color}"/><text x="{}" y="{}" font-size="12">{}</text>"#,
                WIDTH - 180.0,
                WIDTH - 162.0,
                y + 10.0,
                escape_xml(label)
            );
        }
    }

    fn finish(mut self) -> String {
        self.body.push_str("</svg>\n");
        self.body
    }
}

/// Network plot with one colour per route: a route's stops and the edges
/// between its consecutive stops take the route colour; every node is
/// labelled.
pub fn network_svg(network: &TransitNetwork, title: &str) -> String {
    let graph = &network.graph;
    let projection = Projection::fit(graph.nodes().map(|(_, c)| c));
    let palette = hsv_palette(network.routes.len());
    let mut canvas = Canvas::new(title);
    let mut legend = Vec::new();

    for (route, color) in network.routes.iter().zip(&palette) {
        for pair in route.stops.windows(2) {
            if graph.has_edge(&pair[0].name, &pair[1].name) {
                canvas.line(
                    projection.project(pair[0].coordinates),
                    projection.project(pair[1].coordinates),
                    color,
                    2.0,
                );
            }
        }
        legend.push((route.id.clone(), color.clone()));
    }

    for (route, color) in network.routes.iter().zip(&palette) {
        for stop in route.stops.iter().filter(|s| graph.contains(&s.name)) {
            canvas.circle(projection.project(stop.coordinates), 5.0, color);
        }
    }

    for (name, c) in graph.nodes() {
        canvas.label(projection.project(c), name, 9);
    }

    canvas.legend(&legend);
    canvas.finish()
}

/// Plot of the whole graph in light blue with high-degree nodes in red and
/// low-degree nodes in green.
pub fn degree_svg(graph: &NetworkGraph, classes: &DegreeClasses, title: &str) -> String {
    let projection = Projection::fit(graph.nodes().map(|(_, c)| c));
    let mut canvas = Canvas::new(title);

    for (a, b) in graph.edges() {
        if let (Some(pa), Some(pb)) = (graph.position(a), graph.position(b)) {
            canvas.line(projection.project(pa), projection.project(pb), "#808080", 1.0);
        }
    }

    for (name, c) in graph.nodes() {
        let at = projection.project(c);
        if classes.is_high(name) {
            canvas.circle(at, 7.0, "red");
        } else if classes.is_low(name) {
            canvas.circle(at, 7.0, "green");
        } else {
            canvas.circle(at, 4.0, "lightblue");
        }
        canvas.label(at, name, 8);
    }

    canvas.legend(&[
        (format!("degree > 2 ({})", classes.high.len()), "red".to_string()),
        (format!("degree < 2 ({})", classes.low.len()), "green".to_string()),
        ("degree = 2".to_string(), "lightblue".to_string()),
    ]);
    canvas.finish()
}
