//! Standalone SVG rendering of the radar chart

use soulmirror_common::chart::{svg_points, RadarGeometry, RadarPoint, GRID_LEVELS};
use std::fmt::Write;

const GRID_STROKE: &str = "#e5e7eb";
const FILL: &str = "#8b5cf6";
const LABEL_COLOR: &str = "#4b5563";

/// Labels sit slightly outside the outer ring
const LABEL_OFFSET: f64 = 1.18;

/// Render `points` as a complete SVG document
pub fn render_radar_svg(points: &[RadarPoint], geometry: &RadarGeometry) -> String {
    let axes = points.len();
    let size = geometry.size;
    let center = geometry.center();
    let mut svg = String::new();

    // writes to a String cannot fail
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{size}" height="{size}" viewBox="0 0 {size} {size}">"#
    );

    for level in GRID_LEVELS {
        let _ = writeln!(
            svg,
            r#"  <polygon points="{}" fill="none" stroke="{}" stroke-width="1"/>"#,
            svg_points(&geometry.grid_ring(level, axes)),
            GRID_STROKE
        );
    }

    for index in 0..axes {
        let (x, y) = geometry.project(1.0, 1.0, index, axes);
        let _ = writeln!(
            svg,
            r#"  <line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="1"/>"#,
            center, center, x, y, GRID_STROKE
        );
    }

    let _ = writeln!(
        svg,
        r#"  <polygon points="{}" fill="{}" fill-opacity="0.5" stroke="{}" stroke-width="2"/>"#,
        svg_points(&geometry.polygon(points)),
        FILL,
        FILL
    );

    for (index, point) in points.iter().enumerate() {
        let (x, y) = geometry.project(LABEL_OFFSET, 1.0, index, axes);
        let _ = writeln!(
            svg,
            r#"  <text x="{:.2}" y="{:.2}" fill="{}" font-size="12" text-anchor="middle" dominant-baseline="middle">{}</text>"#,
            x,
            y,
            LABEL_COLOR,
            escape(&point.subject)
        );
    }

    svg.push_str("</svg>\n");
    svg
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use soulmirror_common::chart::radar_points;

    fn points() -> Vec<RadarPoint> {
        let dims: Vec<String> = ["认知力", "情绪力", "行动力", "社交力", "意志力", "洞察力"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        radar_points(&dims, &[60, 60, 60, 60, 60, 60])
    }

    #[test]
    fn test_document_structure() {
        let svg = render_radar_svg(&points(), &RadarGeometry::default());
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        // five grid rings plus the data polygon
        assert_eq!(svg.matches("<polygon").count(), 6);
        assert_eq!(svg.matches("<line").count(), 6);
        assert_eq!(svg.matches("<text").count(), 6);
        assert!(svg.contains(">认知力</text>"));
    }

    #[test]
    fn test_first_vertex_straight_up() {
        let svg = render_radar_svg(&points(), &RadarGeometry::default());
        // value 60 of 100 on a 110px radius, 150px center
        assert!(svg.contains(r#"points="150.00,84.00 "#));
    }

    #[test]
    fn test_labels_escaped() {
        let dims = vec!["<A&B>".to_string(), "C".to_string(), "D".to_string()];
        let svg = render_radar_svg(&radar_points(&dims, &[1, 2, 3]), &RadarGeometry::default());
        assert!(svg.contains("&lt;A&amp;B&gt;"));
    }
}
