// src/geometry.rs
//
// Stateless 2D helpers shared by the zone timers, the confidence
// association step and the reconciler.

use crate::types::{BBox, Point};

const EDGE_EPSILON: f64 = 1e-9;

// ============================================================================
// POLYGON CONTAINMENT
// ============================================================================

/// Even-odd ray casting. Points lying on an edge or a vertex count as inside.
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[j];

        if on_segment(point, a, b) {
            return true;
        }

        if (a.y > point.y) != (b.y > point.y) {
            let x_cross = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn on_segment(p: Point, a: Point, b: Point) -> bool {
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    if cross.abs() > EDGE_EPSILON {
        return false;
    }
    p.x >= a.x.min(b.x) - EDGE_EPSILON
        && p.x <= a.x.max(b.x) + EDGE_EPSILON
        && p.y >= a.y.min(b.y) - EDGE_EPSILON
        && p.y <= a.y.max(b.y) + EDGE_EPSILON
}

// ============================================================================
// BOXES & DISTANCES
// ============================================================================

pub fn iou(a: &BBox, b: &BBox) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter <= 0.0 {
        return 0.0;
    }

    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter;

    if union > 0.0 {
        (inter / union).min(1.0)
    } else {
        0.0
    }
}

pub fn euclidean_distance(a: Point, b: Point) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// Centre of a box on the tracker's pixel grid: corners truncated to
/// whole pixels first, then floor-halved.
pub fn centroid(bbox: &BBox) -> Point {
    let [x1, y1, x2, y2] = (*bbox).map(|v| v as i64);
    let cx = (x1 + x2).div_euclid(2);
    let cy = (y1 + y2).div_euclid(2);
    Point::new(cx as f64, cy as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
        ]
    }

    #[test]
    fn test_point_inside_and_outside() {
        let poly = square();
        assert!(point_in_polygon(Point::new(50.0, 50.0), &poly));
        assert!(!point_in_polygon(Point::new(150.0, 50.0), &poly));
        assert!(!point_in_polygon(Point::new(-1.0, 50.0), &poly));
    }

    #[test]
    fn test_boundary_counts_as_inside() {
        let poly = square();
        assert!(point_in_polygon(Point::new(100.0, 50.0), &poly));
        assert!(point_in_polygon(Point::new(0.0, 0.0), &poly));
        assert!(point_in_polygon(Point::new(50.0, 100.0), &poly));
    }

    #[test]
    fn test_concave_polygon() {
        // "U" shape: notch between x=40..60 from the top down to y=50
        let poly = vec![
            Point::new(0.0, 0.0),
            Point::new(40.0, 0.0),
            Point::new(40.0, 50.0),
            Point::new(60.0, 50.0),
            Point::new(60.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
        ];
        assert!(!point_in_polygon(Point::new(50.0, 20.0), &poly));
        assert!(point_in_polygon(Point::new(20.0, 20.0), &poly));
        assert!(point_in_polygon(Point::new(50.0, 80.0), &poly));
    }

    #[test]
    fn test_degenerate_polygon_contains_nothing() {
        let line = vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)];
        assert!(!point_in_polygon(Point::new(5.0, 5.0), &line));
    }

    #[test]
    fn test_iou_overlap() {
        let a = [0.0, 0.0, 100.0, 100.0];
        let b = [50.0, 50.0, 150.0, 150.0];
        assert!((iou(&a, &b) - 2500.0 / 17500.0).abs() < 1e-4);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint_and_degenerate() {
        let a = [0.0, 0.0, 50.0, 50.0];
        let b = [100.0, 100.0, 200.0, 200.0];
        assert_eq!(iou(&a, &b), 0.0);
        let flat = [10.0, 10.0, 10.0, 40.0];
        assert_eq!(iou(&a, &flat), 0.0);
        let inverted = [40.0, 40.0, 10.0, 10.0];
        assert_eq!(iou(&a, &inverted), 0.0);
    }

    #[test]
    fn test_distance_and_centroid() {
        assert_eq!(
            euclidean_distance(Point::new(0.0, 0.0), Point::new(3.0, 4.0)),
            5.0
        );
        let c = centroid(&[10.0, 20.0, 31.0, 41.0]);
        assert_eq!(c, Point::new(20.0, 30.0));
        // Corners snap to whole pixels before averaging
        let c = centroid(&[10.5, 20.9, 31.7, 41.2]);
        assert_eq!(c, Point::new(20.0, 30.0));
    }
}
