use serde::{Deserialize, Serialize};

/// A point in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Four corners of a detected (or candidate) chart quadrilateral.
///
/// A freshly-detected `Quad` carries whatever corner order the detector
/// emitted it in; call [`order_corners`] to get the canonical TL,TR,BR,BL
/// order the rest of the pipeline expects.
pub type Quad = [Point; 4];

/// Axis-aligned extent of a `Quad`. Width/height only — no origin, since
/// nothing downstream needs one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub width: f64,
    pub height: f64,
}

/// Order four corners as TL, TR, BR, BL.
///
/// TL minimizes x+y, BR maximizes x+y; among the remaining two, TR
/// maximizes x-y and BL minimizes x-y. Ties are broken by insertion order
/// (the order the points appear in `corners`), since the source of a tie
/// (exactly collinear sums) is left unspecified upstream.
pub fn order_corners(corners: &[Point; 4]) -> Quad {
    let tl_idx = argmin_by(corners, |p| p.x + p.y);
    let br_idx = argmax_by(corners, |p| p.x + p.y);

    let remaining: Vec<usize> = (0..4).filter(|i| *i != tl_idx && *i != br_idx).collect();
    debug_assert_eq!(remaining.len(), 2);

    let (tr_idx, bl_idx) = if corners[remaining[0]].x - corners[remaining[0]].y
        >= corners[remaining[1]].x - corners[remaining[1]].y
    {
        (remaining[0], remaining[1])
    } else {
        (remaining[1], remaining[0])
    };

    [
        corners[tl_idx],
        corners[tr_idx],
        corners[br_idx],
        corners[bl_idx],
    ]
}

fn argmin_by(points: &[Point; 4], key: impl Fn(&Point) -> f64) -> usize {
    let mut best = 0;
    let mut best_val = key(&points[0]);
    for (i, p) in points.iter().enumerate().skip(1) {
        let v = key(p);
        if v < best_val {
            best_val = v;
            best = i;
        }
    }
    best
}

fn argmax_by(points: &[Point; 4], key: impl Fn(&Point) -> f64) -> usize {
    let mut best = 0;
    let mut best_val = key(&points[0]);
    for (i, p) in points.iter().enumerate().skip(1) {
        let v = key(p);
        if v > best_val {
            best_val = v;
            best = i;
        }
    }
    best
}

/// Axis-aligned bounding box of four points, clamped to nonnegative extent.
pub fn bounding_box(points: &[Point; 4]) -> BoundingBox {
    let min_x = points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let max_x = points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let min_y = points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_y = points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

    BoundingBox {
        width: (max_x - min_x).max(0.0),
        height: (max_y - min_y).max(0.0),
    }
}

/// Average Euclidean distance between corresponding corners of two quads,
/// in the order the points are stored — *not* the canonical TL/TR/BR/BL
/// order, since this is used to compare raw detector output before
/// ordering.
pub fn average_corner_distance(a: &Quad, b: &Quad) -> f64 {
    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(p, q)| ((p.x - q.x).powi(2) + (p.y - q.y).powi(2)).sqrt())
        .sum();
    sum / 4.0
}

/// Deduplicate a list of quads by average corresponding-corner distance.
/// Quads whose average distance is strictly less than `threshold` are
/// treated as the same detection; the first one encountered is kept.
pub fn dedupe_quads(quads: Vec<Quad>, threshold: f64) -> Vec<Quad> {
    let mut kept: Vec<Quad> = Vec::new();
    'outer: for q in quads {
        for k in &kept {
            if average_corner_distance(&q, k) < threshold {
                continue 'outer;
            }
        }
        kept.push(q);
    }
    kept
}
