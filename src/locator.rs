//! Chart localization: find candidate chart quadrilaterals in a frame.
//!
//! Built directly on top of `imageproc`'s contour extraction and gradient
//! primitives, rather than wrapping an external vision library: Otsu
//! threshold the edge-magnitude image, trace contours, approximate each
//! with a convex hull, and pick the four extremal corners — the same
//! sum/difference projection [`crate::geometry::order_corners`] uses.

use image::{GrayImage, RgbImage};
use imageproc::gradients::sobel_gradients;

use crate::config::DetectorConfig;
use crate::geometry::{self, Point, Quad};

/// Capability trait for the localization stage.
pub trait Locator {
    fn locate_all(&self, bgr: &RgbImage) -> Vec<Quad>;
}

/// Classical contour-based chart detector.
#[derive(Debug, Clone)]
pub struct ContourLocator {
    /// Maximum number of candidate quads kept per detector pass.
    pub max_candidates: usize,
    /// Minimum contour area as a fraction of the full image area.
    pub min_area_fraction: f64,
    /// Maximum contour area as a fraction of the full image area.
    pub max_area_fraction: f64,
    /// Average corresponding-corner distance, in pixels, below which two
    /// candidate quads are merged (`spec.md` §4.2, `DetectorConfig::dedup_threshold_px`).
    pub dedup_threshold_px: f64,
}

impl Default for ContourLocator {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

impl ContourLocator {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            max_candidates: 8,
            min_area_fraction: 0.005,
            max_area_fraction: 0.98,
            dedup_threshold_px: config.dedup_threshold_px,
        }
    }
}

impl Locator for ContourLocator {
    fn locate_all(&self, bgr: &RgbImage) -> Vec<Quad> {
        // Stage 1: full image.
        let mut quads = self.detect_quads_in(bgr, 0, 0);

        // Early exit: two or more detections from the full-image pass are
        // assumed to already cover a dual-panel passport.
        if quads.len() < 2 {
            let (w, h) = bgr.dimensions();
            let half = w / 2;

            if half > 0 {
                let left = image::imageops::crop_imm(bgr, 0, 0, half, h).to_image();
                let right = image::imageops::crop_imm(bgr, half, 0, w - half, h).to_image();

                quads.extend(self.detect_quads_in(&left, 0, 0));
                quads.extend(self.detect_quads_in(&right, half, 0));
            }
        }

        geometry::dedupe_quads(quads, self.dedup_threshold_px)
    }
}

impl ContourLocator {
    /// Run the single-pass detector over one image (or ROI), translating
    /// returned corners by `(origin_x, origin_y)` back to full-frame
    /// coordinates.
    fn detect_quads_in(&self, image: &RgbImage, origin_x: u32, origin_y: u32) -> Vec<Quad> {
        let (w, h) = image.dimensions();
        if w < 8 || h < 8 {
            return Vec::new();
        }

        let gray = to_grayscale(image);
        let edges = edge_magnitude_u8(&gray);
        let level = otsu_level(&edges);
        let binary = threshold_above(&edges, level);

        let contours = imageproc::contours::find_contours::<i32>(&binary);

        let image_area = (w as f64) * (h as f64);
        let mut candidates: Vec<(f64, Quad)> = Vec::new();

        for contour in &contours {
            if contour.points.len() < 4 {
                continue;
            }
            let points: Vec<Point> = contour
                .points
                .iter()
                .map(|p| Point::new(p.x as f64, p.y as f64))
                .collect();

            let hull = convex_hull(&points);
            if hull.len() < 4 {
                continue;
            }

            let area = polygon_area(&hull);
            let frac = area / image_area;
            if frac < self.min_area_fraction || frac > self.max_area_fraction {
                continue;
            }

            let Some(quad) = extremal_quad(&hull) else {
                continue;
            };

            // Reject degenerate quads whose enclosed area is far smaller
            // than the hull they were drawn from (near-collinear corners).
            let quad_area = polygon_area(&quad);
            if quad_area < area * 0.4 {
                continue;
            }

            let refined = refine_corners(&quad, &gray);
            let translated = refined.map(|p| Point::new(p.x + origin_x as f64, p.y + origin_y as f64));
            candidates.push((quad_area, translated));
        }

        candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        candidates
            .into_iter()
            .take(self.max_candidates)
            .map(|(_, q)| q)
            .collect()
    }
}

fn to_grayscale(rgb: &RgbImage) -> GrayImage {
    let (w, h) = rgb.dimensions();
    let mut gray = GrayImage::new(w, h);
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let v = 0.299 * pixel[0] as f64 + 0.587 * pixel[1] as f64 + 0.114 * pixel[2] as f64;
        gray.put_pixel(x, y, image::Luma([v.round() as u8]));
    }
    gray
}

/// Sobel gradient magnitude, normalized to 0..255 — manual normalization
/// rather than a library call, since the normalization range depends on
/// the image at hand.
fn edge_magnitude_u8(gray: &GrayImage) -> GrayImage {
    let grad = sobel_gradients(gray);
    let (w, h) = grad.dimensions();
    let max_val = grad.pixels().map(|p| p.0[0]).max().unwrap_or(1).max(1);
    let mut out = GrayImage::new(w, h);
    for (x, y, pixel) in grad.enumerate_pixels() {
        let normalized = (pixel.0[0] as f32 / max_val as f32 * 255.0) as u8;
        out.put_pixel(x, y, image::Luma([normalized]));
    }
    out
}

/// Otsu's method: the threshold level that maximizes between-class
/// variance of a grayscale image's intensity histogram.
fn otsu_level(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for p in gray.pixels() {
        histogram[p.0[0] as usize] += 1;
    }
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 128;
    }

    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut sum_bg = 0.0;
    let mut weight_bg = 0u64;
    let mut best_level = 0u8;
    let mut best_variance = 0.0;

    for level in 0..256 {
        weight_bg += histogram[level];
        if weight_bg == 0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0 {
            break;
        }

        sum_bg += level as f64 * histogram[level] as f64;
        let mean_bg = sum_bg / weight_bg as f64;
        let mean_fg = (sum_all - sum_bg) / weight_fg as f64;

        let between = weight_bg as f64 * weight_fg as f64 * (mean_bg - mean_fg).powi(2);
        if between > best_variance {
            best_variance = between;
            best_level = level as u8;
        }
    }

    best_level
}

fn threshold_above(gray: &GrayImage, level: u8) -> GrayImage {
    let (w, h) = gray.dimensions();
    let mut out = GrayImage::new(w, h);
    for (x, y, pixel) in gray.enumerate_pixels() {
        let v = if pixel.0[0] >= level { 255 } else { 0 };
        out.put_pixel(x, y, image::Luma([v]));
    }
    out
}

/// Andrew's monotone chain convex hull.
fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| {
        a.x.partial_cmp(&b.x)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
    });
    pts.dedup_by(|a, b| (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9);

    if pts.len() < 3 {
        return pts;
    }

    let cross = |o: Point, a: Point, b: Point| -> f64 {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    };

    let mut lower: Vec<Point> = Vec::new();
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Point> = Vec::new();
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Shoelace formula; `points` need not be a closed ring.
fn polygon_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    (sum / 2.0).abs()
}

/// Pick the 4 extremal points of a convex hull by the same sum/difference
/// projections `order_corners` uses, giving a quadrilateral approximation
/// of an arbitrary convex polygon.
fn extremal_quad(hull: &[Point]) -> Option<Quad> {
    let tl = *hull.iter().min_by(|a, b| {
        (a.x + a.y)
            .partial_cmp(&(b.x + b.y))
            .unwrap_or(std::cmp::Ordering::Equal)
    })?;
    let br = *hull.iter().max_by(|a, b| {
        (a.x + a.y)
            .partial_cmp(&(b.x + b.y))
            .unwrap_or(std::cmp::Ordering::Equal)
    })?;
    let tr = *hull.iter().max_by(|a, b| {
        (a.x - a.y)
            .partial_cmp(&(b.x - b.y))
            .unwrap_or(std::cmp::Ordering::Equal)
    })?;
    let bl = *hull.iter().min_by(|a, b| {
        (a.x - a.y)
            .partial_cmp(&(b.x - b.y))
            .unwrap_or(std::cmp::Ordering::Equal)
    })?;

    let pts = [tl, tr, br, bl];
    let mut distinct: Vec<Point> = Vec::new();
    for p in pts {
        if !distinct
            .iter()
            .any(|q| (q.x - p.x).abs() < 1e-6 && (q.y - p.y).abs() < 1e-6)
        {
            distinct.push(p);
        }
    }
    if distinct.len() < 4 {
        return None;
    }
    Some(pts)
}

/// Snap each corner to the nearby local maximum of edge magnitude, within
/// a small search window.
fn refine_corners(quad: &Quad, gray: &GrayImage) -> Quad {
    let edges = edge_magnitude_u8(gray);
    let (w, h) = edges.dimensions();
    const WINDOW: i64 = 4;

    quad.map(|p| {
        let cx = p.x.round() as i64;
        let cy = p.y.round() as i64;
        let mut best = p;
        let mut best_score = -1i32;

        for dy in -WINDOW..=WINDOW {
            for dx in -WINDOW..=WINDOW {
                let x = cx + dx;
                let y = cy + dy;
                if x < 0 || y < 0 || x >= w as i64 || y >= h as i64 {
                    continue;
                }
                let score = edges.get_pixel(x as u32, y as u32).0[0] as i32;
                if score > best_score {
                    best_score = score;
                    best = Point::new(x as f64, y as f64);
                }
            }
        }
        best
    })
}
