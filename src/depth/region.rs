use super::surface::DepthSurface;
use ndarray::s;
use serde::Serialize;

/// Axis-aligned box in original image pixels, `[x, y, w, h]` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "[i64; 4]")]
pub struct BoundingBox {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

impl From<BoundingBox> for [i64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x, b.y, b.w, b.h]
    }
}

impl BoundingBox {
    pub fn new(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self { x, y, w, h }
    }

    /// Fit the box inside a `width` x `height` image
    ///
    /// The result always covers at least one pixel, even for boxes that lie
    /// entirely outside the image or have non-positive size.
    pub fn clamp_to(self, width: usize, height: usize) -> Self {
        let width = width as i64;
        let height = height as i64;

        let x = self.x.min(width - 1).max(0);
        let y = self.y.min(height - 1).max(0);
        let w = self.w.min(width - x).max(1);
        let h = self.h.min(height - y).max(1);

        Self { x, y, w, h }
    }
}

/// Depth statistics for one caller-supplied box
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionDepth {
    pub bbox: BoundingBox,
    /// Median depth, the headline figure
    pub depth_meters: f64,
    pub depth_cm: f64,
    pub depth_mean_meters: f64,
    pub depth_min_meters: f64,
}

/// Summarize `depth` (meters) inside each box, in input order
pub fn summarize_regions(depth: &DepthSurface, boxes: &[BoundingBox]) -> Vec<RegionDepth> {
    let (height, width) = depth.dim();

    boxes
        .iter()
        .map(|bbox| {
            let bbox = bbox.clamp_to(width, height);
            let (x, y) = (bbox.x as usize, bbox.y as usize);
            let (w, h) = (bbox.w as usize, bbox.h as usize);

            let mut values: Vec<f32> = depth.slice(s![y..y + h, x..x + w]).iter().copied().collect();

            let min = values.iter().copied().fold(f32::INFINITY, f32::min) as f64;
            let mean = values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64;
            let median = median(&mut values);

            RegionDepth {
                bbox,
                depth_meters: median,
                depth_cm: median * 100.0,
                depth_mean_meters: mean,
                depth_min_meters: min,
            }
        })
        .collect()
}

/// Median of a non-empty slice; even lengths average the two middle values
fn median(values: &mut [f32]) -> f64 {
    let len = values.len();
    let mid = len / 2;
    let (lower, upper, _) = values.select_nth_unstable_by(mid, f32::total_cmp);
    let upper = *upper as f64;

    if len % 2 == 1 {
        upper
    } else {
        let below = lower.iter().copied().fold(f32::NEG_INFINITY, f32::max) as f64;
        (below + upper) / 2.0
    }
}
