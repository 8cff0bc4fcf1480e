//! Shared-scale histograms rendered as block glyphs

use serde::Serialize;

/// Glyph ramp, from empty to full.
pub const GLYPHS: [char; 8] = [' ', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Equal-width buckets over `[0, max]`, shared by every group of a comparison
/// so all groups render on the same x and y scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    edges: Vec<f64>,
    max_bucket_count: usize,
}

impl Histogram {
    /// `width` buckets spanning `[0, global_max]` (`width + 1` edges).
    ///
    /// A non-positive maximum collapses every edge to zero. `width` is at
    /// least one.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(global_max: f64, width: usize) -> Self {
        let width = width.max(1);
        let top = if global_max > 0.0 { global_max } else { 0.0 };
        let edges = (0..=width)
            .map(|i| {
                if i == width {
                    top
                } else {
                    top * i as f64 / width as f64
                }
            })
            .collect();
        Self {
            edges,
            max_bucket_count: 0,
        }
    }

    /// Set the y-scale: the largest single-bucket count across all groups.
    #[must_use]
    pub fn with_max_bucket_count(mut self, max_bucket_count: usize) -> Self {
        self.max_bucket_count = max_bucket_count;
        self
    }

    /// Bucket boundaries, non-decreasing from `0` to the global max.
    #[must_use]
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Number of buckets.
    #[must_use]
    pub fn width(&self) -> usize {
        self.edges.len() - 1
    }

    /// Upper edge of the last bucket.
    #[must_use]
    pub fn max_value(&self) -> f64 {
        self.edges.last().copied().unwrap_or(0.0)
    }

    /// Largest single-bucket count across all groups.
    #[must_use]
    pub const fn max_bucket_count(&self) -> usize {
        self.max_bucket_count
    }

    /// Bucket a sample falls in. Non-positive samples land in bucket 0, the
    /// maximum lands in the last bucket.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn bucket_index(&self, value: f64) -> usize {
        let top = self.max_value();
        let width = self.width();
        if top <= 0.0 || value.is_nan() || value <= 0.0 {
            return 0;
        }
        let idx = (value / top * width as f64).floor() as usize;
        idx.min(width - 1)
    }

    /// Per-bucket counts of `samples`; sums to `samples.len()`.
    #[must_use]
    pub fn bucket_counts(&self, samples: &[f64]) -> Vec<usize> {
        let mut counts = vec![0; self.width()];
        for &v in samples {
            counts[self.bucket_index(v)] += 1;
        }
        counts
    }

    /// Glyph ramp level (0..=7) of a bucket count against the shared y-scale.
    #[must_use]
    pub fn level(&self, count: usize) -> usize {
        if self.max_bucket_count == 0 {
            return 0;
        }
        let top = GLYPHS.len() - 1;
        // floor(count / max * 7) in exact integer arithmetic
        (count.saturating_mul(top) / self.max_bucket_count).min(top)
    }

    /// Render one group's bucket counts as glyphs.
    #[must_use]
    pub fn render(&self, counts: &[usize]) -> String {
        counts.iter().map(|&c| GLYPHS[self.level(c)]).collect()
    }
}
