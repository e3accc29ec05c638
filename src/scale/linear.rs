//! Linear value -> position scale.

use crate::domain::Domain;

/// Maps `domain` linearly onto `range`. No clamping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    pub domain: [f64; 2],
    pub range: [f64; 2],
}

impl LinearScale {
    pub fn new(domain: [f64; 2], range: [f64; 2]) -> Self {
        Self { domain, range }
    }

    /// `[0, domain.max] -> range`: the lower bound is pinned at zero whatever
    /// the observed minimum is.
    pub fn zero_anchored(domain: &Domain, range: [f64; 2]) -> Self {
        Self::new([0.0, domain.max], range)
    }

    /// Map `value`; a zero-width domain maps everything to the range midpoint.
    pub fn apply(&self, value: f64) -> f64 {
        let [d0, d1] = self.domain;
        let [r0, r1] = self.range;
        let width = d1 - d0;
        if width == 0.0 {
            return (r0 + r1) / 2.0;
        }
        r0 + (value - d0) / width * (r1 - r0)
    }

    /// Inverse of [`LinearScale::apply`].
    pub fn invert(&self, position: f64) -> f64 {
        let flipped = LinearScale::new(self.range, self.domain);
        flipped.apply(position)
    }

    /// `count` evenly spaced domain values, endpoints included.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let count = count.max(2);
        let [d0, d1] = self.domain;
        (0..count)
            .map(|i| d0 + (d1 - d0) * i as f64 / (count - 1) as f64)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_anchored_scale_ignores_observed_min() {
        let s = LinearScale::zero_anchored(&Domain { min: 2.0, max: 4.0 }, [0.0, 1.0]);
        assert!((s.apply(2.0) - 0.5).abs() < 1e-12);
        assert!((s.apply(4.0) - 1.0).abs() < 1e-12);
        assert!((s.apply(0.0) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn inverted_range_maps_top_down() {
        // Screen y grows downward.
        let s = LinearScale::new([0.0, 12.0], [170.0, 20.0]);
        assert!((s.apply(0.0) - 170.0).abs() < 1e-12);
        assert!((s.apply(12.0) - 20.0).abs() < 1e-12);
        assert!((s.invert(95.0) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_domain_maps_to_midpoint() {
        let s = LinearScale::new([0.0, 0.0], [0.0, 1.0]);
        assert_eq!(s.apply(3.0), 0.5);
    }

    #[test]
    fn ticks_include_endpoints() {
        let t = LinearScale::new([0.0, 10.0], [0.0, 1.0]).ticks(5);
        assert_eq!(t, vec![0.0, 2.5, 5.0, 7.5, 10.0]);
    }
}
