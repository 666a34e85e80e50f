//! Summed-area tables for window statistics.
//!
//! Every kernel needs the energy of the image window under the template,
//! and the correlation coefficient also needs per-channel sums. Both are
//! read from integral images in constant time per placement, which leaves
//! the template dot product as the only per-pixel work.

use crate::image::{Bgr, ImageView};

/// Image-side statistics of one template placement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Moments {
    /// `sum(t * i)` over all channels.
    pub dot: u64,
    /// `sum(i * i)` over all channels.
    pub energy: u64,
    /// Per-channel `sum(i)`.
    pub sums: [u64; 3],
}

/// Integral images of squared samples and, optionally, of channel values.
pub struct WindowSums {
    stride: usize,
    energy: Vec<u64>,
    channels: Vec<[u64; 3]>,
}

impl WindowSums {
    /// Builds the tables for `image`; `channels` adds the per-channel sums.
    pub fn new(image: ImageView<'_, Bgr>, channels: bool) -> Self {
        let stride = image.width() + 1;
        let len = stride * (image.height() + 1);
        let mut energy = vec![0u64; len];
        let mut sums = if channels {
            vec![[0u64; 3]; len]
        } else {
            Vec::new()
        };

        for (y, row) in image.rows().enumerate() {
            let above = y * stride;
            let here = above + stride;
            let mut row_energy = 0u64;
            let mut row_sums = [0u64; 3];
            for (x, px) in row.iter().enumerate() {
                for (c, &v) in px.iter().enumerate() {
                    let v = u64::from(v);
                    row_energy += v * v;
                    row_sums[c] += v;
                }
                energy[here + x + 1] = energy[above + x + 1] + row_energy;
                if channels {
                    let prev = sums[above + x + 1];
                    sums[here + x + 1] = [
                        prev[0] + row_sums[0],
                        prev[1] + row_sums[1],
                        prev[2] + row_sums[2],
                    ];
                }
            }
        }

        Self {
            stride,
            energy,
            channels: sums,
        }
    }

    #[inline]
    fn corners(&self, x: usize, y: usize, w: usize, h: usize) -> [usize; 4] {
        let top = y * self.stride;
        let bottom = (y + h) * self.stride;
        [bottom + x + w, top + x, top + x + w, bottom + x]
    }

    /// Sum of squared samples in the `w x h` window at `(x, y)`.
    #[inline]
    pub fn energy(&self, x: usize, y: usize, w: usize, h: usize) -> u64 {
        let [a, d, b, c] = self.corners(x, y, w, h);
        self.energy[a] + self.energy[d] - self.energy[b] - self.energy[c]
    }

    /// Per-channel sums in the window; zero unless built with `channels`.
    #[inline]
    pub fn channel_sums(&self, x: usize, y: usize, w: usize, h: usize) -> [u64; 3] {
        if self.channels.is_empty() {
            return [0; 3];
        }
        let [a, d, b, c] = self.corners(x, y, w, h);
        let (a, d, b, c) = (
            self.channels[a],
            self.channels[d],
            self.channels[b],
            self.channels[c],
        );
        [
            a[0] + d[0] - b[0] - c[0],
            a[1] + d[1] - b[1] - c[1],
            a[2] + d[2] - b[2] - c[2],
        ]
    }
}

/// Energy and channel sums of one window, summed directly.
pub(crate) fn direct_moments(
    image: ImageView<'_, Bgr>,
    x: usize,
    y: usize,
    w: usize,
    h: usize,
) -> Moments {
    let mut m = Moments::default();
    for ty in 0..h {
        let Some(row) = image.row(y + ty) else {
            break;
        };
        for px in &row[x..x + w] {
            for (c, &v) in px.iter().enumerate() {
                let v = u64::from(v);
                m.energy += v * v;
                m.sums[c] += v;
            }
        }
    }
    m
}
