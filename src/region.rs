//! Axis-aligned rectangles in frame coordinates.
//!
//! A `Region` is stored by its extents: `x` and `y` are inclusive, `right`
//! and `bottom` are exclusive. Coordinates are clamped to `±INFINITY`, a
//! sentinel far outside any real frame, so that `Region::ALL` survives
//! translation and extension unchanged. The empty region is `None`.

use std::fmt;

/// Sentinel coordinate standing in for infinity.
pub const INFINITY: i64 = i64::MAX / 4;

fn clamp(v: i64) -> i64 {
    v.clamp(-INFINITY, INFINITY)
}

fn add(a: i64, b: i64) -> i64 {
    if a.abs() >= INFINITY {
        return a;
    }
    clamp(a.saturating_add(b))
}

/// Rectangular region within the video frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Region {
    x: i64,
    y: i64,
    right: i64,
    bottom: i64,
}

impl Region {
    /// The region spanning the whole plane; the identity for `intersect`.
    pub const ALL: Region = Region {
        x: -INFINITY,
        y: -INFINITY,
        right: INFINITY,
        bottom: INFINITY,
    };

    /// Creates a region from its top-left corner and size, or `None` if
    /// either dimension is zero.
    pub fn new(x: i64, y: i64, width: u32, height: u32) -> Option<Self> {
        let x = clamp(x);
        let y = clamp(y);
        Self::from_extents(x, y, add(x, i64::from(width)), add(y, i64::from(height)))
    }

    /// Region covering a non-empty image of the given size at the origin.
    pub(crate) fn of_size(width: usize, height: usize) -> Self {
        debug_assert!(width > 0 && height > 0);
        Self {
            x: 0,
            y: 0,
            right: clamp(width.max(1) as i64),
            bottom: clamp(height.max(1) as i64),
        }
    }

    /// Creates a region from its extents, or `None` unless `x < right` and
    /// `y < bottom`.
    pub fn from_extents(x: i64, y: i64, right: i64, bottom: i64) -> Option<Self> {
        let (x, y, right, bottom) = (clamp(x), clamp(y), clamp(right), clamp(bottom));
        if right <= x || bottom <= y {
            return None;
        }
        Some(Self {
            x,
            y,
            right,
            bottom,
        })
    }

    pub fn x(&self) -> i64 {
        self.x
    }

    pub fn y(&self) -> i64 {
        self.y
    }

    /// Exclusive right edge, `x + width`.
    pub fn right(&self) -> i64 {
        self.right
    }

    /// Exclusive bottom edge, `y + height`.
    pub fn bottom(&self) -> i64 {
        self.bottom
    }

    pub fn width(&self) -> i64 {
        self.right - self.x
    }

    pub fn height(&self) -> i64 {
        self.bottom - self.y
    }

    /// Returns the center point, rounded towards the top-left.
    pub fn center(&self) -> (i64, i64) {
        (self.x + self.width() / 2, self.y + self.height() / 2)
    }

    /// Returns the overlap of two regions, or `None` if they do not overlap.
    ///
    /// Regions that only touch along an edge do not overlap.
    pub fn intersect(&self, other: &Region) -> Option<Region> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right.min(other.right);
        let bottom = self.bottom.min(other.bottom);
        if x >= right || y >= bottom {
            return None;
        }
        Some(Region {
            x,
            y,
            right,
            bottom,
        })
    }

    /// Intersects any number of regions; no regions yields `Region::ALL`.
    pub fn intersect_all<'a, I>(regions: I) -> Option<Region>
    where
        I: IntoIterator<Item = &'a Region>,
    {
        regions
            .into_iter()
            .try_fold(Region::ALL, |acc, r| acc.intersect(r))
    }

    /// The smallest region containing every given region.
    pub fn bounding_box<'a, I>(regions: I) -> Option<Region>
    where
        I: IntoIterator<Item = &'a Region>,
    {
        regions.into_iter().fold(None, |acc: Option<Region>, r| {
            Some(match acc {
                None => *r,
                Some(a) => Region {
                    x: a.x.min(r.x),
                    y: a.y.min(r.y),
                    right: a.right.max(r.right),
                    bottom: a.bottom.max(r.bottom),
                },
            })
        })
    }

    /// Returns true if `other` lies entirely inside this region.
    pub fn contains(&self, other: &Region) -> bool {
        self.x <= other.x
            && other.right <= self.right
            && self.y <= other.y
            && other.bottom <= self.bottom
    }

    /// Returns true if the pixel at `(x, y)` lies inside this region.
    pub fn contains_point(&self, x: i64, y: i64) -> bool {
        self.x <= x && x < self.right && self.y <= y && y < self.bottom
    }

    /// Moves the region by `(dx, dy)`; the size is unchanged.
    pub fn translate(&self, dx: i64, dy: i64) -> Region {
        Region {
            x: add(self.x, dx),
            y: add(self.y, dy),
            right: add(self.right, dx),
            bottom: add(self.bottom, dy),
        }
    }

    /// Moves the region by the top-left corner of `origin`.
    ///
    /// Useful when this region is expressed relative to another UI element.
    pub fn translate_by(&self, origin: &Region) -> Region {
        self.translate(origin.x, origin.y)
    }

    /// Moves each edge by the given amount.
    ///
    /// Returns `None` if the edges meet or cross.
    pub fn extend(&self, x: i64, y: i64, right: i64, bottom: i64) -> Option<Region> {
        Self::from_extents(
            add(self.x, x),
            add(self.y, y),
            add(self.right, right),
            add(self.bottom, bottom),
        )
    }

    /// Grows the region by `n` pixels in every direction.
    pub fn dilate(&self, n: u32) -> Region {
        let n = i64::from(n);
        Region {
            x: add(self.x, -n),
            y: add(self.y, -n),
            right: add(self.right, n),
            bottom: add(self.bottom, n),
        }
    }

    /// Shrinks the region by `n` pixels in every direction, or `None` if
    /// nothing is left.
    pub fn erode(&self, n: u32) -> Option<Region> {
        let n = i64::from(n);
        self.extend(n, n, -n, -n)
    }

    /// The region directly above this one, `height` tall or up to the top edge.
    pub fn above(&self, height: Option<u32>) -> Option<Region> {
        let top = height.map_or(-INFINITY, |h| add(self.y, -i64::from(h)));
        Self::from_extents(self.x, top, self.right, self.y)
    }

    /// The region directly below this one, `height` tall or down to the bottom edge.
    pub fn below(&self, height: Option<u32>) -> Option<Region> {
        let bottom = height.map_or(INFINITY, |h| add(self.bottom, i64::from(h)));
        Self::from_extents(self.x, self.bottom, self.right, bottom)
    }

    /// The region directly left of this one, `width` wide or up to the left edge.
    pub fn left_of(&self, width: Option<u32>) -> Option<Region> {
        let left = width.map_or(-INFINITY, |w| add(self.x, -i64::from(w)));
        Self::from_extents(left, self.y, self.x, self.bottom)
    }

    /// The region directly right of this one, `width` wide or up to the right edge.
    pub fn right_of(&self, width: Option<u32>) -> Option<Region> {
        let right = width.map_or(INFINITY, |w| add(self.right, i64::from(w)));
        Self::from_extents(self.right, self.y, right, self.bottom)
    }

    /// Converts a region known to lie in the first quadrant to `usize` extents.
    pub(crate) fn to_rect(self) -> (usize, usize, usize, usize) {
        debug_assert!(self.x >= 0 && self.y >= 0);
        (
            self.x.max(0) as usize,
            self.y.max(0) as usize,
            self.width().max(0) as usize,
            self.height().max(0) as usize,
        )
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Region::ALL {
            return f.write_str("Region::ALL");
        }
        write!(
            f,
            "Region(x={}, y={}, right={}, bottom={})",
            self.x, self.y, self.right, self.bottom
        )
    }
}
