//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Dimensions after shrinking `source` to fit inside `bounds`.
///
/// Aspect ratio is preserved and the image is never enlarged: a source that
/// already fits is returned unchanged. The scaled edge is rounded to whichever
/// of floor/ceil keeps the aspect ratio closest to the source (minimum 1px).
///
/// ```
/// # use tari_kitchen::imaging::fit_within;
/// assert_eq!(fit_within((1000, 800), (500, 500)), (500, 400));
/// assert_eq!(fit_within((300, 200), (500, 500)), (300, 200));
/// ```
pub fn fit_within(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;

    if src_w == 0 || src_h == 0 || (max_w >= src_w && max_h >= src_h) {
        return source;
    }

    let aspect = src_w as f64 / src_h as f64;
    let (bound_w, bound_h) = (max_w as f64, max_h as f64);

    if bound_w / bound_h >= aspect {
        // Height is the binding edge
        let w = round_aspect(bound_h * aspect, |n| (aspect - n / bound_h).abs());
        (w, max_h)
    } else {
        // Width is the binding edge
        let h = round_aspect(bound_w / aspect, |n| {
            if n == 0.0 {
                0.0
            } else {
                (aspect - bound_w / n).abs()
            }
        });
        (max_w, h)
    }
}

/// Pick floor or ceil of `value`, whichever scores lower; ties go to floor.
fn round_aspect(value: f64, score: impl Fn(f64) -> f64) -> u32 {
    let floor = value.floor();
    let ceil = value.ceil();
    let best = if score(ceil) < score(floor) { ceil } else { floor };
    (best as u32).max(1)
}

/// A crop rectangle in source-pixel coordinates.
///
/// `left`/`top` may be negative and `right()`/`bottom()` may exceed the image:
/// the box is always exactly `width` × `height`, and the part that falls
/// outside the image is filled with black by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub left: i64,
    pub top: i64,
    pub width: u32,
    pub height: u32,
}

impl CropBox {
    pub fn right(&self) -> i64 {
        self.left + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.top + self.height as i64
    }

    /// Whether any part of the box lies outside a `size` image.
    pub fn exceeds(&self, size: (u32, u32)) -> bool {
        self.left < 0 || self.top < 0 || self.right() > size.0 as i64 || self.bottom() > size.1 as i64
    }
}

/// Centered crop box of exactly `crop` size over an image of `size`.
///
/// `left = (w - cw) / 2`, `top = (h - ch) / 2`, halves rounded to even;
/// `right = left + cw`, `bottom = top + ch`.
pub fn center_crop_box(size: (u32, u32), crop: (u32, u32)) -> CropBox {
    CropBox {
        left: half_round_even(size.0 as i64 - crop.0 as i64),
        top: half_round_even(size.1 as i64 - crop.1 as i64),
        width: crop.0,
        height: crop.1,
    }
}

/// `n / 2` with exact halves rounded to the nearest even integer.
fn half_round_even(n: i64) -> i64 {
    let floor = n.div_euclid(2);
    if n.rem_euclid(2) == 0 || floor.rem_euclid(2) == 0 {
        floor
    } else {
        floor + 1
    }
}
