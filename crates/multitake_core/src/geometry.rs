//! Frame geometry for aspect-ratio crops.

/// Largest rectangle with the given aspect ratio (`width / height`) that fits
/// inside a `width × height` frame.
///
/// The height-limited width `w' = round(height × aspect)` is tried first; if
/// it exceeds `width` the result is `(width, round(width / aspect))`. Rounding
/// can push the short side to 0 or one pixel past the frame for extreme
/// aspects, so crop callers clamp to the frame. A non-finite or non-positive
/// aspect returns the source size.
pub fn largest_rect(width: u32, height: u32, aspect: f64) -> (u32, u32) {
    if !aspect.is_finite() || aspect <= 0.0 || width == 0 || height == 0 {
        return (width, height);
    }

    let height_limited = (height as f64 * aspect).round();
    if height_limited <= width as f64 {
        (height_limited as u32, height)
    } else {
        (width, (width as f64 / aspect).round() as u32)
    }
}

/// Aspect ratio of an output resolution.
pub fn aspect_of(width: u32, height: u32) -> f64 {
    if height == 0 {
        return 0.0;
    }
    width as f64 / height as f64
}
