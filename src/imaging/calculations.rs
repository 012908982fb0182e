//! Pure calculation functions for the compression ladders.
//!
//! All functions here are pure and testable without any I/O or images.

/// Quality levels from `start` down to `floor` (inclusive) in `step`s.
///
/// # Examples
/// ```
/// # use telepress::imaging::quality_ladder;
/// assert_eq!(quality_ladder(95, 80, 5), vec![95, 90, 85, 80]);
/// assert_eq!(quality_ladder(85, 30, 10), vec![85, 75, 65, 55, 45, 35]);
/// ```
pub fn quality_ladder(start: u32, floor: u32, step: u32) -> Vec<u32> {
    let step = step.max(1);
    let mut levels = Vec::new();
    let mut q = start;
    while q >= floor && q > 0 {
        levels.push(q);
        match q.checked_sub(step) {
            Some(next) => q = next,
            None => break,
        }
    }
    levels
}

/// Scale factors 0.9, 0.8, ... down to `min_scale` (inclusive).
///
/// Computed in integer tenths so floating-point drift never drops the last
/// step (0.3 must be tried when `min_scale` is 0.3).
pub fn scale_ladder(min_scale: f32) -> Vec<f32> {
    let floor = ((min_scale * 10.0) - 1e-3).ceil().clamp(1.0, 9.0) as u32;
    (floor..=9).rev().map(|tenths| tenths as f32 / 10.0).collect()
}

/// Dimensions after scaling, never collapsing below 1×1.
pub fn scaled_dimensions(original: (u32, u32), scale: f32) -> (u32, u32) {
    let (w, h) = original;
    let sw = ((w as f64) * scale as f64) as u32;
    let sh = ((h as f64) * scale as f64) as u32;
    (sw.max(1), sh.max(1))
}
