//! Downsampling gate
//!
//! Bounds the number of axis points handed to rendering by the available
//! horizontal resolution. Buckets are formed by index, not by time span,
//! because axis spacing may be irregular.

use super::buffer::AlignedSeriesBuffer;
use super::sample::Reading;

use indexmap::IndexMap;
use std::borrow::Cow;
use std::ops::Range;

/// Axis indices covered by bucket `i` when `len` points are split into
/// `width` buckets: `[floor(i*len/width), floor((i+1)*len/width))`.
///
/// For `width <= len` every bucket is non-empty and every index lands in
/// exactly one bucket.
pub fn bucket_bounds(i: usize, len: usize, width: usize) -> Range<usize> {
    // u128 so i*len cannot overflow on large inputs.
    let lo = (i as u128 * len as u128 / width as u128) as usize;
    let hi = ((i as u128 + 1) * len as u128 / width as u128) as usize;
    lo..hi
}

/// Reduces `buffer` to at most `target_width` axis points.
///
/// Each output point is the mean of the present values in its bucket, or
/// `Absent` when the whole bucket is absent; its timestamp is the mean of the
/// bucket's timestamps, kept inside the bucket's span. The output always has
/// `min(target_width, len)` points. Inputs that already fit are returned unchanged.
/// The result is lossy: zooming must re-derive from full-resolution data.
pub fn downsample(buffer: &AlignedSeriesBuffer, target_width: usize) -> Cow<'_, AlignedSeriesBuffer> {
    let len = buffer.len();
    if len <= target_width {
        return Cow::Borrowed(buffer);
    }
    if target_width == 0 {
        return Cow::Owned(buffer.cleared());
    }

    let axis = buffer.axis();
    let buckets: Vec<Range<usize>> = (0..target_width)
        .map(|i| bucket_bounds(i, len, target_width))
        .collect();

    // Clamped to the bucket's own span; buckets are disjoint and ordered, so
    // the reduced axis stays strictly increasing even when rounding drifts.
    let out_axis: Vec<f64> = buckets
        .iter()
        .map(|b| {
            let (lo, hi) = (axis[b.start], axis[b.end - 1]);
            mean(axis[b.clone()].iter().copied()).map_or(lo, |t| t.clamp(lo, hi))
        })
        .collect();

    let columns: IndexMap<String, Vec<Reading>> = buffer
        .iter()
        .map(|(id, values)| {
            let reduced = buckets
                .iter()
                .map(|b| {
                    let present = values[b.clone()].iter().filter_map(Reading::try_as_f64);
                    mean(present).map_or(Reading::Absent, Reading::from_f64)
                })
                .collect();
            (id.to_string(), reduced)
        })
        .collect();

    tracing::trace!(from = len, to = target_width, "downsampled buffer");
    Cow::Owned(AlignedSeriesBuffer::from_aligned_parts(out_axis, columns))
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}
