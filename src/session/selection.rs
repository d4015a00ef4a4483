//! Picture and preview size negotiation.

use crate::config::CameraResolution;
use crate::device::Size;

/// Aspect ratios closer than this are treated as equal.
const ASPECT_TOLERANCE: f64 = 0.01;

/// Sorts sizes by descending pixel area.
///
/// Sizes of equal area keep their device-reported order.
pub fn sort_by_area_desc(sizes: &mut [Size]) {
    sizes.sort_by(|a, b| b.area().cmp(&a.area()));
}

/// Picks the index of a resolution tier within a list of `len` sizes
/// sorted by descending area.
///
/// Returns `None` for an empty list.
pub fn tier_index(len: usize, tier: CameraResolution) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match tier {
        CameraResolution::High => 0,
        CameraResolution::Medium => len / 2,
        CameraResolution::Low => len - 1,
    })
}

/// Selects the still-picture size for a resolution tier.
pub fn select_picture_size(supported: &[Size], tier: CameraResolution) -> Option<Size> {
    let mut sorted = supported.to_vec();
    sort_by_area_desc(&mut sorted);
    tier_index(sorted.len(), tier).map(|i| sorted[i])
}

/// Selects the preview size closest to `target`.
///
/// Sizes whose aspect ratio matches the target are preferred; among those
/// the one with the closest pixel area wins. If none match, the closest
/// aspect ratio wins, ties broken by area.
pub fn select_preview_size(supported: &[Size], target: Size) -> Option<Size> {
    let target_aspect = target.aspect_ratio();
    let area_distance = |s: &Size| s.area().abs_diff(target.area());
    let aspect_distance = |s: &Size| (s.aspect_ratio() - target_aspect).abs();

    let matching = supported
        .iter()
        .filter(|s| aspect_distance(*s) <= ASPECT_TOLERANCE)
        .min_by_key(|s| area_distance(*s));

    if let Some(size) = matching {
        return Some(*size);
    }

    supported.iter().copied().min_by(|a, b| {
        aspect_distance(a)
            .total_cmp(&aspect_distance(b))
            .then_with(|| area_distance(a).cmp(&area_distance(b)))
    })
}
