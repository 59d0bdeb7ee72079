/// How one visible child claims main-axis space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexItem {
    /// Measured span, margins included.
    Fixed(u16),
    /// Weight of a share of whatever the fixed items leave over.
    Flexible(u16),
}

/// Resolve main-axis spans for a container's visible children.
///
/// Fixed items keep their span. Gaps sit between items. Flexible items split
/// the remainder by weight; cells lost to rounding go round-robin to flexible
/// items in source order.
pub fn main_axis_spans(available: u16, gap: u16, items: &[FlexItem]) -> Vec<u16> {
    if items.is_empty() {
        return Vec::new();
    }

    let gaps = gap as u32 * (items.len() as u32 - 1);
    let fixed: u32 = items
        .iter()
        .map(|item| match item {
            FlexItem::Fixed(span) => *span as u32,
            FlexItem::Flexible(_) => 0,
        })
        .sum();
    let remaining = (available as u32).saturating_sub(fixed + gaps);

    let weights: Vec<u16> = items
        .iter()
        .map(|item| match item {
            FlexItem::Fixed(_) => 0,
            FlexItem::Flexible(weight) => *weight,
        })
        .collect();
    let shares = distribute_flex(remaining, &weights);

    items
        .iter()
        .zip(shares)
        .map(|(item, share)| match item {
            FlexItem::Fixed(span) => *span,
            FlexItem::Flexible(_) => share.min(u16::MAX as u32) as u16,
        })
        .collect()
}

/// Split `remaining` cells across `weights`. Zero weights receive nothing.
///
/// When at least one weight is positive the shares sum to exactly
/// `remaining`.
pub fn distribute_flex(remaining: u32, weights: &[u16]) -> Vec<u32> {
    let mut shares = vec![0u32; weights.len()];
    let total: u64 = weights.iter().map(|w| *w as u64).sum();
    if total == 0 || remaining == 0 {
        return shares;
    }

    let mut leftover = remaining;
    for (share, weight) in shares.iter_mut().zip(weights) {
        if *weight == 0 {
            continue;
        }
        let portion = (remaining as u64 * *weight as u64 / total) as u32;
        *share = portion.min(leftover);
        leftover -= *share;
    }

    let flexible: Vec<usize> = weights
        .iter()
        .enumerate()
        .filter(|(_, weight)| **weight > 0)
        .map(|(idx, _)| idx)
        .collect();
    let mut cursor = 0;
    while leftover > 0 {
        shares[flexible[cursor % flexible.len()]] += 1;
        leftover -= 1;
        cursor += 1;
    }

    shares
}
