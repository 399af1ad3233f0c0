//! Division-safe ratio helpers shared by the aggregators.

/// `part / total` as a percentage, or 0 when `total` is 0.
pub fn conversion_rate(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64) * 100.0
}

/// `total_value / count`, or 0 when `count` is 0.
pub fn average_ticket(total_value: f64, count: u64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    total_value / count as f64
}

/// Arithmetic mean of whole-unit durations, or 0 for an empty input.
pub fn mean_of<I>(values: I) -> f64
where
    I: IntoIterator<Item = i64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0i64, 0u64), |(sum, count), v| (sum.saturating_add(v), count + 1));
    if count == 0 {
        return 0.0;
    }
    sum as f64 / count as f64
}
