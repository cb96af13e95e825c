//! Market-cap concentration: top-K contributors plus an "Others" bucket.

/// Ranks weighted items descending, keeps the first `top_k` as individual
/// entries, and collapses the remainder into a single "Others" entry.
///
/// Absent and non-finite weights rank and sum as zero. The sort is stable,
/// so ties keep their input order and the output is reproducible. "Others"
/// is appended only when the remainder sum is strictly positive. Empty input
/// yields two empty vectors.
///
/// The returned label and value sequences are parallel and always of equal
/// length.
pub fn aggregate(items: &[(String, Option<f64>)], top_k: usize) -> (Vec<String>, Vec<f64>) {
    let mut ranked: Vec<(&str, f64)> = items
        .iter()
        .map(|(label, weight)| {
            (
                label.as_str(),
                weight.filter(|w| w.is_finite()).unwrap_or(0.0),
            )
        })
        .collect();
    // Stable sort: equal weights stay in input order.
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut labels: Vec<String> = Vec::with_capacity(top_k.min(ranked.len()) + 1);
    let mut values: Vec<f64> = Vec::with_capacity(top_k.min(ranked.len()) + 1);
    for (label, weight) in ranked.iter().take(top_k) {
        labels.push((*label).to_string());
        values.push(*weight);
    }

    let others: f64 = ranked.iter().skip(top_k).map(|(_, weight)| weight).sum();
    if others > 0.0 {
        labels.push("Others".to_string());
        values.push(others);
    }

    (labels, values)
}
