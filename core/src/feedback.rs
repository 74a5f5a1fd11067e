use ndarray::{Array1, ArrayView1};

/// Rocchio relevance-feedback adjustment over the dense embedding space:
/// `alpha * query + beta * mean(relevant) - gamma * mean(non_relevant)`.
///
/// An empty relevant or non-relevant set contributes a zero vector for its
/// term; the other term still applies. Feedback is per-request only, so the
/// caller re-runs dense search with the returned vector and discards it.
pub fn adjust_query_vector(
    query: &ArrayView1<f32>,
    relevant: &[ArrayView1<f32>],
    non_relevant: &[ArrayView1<f32>],
    alpha: f32,
    beta: f32,
    gamma: f32,
) -> Array1<f32> {
    let mut adjusted = query.mapv(|x| x * alpha);
    if let Some(mean) = mean_vector(relevant, query.len()) {
        adjusted.scaled_add(beta, &mean);
    }
    if let Some(mean) = mean_vector(non_relevant, query.len()) {
        adjusted.scaled_add(-gamma, &mean);
    }
    adjusted
}

/// Mean of the vectors that match the expected dimension; `None` when the
/// set is empty.
fn mean_vector(vectors: &[ArrayView1<f32>], dim: usize) -> Option<Array1<f32>> {
    let mut sum = Array1::<f32>::zeros(dim);
    let mut count = 0usize;
    for v in vectors {
        if v.len() != dim {
            tracing::warn!(got = v.len(), expected = dim, "feedback vector dimension mismatch; dropped");
            continue;
        }
        sum += v;
        count += 1;
    }
    (count > 0).then(|| sum / count as f32)
}
