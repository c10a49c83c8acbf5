//! Small dense-vector helpers shared by the embedding and index crates.

/// Euclidean norm.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale to unit length in place. Zero vectors stay zero rather than
/// dividing by zero.
pub fn normalize_in_place(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm == 0.0 {
        return;
    }
    for x in v.iter_mut() {
        *x /= norm;
    }
}

/// Inner product of two equal-length vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Squared Euclidean distance (no square root, matching L2 index scores).
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
