/// Cosine similarity between two vectors.
///
/// Returns a value in `[-1, 1]`; 1 means identical direction.  Uses f64
/// intermediate precision.  A zero-magnitude vector on either side, or a
/// length mismatch, yields 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot: f64 = 0.0;
    let mut norm_a: f64 = 0.0;
    let mut norm_b: f64 = 0.0;

    for (&x, &y) in a.iter().zip(b) {
        let x = f64::from(x);
        let y = f64::from(y);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    from_parts(dot, norm_a.sqrt(), norm_b.sqrt())
}

/// Euclidean norm with f64 accumulation.
pub(crate) fn magnitude(v: &[f32]) -> f64 {
    v.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt()
}

/// Dot product with f64 accumulation.
pub(crate) fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum()
}

/// Similarity from a precomputed dot product and magnitudes.
pub(crate) fn from_parts(dot: f64, mag_a: f64, mag_b: f64) -> f32 {
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    // Clamp to [-1, 1] to absorb floating point error.
    let score = (dot / (mag_a * mag_b)).clamp(-1.0, 1.0) as f32;
    // -0.0 would rank below +0.0 under total ordering.
    if score == 0.0 {
        0.0
    } else {
        score
    }
}
