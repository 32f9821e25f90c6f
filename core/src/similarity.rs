use crate::vector::WeightVector;

/// Cosine similarity of two sparse weight vectors, in `[0, 1]`.
///
/// Zero when either vector has zero norm.
pub fn cosine(a: &WeightVector<'_>, b: &WeightVector<'_>) -> f64 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    for (term, wa) in a.iter() {
        norm_a += wa * wa;
        dot += wa * b.get(term);
    }
    let norm_b = b.squared_norm();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    // rounding can push identical vectors a hair above 1
    (dot / (norm_a.sqrt() * norm_b.sqrt())).min(1.0)
}
