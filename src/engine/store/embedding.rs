// ── Fact embeddings ────────────────────────────────────────────────────────
// Caller-supplied vectors are stored as little-endian f32 BLOBs.

pub(crate) fn decode_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .filter_map(|word| word.try_into().ok().map(f32::from_le_bytes))
        .collect()
}

pub(crate) fn encode_embedding(values: &[f32]) -> Vec<u8> {
    values.iter().copied().flat_map(f32::to_le_bytes).collect()
}

/// Cosine of the angle between two embeddings. `None` when they cannot be
/// compared: mismatched dimensions, no dimensions, or a zero vector.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }
    let (dot, sq_a, sq_b) = a.iter().zip(b).fold((0.0f64, 0.0f64, 0.0f64), |acc, (&x, &y)| {
        let (x, y) = (f64::from(x), f64::from(y));
        (acc.0 + x * y, acc.1 + x * x, acc.2 + y * y)
    });
    let magnitude = (sq_a * sq_b).sqrt();
    (magnitude > f64::EPSILON).then(|| dot / magnitude)
}
