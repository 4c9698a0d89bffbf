//! Packing of `f32` vectors into the blob layout `vec0` reads.
//!
//! Floats are stored as contiguous little-endian IEEE-754 words, which is the
//! byte order sqlite-vec expects on every platform it supports.

const F32_WIDTH: usize = std::mem::size_of::<f32>();

/// Serialize a vector into a packed blob. An empty vector yields an empty blob.
pub fn encode(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize a packed blob back into a vector.
///
/// Trailing bytes that do not form a whole float are ignored; blobs written
/// by [`encode`] never have any.
pub fn decode(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(F32_WIDTH)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
