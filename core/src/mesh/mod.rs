//! CPU-side mesh data helpers.
//!
//! - [`IndexFormat`] - Index data format (u16 or u32)
//! - [`encode_indices_u16`] / [`encode_indices_u32`] - Pack indices into GPU bytes
//! - [`IndexFormat::decode`] - Read packed indices back

/// Format of index buffer data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    /// 16-bit unsigned integers (max 65535 vertices).
    #[default]
    Uint16,
    /// 32-bit unsigned integers (max ~4 billion vertices).
    Uint32,
}

impl IndexFormat {
    /// Get the size in bytes of each index.
    pub fn size(&self) -> usize {
        match self {
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }

    /// Decode little-endian packed indices.
    ///
    /// Trailing bytes that do not form a whole index are ignored.
    pub fn decode(&self, bytes: &[u8]) -> Vec<u32> {
        let trailing = bytes.len() % self.size();
        if trailing != 0 {
            log::warn!("Ignoring {} trailing index bytes ({:?})", trailing, self);
        }
        match self {
            Self::Uint16 => bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]) as u32)
                .collect(),
            Self::Uint32 => bytes
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        }
    }

    /// Number of whole indices in `byte_len` bytes.
    pub fn count(&self, byte_len: usize) -> usize {
        byte_len / self.size()
    }
}

/// Pack 16-bit indices into little-endian bytes.
pub fn encode_indices_u16(indices: &[u16]) -> Vec<u8> {
    indices.iter().flat_map(|i| i.to_le_bytes()).collect()
}

/// Pack 32-bit indices into little-endian bytes.
pub fn encode_indices_u32(indices: &[u32]) -> Vec<u8> {
    indices.iter().flat_map(|i| i.to_le_bytes()).collect()
}

/// View a slice of plain-old-data vertices as raw bytes.
pub fn vertex_bytes<T: bytemuck::Pod>(vertices: &[T]) -> &[u8] {
    bytemuck::cast_slice(vertices)
}
