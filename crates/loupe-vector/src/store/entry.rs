//! Catalog entries and their storage encoding.

use crate::error::VectorError;
use crate::types::{CatalogId, Embedding};

/// Bytes before the vector: active flag and insertion counter.
const HEADER_LEN: usize = 1 + 8;

/// One catalog record.
///
/// Only `active` ever changes in place; a re-ingest writes a new entry with a
/// fresh `inserted_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    /// The catalog ID.
    pub id: CatalogId,
    /// The embedding.
    pub vector: Embedding,
    /// `false` once soft-deleted.
    pub active: bool,
    /// Monotonic insertion counter, used for tie-breaking and replay order.
    pub inserted_at: u64,
}

impl CatalogEntry {
    /// Encode as `[active u8][inserted_at u64 LE][f32 LE ...]`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.vector.dimension() * 4);
        bytes.push(u8::from(self.active));
        bytes.extend_from_slice(&self.inserted_at.to_le_bytes());
        bytes.extend_from_slice(&self.vector.to_bytes());
        bytes
    }

    /// Decode a stored value for the given ID.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::Encoding`] for a truncated header or an unknown
    /// flag byte, and propagates vector decoding errors.
    pub fn from_bytes(id: CatalogId, bytes: &[u8]) -> Result<Self, VectorError> {
        if bytes.len() < HEADER_LEN {
            return Err(VectorError::Encoding(format!(
                "entry '{id}' is {} bytes, shorter than its header",
                bytes.len()
            )));
        }
        let active = match bytes[0] {
            0 => false,
            1 => true,
            flag => {
                return Err(VectorError::Encoding(format!("entry '{id}' has active flag {flag}")))
            }
        };
        let mut counter = [0u8; 8];
        counter.copy_from_slice(&bytes[1..HEADER_LEN]);
        let vector = Embedding::from_bytes(&bytes[HEADER_LEN..])?;

        Ok(Self { id, vector, active, inserted_at: u64::from_le_bytes(counter) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(active: bool) -> CatalogEntry {
        CatalogEntry {
            id: CatalogId::new("pendant-3").unwrap(),
            vector: Embedding::new(vec![0.5, -0.5, 1.0]).unwrap(),
            active,
            inserted_at: 41,
        }
    }

    #[test]
    fn encode_decode() {
        for active in [true, false] {
            let original = entry(active);
            let decoded =
                CatalogEntry::from_bytes(original.id.clone(), &original.to_bytes()).unwrap();
            assert_eq!(decoded, original);
        }
    }

    #[test]
    fn rejects_bad_flag_and_truncation() {
        let mut bytes = entry(true).to_bytes();
        bytes[0] = 7;
        let id = CatalogId::new("x").unwrap();
        assert!(matches!(CatalogEntry::from_bytes(id.clone(), &bytes), Err(VectorError::Encoding(_))));
        assert!(CatalogEntry::from_bytes(id, &[1, 0, 0]).is_err());
    }
}
