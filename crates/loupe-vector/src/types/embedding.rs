//! Embedding vectors.

use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::distance::l2_norm;
use crate::error::VectorError;

/// A finite, non-empty embedding vector.
///
/// Construction rejects NaN and infinite components, so every `Embedding`
/// can be scored without further checks. Dimension against a catalog is
/// checked where the catalog is known.
///
/// # Example
///
/// ```
/// use loupe_vector::types::Embedding;
///
/// let embedding = Embedding::new(vec![1.0, 2.0, 3.0]).unwrap();
/// assert_eq!(embedding.dimension(), 3);
/// assert!(Embedding::new(vec![f32::NAN]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct Embedding {
    data: Vec<f32>,
}

fn check_finite(index: usize, value: f32) -> Result<(), VectorError> {
    if value.is_finite() {
        return Ok(());
    }
    Err(VectorError::InvalidValue {
        index,
        value,
        reason: if value.is_nan() {
            "NaN values are not allowed"
        } else {
            "Infinite values are not allowed"
        },
    })
}

impl Embedding {
    /// Create an embedding from its components.
    ///
    /// # Errors
    ///
    /// Returns an error if the vector is empty or contains NaN/Infinite values.
    pub fn new(data: Vec<f32>) -> Result<Self, VectorError> {
        if data.is_empty() {
            return Err(VectorError::InvalidDimension { expected: 1, actual: 0 });
        }
        for (i, &value) in data.iter().enumerate() {
            check_finite(i, value)?;
        }
        Ok(Self { data })
    }

    /// Decode little-endian f32 components.
    ///
    /// # Errors
    ///
    /// Returns an error if the byte length is empty or not a multiple of 4,
    /// or if a decoded value is not finite.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VectorError> {
        if bytes.is_empty() {
            return Err(VectorError::InvalidDimension { expected: 1, actual: 0 });
        }
        if bytes.len() % 4 != 0 {
            return Err(VectorError::Encoding(format!(
                "byte length {} is not a multiple of 4",
                bytes.len()
            )));
        }

        let mut data = Vec::with_capacity(bytes.len() / 4);
        for chunk in bytes.chunks_exact(4) {
            let raw: [u8; 4] = chunk
                .try_into()
                .map_err(|_| VectorError::Encoding("failed to read f32 bytes".to_string()))?;
            let value = f32::from_le_bytes(raw);
            check_finite(data.len(), value)?;
            data.push(value);
        }
        Ok(Self { data })
    }

    /// Encode the components as little-endian f32 bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.data.len() * 4);
        for &value in &self.data {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    /// Get the dimension of the embedding.
    #[inline]
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.data.len()
    }

    /// Get the embedding data as a slice.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Consume the embedding and return the underlying vector.
    #[inline]
    #[must_use]
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// The L2 norm (magnitude).
    #[inline]
    #[must_use]
    pub fn l2_norm(&self) -> f32 {
        l2_norm(&self.data)
    }

    /// Whether every component is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|&x| x == 0.0)
    }

    /// A unit-length copy, or `None` for the zero vector.
    #[must_use]
    pub fn normalized(&self) -> Option<Self> {
        let norm = self.l2_norm();
        if norm == 0.0 {
            return None;
        }
        Some(Self { data: self.data.iter().map(|x| x / norm).collect() })
    }
}

impl Deref for Embedding {
    type Target = [f32];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl TryFrom<Vec<f32>> for Embedding {
    type Error = VectorError;

    fn try_from(data: Vec<f32>) -> Result<Self, Self::Error> {
        Self::new(data)
    }
}

impl From<Embedding> for Vec<f32> {
    fn from(embedding: Embedding) -> Self {
        embedding.data
    }
}
