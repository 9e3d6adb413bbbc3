//! Access to encoded per-document norms.

use std::sync::Arc;

use quarry_common::Result;

/// Encoded norm of each document of a field.
pub trait NormValues {
    fn get(&self, doc: u32) -> i64;
}

/// The same norm for every document. A single-document index needs nothing more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantNormValues(pub i64);

impl NormValues for ConstantNormValues {
    #[inline]
    fn get(&self, _doc: u32) -> i64 {
        self.0
    }
}

impl NormValues for Vec<i64> {
    fn get(&self, doc: u32) -> i64 {
        self[doc as usize]
    }
}

/// Supplies norms for a field to similarity scorers.
pub trait NormSource {
    /// Returns `None` when the field has no norms (absent, or norms omitted).
    fn norm_values(&self, field: &str) -> Result<Option<Arc<dyn NormValues>>>;
}

/// A source for fields that omit norms.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNorms;

impl NormSource for NoNorms {
    fn norm_values(&self, _field: &str) -> Result<Option<Arc<dyn NormValues>>> {
        Ok(None)
    }
}

/// Extracts the unsigned norm byte from a stored norm value.
#[inline]
pub fn norm_byte(value: i64) -> u8 {
    (value & 0xff) as u8
}
