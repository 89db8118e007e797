//! Feature vectors and the distance functions over them.

use serde::{Deserialize, Serialize};

use crate::error::{GlyphError, Result};

/// Grid-binned ink density of one glyph.
///
/// Values lie in `[0, 1]`, where `1` is solid ink and `0` is blank
/// background. The vector has `grid * grid` entries in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    grid: u32,
    values: Vec<f32>,
}

impl FeatureVector {
    /// Wrap raw values extracted at `grid` resolution.
    pub fn new(grid: u32, values: Vec<f32>) -> Result<Self> {
        let expected = (grid as usize) * (grid as usize);
        if values.len() != expected {
            return Err(GlyphError::DimensionMismatch {
                expected,
                actual: values.len(),
            });
        }
        Ok(Self { grid, values })
    }

    /// Grid resolution the vector was extracted at.
    pub fn grid(&self) -> u32 {
        self.grid
    }

    /// Number of dimensions (`grid * grid`).
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// The raw values.
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Mean ink density over the whole glyph.
    pub fn ink_coverage(&self) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f32>() / self.values.len() as f32
    }

    /// Euclidean distance to another vector of the same grid.
    pub fn distance(&self, other: &FeatureVector) -> Result<f32> {
        euclidean_distance(&self.values, &other.values)
    }
}

/// Compute the euclidean distance between two vectors.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    Ok(squared_distance(a, b)?.sqrt())
}

/// Compute the squared euclidean distance between two vectors.
///
/// Nearest-centroid search compares squared distances to skip the root.
pub fn squared_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(GlyphError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    Ok(a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum())
}

/// Compute the component-wise mean of several vectors of equal length.
pub fn mean<'a, I>(vectors: I, dimension: usize) -> Result<Option<Vec<f32>>>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut sum = vec![0.0f64; dimension];
    let mut count = 0usize;

    for v in vectors {
        if v.len() != dimension {
            return Err(GlyphError::DimensionMismatch {
                expected: dimension,
                actual: v.len(),
            });
        }
        for (acc, x) in sum.iter_mut().zip(v) {
            *acc += f64::from(*x);
        }
        count += 1;
    }

    if count == 0 {
        return Ok(None);
    }

    let n = count as f64;
    Ok(Some(sum.into_iter().map(|s| (s / n) as f32).collect()))
}
