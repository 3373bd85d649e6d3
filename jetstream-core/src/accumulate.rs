//! Area-weighted temperature distribution of a single time step
//!
//! Every observation contributes the area of its grid cell to the bucket its
//! temperature falls in. The per-bucket areas are then summed coldest to
//! warmest:
//!
//! $$ C_k = \sum_{j \le k} \sum_{i \in b_j} A(\phi_i) $$
//!
//! Empty buckets keep their slot with zero area so the cumulative curve has one
//! value per bucket and never decreases. Curves are built per time step only;
//! nothing accumulates across time.

use crate::bucket::BucketAssignment;
use crate::errors::{JetstreamError, JetstreamResult};
use crate::grid::GridAreaModel;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Per-bucket and cumulative area of one time step (km^2), coldest bucket first
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AreaCurve {
    bucket_areas: Vec<f64>,
    cumulative: Vec<f64>,
}

impl AreaCurve {
    /// Build a curve from per-bucket areas
    pub fn from_bucket_areas(bucket_areas: Vec<f64>) -> Self {
        let cumulative = bucket_areas
            .iter()
            .scan(0.0, |acc, area| {
                *acc += area;
                Some(*acc)
            })
            .collect();
        Self {
            bucket_areas,
            cumulative,
        }
    }

    pub fn bucket_areas(&self) -> &[f64] {
        &self.bucket_areas
    }

    pub fn cumulative(&self) -> &[f64] {
        &self.cumulative
    }

    pub fn len(&self) -> usize {
        self.cumulative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cumulative.is_empty()
    }

    /// Total area of all cells in the step
    pub fn total(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }
}

/// Sums grid-cell areas into temperature buckets
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct AreaAccumulator {
    model: GridAreaModel,
}

impl AreaAccumulator {
    pub fn new(model: GridAreaModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &GridAreaModel {
        &self.model
    }

    /// Accumulate the area of each cell into its bucket
    ///
    /// `latitudes` must be in the same order as the observations used to build
    /// `assignment`.
    pub fn accumulate(
        &self,
        latitudes: ArrayView1<f64>,
        assignment: &BucketAssignment,
    ) -> JetstreamResult<AreaCurve> {
        if latitudes.len() != assignment.indices().len() {
            return Err(JetstreamError::InvalidGrid(format!(
                "{} latitudes for {} bucketed temperatures",
                latitudes.len(),
                assignment.indices().len()
            )));
        }

        let mut bucket_areas = vec![0.0; assignment.buckets().len()];
        for (&lat, &bucket) in latitudes.iter().zip(assignment.indices()) {
            bucket_areas[bucket] += self.model.area(lat);
        }

        Ok(AreaCurve::from_bucket_areas(bucket_areas))
    }
}
