//! admix-core: shared data structures for the admix toolkit.

pub mod config;
pub mod error;

pub use config::FitConfig;
pub use error::{AdmixError, Result};

use ndarray::Array2;

pub type SampleId = String;
pub type MarkerId = String;

/// Sentinel stored in the genotype matrix for an unobserved call.
pub const MISSING_GENOTYPE: i8 = -1;

/// Diploid alternate-allele counts: samples × markers, entries 0..=2 or missing.
#[derive(Clone, Debug)]
pub struct GenotypeMatrix {
    pub sample_ids: Vec<SampleId>,
    pub marker_ids: Vec<MarkerId>,
    /// shape: (n_samples, n_markers)
    pub genotypes: Array2<i8>,
}

impl GenotypeMatrix {
    /// Build a labelled matrix, checking labels against the matrix shape and
    /// every entry against the {missing, 0, 1, 2} alphabet.
    pub fn new(
        sample_ids: Vec<SampleId>,
        marker_ids: Vec<MarkerId>,
        genotypes: Array2<i8>,
    ) -> Result<Self> {
        let (n_rows, n_cols) = genotypes.dim();
        if n_rows != sample_ids.len() {
            return Err(AdmixError::config(format!(
                "Genotype rows ({}) do not match sample count ({})",
                n_rows,
                sample_ids.len()
            )));
        }
        if n_cols != marker_ids.len() {
            return Err(AdmixError::config(format!(
                "Genotype columns ({}) do not match marker count ({})",
                n_cols,
                marker_ids.len()
            )));
        }
        validate_genotypes(&genotypes)?;
        Ok(Self {
            sample_ids,
            marker_ids,
            genotypes,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.genotypes.nrows()
    }

    pub fn n_markers(&self) -> usize {
        self.genotypes.ncols()
    }

    /// Number of missing calls in the whole matrix.
    pub fn n_missing(&self) -> usize {
        self.genotypes.iter().filter(|&&g| is_missing(g)).count()
    }

    /// Fraction of calls that are missing (0.0 for an empty matrix).
    pub fn missing_rate(&self) -> f64 {
        let total = self.genotypes.len();
        if total == 0 {
            return 0.0;
        }
        self.n_missing() as f64 / total as f64
    }
}

#[inline]
pub fn is_missing(g: i8) -> bool {
    g < 0
}

/// Reject anything outside {-1, 0, 1, 2}.
pub fn validate_genotypes(genotypes: &Array2<i8>) -> Result<()> {
    for ((i, j), &g) in genotypes.indexed_iter() {
        if g != MISSING_GENOTYPE && !(0..=2).contains(&g) {
            return Err(AdmixError::config(format!(
                "Invalid genotype {} at sample {}, marker {} (expected 0, 1, 2 or {})",
                g, i, j, MISSING_GENOTYPE
            )));
        }
    }
    Ok(())
}
