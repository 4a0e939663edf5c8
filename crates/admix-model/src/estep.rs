use admix_core::{AdmixError, Result};
use ndarray::{Array2, Array3};

/// Additive floor on posterior normalizers.
pub(crate) const NORM_FLOOR: f64 = 1e-10;

/// Posterior population of origin for a single allele copy.
///
/// Both tensors have shape (n_samples, n_markers, k); for fixed (i, j) the k
/// entries of each sum to one.
#[derive(Clone, Debug)]
pub struct Posteriors {
    /// Origin of an alternate-allele copy.
    pub gamma_alt: Array3<f64>,
    /// Origin of a reference-allele copy.
    pub gamma_ref: Array3<f64>,
}

impl Posteriors {
    pub fn dim(&self) -> (usize, usize, usize) {
        self.gamma_alt.dim()
    }
}

/// E-step.
///
/// alt weight = q_ik * f_kj, ref weight = q_ik * (1 - f_kj), each normalized
/// over k. Only the shape of `g` is used: genotype counts enter in the M-step,
/// which scales these per-copy posteriors by the observed copy numbers.
pub fn e_step(g: &Array2<i8>, q: &Array2<f64>, f: &Array2<f64>) -> Result<Posteriors> {
    let (n_samples, n_markers) = g.dim();
    let k = q.ncols();
    if q.nrows() != n_samples {
        return Err(AdmixError::config(format!(
            "Q rows ({}) do not match genotype samples ({})",
            q.nrows(),
            n_samples
        )));
    }
    if f.dim() != (k, n_markers) {
        return Err(AdmixError::config(format!(
            "F shape {:?} does not match (K, markers) = ({}, {})",
            f.dim(),
            k,
            n_markers
        )));
    }

    let mut gamma_alt = Array3::<f64>::zeros((n_samples, n_markers, k));
    let mut gamma_ref = Array3::<f64>::zeros((n_samples, n_markers, k));

    for i in 0..n_samples {
        for j in 0..n_markers {
            let mut alt_sum = 0.0;
            let mut ref_sum = 0.0;
            for c in 0..k {
                let qic = q[(i, c)];
                let fcj = f[(c, j)];
                let alt_w = qic * fcj;
                let ref_w = qic * (1.0 - fcj);
                gamma_alt[(i, j, c)] = alt_w;
                gamma_ref[(i, j, c)] = ref_w;
                alt_sum += alt_w;
                ref_sum += ref_w;
            }
            let alt_norm = alt_sum + NORM_FLOOR;
            let ref_norm = ref_sum + NORM_FLOOR;
            for c in 0..k {
                gamma_alt[(i, j, c)] /= alt_norm;
                gamma_ref[(i, j, c)] /= ref_norm;
            }
        }
    }

    Ok(Posteriors {
        gamma_alt,
        gamma_ref,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init::initialize_seeded;
    use approx::assert_relative_eq;
    use ndarray::{array, Axis};
    use proptest::prelude::*;

    #[test]
    fn posteriors_follow_weights() {
        let g = array![[1]];
        let q = array![[0.25, 0.75]];
        let f = array![[0.8], [0.2]];
        let post = e_step(&g, &q, &f).unwrap();
        // alt: 0.2, 0.15 -> 0.2/0.35, 0.15/0.35
        assert_relative_eq!(post.gamma_alt[(0, 0, 0)], 0.2 / 0.35, epsilon = 1e-8);
        assert_relative_eq!(post.gamma_alt[(0, 0, 1)], 0.15 / 0.35, epsilon = 1e-8);
        // ref: 0.05, 0.6 -> 0.05/0.65, 0.6/0.65
        assert_relative_eq!(post.gamma_ref[(0, 0, 0)], 0.05 / 0.65, epsilon = 1e-8);
        assert_relative_eq!(post.gamma_ref[(0, 0, 1)], 0.6 / 0.65, epsilon = 1e-8);
    }

    #[test]
    fn ignores_genotype_values() {
        let q = array![[0.3, 0.7], [0.6, 0.4]];
        let f = array![[0.1, 0.5], [0.9, 0.2]];
        let a = e_step(&array![[0, 1], [2, -1]], &q, &f).unwrap();
        let b = e_step(&array![[2, -1], [0, 0]], &q, &f).unwrap();
        assert_eq!(a.gamma_alt, b.gamma_alt);
        assert_eq!(a.gamma_ref, b.gamma_ref);
    }

    #[test]
    fn zero_ancestry_weight_does_not_divide_by_zero() {
        let q = array![[0.0, 0.0]];
        let f = array![[0.5], [0.5]];
        let post = e_step(&array![[1]], &q, &f).unwrap();
        assert!(post.gamma_alt.iter().all(|v| v.is_finite()));
        assert!(post.gamma_ref.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn rejects_mismatched_shapes() {
        let q = array![[0.5, 0.5]];
        let f = array![[0.5, 0.5], [0.5, 0.5]];
        assert!(e_step(&array![[0, 1], [1, 1]], &q, &f).is_err());
        assert!(e_step(&array![[0, 1, 2]], &q, &f).is_err());
    }

    proptest! {
        #[test]
        fn posteriors_sum_to_one(n in 1usize..8, m in 1usize..8, k in 1usize..5, seed in any::<u64>()) {
            let (q, f) = initialize_seeded(n, m, k, Some(seed)).unwrap();
            let g = Array2::<i8>::zeros((n, m));
            let post = e_step(&g, &q, &f).unwrap();
            prop_assert_eq!(post.dim(), (n, m, k));
            for s in post.gamma_alt.sum_axis(Axis(2)).iter() {
                prop_assert!((s - 1.0).abs() < 1e-6);
            }
            for s in post.gamma_ref.sum_axis(Axis(2)).iter() {
                prop_assert!((s - 1.0).abs() < 1e-6);
            }
        }
    }
}
