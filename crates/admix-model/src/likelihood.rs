use admix_core::{is_missing, validate_genotypes, AdmixError, Result};
use ndarray::{Array2, Zip};

/// Expected allele frequencies are clipped to [P_CLIP, 1 - P_CLIP] before taking logs.
const P_CLIP: f64 = 1e-10;

/// Expected alternate-allele frequency for each individual at each marker.
/// p_ij = sum_k q_ik * f_kj
pub fn compute_p(q: &Array2<f64>, f: &Array2<f64>) -> Result<Array2<f64>> {
    if q.ncols() != f.nrows() {
        return Err(AdmixError::config(format!(
            "Q columns ({}) do not match F rows ({})",
            q.ncols(),
            f.nrows()
        )));
    }
    Ok(q.dot(f))
}

/// Hardy-Weinberg probability of genotype `g` given alternate frequency `p`.
/// Only called on validated, non-missing codes.
#[inline]
fn genotype_prob(g: i8, p: f64) -> f64 {
    match g {
        0 => (1.0 - p) * (1.0 - p),
        1 => 2.0 * p * (1.0 - p),
        2 => p * p,
        _ => unreachable!("genotype {} passed validation", g),
    }
}

/// Log-likelihood of the observed genotypes under Q and F.
/// Missing calls are excluded from the sum; codes outside {-1, 0, 1, 2} are rejected.
pub fn log_likelihood(g: &Array2<i8>, q: &Array2<f64>, f: &Array2<f64>) -> Result<f64> {
    validate_genotypes(g)?;
    let p = compute_p(q, f)?;
    if p.dim() != g.dim() {
        return Err(AdmixError::config(format!(
            "Genotype shape {:?} does not match Q·F shape {:?}",
            g.dim(),
            p.dim()
        )));
    }

    let mut ll = 0.0;
    Zip::from(g).and(&p).for_each(|&gij, &pij| {
        if is_missing(gij) {
            return;
        }
        let pij = pij.clamp(P_CLIP, 1.0 - P_CLIP);
        ll += genotype_prob(gij, pij).ln();
    });
    Ok(ll)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn p_is_matrix_product() {
        let q = array![[0.5, 0.5], [1.0, 0.0]];
        let f = array![[0.2, 0.8], [0.6, 0.4]];
        let p = compute_p(&q, &f).unwrap();
        assert_eq!(p.dim(), (2, 2));
        // Individual 0: 0.5*0.2 + 0.5*0.6, 0.5*0.8 + 0.5*0.4
        assert_relative_eq!(p[(0, 0)], 0.4, epsilon = 1e-12);
        assert_relative_eq!(p[(0, 1)], 0.6, epsilon = 1e-12);
        assert_relative_eq!(p[(1, 0)], 0.2, epsilon = 1e-12);
        assert_relative_eq!(p[(1, 1)], 0.8, epsilon = 1e-12);
    }

    #[test]
    fn p_rejects_inner_dimension_mismatch() {
        let q = array![[0.5, 0.5]];
        let f = array![[0.2, 0.8]];
        assert!(compute_p(&q, &f).is_err());
    }

    #[test]
    fn likelihood_is_negative_and_finite() {
        let g = array![[0, 2], [1, 1]];
        let q = array![[0.5, 0.5], [0.5, 0.5]];
        let f = array![[0.3, 0.7], [0.3, 0.7]];
        let ll = log_likelihood(&g, &q, &f).unwrap();
        assert!(ll.is_finite());
        assert!(ll < 0.0);

        let expected = (0.7f64 * 0.7).ln()
            + (0.7f64 * 0.7).ln()
            + (2.0f64 * 0.3 * 0.7).ln()
            + (2.0f64 * 0.7 * 0.3).ln();
        assert_relative_eq!(ll, expected, epsilon = 1e-12);
    }

    #[test]
    fn missing_entries_drop_out_of_the_sum() {
        let q = array![[0.5, 0.5], [0.5, 0.5]];
        let f = array![[0.3, 0.7], [0.3, 0.7]];
        let full = log_likelihood(&array![[0, 2], [1, 1]], &q, &f).unwrap();
        let masked = log_likelihood(&array![[0, -1], [1, 1]], &q, &f).unwrap();
        assert!(masked.is_finite());
        // The (0, 1) call was genotype 2 at p = 0.7.
        assert_relative_eq!(full - masked, (0.7f64 * 0.7).ln(), epsilon = 1e-12);
    }

    #[test]
    fn all_missing_row_and_column_stay_finite() {
        let q = array![[0.5, 0.5], [0.9, 0.1]];
        let f = array![[0.3, 0.7], [0.3, 0.7]];
        let ll = log_likelihood(&array![[-1, -1], [1, -1]], &q, &f).unwrap();
        assert!(ll.is_finite());
        let none = log_likelihood(&array![[-1, -1], [-1, -1]], &q, &f).unwrap();
        assert_eq!(none, 0.0);
    }

    #[test]
    fn boundary_frequencies_are_clipped() {
        let q = array![[1.0]];
        let f = array![[0.0]];
        let ll = log_likelihood(&array![[2]], &q, &f).unwrap();
        assert!(ll.is_finite());
        assert!(ll < 0.0);
    }

    #[test]
    fn shape_mismatch_is_config_error() {
        let q = array![[0.5, 0.5]];
        let f = array![[0.3, 0.7], [0.3, 0.7]];
        let err = log_likelihood(&array![[0, 1], [1, 1]], &q, &f).unwrap_err();
        assert!(matches!(err, AdmixError::Config { .. }));
    }

    #[test]
    fn out_of_range_genotype_is_config_error() {
        let q = array![[0.5, 0.5], [0.5, 0.5]];
        let f = array![[0.3, 0.7], [0.3, 0.7]];
        let err = log_likelihood(&array![[3, 0], [1, 2]], &q, &f).unwrap_err();
        assert!(matches!(err, AdmixError::Config { .. }));
        assert!(log_likelihood(&array![[0, -2], [1, 2]], &q, &f).is_err());
    }
}
