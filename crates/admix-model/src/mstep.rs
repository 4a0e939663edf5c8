use crate::estep::{Posteriors, NORM_FLOOR};
use admix_core::{is_missing, validate_genotypes, AdmixError, Result};
use ndarray::Array2;

/// Re-estimated frequencies are clipped to [F_CLIP, 1 - F_CLIP].
pub const F_CLIP: f64 = 1e-6;

/// M-step: new (Q, F) from the per-copy posteriors and the observed genotypes.
///
/// A call g at (i, j) contributes g alternate copies split by `gamma_alt` and
/// 2 - g reference copies split by `gamma_ref`; missing calls contribute nothing.
/// Q rows are each individual's share of copies per population. F is the
/// alternate share of copies per (population, marker).
pub fn m_step(g: &Array2<i8>, posteriors: &Posteriors) -> Result<(Array2<f64>, Array2<f64>)> {
    let (n_samples, n_markers, k) = posteriors.dim();
    if g.dim() != (n_samples, n_markers) {
        return Err(AdmixError::config(format!(
            "Genotype shape {:?} does not match posterior shape ({}, {})",
            g.dim(),
            n_samples,
            n_markers
        )));
    }
    if posteriors.gamma_ref.dim() != posteriors.gamma_alt.dim() {
        return Err(AdmixError::config(format!(
            "gamma_ref shape {:?} does not match gamma_alt shape {:?}",
            posteriors.gamma_ref.dim(),
            posteriors.gamma_alt.dim()
        )));
    }
    validate_genotypes(g)?;

    let gamma_alt = &posteriors.gamma_alt;
    let gamma_ref = &posteriors.gamma_ref;

    let mut q_counts = Array2::<f64>::zeros((n_samples, k));
    // (k, n_markers)
    let mut alt_sum = Array2::<f64>::zeros((k, n_markers));
    let mut ref_sum = Array2::<f64>::zeros((k, n_markers));

    for i in 0..n_samples {
        for j in 0..n_markers {
            let gij = g[(i, j)];
            if is_missing(gij) {
                continue;
            }
            let alt_copies = gij as f64;
            let ref_copies = 2.0 - alt_copies;
            for c in 0..k {
                let alt_c = alt_copies * gamma_alt[(i, j, c)];
                let ref_c = ref_copies * gamma_ref[(i, j, c)];
                q_counts[(i, c)] += alt_c + ref_c;
                alt_sum[(c, j)] += alt_c;
                ref_sum[(c, j)] += ref_c;
            }
        }
    }

    let mut q_new = q_counts;
    for mut row in q_new.rows_mut() {
        let total: f64 = row.sum();
        if total > 0.0 {
            let norm = total + NORM_FLOOR;
            row.mapv_inplace(|v| v / norm);
        } else {
            // No observed calls for this individual.
            row.fill(1.0 / k as f64);
        }
    }

    let mut f_new = Array2::<f64>::zeros((k, n_markers));
    for c in 0..k {
        for j in 0..n_markers {
            let a = alt_sum[(c, j)];
            let r = ref_sum[(c, j)];
            f_new[(c, j)] = (a / (a + r + NORM_FLOOR)).clamp(F_CLIP, 1.0 - F_CLIP);
        }
    }

    Ok((q_new, f_new))
}
