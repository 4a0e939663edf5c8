use admix_core::{AdmixError, Result};
use ndarray::Array2;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Dirichlet;

/// Initial allele frequencies are kept away from the boundary.
pub const INIT_FREQ_MIN: f64 = 0.01;
pub const INIT_FREQ_MAX: f64 = 0.99;

/// Draw starting parameters.
///
/// Each row of Q (n × k) is a sample from a symmetric Dirichlet(1), i.e. a
/// uniform point on the simplex. F (k × m) is i.i.d. uniform on
/// [`INIT_FREQ_MIN`, `INIT_FREQ_MAX`].
pub fn initialize<R: Rng + ?Sized>(
    n_samples: usize,
    n_markers: usize,
    k: usize,
    rng: &mut R,
) -> Result<(Array2<f64>, Array2<f64>)> {
    if n_samples == 0 || n_markers == 0 || k == 0 {
        return Err(AdmixError::config(format!(
            "Initializer needs positive dimensions (n={}, m={}, K={})",
            n_samples, n_markers, k
        )));
    }

    let mut q = Array2::<f64>::zeros((n_samples, k));
    if k == 1 {
        // Dirichlet is undefined for a single category.
        q.fill(1.0);
    } else {
        let alpha = vec![1.0f64; k];
        let dirichlet = Dirichlet::new(&alpha)
            .map_err(|e| AdmixError::config(format!("Dirichlet prior: {}", e)))?;
        for mut row in q.rows_mut() {
            let draw = dirichlet.sample(rng);
            for (dst, src) in row.iter_mut().zip(draw) {
                *dst = src;
            }
        }
    }

    let uniform = Uniform::new_inclusive(INIT_FREQ_MIN, INIT_FREQ_MAX);
    let f = Array2::from_shape_simple_fn((k, n_markers), || uniform.sample(rng));

    Ok((q, f))
}

/// [`initialize`] with a generator built from `seed`, or from entropy when absent.
pub fn initialize_seeded(
    n_samples: usize,
    n_markers: usize,
    k: usize,
    seed: Option<u64>,
) -> Result<(Array2<f64>, Array2<f64>)> {
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    initialize(n_samples, n_markers, k, &mut rng)
}
