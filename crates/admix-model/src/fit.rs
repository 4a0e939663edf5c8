use crate::estep::e_step;
use crate::init::initialize_seeded;
use crate::likelihood::log_likelihood;
use crate::mstep::m_step;
use admix_core::{validate_genotypes, AdmixError, FitConfig, Result};
use ndarray::Array2;
use tracing::{debug, info};

const REPORT_EVERY: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FitState {
    /// Parameters drawn, no iteration run yet.
    Initialized,
    Iterating,
    /// |ll_t - ll_{t-1}| fell below the tolerance.
    Converged,
    /// Iteration budget exhausted without meeting the tolerance.
    MaxIterReached,
}

impl FitState {
    pub fn is_terminal(self) -> bool {
        matches!(self, FitState::Converged | FitState::MaxIterReached)
    }
}

/// Outputs of a finished fit. Both terminal states carry the same fields.
#[derive(Clone, Debug)]
pub struct FitResult {
    /// shape: (n_samples, k)
    pub q: Array2<f64>,
    /// shape: (k, n_markers)
    pub f: Array2<f64>,
    /// One entry per completed iteration.
    pub log_likelihoods: Vec<f64>,
    pub state: FitState,
    pub iterations: usize,
}

impl FitResult {
    pub fn converged(&self) -> bool {
        self.state == FitState::Converged
    }

    pub fn final_log_likelihood(&self) -> Option<f64> {
        self.log_likelihoods.last().copied()
    }
}

/// EM driver owning the evolving (Q, F) pair and the log-likelihood trace.
///
/// Between calls to [`AdmixtureFit::step`] the parameters are always a complete
/// estimate, so a caller may stop after any iteration.
pub struct AdmixtureFit<'g> {
    genotypes: &'g Array2<i8>,
    config: FitConfig,
    q: Array2<f64>,
    f: Array2<f64>,
    log_likelihoods: Vec<f64>,
    prev_ll: f64,
    iteration: usize,
    state: FitState,
}

impl<'g> AdmixtureFit<'g> {
    /// Validate inputs and draw the starting parameters.
    pub fn new(genotypes: &'g Array2<i8>, config: &FitConfig) -> Result<Self> {
        config.validate()?;
        let (n_samples, n_markers) = genotypes.dim();
        if n_samples == 0 || n_markers == 0 {
            return Err(AdmixError::config(format!(
                "Genotype matrix is empty ({} samples x {} markers)",
                n_samples, n_markers
            )));
        }
        validate_genotypes(genotypes)?;

        let (q, f) = initialize_seeded(n_samples, n_markers, config.k, config.seed)?;
        Ok(Self {
            genotypes,
            config: config.clone(),
            q,
            f,
            log_likelihoods: Vec::with_capacity(config.max_iter.min(1024)),
            prev_ll: f64::NEG_INFINITY,
            iteration: 0,
            state: FitState::Initialized,
        })
    }

    pub fn state(&self) -> FitState {
        self.state
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn q(&self) -> &Array2<f64> {
        &self.q
    }

    pub fn f(&self) -> &Array2<f64> {
        &self.f
    }

    pub fn log_likelihoods(&self) -> &[f64] {
        &self.log_likelihoods
    }

    /// Run one E -> M -> evaluate iteration. No-op once terminal.
    pub fn step(&mut self) -> Result<FitState> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }
        self.state = FitState::Iterating;

        let posteriors = e_step(self.genotypes, &self.q, &self.f)?;
        let (q, f) = m_step(self.genotypes, &posteriors)?;
        let ll = log_likelihood(self.genotypes, &q, &f)?;
        self.q = q;
        self.f = f;
        self.log_likelihoods.push(ll);
        self.iteration += 1;

        debug!(iteration = self.iteration, log_likelihood = ll, "EM step");
        if self.iteration % REPORT_EVERY == 0 {
            info!("Iteration {}: log-likelihood = {:.2}", self.iteration, ll);
        }

        if (ll - self.prev_ll).abs() < self.config.tolerance {
            info!("Converged at iteration {}", self.iteration);
            self.state = FitState::Converged;
        } else if self.iteration >= self.config.max_iter {
            info!(
                "Reached max_iter={} without convergence (last change {:.3e})",
                self.config.max_iter,
                (ll - self.prev_ll).abs()
            );
            self.state = FitState::MaxIterReached;
        }
        self.prev_ll = ll;
        Ok(self.state)
    }

    /// Iterate to a terminal state.
    pub fn run(mut self) -> Result<FitResult> {
        while !self.state.is_terminal() {
            self.step()?;
        }
        Ok(self.into_result())
    }

    pub fn into_result(self) -> FitResult {
        FitResult {
            q: self.q,
            f: self.f,
            log_likelihoods: self.log_likelihoods,
            state: self.state,
            iterations: self.iteration,
        }
    }
}

/// Fit K ancestral populations to `genotypes` (samples × markers, -1 = missing).
pub fn run_admixture(genotypes: &Array2<i8>, config: &FitConfig) -> Result<FitResult> {
    info!(
        "Running ADMIXTURE: {} individuals, {} SNPs, K={}",
        genotypes.nrows(),
        genotypes.ncols(),
        config.k
    );
    AdmixtureFit::new(genotypes, config)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn toy() -> Array2<i8> {
        array![
            [0, 0, 1, 2, 2],
            [0, 1, 0, 2, 1],
            [2, 2, 1, 0, 0],
            [2, 1, 2, 0, -1]
        ]
    }

    #[test]
    fn starts_initialized_and_steps() {
        let g = toy();
        let cfg = FitConfig::new(2).with_seed(Some(1)).with_max_iter(5);
        let mut fit = AdmixtureFit::new(&g, &cfg).unwrap();
        assert_eq!(fit.state(), FitState::Initialized);
        assert!(fit.log_likelihoods().is_empty());

        let state = fit.step().unwrap();
        // The first iteration compares against -inf and cannot converge.
        assert_eq!(state, FitState::Iterating);
        assert_eq!(fit.iteration(), 1);
        assert_eq!(fit.log_likelihoods().len(), 1);
        assert_eq!(fit.q().dim(), (4, 2));
        assert_eq!(fit.f().dim(), (2, 5));
    }

    #[test]
    fn huge_tolerance_still_runs_one_iteration_then_converges() {
        let g = toy();
        let cfg = FitConfig::new(2).with_seed(Some(2)).with_tolerance(1e12);
        let res = run_admixture(&g, &cfg).unwrap();
        assert_eq!(res.state, FitState::Converged);
        assert_eq!(res.iterations, 2);
        assert_eq!(res.log_likelihoods.len(), 2);
    }

    #[test]
    fn zero_tolerance_hits_iteration_cap() {
        let g = toy();
        let cfg = FitConfig::new(2).with_seed(Some(3)).with_tolerance(0.0).with_max_iter(7);
        let res = run_admixture(&g, &cfg).unwrap();
        assert_eq!(res.state, FitState::MaxIterReached);
        assert!(!res.converged());
        assert_eq!(res.iterations, 7);
        assert_eq!(res.log_likelihoods.len(), 7);
    }

    #[test]
    fn step_after_terminal_is_noop() {
        let g = toy();
        let cfg = FitConfig::new(2).with_seed(Some(4)).with_tolerance(0.0).with_max_iter(1);
        let mut fit = AdmixtureFit::new(&g, &cfg).unwrap();
        assert_eq!(fit.step().unwrap(), FitState::MaxIterReached);
        let q_before = fit.q().clone();
        assert_eq!(fit.step().unwrap(), FitState::MaxIterReached);
        assert_eq!(fit.log_likelihoods().len(), 1);
        assert_eq!(fit.q(), &q_before);
    }

    #[test]
    fn same_seed_same_fit() {
        let g = toy();
        let cfg = FitConfig::new(2).with_seed(Some(9)).with_max_iter(15);
        let a = run_admixture(&g, &cfg).unwrap();
        let b = run_admixture(&g, &cfg).unwrap();
        assert_eq!(a.q, b.q);
        assert_eq!(a.f, b.f);
        assert_eq!(a.log_likelihoods, b.log_likelihoods);
    }

    #[test]
    fn rejects_bad_inputs_before_computing() {
        let g = toy();
        assert!(AdmixtureFit::new(&g, &FitConfig::new(0)).is_err());

        let empty = Array2::<i8>::zeros((0, 3));
        assert!(AdmixtureFit::new(&empty, &FitConfig::new(2)).is_err());

        let bad = array![[0, 5], [1, 1]];
        let err = run_admixture(&bad, &FitConfig::new(2).with_seed(Some(1))).unwrap_err();
        assert!(matches!(err, AdmixError::Config { .. }));
    }
}
