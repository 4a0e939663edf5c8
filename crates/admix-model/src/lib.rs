//! admix-model: EM inference of ancestry proportions (Q) and population allele
//! frequencies (F) from diploid genotypes under Hardy-Weinberg.
//!
//! Each iteration runs [`e_step`], [`m_step`] and [`log_likelihood`] in that
//! order; [`AdmixtureFit`] owns the parameters and the log-likelihood trace.

pub mod estep;
pub mod fit;
pub mod init;
pub mod likelihood;
pub mod mstep;

pub use estep::{e_step, Posteriors};
pub use fit::{run_admixture, AdmixtureFit, FitResult, FitState};
pub use init::{initialize, initialize_seeded};
pub use likelihood::{compute_p, log_likelihood};
pub use mstep::m_step;
