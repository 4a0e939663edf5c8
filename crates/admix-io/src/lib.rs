//! admix-io: file I/O for the admix toolkit.
//!
//! - VCF genotype loading (plain, gzip/bgzip, stdin) into a [`GenotypeMatrix`]
//! - `.Q` / `.P` result matrices in the ADMIXTURE text layout

pub mod output;
pub mod vcf;

pub use admix_core::GenotypeMatrix;
pub use output::{default_prefix, output_paths, write_p_matrix, write_q_matrix};
pub use vcf::{load_vcf, parse_gt, VcfReadConfig};
