use admix_core::FitConfig;
use admix_io::{default_prefix, load_vcf, output_paths, write_p_matrix, write_q_matrix, VcfReadConfig};
use admix_model::{run_admixture, FitState};
use anyhow::{Context, Result};
use clap::Parser;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// admix: EM admixture inference from VCF genotypes
#[derive(Parser)]
#[command(
    name = "admix",
    version,
    about = "admix: estimate ancestry proportions (Q) and population allele frequencies (P) from a VCF",
    after_help = "OUTPUT:
    {prefix}.{K}.Q    one line per individual, K ancestry proportions
    {prefix}.{K}.P    one line per marker, K population allele frequencies

EXAMPLE:
    admix --vcf cohort.vcf.gz -k 3 -o runs/cohort --seed 42"
)]
struct Cli {
    /// Input VCF (plain, gzipped, or - for stdin) with FORMAT/GT calls
    #[arg(long)]
    vcf: String,

    /// Number of ancestral populations (K)
    #[arg(short = 'k', long = "populations", default_value_t = admix_core::config::DEFAULT_K)]
    populations: usize,

    /// Output prefix (default: input file name without .vcf/.gz)
    #[arg(short = 'o', long)]
    output: Option<String>,

    /// Maximum EM iterations
    #[arg(long, default_value_t = admix_core::config::DEFAULT_MAX_ITER)]
    max_iter: usize,

    /// Convergence tolerance on the log-likelihood change
    #[arg(long, default_value_t = admix_core::config::DEFAULT_TOLERANCE)]
    tol: f64,

    /// Random seed for reproducible initialization
    #[arg(long)]
    seed: Option<u64>,

    /// Fail on malformed VCF records instead of skipping them
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Enable verbose (per-iteration) logging
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let start = Instant::now();
    let config = FitConfig::new(cli.populations)
        .with_max_iter(cli.max_iter)
        .with_tolerance(cli.tol)
        .with_seed(cli.seed);
    config.validate().context("invalid fit parameters")?;

    let prefix = cli.output.clone().unwrap_or_else(|| default_prefix(&cli.vcf));
    info!(
        "{} v{} | vcf={} | K={} | max_iter={} | tol={} | seed={} | output={}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        cli.vcf,
        config.k,
        config.max_iter,
        config.tolerance,
        config
            .seed
            .map(|s| s.to_string())
            .unwrap_or_else(|| "none".to_string()),
        prefix
    );

    info!("Loading {}...", cli.vcf);
    let geno = load_vcf(&cli.vcf, &VcfReadConfig { strict: cli.strict })
        .with_context(|| format!("failed to read VCF {}", cli.vcf))?;
    info!(
        "  {} individuals, {} SNPs ({:.2}% missing)",
        geno.n_samples(),
        geno.n_markers(),
        100.0 * geno.missing_rate()
    );

    let result = run_admixture(&geno.genotypes, &config).context("admixture fit failed")?;
    let final_ll = result.final_log_likelihood().unwrap_or(f64::NEG_INFINITY);
    match result.state {
        FitState::Converged => info!(
            "Converged after {} iterations (log-likelihood = {:.4})",
            result.iterations, final_ll
        ),
        _ => info!(
            "Stopped at max_iter={} (log-likelihood = {:.4})",
            result.iterations, final_ll
        ),
    }

    let (q_path, p_path) = output_paths(&prefix, config.k);
    write_q_matrix(&result.q, &q_path)
        .with_context(|| format!("failed to write {}", q_path.display()))?;
    write_p_matrix(&result.f, &p_path)
        .with_context(|| format!("failed to write {}", p_path.display()))?;

    info!(
        "Output written to {} and {} in {:.1}s",
        q_path.display(),
        p_path.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
