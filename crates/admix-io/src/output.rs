//! ADMIXTURE-style text output: `.Q` (individual-major) and `.P` (marker-major).

use std::path::{Path, PathBuf};

use admix_core::{AdmixError, Result};
use ndarray::{Array2, ArrayView2};

fn csv_error(e: csv::Error) -> AdmixError {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => AdmixError::Io(io),
        other => AdmixError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("{:?}", other),
        )),
    }
}

fn write_rows<P: AsRef<Path>>(path: P, rows: ArrayView2<f64>) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .from_path(path.as_ref())
        .map_err(csv_error)?;

    for row in rows.rows() {
        let record: Vec<String> = row.iter().map(|v| format!("{:.6}", v)).collect();
        wtr.write_record(&record).map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write Q (individuals × K): one line per individual, K values with 6 decimals.
pub fn write_q_matrix<P: AsRef<Path>>(q: &Array2<f64>, path: P) -> Result<()> {
    write_rows(path, q.view())
}

/// Write F (K × markers) transposed: one line per marker, K frequencies.
pub fn write_p_matrix<P: AsRef<Path>>(f: &Array2<f64>, path: P) -> Result<()> {
    write_rows(path, f.t())
}

/// `{prefix}.{K}.Q` and `{prefix}.{K}.P`.
pub fn output_paths(prefix: &str, k: usize) -> (PathBuf, PathBuf) {
    (
        PathBuf::from(format!("{}.{}.Q", prefix, k)),
        PathBuf::from(format!("{}.{}.P", prefix, k)),
    )
}

/// Output prefix derived from the input file name, dropping `.gz`/`.bgz`
/// and then a `.vcf`/`.bcf` extension. Stdin (`-`) falls back to `admix`.
pub fn default_prefix<P: AsRef<Path>>(input: P) -> String {
    let name = input
        .as_ref()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "admix".to_string());
    let base = name
        .strip_suffix(".gz")
        .or_else(|| name.strip_suffix(".bgz"))
        .unwrap_or(&name);
    let base = base
        .strip_suffix(".vcf")
        .or_else(|| base.strip_suffix(".bcf"))
        .unwrap_or(base);
    if base.is_empty() || base == "-" {
        "admix".to_string()
    } else {
        base.to_string()
    }
}
