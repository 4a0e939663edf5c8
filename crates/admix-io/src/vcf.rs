use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use admix_core::{AdmixError, GenotypeMatrix, MarkerId, Result, MISSING_GENOTYPE};
use flate2::read::MultiGzDecoder;
use ndarray::Array2;
use tracing::{debug, warn};

/// Reader configuration.
#[derive(Clone, Debug, Default)]
pub struct VcfReadConfig {
    /// If true, unusable records raise an error instead of being skipped with a warning.
    pub strict: bool,
}

/// One parsed data line: marker id plus one genotype per sample.
#[derive(Debug)]
struct GenotypeRecord {
    id: MarkerId,
    calls: Vec<i8>,
}

fn vcf_reader(path: &Path) -> Result<Box<dyn BufRead>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufReader::with_capacity(64 * 1024, io::stdin())));
    }

    let file = File::open(path)?;
    let lower = path.to_string_lossy().to_ascii_lowercase();
    if lower.ends_with(".gz") || lower.ends_with(".bgz") {
        let decoder = MultiGzDecoder::new(file);
        Ok(Box::new(BufReader::with_capacity(64 * 1024, decoder)))
    } else {
        Ok(Box::new(BufReader::with_capacity(64 * 1024, file)))
    }
}

fn warn_or_err(strict: bool, line_no: usize, msg: &str) -> Result<()> {
    if strict {
        Err(AdmixError::parse(line_no, msg))
    } else {
        warn!("line {}: {}", line_no, msg);
        Ok(())
    }
}

/// Alternate-allele count of a diploid GT string ("0/1", "1|1", "./.").
/// Any non-reference allele counts as alternate. Missing alleles and
/// non-diploid calls map to [`MISSING_GENOTYPE`].
pub fn parse_gt(gt: &str) -> i8 {
    let mut alleles = gt.split(|c| c == '/' || c == '|');
    let (Some(a), Some(b), None) = (alleles.next(), alleles.next(), alleles.next()) else {
        return MISSING_GENOTYPE;
    };
    match (allele_is_alt(a), allele_is_alt(b)) {
        (Some(a), Some(b)) => a as i8 + b as i8,
        _ => MISSING_GENOTYPE,
    }
}

fn allele_is_alt(allele: &str) -> Option<bool> {
    if allele == "." || allele.is_empty() {
        return None;
    }
    allele.parse::<u32>().ok().map(|idx| idx != 0)
}

fn gt_index(format_str: &str) -> Option<usize> {
    format_str.split(':').position(|key| key == "GT")
}

fn parse_record_line(
    line: &str,
    line_no: usize,
    n_samples: usize,
    config: &VcfReadConfig,
) -> Result<Option<GenotypeRecord>> {
    // A single trailing tab is not an extra sample column.
    let line = line.strip_suffix('\t').unwrap_or(line);
    let mut fields = line.split('\t');

    let missing = |name: &str| AdmixError::parse(line_no, format!("Missing {} field", name));
    let chrom = fields.next().ok_or_else(|| missing("CHROM"))?;
    let pos = fields.next().ok_or_else(|| missing("POS"))?;
    let id = fields.next().ok_or_else(|| missing("ID"))?;
    let _ref = fields.next().ok_or_else(|| missing("REF"))?;
    let _alt = fields.next().ok_or_else(|| missing("ALT"))?;
    let _qual = fields.next().ok_or_else(|| missing("QUAL"))?;
    let _filter = fields.next().ok_or_else(|| missing("FILTER"))?;
    let _info = fields.next().ok_or_else(|| missing("INFO"))?;
    let format_str = fields.next().ok_or_else(|| missing("FORMAT"))?;

    let Some(gt_idx) = gt_index(format_str) else {
        warn_or_err(config.strict, line_no, "No GT in FORMAT; skipping marker")?;
        return Ok(None);
    };

    let mut calls = Vec::with_capacity(n_samples);
    for sample_str in fields {
        let call = sample_str
            .split(':')
            .nth(gt_idx)
            .map(parse_gt)
            .unwrap_or(MISSING_GENOTYPE);
        calls.push(call);
    }

    if calls.len() != n_samples {
        warn_or_err(
            config.strict,
            line_no,
            &format!(
                "Sample count mismatch (expected {}, got {}); skipping marker",
                n_samples,
                calls.len()
            ),
        )?;
        return Ok(None);
    }

    let marker_id = if id.is_empty() || id == "." {
        format!("{}:{}", chrom, pos)
    } else {
        id.to_string()
    };

    Ok(Some(GenotypeRecord {
        id: marker_id,
        calls,
    }))
}

/// Load a VCF (plain, gzip/bgzip, or `-` for stdin) into a samples × markers
/// genotype matrix. Encoding: 0/0 -> 0, 0/1 -> 1, 1/1 -> 2, ./. -> -1.
pub fn load_vcf<P: AsRef<Path>>(path: P, config: &VcfReadConfig) -> Result<GenotypeMatrix> {
    let path = path.as_ref();
    let mut reader = vcf_reader(path)?;
    let mut line = String::with_capacity(8192);
    let mut line_no = 0usize;
    let mut sample_ids: Option<Vec<String>> = None;
    let mut records: Vec<GenotypeRecord> = Vec::new();
    let mut skipped = 0usize;

    loop {
        line.clear();
        let bytes = reader.read_line(&mut line)?;
        if bytes == 0 {
            break;
        }
        line_no += 1;
        let trimmed = line.trim_end_matches(&['\n', '\r'][..]);
        if trimmed.is_empty() || trimmed.starts_with("##") {
            continue;
        }
        if trimmed.starts_with("#CHROM") {
            let mut header_fields = trimmed.split('\t');
            if header_fields.by_ref().take(9).count() < 9 {
                return Err(AdmixError::parse(line_no, "Header has fewer than 9 columns"));
            }
            let names: Vec<String> = header_fields.map(|s| s.to_string()).collect();
            let expected_line_size = 100 + names.len() * 4;
            if expected_line_size > line.capacity() {
                line.reserve(expected_line_size - line.capacity());
            }
            sample_ids = Some(names);
            continue;
        }

        let Some(names) = sample_ids.as_ref() else {
            return Err(AdmixError::vcf(format!(
                "Data line {} appears before the #CHROM header",
                line_no
            )));
        };
        match parse_record_line(trimmed, line_no, names.len(), config)? {
            Some(rec) => records.push(rec),
            None => skipped += 1,
        }
    }

    let sample_ids = sample_ids
        .ok_or_else(|| AdmixError::vcf(format!("No #CHROM header in {}", path.display())))?;
    if sample_ids.is_empty() {
        return Err(AdmixError::vcf(format!("No samples in {}", path.display())));
    }
    if records.is_empty() {
        return Err(AdmixError::vcf(format!(
            "No usable markers in {}",
            path.display()
        )));
    }
    if skipped > 0 {
        warn!("Skipped {} markers in {}", skipped, path.display());
    }

    let n_samples = sample_ids.len();
    let n_markers = records.len();
    // Records are marker-major; the matrix is sample-major.
    let genotypes = Array2::from_shape_fn((n_samples, n_markers), |(i, j)| records[j].calls[i]);
    let marker_ids = records.into_iter().map(|r| r.id).collect();

    let geno = GenotypeMatrix::new(sample_ids, marker_ids, genotypes)?;
    debug!(
        "Loaded {} samples x {} markers ({:.2}% missing)",
        geno.n_samples(),
        geno.n_markers(),
        100.0 * geno.missing_rate()
    );
    Ok(geno)
}
