// src/utils/batch.rs: splitting samples and chromosomal positions into job units

use crate::utils::chromosome::Chromosome;

/// Inclusive, 1-indexed range of samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRange {
    pub from: usize,
    pub to: usize,
}

/// Inclusive base-pair window on a chromosome. `to` may pass the chromosome end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionRange {
    pub chromosome: Chromosome,
    pub from: u64,
    pub to: u64,
}

/// One imputation job: a position window for a range of samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImputationJob {
    pub position: PositionRange,
    pub samples: SampleRange,
}

/// Splits `n` samples into ranges of roughly `chunk_size` samples.
///
/// The stride is `n / (n / chunk_size)` so the samples spread evenly; a tail
/// shorter than one stride is merged into the preceding range.
///
/// # Arguments
///
/// * `n` - Total number of samples.
/// * `chunk_size` - Target number of samples per range (values below 1 are treated as 1).
///
/// # Returns
/// Contiguous ranges covering `[1, n]`.
pub fn sample_chunks(n: usize, chunk_size: usize) -> Vec<SampleRange> {
    if n == 0 {
        return Vec::new();
    }
    let chunk_size = chunk_size.max(1);
    if chunk_size >= n {
        return vec![SampleRange { from: 1, to: n }];
    }

    let ratio = n / (n / chunk_size);
    let mut chunks = Vec::new();
    let mut r = 1;
    loop {
        // n - r - ratio + 1 < ratio, kept unsigned
        if n + 1 < r + 2 * ratio {
            chunks.push(SampleRange { from: r, to: n });
            break;
        }
        chunks.push(SampleRange { from: r, to: r + ratio - 1 });
        r += ratio;
    }
    chunks
}

/// Windows of `stride` base pairs over each chromosome, starting at position 1.
pub fn position_chunks(chromosomes: &[Chromosome], stride: u64) -> Vec<PositionRange> {
    let stride = stride.max(1);
    chromosomes
        .iter()
        .flat_map(|chromosome| {
            let length = chromosome.length_b37();
            (0..length.div_ceil(stride)).map(move |i| {
                let from = 1 + i * stride;
                PositionRange {
                    chromosome: chromosome.clone(),
                    from,
                    to: from + stride - 1,
                }
            })
        })
        .collect()
}

/// Every position window paired with every sample range, positions outermost.
pub fn imputation_jobs(positions: &[PositionRange], samples: &[SampleRange]) -> Vec<ImputationJob> {
    positions
        .iter()
        .flat_map(|position| {
            samples.iter().map(move |range| ImputationJob {
                position: position.clone(),
                samples: *range,
            })
        })
        .collect()
}
