use crc::crc32;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Sample k elements from `pool` uniformly with replacement.
pub fn with_replacement<T: Copy, R: Rng>(pool: &[T], k: usize, rng: &mut R) -> Vec<T> {
    if pool.is_empty() {
        return Vec::new();
    }
    (0 .. k).map(|_| pool[rng.gen_range(0 .. pool.len())]).collect()
}

/// Random number generator for one gene.
///
/// With a base seed, the generator is seeded by the seed combined with the CRC32
/// hash of the gene name, so that results do not depend on how genes are
/// distributed across workers.
pub fn gene_rng(seed: Option<u64>, gene: &str) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s ^ crc32::checksum_ieee(gene.as_bytes()) as u64),
        None => StdRng::from_entropy(),
    }
}
