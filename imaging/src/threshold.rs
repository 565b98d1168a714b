use rayon::prelude::*;

/// Amount of samples binarized by a single task.
const CHUNK_SIZE: usize = 16 * 1024;

/// Binarizes `samples` in place: anything above `cutoff` becomes 255, the rest 0.
///
/// Each task counts its own passing samples, the partial counts are only
/// summed once all tasks are done.
///
/// # Returns
/// The amount of samples set to 255.
pub fn binarize(samples: &mut [u8], cutoff: u8) -> u64 {
    samples
        .par_chunks_mut(CHUNK_SIZE)
        .map(|chunk| {
            let mut passed = 0u64;
            for sample in chunk {
                if *sample > cutoff {
                    *sample = 255;
                    passed += 1;
                } else {
                    *sample = 0;
                }
            }

            passed
        })
        .sum()
}
