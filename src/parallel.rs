use rayon::prelude::*;
use std::sync::OnceLock;

const PAR_THRESHOLD_DEFAULT: usize = 262_144;
const PAR_MIN_WORK_PER_THREAD: usize = 4096;

fn parallel_threshold() -> usize {
    static THRESHOLD: OnceLock<usize> = OnceLock::new();
    *THRESHOLD.get_or_init(|| {
        std::env::var("FDM_PAR_THRESHOLD")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(PAR_THRESHOLD_DEFAULT)
    })
}

pub(crate) fn should_parallel(len: usize) -> bool {
    if len < parallel_threshold() {
        return false;
    }
    let threads = rayon::current_num_threads().max(1);
    len / threads >= PAR_MIN_WORK_PER_THREAD
}

/// Row-major `(x, y)` traversal of a flat buffer, fanned out to the rayon
/// pool once the buffer is large enough.
pub(crate) fn for_each_indexed<T: Send>(
    data: &mut [T],
    width: usize,
    f: impl Fn(usize, usize, &mut T) + Sync,
) {
    if width == 0 {
        return;
    }
    if should_parallel(data.len()) {
        data.par_iter_mut().enumerate().for_each(|(i, value)| {
            f(i % width, i / width, value);
        });
    } else {
        for (i, value) in data.iter_mut().enumerate() {
            f(i % width, i / width, value);
        }
    }
}

pub(crate) fn for_each_enumerated<T: Send>(data: &mut [T], f: impl Fn(usize, &mut T) + Sync) {
    if should_parallel(data.len()) {
        data.par_iter_mut().enumerate().for_each(|(i, value)| f(i, value));
    } else {
        for (i, value) in data.iter_mut().enumerate() {
            f(i, value);
        }
    }
}

pub(crate) fn sum_indexed(len: usize, f: impl Fn(usize) -> f64 + Sync + Send) -> f64 {
    if should_parallel(len) {
        (0..len).into_par_iter().map(f).sum()
    } else {
        (0..len).map(f).sum()
    }
}

pub(crate) fn max_indexed(len: usize, f: impl Fn(usize) -> f64 + Sync + Send) -> f64 {
    if should_parallel(len) {
        (0..len).into_par_iter().map(f).reduce(|| 0.0_f64, f64::max)
    } else {
        (0..len).map(f).fold(0.0_f64, f64::max)
    }
}
