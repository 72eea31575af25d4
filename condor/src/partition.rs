use std::ops::Range;

use crate::{CondorErr, Result};

/// Amount of chunks a task grid of `shape` is split into.
///
/// Every chunk covers at least `granularity` tasks when possible, and there are
/// never more than `quota` of them.
///
/// # Errors
/// `InvalidArgument` if `quota` or `granularity` is zero.
pub fn guess_chunk_number(shape: &[usize], quota: usize, granularity: usize) -> Result<usize> {
    if quota == 0 {
        return Err(CondorErr::InvalidArgument("the condor quota must be positive".into()));
    }
    if granularity == 0 {
        return Err(CondorErr::InvalidArgument("the granularity must be positive".into()));
    }

    let total: usize = shape.iter().product();
    Ok(total.div_ceil(granularity).clamp(1, quota))
}

/// A contiguous slice of a row-major task grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskChunk {
    shape: Vec<usize>,
    range: Range<usize>,
}

impl TaskChunk {
    /// The flat indices of this chunk.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// The N-dimensional coordinates of every task of the chunk, in order.
    pub fn indices(&self) -> impl Iterator<Item = Vec<usize>> + '_ {
        self.range.clone().map(|flat| unravel(flat, &self.shape))
    }
}

/// Row-major coordinates of the flat index `flat` inside `shape`.
pub fn unravel(mut flat: usize, shape: &[usize]) -> Vec<usize> {
    let mut coords = vec![0; shape.len()];

    for (coord, &dim) in coords.iter_mut().zip(shape).rev() {
        if dim == 0 {
            continue;
        }
        *coord = flat % dim;
        flat /= dim;
    }

    coords
}

/// The `task_id`th of `total_chunks` chunks of the grid `shape`: flat indices
/// `[total * id / n, total * (id + 1) / n)`.
///
/// # Errors
/// `TaskOutOfRange` if `task_id >= total_chunks`.
pub fn get_task_chunk(shape: &[usize], total_chunks: usize, task_id: usize) -> Result<TaskChunk> {
    if task_id >= total_chunks {
        return Err(CondorErr::TaskOutOfRange {
            task_id,
            total_chunks,
        });
    }

    let total = shape.iter().product::<usize>() as u128;
    let bound = |id: usize| (total * id as u128 / total_chunks as u128) as usize;

    Ok(TaskChunk {
        shape: shape.to_vec(),
        range: bound(task_id)..bound(task_id + 1),
    })
}

/// `i` zero padded to the width of `total - 1`, so names sort in index order.
pub fn padded(i: usize, total: usize) -> String {
    let width = total.saturating_sub(1).max(1).ilog10() as usize + 1;
    format!("{i:0width$}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_number_is_bounded_by_quota() {
        assert_eq!(guess_chunk_number(&[10, 100], 8, 10).unwrap(), 8);
        assert_eq!(guess_chunk_number(&[10, 100], 800, 10).unwrap(), 100);
        assert_eq!(guess_chunk_number(&[3, 3], 8, 10).unwrap(), 1);
        assert_eq!(guess_chunk_number(&[0], 8, 10).unwrap(), 1);
        assert_eq!(guess_chunk_number(&[11], 8, 10).unwrap(), 2);
    }

    #[test]
    fn zero_quota_or_granularity_is_an_error() {
        assert!(matches!(
            guess_chunk_number(&[4], 0, 1),
            Err(CondorErr::InvalidArgument(_))
        ));
        assert!(matches!(
            guess_chunk_number(&[4], 1, 0),
            Err(CondorErr::InvalidArgument(_))
        ));
    }

    #[test]
    fn chunks_cover_the_grid_exactly_once_in_order() {
        for shape in [vec![7], vec![3, 5], vec![2, 3, 4], vec![1]] {
            let total: usize = shape.iter().product();

            for chunks in 1..=total + 2 {
                let mut next = 0;
                for id in 0..chunks {
                    let chunk = get_task_chunk(&shape, chunks, id).unwrap();
                    assert_eq!(chunk.range().start, next);
                    next = chunk.range().end;
                }
                assert_eq!(next, total, "shape {shape:?} in {chunks} chunks");
            }
        }
    }

    #[test]
    fn indices_are_row_major() {
        let chunk = get_task_chunk(&[2, 3], 2, 1).unwrap();
        let indices: Vec<_> = chunk.indices().collect();

        assert_eq!(chunk.len(), 3);
        assert_eq!(indices, vec![vec![1, 0], vec![1, 1], vec![1, 2]]);
    }

    #[test]
    fn task_id_past_the_last_chunk_is_an_error() {
        let err = get_task_chunk(&[10], 4, 4).unwrap_err();
        assert!(matches!(
            err,
            CondorErr::TaskOutOfRange {
                task_id: 4,
                total_chunks: 4
            }
        ));
    }

    #[test]
    fn padded_names_sort_in_index_order() {
        assert_eq!(padded(0, 1), "0");
        assert_eq!(padded(3, 10), "3");
        assert_eq!(padded(3, 11), "03");
        assert_eq!(padded(42, 1000), "042");

        let mut names: Vec<_> = (0..120).map(|i| padded(i, 120)).collect();
        let ordered = names.clone();
        names.sort();
        assert_eq!(names, ordered);
    }
}
