use std::ops::Range;

/// A work assignment for one worker, produced by [`plan_hash_band`] or [`plan_row_band`].
///
/// The two variants correspond to the multiplier's two partitioning strategies (see
/// [`crate::multiplier::estimator::Estimate::is_dense`]): a sparse product is split by output
/// hash band so every worker can insert into its own accumulator lock-free, while a dense product
/// is split by input row so the (much smaller) output space can still be merged cheaply at the
/// end instead of paying redundant hash classification on every pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Workgroup {
    /// Worker receives the full `A x B` Cartesian product, but only deposits a product term if
    /// `hash(m_a + m_b) mod capacity` falls in `band`.
    HashBand { band: Range<u64>, capacity: usize },
    /// Worker receives only the rows of `A` in `rows`, crossed with the whole of `B`.
    RowBand { rows: Range<usize> },
}

/// Splits `[0, capacity)` into `worker_count` contiguous, disjoint, union-covering bands.
///
/// Bands are sized as evenly as possible; any remainder (`capacity % worker_count`) is
/// distributed one unit at a time to the first bands, so no band differs from another by more
/// than one. `capacity` is expected to already be a power of two (the accumulator's capacity),
/// but this function does not require it.
pub fn plan_hash_band(worker_count: usize, capacity: usize) -> Vec<Workgroup> {
    assert!(worker_count > 0, "worker_count must be at least 1");
    let base = capacity / worker_count;
    let remainder = capacity % worker_count;
    let mut start = 0u64;
    let mut bands = Vec::with_capacity(worker_count);
    for k in 0..worker_count {
        let width = base + usize::from(k < remainder);
        let end = start + width as u64;
        bands.push(Workgroup::HashBand {
            band: start..end,
            capacity,
        });
        start = end;
    }
    bands
}

/// Splits the row range `[0, a_len)` into `worker_count` contiguous, disjoint, union-covering
/// slices, using the same even-split-with-remainder rule as [`plan_hash_band`].
pub fn plan_row_band(worker_count: usize, a_len: usize) -> Vec<Workgroup> {
    assert!(worker_count > 0, "worker_count must be at least 1");
    let base = a_len / worker_count;
    let remainder = a_len % worker_count;
    let mut start = 0usize;
    let mut rows = Vec::with_capacity(worker_count);
    for k in 0..worker_count {
        let width = base + usize::from(k < remainder);
        let end = start + width;
        rows.push(Workgroup::RowBand { rows: start..end });
        start = end;
    }
    rows
}

/// True iff `hash mod capacity` falls within `band`. Used by the driver's hash-band worker loop
/// to decide, for each candidate product, whether this worker owns it.
pub fn hash_in_band(hash: u64, capacity: usize, band: &Range<u64>) -> bool {
    let bucket = hash % capacity as u64;
    bucket >= band.start && bucket < band.end
}
