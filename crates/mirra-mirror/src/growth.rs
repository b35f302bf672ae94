//! Capacity growth for row-major per-particle arrays.
//!
//! [`Mirrored::grow`](crate::Mirrored::grow) covers fields the store owns.
//! [`grow_rows`] gives extension owners the same copy-forward contract for
//! their own host arrays.

use mirra_core::GrowError;

/// Copy the leading `min(src_cols, dst_cols)` elements of each of the
/// first `rows` rows from `src` into `dst`.
pub(crate) fn copy_rows<T: Copy>(
    src: &[T],
    dst: &mut [T],
    src_cols: usize,
    dst_cols: usize,
    rows: usize,
) {
    if src_cols == dst_cols {
        let n = rows * src_cols;
        dst[..n].copy_from_slice(&src[..n]);
        return;
    }
    let keep = src_cols.min(dst_cols);
    for r in 0..rows {
        let s = r * src_cols;
        let d = r * dst_cols;
        dst[d..d + keep].copy_from_slice(&src[s..s + keep]);
    }
}

/// Reallocate `buf` to `new_capacity` rows of `cols` elements, keeping the
/// first `live` rows and filling the rest with `T::default()`.
///
/// Fails if `new_capacity < live`, or if `buf` holds fewer than
/// `live * cols` elements.
pub fn grow_rows<T: Copy + Default>(
    buf: &mut Vec<T>,
    cols: usize,
    live: usize,
    new_capacity: usize,
) -> Result<(), GrowError> {
    if new_capacity < live {
        return Err(GrowError::CapacityBelowCount {
            requested: new_capacity,
            live,
        });
    }
    if cols > 0 && buf.len() < live * cols {
        return Err(GrowError::CapacityBelowCount {
            requested: buf.len() / cols,
            live,
        });
    }
    let mut fresh = vec![T::default(); new_capacity * cols];
    copy_rows(buf, &mut fresh, cols, cols, live);
    *buf = fresh;
    Ok(())
}
