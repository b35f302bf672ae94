//! The mirrored field: one named per-particle buffer, one copy per domain.

use std::fmt;

use mirra_core::{Domain, GrowError, Permutation};

use crate::growth::copy_rows;
use crate::overlap::InFlight;
use crate::stats::{Transfer, TransferStats};

/// Element types a mirrored field can hold.
pub trait Element: Copy + Default + Send + Sync + 'static {}

impl<T: Copy + Default + Send + Sync + 'static> Element for T {}

/// Whether a field's rows are per particle or per something else.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldScope {
    /// One row per particle slot. Grown with particle capacity and
    /// relocated by sorts.
    PerParticle,
    /// A fixed table (for example one row per particle type). Never grown
    /// with particle capacity and never relocated.
    Table,
}

/// A named row-major buffer replicated across `N` memory domains.
///
/// `N = 2` ([`DualField`]) is the normal host + device layout. `N = 1`
/// ([`HostField`]) is a single allocation that serves both domains, so
/// every sync is a no-op; it is used where the device aliases host
/// memory or for data that never leaves the host.
///
/// The modified flags are only changed through [`modify`](Self::modify),
/// [`sync`](Self::sync) and the growth operations. Writing through
/// [`view_mut`](Self::view_mut) does not mark anything: callers pair the
/// write with a `modify` of the same domain.
pub struct Mirrored<T, const N: usize> {
    name: String,
    scope: FieldScope,
    cols: usize,
    len: usize,
    capacity: usize,
    copies: [Vec<T>; N],
    modified: [bool; N],
    last_modified: usize,
    stats: TransferStats,
    in_flight: Option<InFlight<T>>,
}

/// Host + device copies.
pub type DualField<T> = Mirrored<T, 2>;

/// A single copy shared by both domains.
pub type HostField<T> = Mirrored<T, 1>;

impl<T: Element, const N: usize> Mirrored<T, N> {
    /// Allocate a field with `capacity` rows of `cols` elements in every
    /// domain. All copies start zeroed (`T::default()`) and consistent.
    pub fn new(name: impl Into<String>, scope: FieldScope, cols: usize, capacity: usize) -> Self {
        Self::with_live_rows(name, scope, cols, capacity, 0)
    }

    /// Like [`new`](Self::new), with the first `len` rows already live.
    /// Allocates `max(capacity, len)` rows.
    pub fn with_live_rows(
        name: impl Into<String>,
        scope: FieldScope,
        cols: usize,
        capacity: usize,
        len: usize,
    ) -> Self {
        let capacity = capacity.max(len);
        let elems = capacity * cols;
        Self {
            name: name.into(),
            scope,
            cols,
            len,
            capacity,
            copies: std::array::from_fn(|_| vec![T::default(); elems]),
            modified: [false; N],
            last_modified: 0,
            stats: TransferStats::default(),
            in_flight: None,
        }
    }

    fn slot(domain: Domain) -> usize {
        domain.index().min(N - 1)
    }

    fn domain_of(slot: usize) -> Domain {
        if N == 1 || slot == 0 {
            Domain::Host
        } else {
            Domain::Device
        }
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether rows are per particle.
    pub fn scope(&self) -> FieldScope {
        self.scope
    }

    /// Elements per row.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of live rows.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no row is live.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocated rows per domain.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes in one domain's allocation.
    pub fn allocation_bytes(&self) -> usize {
        self.capacity * self.cols * std::mem::size_of::<T>()
    }

    /// Cumulative transfer counters for this field.
    pub fn stats(&self) -> TransferStats {
        self.stats
    }

    /// Whether `domain` holds a write the other domain has not seen.
    pub fn is_modified(&self, domain: Domain) -> bool {
        self.modified[Self::slot(domain)]
    }

    /// Whether an overlapped transfer has not been joined yet.
    pub fn in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Set the number of live rows.
    ///
    /// Fails if `len` exceeds the allocated capacity.
    pub fn set_len(&mut self, len: usize) -> Result<(), GrowError> {
        if len > self.capacity {
            return Err(GrowError::CapacityBelowCount {
                requested: self.capacity,
                live: len,
            });
        }
        self.len = len;
        Ok(())
    }

    /// The live rows of `domain`'s copy.
    ///
    /// # Panics
    ///
    /// Panics if an overlapped transfer is in flight; use
    /// [`view_mut`](Self::view_mut) or [`join`](Self::join) first.
    pub fn view(&self, domain: Domain) -> &[T] {
        &self.allocation(domain)[..self.len * self.cols]
    }

    /// The whole allocation of `domain`'s copy, including rows past `len()`.
    ///
    /// # Panics
    ///
    /// Panics if an overlapped transfer is in flight.
    pub fn allocation(&self, domain: Domain) -> &[T] {
        assert!(
            self.in_flight.is_none(),
            "field '{}' read while an overlapped transfer is in flight",
            self.name
        );
        &self.copies[Self::slot(domain)]
    }

    /// Mutable live rows of `domain`'s copy. Joins any in-flight transfer.
    pub fn view_mut(&mut self, domain: Domain) -> &mut [T] {
        self.join();
        let n = self.len * self.cols;
        &mut self.copies[Self::slot(domain)][..n]
    }

    /// One live row of `domain`'s copy.
    pub fn row(&self, domain: Domain, index: usize) -> &[T] {
        let start = index * self.cols;
        &self.view(domain)[start..start + self.cols]
    }

    /// Record that `domain` was just written.
    pub fn modify(&mut self, domain: Domain) {
        self.join();
        let s = Self::slot(domain);
        self.modified[s] = true;
        self.last_modified = s;
    }

    /// Bring `domain`'s copy up to date.
    ///
    /// If another domain is marked modified, copies it into `domain` and
    /// clears that domain's flag. Returns the transfer performed, or
    /// `None` if `domain` already held the newest data.
    pub fn sync(&mut self, domain: Domain) -> Option<Transfer> {
        self.join();
        let dst = Self::slot(domain);
        let src = self.stale_source(dst)?;
        copy_between(&mut self.copies, src, dst);
        self.modified[src] = false;
        let transfer = Transfer {
            from: Self::domain_of(src),
            to: domain,
            bytes: self.allocation_bytes(),
        };
        self.stats.record(transfer);
        tracing::trace!(
            field = %self.name,
            from = %transfer.from,
            to = %transfer.to,
            bytes = transfer.bytes,
            "transfer"
        );
        Some(transfer)
    }

    /// Like [`sync`](Self::sync), but runs the copy on a worker thread.
    ///
    /// The flags are updated immediately, as if the copy had completed.
    /// The copy is joined by the next operation that touches the field.
    pub fn begin_sync(&mut self, domain: Domain) -> Option<Transfer> {
        self.join();
        let dst = Self::slot(domain);
        let src = self.stale_source(dst)?;
        let src_buf = std::mem::take(&mut self.copies[src]);
        let dst_buf = std::mem::take(&mut self.copies[dst]);
        self.in_flight = Some(InFlight::start(src, dst, src_buf, dst_buf));
        self.modified[src] = false;
        let transfer = Transfer {
            from: Self::domain_of(src),
            to: domain,
            bytes: self.allocation_bytes(),
        };
        self.stats.record(transfer);
        self.stats.overlapped += 1;
        tracing::trace!(
            field = %self.name,
            from = %transfer.from,
            to = %transfer.to,
            bytes = transfer.bytes,
            "overlapped transfer started"
        );
        Some(transfer)
    }

    /// Wait for an in-flight transfer and put its buffers back.
    ///
    /// Returns `true` if there was one to join.
    pub fn join(&mut self) -> bool {
        match self.in_flight.take() {
            Some(job) => {
                let (src, dst) = (job.src, job.dst);
                let (src_buf, dst_buf) = job.join();
                self.copies[src] = src_buf;
                self.copies[dst] = dst_buf;
                true
            }
            None => false,
        }
    }

    /// Whether an in-flight transfer has finished.
    pub fn transfer_ready(&self) -> bool {
        self.in_flight.as_ref().is_none_or(InFlight::is_ready)
    }

    fn stale_source(&self, dst: usize) -> Option<usize> {
        (0..N).find(|&s| s != dst && self.modified[s])
    }

    /// Make every copy hold the newest data and clear all flags.
    fn settle(&mut self) {
        if N == 1 {
            self.modified = [false; N];
            return;
        }
        let newest = if self.modified[self.last_modified] {
            Some(self.last_modified)
        } else {
            (0..N).find(|&s| self.modified[s])
        };
        if let Some(src) = newest {
            for dst in (0..N).filter(|&d| d != src) {
                copy_between(&mut self.copies, src, dst);
                let transfer = Transfer {
                    from: Self::domain_of(src),
                    to: Self::domain_of(dst),
                    bytes: self.allocation_bytes(),
                };
                self.stats.record(transfer);
            }
        }
        self.modified = [false; N];
    }

    /// Reallocate every copy to `new_capacity` rows.
    ///
    /// Pending writes are first propagated so no domain loses data, the
    /// live rows are copied forward into fresh allocations, and all flags
    /// end clear (every copy valid).
    pub fn grow(&mut self, new_capacity: usize) -> Result<(), GrowError> {
        if self.in_flight.is_some() {
            return Err(GrowError::TransferInFlight {
                field: self.name.clone(),
            });
        }
        if new_capacity < self.len {
            return Err(GrowError::CapacityBelowCount {
                requested: new_capacity,
                live: self.len,
            });
        }
        self.settle();
        let mut fresh = vec![T::default(); new_capacity * self.cols];
        copy_rows(&self.copies[0], &mut fresh, self.cols, self.cols, self.len);
        let old_capacity = self.capacity;
        self.copies = std::array::from_fn(|_| fresh.clone());
        self.capacity = new_capacity;
        tracing::debug!(
            field = %self.name,
            old_capacity,
            new_capacity,
            "field grown"
        );
        Ok(())
    }

    /// Change the number of columns, keeping the leading
    /// `min(old, new)` columns of every allocated row.
    pub fn reshape_columns(&mut self, new_cols: usize) -> Result<(), GrowError> {
        if new_cols == 0 {
            return Err(GrowError::InvalidColumns {
                field: self.name.clone(),
                cols: new_cols,
            });
        }
        if self.in_flight.is_some() {
            return Err(GrowError::TransferInFlight {
                field: self.name.clone(),
            });
        }
        self.settle();
        let mut fresh = vec![T::default(); self.capacity * new_cols];
        copy_rows(&self.copies[0], &mut fresh, self.cols, new_cols, self.capacity);
        self.copies = std::array::from_fn(|_| fresh.clone());
        self.cols = new_cols;
        Ok(())
    }

    /// Reorder the live rows of `domain`'s copy by `permutation`.
    ///
    /// Only the first `permutation.len()` rows move. Does not change the
    /// flags; the caller marks `domain` modified afterwards.
    pub fn permute(&mut self, permutation: &Permutation, domain: Domain) {
        self.join();
        let cols = self.cols;
        permutation.apply_rows(&mut self.copies[Self::slot(domain)], cols);
    }
}

impl<T: Element, const N: usize> fmt::Debug for Mirrored<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mirrored")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("cols", &self.cols)
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .field("modified", &self.modified)
            .field("in_flight", &self.in_flight.is_some())
            .finish()
    }
}

fn copy_between<T: Copy>(copies: &mut [Vec<T>], src: usize, dst: usize) {
    if src < dst {
        let (lo, hi) = copies.split_at_mut(dst);
        hi[0].copy_from_slice(&lo[src]);
    } else {
        let (lo, hi) = copies.split_at_mut(src);
        lo[dst].copy_from_slice(&hi[0]);
    }
}
