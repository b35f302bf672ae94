//! The particle reordering produced by a spatial sort.

use crate::error::SortError;

/// A bijection from new particle index to old particle index.
///
/// Covers only the range that was sorted (`0..len()`, the local
/// particles); rows past that range are never touched by
/// [`apply_rows`](Self::apply_rows). Every field relocated during one
/// sort must be relocated by the same `Permutation`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Permutation {
    new_to_old: Vec<usize>,
}

impl Permutation {
    /// The identity permutation over `n` particles.
    pub fn identity(n: usize) -> Self {
        Self {
            new_to_old: (0..n).collect(),
        }
    }

    /// Build a permutation from a new-to-old index map.
    ///
    /// Returns [`SortError::InvalidPermutation`] if `new_to_old` is not a
    /// bijection over `0..new_to_old.len()`.
    pub fn from_new_to_old(new_to_old: Vec<usize>) -> Result<Self, SortError> {
        if !is_bijection(&new_to_old) {
            return Err(SortError::InvalidPermutation {
                len: new_to_old.len(),
            });
        }
        Ok(Self { new_to_old })
    }

    /// Number of particles covered.
    pub fn len(&self) -> usize {
        self.new_to_old.len()
    }

    /// Returns `true` if the permutation covers no particle.
    pub fn is_empty(&self) -> bool {
        self.new_to_old.is_empty()
    }

    /// Old index of the particle that moves to new index `new`.
    pub fn source_of(&self, new: usize) -> usize {
        self.new_to_old[new]
    }

    /// The new-to-old map as a slice.
    pub fn as_slice(&self) -> &[usize] {
        &self.new_to_old
    }

    /// Whether this permutation leaves every particle in place.
    pub fn is_identity(&self) -> bool {
        self.new_to_old.iter().enumerate().all(|(i, &o)| i == o)
    }

    /// The old-to-new map.
    pub fn inverse(&self) -> Vec<usize> {
        let mut old_to_new = vec![0; self.new_to_old.len()];
        for (new, &old) in self.new_to_old.iter().enumerate() {
            old_to_new[old] = new;
        }
        old_to_new
    }

    /// Reorder the first `len()` rows of a row-major buffer with `cols`
    /// elements per row so that new row `j` holds old row `source_of(j)`.
    ///
    /// # Panics
    ///
    /// Panics if `data` holds fewer than `len() * cols` elements.
    pub fn apply_rows<T: Copy>(&self, data: &mut [T], cols: usize) {
        let n = self.new_to_old.len() * cols;
        assert!(
            data.len() >= n,
            "buffer of {} elements cannot hold {} rows of {cols}",
            data.len(),
            self.new_to_old.len()
        );
        if cols == 0 || self.is_empty() {
            return;
        }
        let old: Vec<T> = data[..n].to_vec();
        for (new, dst) in data[..n].chunks_exact_mut(cols).enumerate() {
            let src = self.new_to_old[new] * cols;
            dst.copy_from_slice(&old[src..src + cols]);
        }
    }
}

/// Whether `map` is a bijection over `0..map.len()`.
pub fn is_bijection(map: &[usize]) -> bool {
    let mut seen = vec![false; map.len()];
    for &i in map {
        match seen.get_mut(i) {
            Some(s) if !*s => *s = true,
            _ => return false,
        }
    }
    true
}
