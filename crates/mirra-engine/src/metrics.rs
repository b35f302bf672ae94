//! Cumulative counters for a particle store.
//!
//! [`StoreMetrics`] is a snapshot taken by
//! [`ParticleStore::metrics`](crate::ParticleStore::metrics). Transfer
//! counters cover core fields and mirrored custom properties together.

use mirra_mirror::TransferStats;

/// Counters accumulated since the store was created.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreMetrics {
    /// Copies into host memory.
    pub transfers_to_host: u64,
    /// Copies into device memory.
    pub transfers_to_device: u64,
    /// Bytes copied into host memory.
    pub bytes_to_host: u64,
    /// Bytes copied into device memory.
    pub bytes_to_device: u64,
    /// Transfers started through `overlapped_ensure_valid`.
    pub overlapped_transfers: u64,
    /// Sorts that produced and applied a permutation.
    pub sorts: u64,
    /// Sorts skipped because the grid had a single bin.
    pub sorts_skipped: u64,
    /// Of `sorts`, how many ran on the host.
    pub host_sorts: u64,
    /// Downgrades from device to host sorting (at most one per run).
    pub downgrades: u64,
    /// Capacity growth events.
    pub grow_events: u64,
    /// Custom properties added.
    pub custom_added: u64,
    /// Custom properties removed.
    pub custom_removed: u64,
}

impl StoreMetrics {
    pub(crate) fn with_transfers(mut self, stats: TransferStats) -> Self {
        self.transfers_to_host = stats.to_host;
        self.transfers_to_device = stats.to_device;
        self.bytes_to_host = stats.bytes_to_host;
        self.bytes_to_device = stats.bytes_to_device;
        self.overlapped_transfers = stats.overlapped;
        self
    }

    /// Total transfers in either direction.
    pub fn transfers(&self) -> u64 {
        self.transfers_to_host + self.transfers_to_device
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = StoreMetrics::default();
        assert_eq!(m.transfers(), 0);
        assert_eq!(m.sorts, 0);
        assert_eq!(m.downgrades, 0);
        assert_eq!(m.custom_added, 0);
    }

    #[test]
    fn transfer_counters_come_from_stats() {
        let stats = TransferStats {
            to_host: 3,
            to_device: 4,
            bytes_to_host: 24,
            bytes_to_device: 32,
            overlapped: 1,
        };
        let m = StoreMetrics {
            sorts: 2,
            ..StoreMetrics::default()
        }
        .with_transfers(stats);
        assert_eq!(m.transfers(), 7);
        assert_eq!(m.bytes_to_device, 32);
        assert_eq!(m.overlapped_transfers, 1);
        assert_eq!(m.sorts, 2);
    }
}
