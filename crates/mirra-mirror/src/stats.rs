//! Transfer accounting.

use mirra_core::Domain;

/// One completed (or started) copy between domains.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transfer {
    /// Domain the data was copied from.
    pub from: Domain,
    /// Domain the data was copied into.
    pub to: Domain,
    /// Bytes moved.
    pub bytes: usize,
}

/// Cumulative transfer counters for one field or a whole coordinator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Copies into host memory.
    pub to_host: u64,
    /// Copies into device memory.
    pub to_device: u64,
    /// Bytes copied into host memory.
    pub bytes_to_host: u64,
    /// Bytes copied into device memory.
    pub bytes_to_device: u64,
    /// Copies that were started as overlapped transfers.
    pub overlapped: u64,
}

impl TransferStats {
    /// Account for one transfer.
    pub fn record(&mut self, transfer: Transfer) {
        match transfer.to {
            Domain::Host => {
                self.to_host += 1;
                self.bytes_to_host += transfer.bytes as u64;
            }
            Domain::Device => {
                self.to_device += 1;
                self.bytes_to_device += transfer.bytes as u64;
            }
        }
    }

    /// Total number of transfers in either direction.
    pub fn total(&self) -> u64 {
        self.to_host + self.to_device
    }

    /// Field-wise sum of two counters.
    pub fn merged(self, other: Self) -> Self {
        Self {
            to_host: self.to_host + other.to_host,
            to_device: self.to_device + other.to_device,
            bytes_to_host: self.bytes_to_host + other.bytes_to_host,
            bytes_to_device: self.bytes_to_device + other.bytes_to_device,
            overlapped: self.overlapped + other.overlapped,
        }
    }
}
