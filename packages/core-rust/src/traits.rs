//! Transport seam used by the enqueue adapter.

use async_trait::async_trait;

use crate::entry::OutboundEntry;

/// Outbound side of the queue transport.
/// Implementations own networking, retries and credentials; the core only
/// hands over fully built entries.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a single entry to `destination`.
    async fn send(&self, destination: &str, entry: OutboundEntry) -> anyhow::Result<()>;

    /// Send up to [`MAX_BATCH_SIZE`](crate::batch::MAX_BATCH_SIZE) entries in
    /// one call. Returns how many entries the transport accepted.
    async fn send_batch(
        &self,
        destination: &str,
        entries: Vec<OutboundEntry>,
    ) -> anyhow::Result<usize>;
}
