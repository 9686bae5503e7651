//! External collaborators consulted by the handlers: leader election,
//! data-URI streaming, and webhooks. All are trait seams with small
//! defaults for deployments that don't wire them.

use bytes::Bytes;

use tether_core::model::MetaData;

// ── Leader ────────────────────────────────────────────────────────────────────

/// Leader-election facility. Only the elected CSS leader may accept
/// mid-stream chunks; everything else is free of this constraint.
pub trait Leader: Send + Sync {
    fn is_leader(&self) -> bool;
}

/// Single-node deployments are always the leader.
pub struct AlwaysLeader;

impl Leader for AlwaysLeader {
    fn is_leader(&self) -> bool {
        true
    }
}

// ── Data URI ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, thiserror::Error)]
pub enum DataUriError {
    #[error("no data-URI sink configured")]
    NoSink,
    #[error("data-URI I/O failed: {0}")]
    Io(String),
}

/// Streaming sink/source for objects whose payload lives behind a URI
/// rather than in the store.
pub trait DataUriSink: Send + Sync {
    fn append_data(
        &self,
        uri: &str,
        data: &[u8],
        offset: i64,
        total_size: i64,
        is_first: bool,
        is_last: bool,
    ) -> Result<(), DataUriError>;

    /// Read up to `max_len` bytes at `offset`. The flag reports end of data.
    fn get_data_chunk(
        &self,
        uri: &str,
        max_len: usize,
        offset: i64,
    ) -> Result<(Bytes, bool), DataUriError>;
}

/// Refuses all data-URI traffic. Metadata carrying a data URI cannot be
/// transferred through a node wired with this sink.
pub struct NoDataUri;

impl DataUriSink for NoDataUri {
    fn append_data(
        &self,
        _uri: &str,
        _data: &[u8],
        _offset: i64,
        _total_size: i64,
        _is_first: bool,
        _is_last: bool,
    ) -> Result<(), DataUriError> {
        Err(DataUriError::NoSink)
    }

    fn get_data_chunk(
        &self,
        _uri: &str,
        _max_len: usize,
        _offset: i64,
    ) -> Result<(Bytes, bool), DataUriError> {
        Err(DataUriError::NoSink)
    }
}

// ── Webhooks ──────────────────────────────────────────────────────────────────

/// Fired after the last chunk of an object lands. Dispatch is
/// fire-and-forget; failures are the implementation's problem.
pub trait Webhooks: Send + Sync {
    fn object_received(&self, meta: &MetaData);
}

pub struct NoopWebhooks;

impl Webhooks for NoopWebhooks {
    fn object_received(&self, _meta: &MetaData) {}
}
