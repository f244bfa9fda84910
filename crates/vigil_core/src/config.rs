//! Runtime configuration for scope trees.

/// Default iteration budget of a digest.
pub const DEFAULT_DIGEST_TTL: usize = 10;

/// Settings shared by every scope of one tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Maximum number of dirty passes a digest may run before it fails with
    /// [`VigilError::UnstableDigest`](crate::error::VigilError::UnstableDigest).
    pub digest_ttl: usize,
    /// Whether faults isolated inside watchers, listeners and queued tasks
    /// are reported through `tracing::error!`.
    pub log_callback_errors: bool,
}

impl RuntimeConfig {
    /// Sets [`digest_ttl`](Self::digest_ttl).  A budget of zero is raised to
    /// one so a digest always runs at least one pass.
    pub fn with_digest_ttl(mut self, ttl: usize) -> Self {
        self.digest_ttl = ttl.max(1);
        self
    }

    /// Sets [`log_callback_errors`](Self::log_callback_errors).
    pub fn with_log_callback_errors(mut self, enabled: bool) -> Self {
        self.log_callback_errors = enabled;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            digest_ttl: DEFAULT_DIGEST_TTL,
            log_callback_errors: true,
        }
    }
}
