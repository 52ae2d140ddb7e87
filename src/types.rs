//! Core types for course-dl

use serde::{Deserialize, Serialize};

/// One unit of retrieval work
///
/// A job names a remote resource by its opaque reference ID together with the
/// parent context the fetcher needs to resolve it (for course documents, the
/// course the document belongs to).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Job {
    /// Opaque ID of the resource to fetch
    pub reference_id: String,
    /// ID of the parent context the resource is fetched under
    pub parent_id: String,
}

impl Job {
    /// Create a new job
    pub fn new(reference_id: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self {
            reference_id: reference_id.into(),
            parent_id: parent_id.into(),
        }
    }
}

impl std::fmt::Display for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (parent {})", self.reference_id, self.parent_id)
    }
}

/// Summary of a completed pipeline run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Jobs produced by the catalog
    pub jobs: usize,
    /// Items fetched successfully
    pub fetched: usize,
    /// Items the sink stored
    pub saved: usize,
    /// Items the sink failed to store
    pub save_failures: usize,
}

/// Events emitted by the orchestrator
///
/// Consumers subscribe via [`Orchestrator::subscribe`](crate::pipeline::Orchestrator::subscribe).
/// Events are best-effort: a run never waits for slow subscribers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The catalog produced the job list
    JobsEnumerated {
        /// Number of jobs about to be submitted
        count: usize,
    },

    /// An item was drained from the pool
    ItemFetched {
        /// Position of the item in drain order (0-based)
        index: usize,
    },

    /// The sink stored an item
    ItemSaved {
        /// Position of the item in drain order (0-based)
        index: usize,
    },

    /// The sink failed to store an item (non-fatal)
    SaveFailed {
        /// Position of the item in drain order (0-based)
        index: usize,
        /// Error message
        error: String,
    },

    /// The run finished and every fetched item was handed to the sink
    Completed {
        /// Final counts
        report: RunReport,
    },

    /// The run failed
    Failed {
        /// Error message naming the first failing job
        error: String,
    },
}
