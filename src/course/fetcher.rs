//! Fetcher for course documents

use std::sync::Arc;

use tracing::debug;

use crate::api::{ApiClient, Document};
use crate::error::FetchError;
use crate::pool::Fetcher;
use crate::types::Job;

/// Fetches one document per job through the course API
pub struct DocumentFetcher {
    client: Arc<ApiClient>,
}

impl DocumentFetcher {
    /// Create a fetcher sharing `client`
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Fetcher for DocumentFetcher {
    type Job = Job;
    type Item = Document;

    async fn fetch(&self, job: &Job) -> Result<Document, FetchError> {
        let document = self
            .client
            .get_document(&job.reference_id, &job.parent_id)
            .await?;
        debug!(reference = %job.reference_id, id = ?document.id(), "document fetched");
        Ok(document)
    }
}
