//! Sink that writes a course as a tree of JSON files
//!
//! ```text
//! <root>/
//!     courses.json
//!     <course slug>/
//!         lessons.json
//!         documents/
//!             <document id>.json
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::api::Document;
use crate::error::SaveError;
use crate::pipeline::Sink;
use crate::utils::{create_dir, json_path, recreate_dir, sanitize_component, write_json};

use super::CourseListing;

/// Writes fetched documents of one course under an output root
pub struct JsonDirSink {
    root: PathBuf,
    listing: Arc<CourseListing>,
}

impl JsonDirSink {
    /// Create a sink writing under `root`
    pub fn new(root: impl Into<PathBuf>, listing: Arc<CourseListing>) -> Self {
        Self {
            root: root.into(),
            listing,
        }
    }

    /// Output root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of the course, named after its slug
    pub fn course_dir(&self) -> PathBuf {
        self.root.join(sanitize_component(&self.listing.course.slug))
    }

    /// Directory holding one file per document
    pub fn documents_dir(&self) -> PathBuf {
        self.course_dir().join("documents")
    }
}

#[async_trait::async_trait]
impl Sink for JsonDirSink {
    type Item = Document;

    /// Write the course list and lessons, and start the course directory from scratch
    async fn prepare(&self) -> Result<(), SaveError> {
        create_dir(&self.root).await?;
        write_json(&self.root.join("courses.json"), &self.listing.courses).await?;

        let course_dir = self.course_dir();
        recreate_dir(&course_dir).await?;
        create_dir(&self.documents_dir()).await?;
        write_json(&course_dir.join("lessons.json"), &self.listing.lessons).await?;

        info!(dir = %course_dir.display(), "course directory prepared");
        Ok(())
    }

    async fn save(&self, document: &Document) -> Result<(), SaveError> {
        let path = json_path(&self.documents_dir(), document.id().unwrap_or_default());
        write_json(&path, document).await?;
        debug!(path = %path.display(), "document saved");
        Ok(())
    }
}
