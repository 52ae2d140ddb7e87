//! Downloading one course: resolve it, fetch its documents, write them out.
//!
//! - [`CourseCatalog`] resolves a course title into a [`CourseListing`],
//!   which enumerates one job per document
//! - [`DocumentFetcher`] fetches a single document
//! - [`JsonDirSink`] lays the results out under the output directory
//!
//! [`download_course`] wires the three into an [`Orchestrator`] run.

pub mod fetcher;
pub mod sink;


use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api::{ApiClient, Course, Courses, Lessons};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::pipeline::{Catalog, Orchestrator};
use crate::types::{Job, RunReport};

pub use fetcher::DocumentFetcher;
pub use sink::JsonDirSink;

/// Looks courses up on the platform
pub struct CourseCatalog {
    client: Arc<ApiClient>,
}

impl CourseCatalog {
    /// Create a catalog backed by `client`
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Resolve a course by its exact title.
    ///
    /// Fetches the course list and the course's lessons.
    ///
    /// # Errors
    /// - [`Error::NotFound`] if no single-course product has this title
    /// - [`Error::Catalog`] if the product lists no inner course ID
    /// - [`Error::Fetch`] if either request fails
    pub async fn resolve(&self, title: &str) -> Result<CourseListing> {
        let courses = self
            .client
            .get_courses()
            .await
            .map_err(|source| Error::Fetch {
                job: "course list".into(),
                source,
            })?;

        let course = courses
            .course_by_title(title)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("no course titled '{}'", title)))?;

        let course_id = course.courses.first().cloned().ok_or_else(|| {
            Error::Catalog(format!("course '{}' does not list a course ID", course.title))
        })?;

        let lessons = self
            .client
            .get_lessons(&course.slug)
            .await
            .map_err(|source| Error::Fetch {
                job: format!("lessons of {}", course.slug),
                source,
            })?;

        let listing = CourseListing {
            courses,
            course,
            course_id,
            lessons,
        };
        info!(
            course = %listing.course.title,
            slug = %listing.course.slug,
            lessons = listing.lessons.data.len(),
            documents = listing.lessons.documents().count(),
            "course resolved"
        );
        Ok(listing)
    }
}

/// A resolved course with everything needed to download it
#[derive(Clone, Debug)]
pub struct CourseListing {
    /// Full course list, saved alongside the course
    pub courses: Courses,
    /// The selected course product
    pub course: Course,
    /// Course ID the document endpoint expects
    pub course_id: String,
    /// Lessons of the course
    pub lessons: Lessons,
}

impl CourseListing {
    /// One job per document of every lesson, in lesson order
    pub fn jobs(&self) -> Vec<Job> {
        self.lessons
            .documents()
            .map(|doc| Job::new(doc.document_id.clone(), self.course_id.clone()))
            .collect()
    }
}

#[async_trait::async_trait]
impl Catalog for CourseListing {
    type Job = Job;

    async fn list_jobs(&self) -> Result<Vec<Job>> {
        Ok(self.jobs())
    }
}

/// Download the course titled `title` into `config.output.dir`.
///
/// Cancelling `shutdown` stops the run; a cancelled run returns
/// [`Error::Cancelled`] and writes nothing.
pub async fn download_course(
    config: &Config,
    title: &str,
    shutdown: CancellationToken,
) -> Result<RunReport> {
    config.validate()?;
    let client = Arc::new(ApiClient::new(&config.api)?);

    let catalog = CourseCatalog::new(Arc::clone(&client));
    let listing = tokio::select! {
        biased;
        _ = shutdown.cancelled() => return Err(Error::Cancelled),
        listing = catalog.resolve(title) => Arc::new(listing?),
    };

    let fetcher = Arc::new(DocumentFetcher::new(client));
    let sink = JsonDirSink::new(config.output.dir.clone(), Arc::clone(&listing));

    Orchestrator::new(listing, fetcher, sink, config.pipeline.clone())
        .with_shutdown(shutdown)
        .run()
        .await
}
