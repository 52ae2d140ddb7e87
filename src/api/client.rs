//! Course platform HTTP client

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::ApiConfig;
use crate::error::{Error, FetchError, Result};

use super::models::{Courses, Document, Lessons};

/// Typed access to the course platform's JSON endpoints
///
/// Cheap to share behind an `Arc`; the underlying `reqwest::Client` pools
/// connections across concurrent requests.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    build_id: String,
}

impl ApiClient {
    /// Create a client for the endpoint described by `config`
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the base URL is not an absolute HTTP(S)
    /// URL, or [`Error::Network`] if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            Error::config(
                format!("invalid base URL '{}': {}", config.base_url, e),
                "api.base_url",
            )
        })?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::config(
                format!("base URL '{}' must be an http(s) URL", config.base_url),
                "api.base_url",
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            http,
            base_url,
            build_id: config.build_id.clone(),
        })
    }

    /// Base URL every endpoint is resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch the list of every course product
    pub async fn get_courses(&self) -> std::result::Result<Courses, FetchError> {
        let url = self.endpoint(&["_next", "data", self.build_id.as_str(), "en", "courses.json"]);
        self.get_json(url).await
    }

    /// Fetch the lessons of the course with the given slug
    pub async fn get_lessons(&self, slug: &str) -> std::result::Result<Lessons, FetchError> {
        let url = self.endpoint(&["api", "course", "getLessonsList", slug]);
        self.get_json(url).await
    }

    /// Fetch one document of a course
    ///
    /// A body that decodes but carries no document ID is rejected with
    /// [`FetchError::MissingField`]: it could not be stored under its ID.
    pub async fn get_document(
        &self,
        document_id: &str,
        course_id: &str,
    ) -> std::result::Result<Document, FetchError> {
        let mut url = self.endpoint(&["api", "document", document_id]);
        url.query_pairs_mut().append_pair("courseId", course_id);

        let document: Document = self.get_json(url.clone()).await?;
        if document.id().is_none() {
            return Err(FetchError::MissingField {
                url: url.to_string(),
                field: "data.doc._id",
            });
        }
        Ok(document)
    }

    /// Append percent-encoded path segments to the base URL
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // new() rejects cannot-be-a-base URLs, so this always succeeds
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> std::result::Result<T, FetchError> {
        let url_text = url.to_string();
        debug!(url = %url_text, "GET");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url_text.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url_text,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::Transport {
                url: url_text.clone(),
                source,
            })?;

        serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
            url: url_text,
            source,
        })
    }
}
