//! Response bodies of the course platform API
//!
//! Only the fields the downloader reads are typed. Everything else lands in
//! each struct's `extra` map and is written back out unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of the statically generated course list page
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Courses {
    /// Page data
    #[serde(rename = "pageProps")]
    pub page_props: PageProps,

    /// Remaining fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Courses {
    /// Find a single-course product by its exact title
    pub fn course_by_title(&self, title: &str) -> Option<&Course> {
        self.page_props
            .single_course
            .iter()
            .find(|course| course.title == title)
    }
}

/// Product lists of the course page
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PageProps {
    /// Products that wrap exactly one course
    #[serde(rename = "singleCourse")]
    pub single_course: Vec<Course>,

    /// Remaining fields (path courses, bundles, subscriptions, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A purchasable course product
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Course {
    /// Product ID
    #[serde(rename = "_id")]
    pub id: String,

    /// Display title, used to select the course
    pub title: String,

    /// URL slug; names the lessons endpoint and the output directory
    pub slug: String,

    /// IDs of the courses inside this product
    #[serde(default)]
    pub courses: Vec<String>,

    /// Remaining fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of the lessons endpoint
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Lessons {
    /// Lessons in course order
    pub data: Vec<Lesson>,

    /// Remaining fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Lessons {
    /// Every document of every lesson, in lesson order
    pub fn documents(&self) -> impl Iterator<Item = &LessonDocument> {
        self.data.iter().flat_map(|lesson| lesson.documents.iter())
    }
}

/// One lesson of a course
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Lesson {
    /// Lesson ID
    #[serde(rename = "_id", default)]
    pub id: String,

    /// Lesson title
    #[serde(default)]
    pub title: String,

    /// Creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    /// Documents of the lesson, in reading order
    pub documents: Vec<LessonDocument>,

    /// Remaining fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reference from a lesson to one of its documents
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LessonDocument {
    /// ID accepted by the document endpoint
    #[serde(rename = "documentId")]
    pub document_id: String,

    /// Title shown in the lesson list
    #[serde(rename = "documentTitle", default)]
    pub document_title: String,

    /// Remaining fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of the document endpoint
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    /// Document payload
    pub data: DocumentData,

    /// Remaining fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    /// ID of the document: the full body's ID, or the preview's for locked documents
    pub fn id(&self) -> Option<&str> {
        fn non_empty(body: &Option<DocumentBody>) -> Option<&str> {
            body.as_ref()
                .map(|b| b.id.as_str())
                .filter(|id| !id.is_empty())
        }
        non_empty(&self.data.doc).or_else(|| non_empty(&self.data.preview_doc))
    }
}

/// Full and preview variants of a document
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentData {
    /// Full document, present when the content is accessible
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<DocumentBody>,

    /// Preview of a locked document
    #[serde(rename = "previewDoc", default, skip_serializing_if = "Option::is_none")]
    pub preview_doc: Option<DocumentBody>,

    /// Remaining fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Document content; sections, drafts and revisions stay untyped
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentBody {
    /// Document ID
    #[serde(rename = "_id", default)]
    pub id: String,

    /// Remaining fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
