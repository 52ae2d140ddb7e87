//! Mock course platform served by wiremock

use std::path::Path;
use std::time::Duration;

use course_dl::Config;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Title of the course every fixture serves
pub const COURSE_TITLE: &str = "Grokking Modern Behavioral Interview";
/// Slug of that course
pub const COURSE_SLUG: &str = "grokking-behavioral";
/// Inner course ID documents are requested with
pub const COURSE_ID: &str = "c-100";
/// Build ID the catalog path is served under
pub const BUILD_ID: &str = "e2e-build";

/// Course list with the fixture course and one unrelated product
pub fn courses_body() -> Value {
    json!({
        "pageProps": {
            "singleCourse": [
                {
                    "_id": "p-1",
                    "title": COURSE_TITLE,
                    "slug": COURSE_SLUG,
                    "courses": [COURSE_ID],
                    "discountPercent": 20
                },
                {
                    "_id": "p-2",
                    "title": "Grokking the System Design Interview",
                    "slug": "grokking-system-design",
                    "courses": ["c-200"]
                }
            ],
            "bootcampProducts": []
        },
        "__N_SSG": true
    })
}

/// Lessons body splitting `document_ids` over two lessons
pub fn lessons_body(document_ids: &[&str]) -> Value {
    let (first, second) = document_ids.split_at(document_ids.len() / 2);
    let refs = |ids: &[&str]| -> Vec<Value> {
        ids.iter()
            .map(|id| json!({ "documentId": id, "documentTitle": format!("Title of {id}") }))
            .collect()
    };
    json!({
        "data": [
            { "_id": "l-1", "title": "Introduction", "created": "2024-01-15T09:30:00Z", "documents": refs(first) },
            { "_id": "l-2", "title": "Stories", "documents": refs(second) }
        ]
    })
}

/// Document body for `id` with a section the downloader does not model
pub fn document_body(id: &str) -> Value {
    json!({
        "data": {
            "doc": {
                "_id": id,
                "rvn": 2,
                "latestDocument": {
                    "sections": [{ "sectionType": "markdown", "markdown": { "text": format!("# {id}") } }]
                }
            }
        }
    })
}

/// Start a platform serving the fixture course with the given documents
pub async fn start_platform(document_ids: &[&str]) -> MockServer {
    start_platform_with_lessons(lessons_body(document_ids)).await
}

/// Start a platform whose lessons endpoint answers 200 with `lessons`
pub async fn start_platform_with_lessons(lessons: Value) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/_next/data/{BUILD_ID}/en/courses.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(courses_body()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/api/course/getLessonsList/{COURSE_SLUG}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(lessons))
        .mount(&server)
        .await;

    server
}

/// Serve `id` successfully after `delay`
pub async fn serve_document(server: &MockServer, id: &str, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(format!("/api/document/{id}")))
        .and(query_param("courseId", COURSE_ID))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(document_body(id))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Serve `id` with an error status
pub async fn fail_document(server: &MockServer, id: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/api/document/{id}")))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Configuration pointing at `server` and writing into `output`
pub fn config_for(server: &MockServer, output: &Path, workers: usize) -> Config {
    let mut config = Config::default();
    config.api.base_url = server.uri();
    config.api.build_id = BUILD_ID.to_string();
    config.api.request_timeout = Duration::from_secs(5);
    config.pipeline.workers = workers;
    config.output.dir = output.to_path_buf();
    config
}
