//! HTTP client for the course platform
//!
//! - [`client`] - [`ApiClient`], one method per endpoint
//! - [`models`] - response bodies; unknown fields are kept so saved files are lossless

pub mod client;
pub mod models;


pub use client::ApiClient;
pub use models::{
    Course, Courses, Document, DocumentBody, DocumentData, Lesson, LessonDocument, Lessons,
    PageProps,
};
