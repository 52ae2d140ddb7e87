//! Assertions over the output directory

use std::path::Path;

use super::fixtures::COURSE_SLUG;

/// Read and parse a JSON file, panicking with the path on failure
pub fn read_json(path: &Path) -> serde_json::Value {
    let text = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
    serde_json::from_str(&text).unwrap_or_else(|e| panic!("invalid JSON in {}: {e}", path.display()))
}

/// Sorted file names inside the course's documents directory
pub fn saved_documents(output: &Path) -> Vec<String> {
    let dir = output.join(COURSE_SLUG).join("documents");
    let mut names: Vec<String> = std::fs::read_dir(&dir)
        .unwrap_or_else(|e| panic!("failed to list {}: {e}", dir.display()))
        .map(|entry| {
            entry
                .unwrap()
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    names.sort();
    names
}

/// Assert the run left no trace in `output`
pub fn assert_nothing_written(output: &Path) {
    assert!(
        !output.join("courses.json").exists(),
        "courses.json must not be written"
    );
    assert!(
        !output.join(COURSE_SLUG).join("documents").exists(),
        "documents directory must not be created"
    );
}
