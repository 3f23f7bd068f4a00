use std::fmt;

/// A request to duplicate one object from a source location to a destination.
///
/// Tasks carry no identity beyond their fields; duplicate destinations are the
/// caller's problem.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CopyTask {
    pub source_bucket: String,
    pub source_object: String,
    pub dest_bucket: String,
    pub dest_object: String,
}

impl CopyTask {
    pub fn new(
        source_bucket: impl Into<String>,
        source_object: impl Into<String>,
        dest_bucket: impl Into<String>,
        dest_object: impl Into<String>,
    ) -> Self {
        Self {
            source_bucket: source_bucket.into(),
            source_object: source_object.into(),
            dest_bucket: dest_bucket.into(),
            dest_object: dest_object.into(),
        }
    }

    /// Identifier reported when the task exhausts its attempts.
    pub fn destination(&self) -> &str {
        &self.dest_object
    }
}

impl fmt::Display for CopyTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} -> {}/{}",
            self.source_bucket, self.source_object, self.dest_bucket, self.dest_object
        )
    }
}

/// Joins a numeric prefix and an object name with a dash (`7-photo.jpg`).
pub fn build_name(prefix: usize, name: &str) -> String {
    format!("{prefix}-{name}")
}

/// Builds the copy tasks that turn `0-<file_name>` into `copies` objects.
///
/// The source object is prefix `0`; destinations run from `1` to `copies - 1`,
/// all within the same bucket.
pub fn fan_out_tasks(bucket: &str, file_name: &str, copies: usize) -> Vec<CopyTask> {
    let source = build_name(0, file_name);
    (1..copies)
        .map(|i| CopyTask::new(bucket, &source, bucket, build_name(i, file_name)))
        .collect()
}
