//! QueuePath - `projects/{project}/locations/{location}/queues/{queue}`
//!
//! project id, location（region）, queue name の 3 つの設定値から合成する。
//! location はアプリ自身のデプロイ region と一致するとは限らない。

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::SubmitError;
use super::task_name::TaskName;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueuePath {
    project_id: String,
    location: String,
    queue: String,
}

impl QueuePath {
    pub fn new(
        project_id: impl Into<String>,
        location: impl Into<String>,
        queue: impl Into<String>,
    ) -> Result<Self, SubmitError> {
        let path = Self {
            project_id: project_id.into(),
            location: location.into(),
            queue: queue.into(),
        };
        validate_segment("project id", &path.project_id)?;
        validate_segment("location", &path.location)?;
        validate_queue_id(&path.queue)?;
        Ok(path)
    }

    /// 完全修飾名をパースする（`queues describe` の出力などから）
    pub fn parse(value: &str) -> Result<Self, SubmitError> {
        let parts: Vec<&str> = value.split('/').collect();
        match parts.as_slice() {
            ["projects", project, "locations", location, "queues", queue] => {
                Self::new(*project, *location, *queue)
            }
            _ => Err(SubmitError::invalid(format!("not a queue path: {value}"))),
        }
    }

    /// `projects/{project}/locations/{location}`（queue 作成時の parent）
    pub fn location_path(&self) -> String {
        format!("projects/{}/locations/{}", self.project_id, self.location)
    }

    /// `{queue path}/tasks/{name}`
    pub fn task_path(&self, name: &TaskName) -> String {
        format!("{self}/tasks/{name}")
    }
}

impl fmt::Display for QueuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "projects/{}/locations/{}/queues/{}",
            self.project_id, self.location, self.queue
        )
    }
}

fn validate_segment(field: &str, value: &str) -> Result<(), SubmitError> {
    if value.is_empty() {
        return Err(SubmitError::invalid(format!("{field} must not be empty")));
    }
    if value.contains('/') || value.chars().any(char::is_whitespace) {
        return Err(SubmitError::invalid(format!(
            "{field} must not contain '/' or whitespace: {value:?}"
        )));
    }
    Ok(())
}

// queue id: [A-Za-z0-9-]{1,100}
fn validate_queue_id(queue: &str) -> Result<(), SubmitError> {
    let valid = !queue.is_empty()
        && queue.len() <= 100
        && queue.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(SubmitError::invalid(format!(
            "queue name must match [A-Za-z0-9-]{{1,100}}: {queue:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn renders_fully_qualified_path() {
        let path = QueuePath::new("my-project", "europe-west1", "default").unwrap();
        assert_eq!(
            path.to_string(),
            "projects/my-project/locations/europe-west1/queues/default"
        );
        assert_eq!(path.location_path(), "projects/my-project/locations/europe-west1");
    }

    #[test]
    fn parse_roundtrips_display() {
        let path = QueuePath::new("p", "us-central1", "mail-queue").unwrap();
        assert_eq!(QueuePath::parse(&path.to_string()).unwrap(), path);
    }

    #[test]
    fn task_path_appends_name() {
        let path = QueuePath::new("p", "l", "q").unwrap();
        let name = TaskName::new("welcome-42").unwrap();
        assert_eq!(
            path.task_path(&name),
            "projects/p/locations/l/queues/q/tasks/welcome-42"
        );
    }

    #[rstest]
    #[case::empty_project("", "l", "q")]
    #[case::slash_in_location("p", "us/central", "q")]
    #[case::underscore_in_queue("p", "l", "my_queue")]
    #[case::empty_queue("p", "l", "")]
    fn rejects_malformed_segments(#[case] project: &str, #[case] location: &str, #[case] queue: &str) {
        assert!(QueuePath::new(project, location, queue).is_err());
    }

    #[test]
    fn parse_rejects_other_resources() {
        assert!(QueuePath::parse("projects/p/locations/l").is_err());
        assert!(QueuePath::parse("projects/p/locations/l/queues/q/tasks/t").is_err());
    }
}
