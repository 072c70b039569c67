use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of an indexing job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// A background code-indexing task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingJob {
    pub id: String,
    pub path: String,
    pub status: JobStatus,
    pub progress: f32,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl IndexingJob {
    pub fn new(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            status: JobStatus::Pending,
            progress: 0.0,
            started_at: Utc::now(),
            finished_at: None,
            error: String::new(),
        }
    }

    /// Mark the job finished, successfully or not.
    pub fn finish(&mut self, error: Option<String>) {
        self.finished_at = Some(Utc::now());
        match error {
            Some(message) => {
                self.status = JobStatus::Failed;
                self.error = message;
            }
            None => {
                self.status = JobStatus::Completed;
                self.progress = 1.0;
            }
        }
    }
}
