use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use super::domain::JobId;

/// What the review desk needs to know about a job posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: JobId,
    pub title: String,
    pub url: Option<String>,
}

/// Lookup into the content platform's job postings.
pub trait JobDirectory: Send + Sync {
    fn posting(&self, id: JobId) -> Option<JobPosting>;
}

#[derive(Debug, thiserror::Error)]
pub enum JobCatalogError {
    #[error("failed to read job catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid job catalog CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Job postings held in memory, optionally hydrated from a CSV export with
/// `id,title,url` columns.
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobDirectory {
    postings: BTreeMap<JobId, JobPosting>,
}

impl InMemoryJobDirectory {
    pub fn with_posting(mut self, id: JobId, title: &str, url: Option<&str>) -> Self {
        self.postings.insert(
            id,
            JobPosting {
                id,
                title: title.to_string(),
                url: url.map(str::to_string),
            },
        );
        self
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, JobCatalogError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, JobCatalogError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut postings = BTreeMap::new();
        for row in csv_reader.deserialize::<CatalogRow>() {
            let row = row?;
            postings.insert(
                row.id,
                JobPosting {
                    id: row.id,
                    title: row.title,
                    url: row.url,
                },
            );
        }

        Ok(Self { postings })
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }
}

impl JobDirectory for InMemoryJobDirectory {
    fn posting(&self, id: JobId) -> Option<JobPosting> {
        self.postings.get(&id).cloned()
    }
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    id: JobId,
    title: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    url: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
