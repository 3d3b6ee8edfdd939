// Summary Projection - flat table of approved access grants
//
// Rows are derived from finally approved submissions and keyed by the
// applicant's fact user id. The table is exported and re-imported as JSON
// rows using the spreadsheet headers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use fd_lock::RwLock;
use std::collections::HashSet;
use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::approval::Submission;
use crate::store::file::{lock_path_for, open_lock_file};

const KEY_FIELD: &str = "factUserId";
const COMPANY_FIELD: &str = "entityName";
const SECURITY_GROUP_FIELD: &str = "securityGroupOther";

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Import contained no rows")]
    EmptyImport,

    #[error("Summary lock error: {reason}")]
    LockError { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    #[serde(rename = "ID", alias = "id")]
    pub id: String,
    #[serde(rename = "Company List", alias = "companyList", default)]
    pub company_list: String,
    #[serde(rename = "Security Group", alias = "securityGroup", default)]
    pub security_group: String,
}

impl SummaryRow {
    /// Row for a submission, `None` when the key field is missing or blank
    pub fn from_submission(submission: &Submission) -> Option<Self> {
        let id = submission.fields.text(KEY_FIELD)?.to_string();
        Some(Self {
            id,
            company_list: submission.fields.entries(COMPANY_FIELD).join(", "),
            security_group: submission
                .fields
                .text(SECURITY_GROUP_FIELD)
                .unwrap_or_default()
                .to_string(),
        })
    }

    fn matches(&self, needle: &str) -> bool {
        [&self.id, &self.company_list, &self.security_group]
            .iter()
            .any(|value| value.to_lowercase().contains(needle))
    }
}

/// A row as it arrives from an import; the id may be absent
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ImportedRow {
    #[serde(rename = "ID", alias = "id", default, deserialize_with = "text_or_number")]
    pub id: Option<String>,
    #[serde(rename = "Company List", alias = "companyList", default)]
    pub company_list: String,
    #[serde(rename = "Security Group", alias = "securityGroup", default)]
    pub security_group: String,
}

// Spreadsheet ids often come back as numbers
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SummaryProjection {
    rows: Vec<SummaryRow>,
}

impl SummaryProjection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<SummaryRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rows.iter().any(|row| row.id == id)
    }

    /// Append rows for finally approved submissions not yet in the table.
    /// Returns how many rows were added.
    pub fn sync(&mut self, submissions: &[Submission]) -> usize {
        let mut seen: HashSet<String> = self.rows.iter().map(|row| row.id.clone()).collect();
        let before = self.rows.len();

        for submission in submissions.iter().filter(|s| s.final_status.is_approved()) {
            let Some(row) = SummaryRow::from_submission(submission) else {
                debug!(submission.id = %submission.id, "Approved submission has no {}", KEY_FIELD);
                continue;
            };
            if seen.insert(row.id.clone()) {
                self.rows.push(row);
            }
        }

        let added = self.rows.len() - before;
        info!(added, total = self.rows.len(), "Summary table synced");
        added
    }

    pub fn export_rows(&self) -> Vec<SummaryRow> {
        self.rows.clone()
    }

    pub fn export_json<W: Write>(&self, writer: W) -> Result<(), SummaryError> {
        serde_json::to_writer_pretty(writer, &self.rows)?;
        Ok(())
    }

    /// Replace the table with imported rows
    pub fn import_rows(&mut self, rows: Vec<ImportedRow>) -> Result<usize, SummaryError> {
        self.import_rows_at(rows, Utc::now())
    }

    pub fn import_rows_at(
        &mut self,
        rows: Vec<ImportedRow>,
        now: DateTime<Utc>,
    ) -> Result<usize, SummaryError> {
        if rows.is_empty() {
            return Err(SummaryError::EmptyImport);
        }

        let millis = now.timestamp_millis();
        self.rows = rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| SummaryRow {
                id: row
                    .id
                    .unwrap_or_else(|| format!("AUTO_{}_{}", millis, index)),
                company_list: row.company_list,
                security_group: row.security_group,
            })
            .collect();

        info!(rows = self.rows.len(), "Summary table imported");
        Ok(self.rows.len())
    }

    pub fn import_json<R: Read>(&mut self, reader: R) -> Result<usize, SummaryError> {
        let rows: Vec<ImportedRow> = serde_json::from_reader(reader)?;
        self.import_rows(rows)
    }

    /// Insert or overwrite a row by id. Returns true when the row is new.
    pub fn upsert_row(&mut self, row: SummaryRow) -> bool {
        match self.rows.iter_mut().find(|existing| existing.id == row.id) {
            Some(existing) => {
                *existing = row;
                false
            }
            None => {
                self.rows.push(row);
                true
            }
        }
    }

    pub fn remove_row(&mut self, id: &str) -> bool {
        let before = self.rows.len();
        self.rows.retain(|row| row.id != id);
        self.rows.len() != before
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn search(&self, term: &str) -> Vec<&SummaryRow> {
        let needle = term.trim().to_lowercase();
        self.rows.iter().filter(|row| row.matches(&needle)).collect()
    }

    /// Load the table under a shared lock; a missing file is an empty table
    pub async fn load(path: &Path) -> Result<Self, SummaryError> {
        let path = path.to_path_buf();
        run_blocking(move || {
            let lock = RwLock::new(open_lock_file(&path, &lock_path_for(&path))?);
            let _guard = lock.read()?;
            read_table(&path)
        })
        .await
    }

    /// Overwrite the table on disk under the exclusive lock
    pub async fn save(&self, path: &Path) -> Result<(), SummaryError> {
        let path = path.to_path_buf();
        let table = self.clone();
        run_blocking(move || {
            let mut lock = RwLock::new(open_lock_file(&path, &lock_path_for(&path))?);
            let _guard = lock.write()?;
            write_table(&path, &table)
        })
        .await
    }

    /// Read-modify-write the table on disk under the exclusive lock. The
    /// closure reports whether the table changed and needs to be written back.
    pub async fn update<R, F>(path: &Path, modify: F) -> Result<R, SummaryError>
    where
        F: FnOnce(&mut SummaryProjection) -> Result<(R, bool), SummaryError> + Send + 'static,
        R: Send + 'static,
    {
        let path = path.to_path_buf();
        run_blocking(move || {
            let mut lock = RwLock::new(open_lock_file(&path, &lock_path_for(&path))?);
            let _guard = lock.write()?;
            let mut table = read_table(&path)?;
            let (result, dirty) = modify(&mut table)?;
            if dirty {
                write_table(&path, &table)?;
                debug!(path = %path.display(), rows = table.len(), "Summary table written");
            }
            Ok(result)
        })
        .await
    }
}

async fn run_blocking<R, F>(work: F) -> Result<R, SummaryError>
where
    F: FnOnce() -> Result<R, SummaryError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| SummaryError::LockError {
            reason: format!("summary task failed: {}", e),
        })?
}

fn read_table(path: &Path) -> Result<SummaryProjection, SummaryError> {
    match fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => Ok(SummaryProjection::new()),
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(SummaryProjection::new()),
        Err(e) => Err(e.into()),
    }
}

fn write_table(path: &Path, table: &SummaryProjection) -> Result<(), SummaryError> {
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, serde_json::to_string_pretty(&table.rows)?)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
