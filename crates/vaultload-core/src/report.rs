//! CSV audit report of an upload pass.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, SecondsFormat};
use tracing::info;

use crate::error::ReportError;
use crate::group::GroupedSecrets;
use crate::upload::UploadResult;

/// Report header row.
pub const REPORT_HEADER: &str =
    "Full Path,Secret Name,Keys,Namespace,Vault URL,Base Path,Timestamp,Status,Message";

/// `vault-upload-report-YYYY-MM-DD.csv` for the given run date.
#[must_use]
pub fn report_file_name(date: NaiveDate) -> String {
    format!("vault-upload-report-{}.csv", date.format("%Y-%m-%d"))
}

/// Render one row per result. Every field is double-quoted.
#[must_use]
pub fn render_report(results: &[UploadResult], grouped: &GroupedSecrets) -> String {
    let mut lines = Vec::with_capacity(results.len() + 1);
    lines.push(REPORT_HEADER.to_owned());

    for result in results {
        let keys = grouped
            .get(&result.secret_name)
            .map(|data| data.keys().collect::<Vec<_>>().join(", "))
            .unwrap_or_default();
        let attempt = result.attempt.as_ref();
        let timestamp = attempt
            .map(|a| a.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_default();
        let status = result.status.to_string();

        let fields = [
            attempt.map_or("", |a| a.full_path.as_str()),
            result.secret_name.as_str(),
            keys.as_str(),
            attempt.and_then(|a| a.namespace.as_deref()).unwrap_or(""),
            attempt.map_or("", |a| a.backend_url.as_str()),
            attempt.map_or("", |a| a.base_path.as_str()),
            timestamp.as_str(),
            status.as_str(),
            result.message.as_deref().unwrap_or(""),
        ];
        lines.push(fields.map(quote).join(","));
    }

    lines.join("\n")
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Write the report into `dir` (created if missing) and return its path.
///
/// # Errors
///
/// Returns [`ReportError::Io`] if the directory or file cannot be written.
pub async fn write_report(
    dir: &Path,
    date: NaiveDate,
    results: &[UploadResult],
    grouped: &GroupedSecrets,
) -> Result<PathBuf, ReportError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| ReportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

    let path = dir.join(report_file_name(date));
    tokio::fs::write(&path, render_report(results, grouped))
        .await
        .map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;

    info!(path = %path.display(), rows = results.len(), "report written");
    Ok(path)
}
