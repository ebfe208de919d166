//! Batch input parsing.
//!
//! Bulk runs are driven by a CSV file with one job per row. Malformed
//! rows are skipped with a warning rather than aborting the batch; an
//! input that yields no usable rows is an error.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use reelgen_models::{AccountId, JobSpec, Privacy, UploadMetadata};

use crate::error::{WorkerError, WorkerResult};

#[derive(Debug, Deserialize)]
struct BatchRow {
    title: String,
    script: String,
    #[serde(default)]
    preset: Option<String>,
    #[serde(default)]
    target_secs: Option<f64>,
    #[serde(default)]
    visual_count: Option<usize>,
    #[serde(default)]
    music: Option<String>,
    #[serde(default)]
    account: Option<String>,
    #[serde(default)]
    description: Option<String>,
    /// Semicolon-separated tag list
    #[serde(default)]
    tags: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    privacy: Option<String>,
    /// RFC 3339 publish time; implies private until then
    #[serde(default)]
    publish_at: Option<String>,
}

/// Read a batch CSV into ordered job specs.
pub async fn read_batch_csv(path: &Path, default_preset: &str) -> WorkerResult<Vec<JobSpec>> {
    let bytes = tokio::fs::read(path).await?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes.as_slice());

    let mut specs = Vec::new();
    let mut skipped = 0usize;
    for (index, record) in reader.deserialize::<BatchRow>().enumerate() {
        let line = index + 2; // header is line 1
        let row = match record {
            Ok(row) => row,
            Err(e) => {
                warn!(line, error = %e, "skipping malformed batch row");
                skipped += 1;
                continue;
            }
        };
        match spec_from_row(row, default_preset) {
            Ok(spec) => specs.push(spec),
            Err(e) => {
                warn!(line, error = %e, "skipping invalid batch row");
                skipped += 1;
            }
        }
    }

    if specs.is_empty() {
        return Err(WorkerError::batch(format!(
            "batch file {} contains no usable rows",
            path.display()
        )));
    }
    info!(
        path = %path.display(),
        jobs = specs.len(),
        skipped,
        "batch input parsed"
    );
    Ok(specs)
}

fn spec_from_row(row: BatchRow, default_preset: &str) -> WorkerResult<JobSpec> {
    if row.title.is_empty() {
        return Err(WorkerError::batch("row has an empty title"));
    }
    if row.script.is_empty() {
        return Err(WorkerError::batch("row has an empty script"));
    }

    let preset = row
        .preset
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| default_preset.to_string());

    let mut upload = UploadMetadata::new(row.title.clone());
    if let Some(description) = row.description {
        upload.description = description;
    }
    if let Some(tags) = row.tags {
        upload.tags = tags
            .split(';')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
    }
    upload.category = row.category.filter(|c| !c.is_empty());
    if let Some(privacy) = row.privacy.filter(|p| !p.is_empty()) {
        upload.privacy = parse_privacy(&privacy)?;
    }
    if let Some(publish_at) = row.publish_at.filter(|p| !p.is_empty()) {
        let at = DateTime::parse_from_rfc3339(&publish_at)
            .map_err(|e| WorkerError::batch(format!("bad publish_at {publish_at:?}: {e}")))?;
        upload.publish_at = Some(at.with_timezone(&Utc));
        upload.privacy = Privacy::Private;
    }

    let mut spec = JobSpec::new(row.title, row.script, preset).with_upload(upload);
    if let Some(secs) = row.target_secs {
        spec = spec.with_target_secs(secs);
    }
    if let Some(count) = row.visual_count {
        spec = spec.with_visual_count(count);
    }
    if let Some(music) = row.music.filter(|m| !m.is_empty()) {
        spec = spec.with_music(music);
    }
    if let Some(account) = row.account.filter(|a| !a.is_empty()) {
        spec = spec.with_account(AccountId::new(account));
    }
    Ok(spec)
}

fn parse_privacy(value: &str) -> WorkerResult<Privacy> {
    match value.to_lowercase().as_str() {
        "public" => Ok(Privacy::Public),
        "unlisted" => Ok(Privacy::Unlisted),
        "private" => Ok(Privacy::Private),
        other => Err(WorkerError::batch(format!("unknown privacy {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn write_csv(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.csv");
        tokio::fs::write(&path, contents).await.unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn rows_map_to_specs_in_order() {
        let (_dir, path) = write_csv(
            "title,script,preset,target_secs,visual_count,music,account,description,tags,category,privacy,publish_at\n\
             First,Tell a story,noir,30,5,calm,main,A story,tag one;tag two,22,public,\n\
             Second,Another story,,,,,,,,,,\n",
        )
        .await;

        let specs = read_batch_csv(&path, "default").await.unwrap();
        assert_eq!(specs.len(), 2);

        let first = &specs[0];
        assert_eq!(first.title, "First");
        assert_eq!(first.preset, "noir");
        assert_eq!(first.target_secs, Some(30.0));
        assert_eq!(first.visual_count, Some(5));
        assert_eq!(first.account, Some(AccountId::new("main")));
        assert_eq!(first.upload.tags, vec!["tag one", "tag two"]);
        assert_eq!(first.upload.privacy, Privacy::Public);

        let second = &specs[1];
        assert_eq!(second.preset, "default");
        assert_eq!(second.upload.privacy, Privacy::Private);
        assert!(second.account.is_none());
    }

    #[tokio::test]
    async fn scheduled_rows_stay_private_until_published() {
        let (_dir, path) = write_csv(
            "title,script,privacy,publish_at\n\
             Scheduled,Say it later,public,2026-09-01T12:00:00Z\n",
        )
        .await;

        let specs = read_batch_csv(&path, "default").await.unwrap();
        assert_eq!(specs[0].upload.privacy, Privacy::Private);
        assert!(specs[0].upload.publish_at.is_some());
    }

    #[tokio::test]
    async fn bad_rows_are_skipped_but_good_ones_survive() {
        let (_dir, path) = write_csv(
            "title,script,privacy\n\
             ,missing title,\n\
             Valid,has a script,\n\
             Weird,also fine,definitely-not-a-privacy\n",
        )
        .await;

        let specs = read_batch_csv(&path, "default").await.unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].title, "Valid");
    }

    #[tokio::test]
    async fn all_bad_rows_is_an_error() {
        let (_dir, path) = write_csv("title,script\n,\n,\n").await;
        let err = read_batch_csv(&path, "default").await.unwrap_err();
        assert!(matches!(err, WorkerError::Batch(_)));
    }
}
