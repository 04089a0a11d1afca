//! File export sink.
//!
//! Renders one history entry (transcript + analytics + chat) into a text
//! document and saves it under a name derived from the meeting title. A
//! rejected file name falls back to a fixed one; only unreadable content is
//! fatal.

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::analytics::AnalyticsGenerator;
use crate::error::MeetingError;
use crate::meeting::records::Meeting;
use crate::render;
use crate::store::MeetingStore;
use crate::telemetry::{error_codes, Telemetry};

const FALLBACK_FILE_NAME: &str = "Transcript.txt";

/// Title used when a meeting was captured without one.
const DEFAULT_TITLE: &str = "Meeting";

const RESERVED_DEVICE_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Replace characters no mainstream filesystem accepts, strip illegal
/// leading/trailing characters, and neutralize reserved device names.
pub fn sanitize_file_component(raw: &str) -> String {
    let invalid = Regex::new(r#"[:?"*<>|~/\\\x00-\x1f\x7f]"#).expect("valid pattern");
    let replaced = invalid.replace_all(raw, "_").to_string();
    let trimmed = replaced.trim_matches(|c: char| c == '.' || c.is_whitespace());

    let mut name = trimmed.to_string();
    let stem_end = name.find('.').unwrap_or(name.len());
    if RESERVED_DEVICE_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(&name[..stem_end]))
    {
        name.replace_range(..stem_end, "_");
    }
    name
}

/// `Transcript-{title} at {start time}.txt`
pub fn export_file_name(meeting: &Meeting) -> String {
    let title = meeting
        .meeting_title
        .as_deref()
        .filter(|title| !title.trim().is_empty())
        .unwrap_or(DEFAULT_TITLE);

    let mut sanitized = sanitize_file_component(title);
    if sanitized.is_empty() {
        sanitized = DEFAULT_TITLE.to_string();
    }

    format!(
        "Transcript-{} at {}.txt",
        sanitized,
        render::file_name_timestamp(&meeting.meeting_start_timestamp)
    )
}

/// Where export documents land. Conflict-safe: an existing name is
/// uniquified, never overwritten.
#[async_trait]
pub trait FileSink: Send + Sync {
    async fn save(&self, file_name: &str, content: &str) -> Result<PathBuf>;
}

pub struct DownloadsSink {
    dir: PathBuf,
}

impl DownloadsSink {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn unique_path(&self, file_name: &str) -> PathBuf {
        let path = self.dir.join(file_name);
        if !path.exists() {
            return path;
        }

        let (stem, extension) = match file_name.rsplit_once('.') {
            Some((stem, extension)) => (stem, extension),
            None => (file_name, "txt"),
        };
        for i in 1..100 {
            let alt_path = self.dir.join(format!("{stem}-{i}.{extension}"));
            if !alt_path.exists() {
                return alt_path;
            }
        }

        path
    }
}

#[async_trait]
impl FileSink for DownloadsSink {
    async fn save(&self, file_name: &str, content: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .context("Failed to create downloads directory")?;

        let path = self.unique_path(file_name);
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write transcript file {:?}", path))?;
        Ok(path)
    }
}

pub struct TranscriptExporter {
    store: Arc<dyn MeetingStore>,
    analytics: AnalyticsGenerator,
    sink: Box<dyn FileSink>,
    telemetry: Telemetry,
}

impl TranscriptExporter {
    pub fn new(
        store: Arc<dyn MeetingStore>,
        analytics: AnalyticsGenerator,
        sink: Box<dyn FileSink>,
        telemetry: Telemetry,
    ) -> Self {
        Self {
            store,
            analytics,
            sink,
            telemetry,
        }
    }

    pub async fn export(
        &self,
        index: usize,
        webhook_enabled: bool,
    ) -> Result<PathBuf, MeetingError> {
        let meeting = self
            .store
            .meeting_at(index)
            .await?
            .ok_or(MeetingError::MeetingNotFound(index))?;

        let analytics = self.analytics.generate(&meeting.transcript).await;
        let content = render::compose_document(&meeting, analytics.text());
        let file_name = export_file_name(&meeting);

        match self.sink.save(&file_name, &content).await {
            Ok(path) => {
                info!("Transcript saved to {:?}", path);
                self.telemetry.report_download(webhook_enabled);
                Ok(path)
            }
            Err(err) => {
                warn!("Save rejected for {file_name:?}, retrying with fallback name: {err:#}");
                self.telemetry
                    .report_error(error_codes::FILE_NAME_REJECTED, &err.to_string());

                let path = self
                    .sink
                    .save(FALLBACK_FILE_NAME, &content)
                    .await
                    .map_err(|err| MeetingError::FileExportFailed(err.to_string()))?;
                info!("Transcript saved with fallback name to {:?}", path);
                self.telemetry.report_download(webhook_enabled);
                Ok(path)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meeting::records::{TranscriptBlock, WebhookPostStatus};
    use crate::store::MemoryStore;
    use anyhow::anyhow;
    use chrono::{TimeZone, Utc};

    fn sample_meeting(title: Option<&str>) -> Meeting {
        Meeting {
            meeting_title: title.map(str::to_string),
            meeting_start_timestamp: Utc.with_ymd_and_hms(2024, 6, 15, 14, 0, 0).unwrap(),
            meeting_end_timestamp: Utc.with_ymd_and_hms(2024, 6, 15, 15, 0, 0).unwrap(),
            transcript: vec![TranscriptBlock {
                person_name: "Alice".to_string(),
                timestamp: Utc.with_ymd_and_hms(2024, 6, 15, 14, 30, 0).unwrap(),
                transcript_text: "Hello".to_string(),
            }],
            chat_messages: vec![],
            webhook_post_status: WebhookPostStatus::New,
        }
    }

    #[test]
    fn test_sanitize_replaces_invalid_characters() {
        assert_eq!(sanitize_file_component("a/b\\c:d?e"), "a_b_c_d_e");
        assert_eq!(sanitize_file_component("quarterly <review>"), "quarterly _review_");
    }

    #[test]
    fn test_sanitize_strips_leading_trailing() {
        assert_eq!(sanitize_file_component("  .hidden.  "), "hidden");
        assert_eq!(sanitize_file_component("..."), "");
    }

    #[test]
    fn test_sanitize_reserved_device_names() {
        assert_eq!(sanitize_file_component("CON"), "_");
        assert_eq!(sanitize_file_component("con.call"), "_.call");
        assert_eq!(sanitize_file_component("CONference"), "CONference");
    }

    #[test]
    fn test_export_file_name_default_title() {
        let name = export_file_name(&sample_meeting(None));
        assert!(name.starts_with("Transcript-Meeting at "));
        assert!(name.ends_with(".txt"));
        assert!(!name.contains('/'));
        assert!(!name.contains(':'));
    }

    #[tokio::test]
    async fn test_downloads_sink_uniquifies() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DownloadsSink::new(dir.path().to_path_buf());

        let first = sink.save("Transcript.txt", "one").await.unwrap();
        let second = sink.save("Transcript.txt", "two").await.unwrap();

        assert_ne!(first, second);
        assert_eq!(second.file_name().unwrap(), "Transcript-1.txt");
        assert_eq!(std::fs::read_to_string(first).unwrap(), "one");
        assert_eq!(std::fs::read_to_string(second).unwrap(), "two");
    }

    /// Rejects every name except the fixed fallback.
    struct PickyFileSink {
        dir: PathBuf,
    }

    #[async_trait]
    impl FileSink for PickyFileSink {
        async fn save(&self, file_name: &str, content: &str) -> Result<PathBuf> {
            if file_name != FALLBACK_FILE_NAME {
                return Err(anyhow!("invalid file name"));
            }
            let path = self.dir.join(file_name);
            tokio::fs::write(&path, content).await?;
            Ok(path)
        }
    }

    struct FailingFileSink;

    #[async_trait]
    impl FileSink for FailingFileSink {
        async fn save(&self, _file_name: &str, _content: &str) -> Result<PathBuf> {
            Err(anyhow!("disk full"))
        }
    }

    async fn store_with_meeting(title: Option<&str>) -> Arc<dyn MeetingStore> {
        let store = Arc::new(MemoryStore::new());
        store.push_meeting(sample_meeting(title)).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_export_falls_back_on_bad_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_meeting(Some("Weekly sync")).await;
        let exporter = TranscriptExporter::new(
            store,
            AnalyticsGenerator::rule_based_only(),
            Box::new(PickyFileSink {
                dir: dir.path().to_path_buf(),
            }),
            Telemetry::disabled(),
        );

        let path = exporter.export(0, false).await.unwrap();
        assert_eq!(path.file_name().unwrap(), FALLBACK_FILE_NAME);

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("Alice"));
        assert!(content.contains(render::attribution()));
    }

    #[tokio::test]
    async fn test_export_fails_when_fallback_also_fails() {
        let store = store_with_meeting(Some("Weekly sync")).await;
        let exporter = TranscriptExporter::new(
            store,
            AnalyticsGenerator::rule_based_only(),
            Box::new(FailingFileSink),
            Telemetry::disabled(),
        );

        assert!(matches!(
            exporter.export(0, false).await,
            Err(MeetingError::FileExportFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_export_unknown_index() {
        let store = store_with_meeting(None).await;
        let exporter = TranscriptExporter::new(
            store,
            AnalyticsGenerator::rule_based_only(),
            Box::new(FailingFileSink),
            Telemetry::disabled(),
        );

        assert!(matches!(
            exporter.export(5, false).await,
            Err(MeetingError::MeetingNotFound(5))
        ));
    }
}
