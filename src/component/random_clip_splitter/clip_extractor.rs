use super::clip_plan::ClipSpec;
use super::error::SplitError;
use super::ffmpeg_command::{ClipCommand, EncodingProfile};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::process::Stdio;

/// 寫入輸出容器的標籤（artist / album / comment / date 等）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipMetadata {
    tags: BTreeMap<String, String>,
}

impl ClipMetadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 以單一標記文字產生整組標籤
    ///
    /// artist 與 album 使用標記本身，comment 為 `Created by {tag}`，
    /// 空白的欄位不會寫入
    #[must_use]
    pub fn from_tag(tag: &str, date: &str) -> Self {
        let tag = tag.trim();
        let mut metadata = Self::new();
        if !tag.is_empty() {
            metadata.insert("artist", tag);
            metadata.insert("album", tag);
            metadata.insert("comment", format!("Created by {tag}"));
        }
        metadata.insert("date", date.trim());
        metadata
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            return;
        }
        self.tags.insert(key.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// 一次片段擷取需要的全部資訊
#[derive(Debug, Clone, Copy)]
pub struct ClipRequest<'a> {
    pub source: &'a Path,
    pub spec: &'a ClipSpec,
    pub output: &'a Path,
    pub metadata: &'a ClipMetadata,
}

/// 擷取單一片段
///
/// 失敗時以 `Err(SplitError::TranscodeFailed)` 回傳，呼叫端繼續處理下一個片段
pub trait ClipExtractor {
    fn extract(&self, request: &ClipRequest<'_>) -> Result<(), SplitError>;
}

/// 呼叫 ffmpeg 重新編碼片段
#[derive(Debug, Clone, Default)]
pub struct FfmpegClipExtractor {
    profile: EncodingProfile,
}

impl FfmpegClipExtractor {
    #[must_use]
    pub const fn new(profile: EncodingProfile) -> Self {
        Self { profile }
    }

    #[must_use]
    pub const fn profile(&self) -> &EncodingProfile {
        &self.profile
    }

    fn remove_partial_output(output: &Path) {
        if output.exists() {
            if let Err(e) = fs::remove_file(output) {
                warn!("無法刪除失敗的輸出檔案 {}: {}", output.display(), e);
            } else {
                info!("已刪除失敗的輸出檔案: {}", output.display());
            }
        }
    }
}

impl ClipExtractor for FfmpegClipExtractor {
    fn extract(&self, request: &ClipRequest<'_>) -> Result<(), SplitError> {
        let clip_command = ClipCommand::new(
            request.source,
            request.spec,
            request.output,
            request.metadata,
            &self.profile,
        );
        debug!("執行: {}", clip_command.describe());

        let mut command = clip_command.build_command();
        command.stdin(Stdio::null());

        let output = match command.output() {
            Ok(output) => output,
            Err(e) => return Err(SplitError::transcode_failed(format!("無法啟動 ffmpeg: {e}"))),
        };

        if output.status.success() {
            return Ok(());
        }

        Self::remove_partial_output(request.output);

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let diagnostic = if stderr.is_empty() {
            format!("ffmpeg 結束代碼 {}", output.status)
        } else {
            stderr
        };
        Err(SplitError::transcode_failed(diagnostic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_metadata_from_tag() {
        let metadata = ClipMetadata::from_tag("  Abobi ", "");
        let tags: Vec<(&str, &str)> = metadata.iter().collect();

        assert_eq!(
            tags,
            vec![
                ("album", "Abobi"),
                ("artist", "Abobi"),
                ("comment", "Created by Abobi"),
            ]
        );
    }

    #[test]
    fn test_metadata_empty_tag_writes_nothing() {
        assert!(ClipMetadata::from_tag("", "").is_empty());

        let dated = ClipMetadata::from_tag("", "2000-06-27");
        assert_eq!(dated.iter().collect::<Vec<_>>(), vec![("date", "2000-06-27")]);
    }

    #[test]
    fn test_failed_transcode_is_returned_as_value() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("missing.mp4");
        let output = temp_dir.path().join("missing - 1.mp4");
        let spec = ClipSpec {
            index: 1,
            start: 1.0,
            end: 2.0,
        };
        let metadata = ClipMetadata::new();
        let request = ClipRequest {
            source: &source,
            spec: &spec,
            output: &output,
            metadata: &metadata,
        };

        // 不論 ffmpeg 是否安裝，來源不存在都應該回傳 TranscodeFailed
        let result = FfmpegClipExtractor::default().extract(&request);
        assert!(matches!(result, Err(SplitError::TranscodeFailed { .. })));
        assert!(!output.exists());
    }
}
