use std::path::PathBuf;

/// 隨機剪輯流程的錯誤分類
///
/// 只有 `InvalidJobParameters` 會讓整批工作無法開始，
/// 其餘錯誤都在單一檔案或單一片段的範圍內轉成事件回報
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SplitError {
    #[error("無法讀取影片 {}: {reason}", .path.display())]
    UnreadableMedia { path: PathBuf, reason: String },

    #[error("影片長度不足: {duration:.2}s，至少需要 {required:.2}s")]
    InsufficientDuration { duration: f64, required: f64 },

    #[error("ffmpeg 轉檔失敗: {stderr}")]
    TranscodeFailed { stderr: String },

    #[error("工作參數無效: {0}")]
    InvalidJobParameters(String),
}

impl SplitError {
    pub fn unreadable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::UnreadableMedia {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn transcode_failed(stderr: impl Into<String>) -> Self {
        Self::TranscodeFailed {
            stderr: stderr.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidJobParameters(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_file_and_cause() {
        let e = SplitError::unreadable("/videos/broken.mkv", "moov atom not found");
        let message = e.to_string();
        assert!(message.contains("broken.mkv"));
        assert!(message.contains("moov atom not found"));
    }

    #[test]
    fn test_insufficient_duration_message() {
        let e = SplitError::InsufficientDuration {
            duration: 299.0,
            required: 300.0,
        };
        assert!(e.to_string().contains("299.00"));
        assert!(e.to_string().contains("300.00"));
    }
}
