use super::error::SplitError;
use crate::tools::probe_duration;
use std::path::Path;

/// 取得影片總長度（秒）
pub trait DurationProbe {
    fn probe(&self, path: &Path) -> Result<f64, SplitError>;
}

/// 透過 ffprobe 取得長度，每次呼叫都重新開啟檔案，不做快取
#[derive(Debug, Clone, Copy, Default)]
pub struct FfprobeDurationProbe;

impl DurationProbe for FfprobeDurationProbe {
    fn probe(&self, path: &Path) -> Result<f64, SplitError> {
        probe_duration(path).map_err(|e| SplitError::unreadable(path, format!("{e:#}")))
    }
}
