//! 隨機片段剪輯元件
//!
//! 從資料夾挑選影片，在每支影片頭尾保留區間之外隨機擷取固定長度的片段，
//! 以 ffmpeg 重新編碼輸出為 `{檔名} - {編號}.{副檔名}`

mod batch_orchestrator;
mod clip_extractor;
mod clip_plan;
mod duration_probe;
mod error;
mod ffmpeg_command;
mod main;

pub use crate::tools::SourceFile;
pub use batch_orchestrator::{
    BatchEvent, BatchHandle, BatchJob, BatchOrchestrator, BatchSummary, DEFAULT_CLIP_LENGTH,
    DEFAULT_CLIPS_PER_FILE, DEFAULT_MARGIN, DEFAULT_OUTPUT_EXTENSION, Selection, SelectionClamp,
    SelectionMode, select_sources,
};
pub use clip_extractor::{ClipExtractor, ClipMetadata, ClipRequest, FfmpegClipExtractor};
pub use clip_plan::{ClipSpec, OverlapPolicy, clip_file_name, plan, required_span};
pub use duration_probe::{DurationProbe, FfprobeDurationProbe};
pub use error::SplitError;
pub use ffmpeg_command::{ClipCommand, EncodingPreset, EncodingProfile};
pub use main::RandomClipSplitter;
