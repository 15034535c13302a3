use crate::component::random_clip_splitter::{
    DEFAULT_CLIP_LENGTH, DEFAULT_CLIPS_PER_FILE, DEFAULT_MARGIN, DEFAULT_OUTPUT_EXTENSION,
    EncodingPreset, OverlapPolicy, SelectionMode,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// 最近使用路徑的保留數量
pub const MAX_RECENT_PATHS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileTypeTable {
    #[serde(rename = "VIDEO_FILE")]
    pub video_file: Vec<String>,
}

impl FileTypeTable {
    #[must_use]
    pub fn video_extensions_set(&self) -> HashSet<String> {
        self.video_file
            .iter()
            .map(|ext| ext.to_lowercase())
            .collect()
    }

    #[must_use]
    pub fn is_video_file(&self, path: &Path) -> bool {
        let video_extensions = self.video_extensions_set();
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| video_extensions.contains(&format!(".{}", ext.to_lowercase())))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "zh-TW")]
    ZhTw,
}

impl Language {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EnUs => "en-US",
            Self::ZhTw => "zh-TW",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnUs => write!(f, "English"),
            Self::ZhTw => write!(f, "繁體中文"),
        }
    }
}

/// 隨機剪輯的預設參數，每次送出工作後更新為最後一次使用的值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterSettings {
    /// 每個片段長度（秒）
    pub clip_length: f64,
    pub clips_per_file: u32,
    pub files_to_process: usize,
    /// 影片開頭與結尾保留不取樣的秒數
    pub margin: f64,
    pub selection_mode: SelectionMode,
    pub overlap_policy: OverlapPolicy,
    pub recursive_scan: bool,
    /// 寫入 artist / album / comment 的標記文字，空字串代表不寫入
    pub metadata_tag: String,
    pub metadata_date: String,
    /// 固定亂數種子，方便重現同一批片段
    pub seed: Option<u64>,
}

impl Default for SplitterSettings {
    fn default() -> Self {
        Self {
            clip_length: DEFAULT_CLIP_LENGTH,
            clips_per_file: DEFAULT_CLIPS_PER_FILE,
            files_to_process: 10,
            margin: DEFAULT_MARGIN,
            selection_mode: SelectionMode::Random,
            overlap_policy: OverlapPolicy::Allow,
            recursive_scan: true,
            metadata_tag: String::new(),
            metadata_date: String::new(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    pub preset: EncodingPreset,
    pub output_extension: String,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            preset: EncodingPreset::Quality,
            output_extension: DEFAULT_OUTPUT_EXTENSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub language: Language,
    pub recent_input_paths: Vec<String>,
    pub recent_output_paths: Vec<String>,
    pub splitter: SplitterSettings,
    pub encoder: EncoderSettings,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub file_type_table: FileTypeTable,
    pub settings: UserSettings,
}
