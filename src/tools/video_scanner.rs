use crate::config::FileTypeTable;
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 掃描到的來源影片，長度不在掃描時取得，由處理流程在需要時才探測
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub size: u64,
}

impl SourceFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }

    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map_or_else(|| self.path.display().to_string(), |n| n.to_string_lossy().to_string())
    }
}

/// 掃描資料夾中的影片檔案，依路徑排序
///
/// `recursive` 為 false 時只掃描第一層
pub fn scan_video_files(
    directory: &Path,
    file_type_table: &FileTypeTable,
    recursive: bool,
) -> Result<Vec<SourceFile>> {
    let mut walker = WalkDir::new(directory).follow_links(false);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut video_files: Vec<SourceFile> = walker
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| file_type_table.is_video_file(entry.path()))
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            Some(SourceFile {
                path: entry.into_path(),
                size: metadata.len(),
            })
        })
        .collect();

    video_files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(video_files)
}

/// 移除位於 `directory` 之內的檔案
///
/// 輸出資料夾放在來源資料夾底下時，遞迴掃描會把上一次的片段當成來源
#[must_use]
pub fn exclude_directory(files: Vec<SourceFile>, directory: &Path) -> Vec<SourceFile> {
    let directory = comparable_path(directory);
    files
        .into_iter()
        .filter(|file| !comparable_path(&file.path).starts_with(&directory))
        .collect()
}

/// 路徑存在時取得絕對路徑，讓相對路徑與 `.` 也能比較
fn comparable_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
