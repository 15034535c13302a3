use crate::config::types::{MAX_RECENT_PATHS, UserSettings};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// 設定檔放在程式執行的當前目錄
pub const SETTINGS_FILE: &str = "settings.json";

pub fn save_settings(settings: &UserSettings) -> Result<()> {
    save_settings_to(settings, Path::new(SETTINGS_FILE))
}

pub fn save_settings_to(settings: &UserSettings, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;

    fs::write(path, content)
        .with_context(|| format!("Failed to write settings to {}", path.display()))?;

    Ok(())
}

/// 更新最近使用的路徑
/// 將新路徑加入最前面，去重並限制數量
pub fn add_recent_path(recent_paths: &mut Vec<String>, path: &str) {
    // 移除已存在的相同路徑
    recent_paths.retain(|p| p != path);

    // 加入到最前面
    recent_paths.insert(0, path.to_string());

    // 限制數量
    recent_paths.truncate(MAX_RECENT_PATHS);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load::load_settings_from;
    use tempfile::TempDir;

    #[test]
    fn test_add_recent_path_moves_existing_to_front() {
        let mut paths = vec!["/a".to_string(), "/b".to_string(), "/c".to_string()];
        add_recent_path(&mut paths, "/b");
        assert_eq!(paths, vec!["/b", "/a", "/c"]);
    }

    #[test]
    fn test_add_recent_path_keeps_limit() {
        let mut paths = Vec::new();
        for p in ["/1", "/2", "/3", "/4", "/5"] {
            add_recent_path(&mut paths, p);
        }
        assert_eq!(paths.len(), MAX_RECENT_PATHS);
        assert_eq!(paths[0], "/5");
        assert_eq!(paths[MAX_RECENT_PATHS - 1], "/3");
    }

    #[test]
    fn test_saved_history_is_restored() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");

        let mut settings = UserSettings::default();
        add_recent_path(&mut settings.recent_input_paths, "/videos/in");
        add_recent_path(&mut settings.recent_output_paths, "/videos/out");
        settings.splitter.clips_per_file = 3;
        settings.splitter.seed = Some(7);

        save_settings_to(&settings, &path).unwrap();
        let loaded = load_settings_from(&path).unwrap();

        assert_eq!(loaded, settings);
    }
}
