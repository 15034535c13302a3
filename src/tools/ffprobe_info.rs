use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

#[derive(Deserialize)]
struct FfprobeOutput {
    format: Option<FormatInfo>,
    streams: Option<Vec<StreamInfo>>,
}

#[derive(Deserialize)]
struct FormatInfo {
    duration: Option<String>,
}

#[derive(Deserialize)]
struct StreamInfo {
    codec_type: Option<String>,
    duration: Option<String>,
}

/// 使用 ffprobe 取得影片長度（秒）
///
/// `output()` 會等待 ffprobe 結束並回收程序，任何錯誤路徑都不會留下開啟中的檔案
pub fn probe_duration(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .with_context(|| format!("無法執行 ffprobe: {}", path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("ffprobe 執行失敗: {}", stderr.trim());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_duration(&stdout)
}

/// 解析 ffprobe 的 JSON 輸出（優先從 format，其次從視訊串流）
fn parse_duration(json: &str) -> Result<f64> {
    let probe: FfprobeOutput = serde_json::from_str(json).context("無法解析 ffprobe 輸出")?;

    let video_stream_duration = probe.streams.as_ref().and_then(|streams| {
        streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .and_then(|s| s.duration.as_ref())
    });

    let duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .or(video_stream_duration)
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| anyhow::anyhow!("無法取得影片長度"))?;

    if !duration.is_finite() || duration <= 0.0 {
        bail!("影片長度無效: {duration}");
    }

    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_from_format() {
        let json = r#"{
            "format": { "duration": "300.500000" },
            "streams": [{ "codec_type": "video", "duration": "299.0" }]
        }"#;
        assert!((parse_duration(json).unwrap() - 300.5).abs() < 0.001);
    }

    #[test]
    fn test_parse_duration_falls_back_to_video_stream() {
        let json = r#"{
            "format": {},
            "streams": [
                { "codec_type": "audio", "duration": "10.0" },
                { "codec_type": "video", "duration": "42.25" }
            ]
        }"#;
        assert!((parse_duration(json).unwrap() - 42.25).abs() < 0.001);
    }

    #[test]
    fn test_parse_duration_missing() {
        let json = r#"{ "format": {}, "streams": [{ "codec_type": "audio" }] }"#;
        assert!(parse_duration(json).is_err());
    }

    #[test]
    fn test_parse_duration_rejects_invalid_values() {
        assert!(parse_duration(r#"{ "format": { "duration": "N/A" } }"#).is_err());
        assert!(parse_duration(r#"{ "format": { "duration": "0.0" } }"#).is_err());
        assert!(parse_duration("not json").is_err());
    }
}
