use super::clip_extractor::ClipMetadata;
use super::clip_plan::ClipSpec;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::process::Command;

/// 可選的編碼設定組合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EncodingPreset {
    /// x265 CRF 18，保留原始解析度
    #[default]
    Quality,
    /// x265 ultrafast，縮放到 1280 寬並啟用 faststart
    Fast,
}

impl fmt::Display for EncodingPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quality => write!(f, "x265 CRF 18"),
            Self::Fast => write!(f, "x265 ultrafast 1280px"),
        }
    }
}

/// 固定的編碼參數，不屬於片段規劃邏輯
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingProfile {
    pub video_codec: String,
    pub crf: Option<u8>,
    pub preset: Option<String>,
    pub scale: Option<String>,
    pub pixel_format: String,
    pub audio_codec: String,
    pub faststart: bool,
}

impl From<EncodingPreset> for EncodingProfile {
    fn from(preset: EncodingPreset) -> Self {
        match preset {
            EncodingPreset::Quality => Self {
                video_codec: "libx265".to_string(),
                crf: Some(18),
                preset: None,
                scale: Some("-1:-1".to_string()),
                pixel_format: "yuv420p".to_string(),
                audio_codec: "aac".to_string(),
                faststart: false,
            },
            EncodingPreset::Fast => Self {
                video_codec: "libx265".to_string(),
                crf: None,
                preset: Some("ultrafast".to_string()),
                scale: Some("1280:-1".to_string()),
                pixel_format: "yuv420p".to_string(),
                audio_codec: "aac".to_string(),
                faststart: true,
            },
        }
    }
}

impl Default for EncodingProfile {
    fn default() -> Self {
        EncodingPreset::default().into()
    }
}

/// 單一片段的 ffmpeg 指令
pub struct ClipCommand<'a> {
    source_path: &'a Path,
    spec: &'a ClipSpec,
    output_path: &'a Path,
    metadata: &'a ClipMetadata,
    profile: &'a EncodingProfile,
}

impl<'a> ClipCommand<'a> {
    #[must_use]
    pub const fn new(
        source_path: &'a Path,
        spec: &'a ClipSpec,
        output_path: &'a Path,
        metadata: &'a ClipMetadata,
        profile: &'a EncodingProfile,
    ) -> Self {
        Self {
            source_path,
            spec,
            output_path,
            metadata,
            profile,
        }
    }

    #[must_use]
    pub fn args(&self) -> Vec<OsString> {
        let profile = self.profile;

        // -ss 放在 -i 前，快速跳轉到起點
        let mut args = to_os_args(&[
            "-hide_banner",
            "-nostdin",
            "-loglevel",
            "error",
            "-y",
            "-ss",
            &format!("{:.2}", self.spec.start),
            "-i",
        ]);
        args.push(self.source_path.as_os_str().to_owned());

        let mut options: Vec<String> = vec![
            "-t".to_string(),
            format!("{:.2}", self.spec.length()),
            "-c:v".to_string(),
            profile.video_codec.clone(),
        ];
        if let Some(crf) = profile.crf {
            options.extend(["-crf".to_string(), crf.to_string()]);
        }
        if let Some(preset) = &profile.preset {
            options.extend(["-preset".to_string(), preset.clone()]);
        }
        if let Some(scale) = &profile.scale {
            options.extend(["-vf".to_string(), format!("scale={scale}")]);
        }
        options.extend([
            "-pix_fmt".to_string(),
            profile.pixel_format.clone(),
            "-c:a".to_string(),
            profile.audio_codec.clone(),
        ]);
        for (key, value) in self.metadata.iter() {
            options.extend(["-metadata".to_string(), format!("{key}={value}")]);
        }
        if profile.faststart {
            options.extend(["-movflags".to_string(), "+faststart".to_string()]);
        }

        args.extend(options.into_iter().map(OsString::from));
        args.push(self.output_path.as_os_str().to_owned());
        args
    }

    #[must_use]
    pub fn build_command(&self) -> Command {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(self.args());
        cmd
    }

    /// 方便寫入 log 的指令字串
    #[must_use]
    pub fn describe(&self) -> String {
        let args: Vec<String> = self
            .args()
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        format!("ffmpeg {}", args.join(" "))
    }
}

fn to_os_args(values: &[&str]) -> Vec<OsString> {
    values.iter().map(OsString::from).collect()
}
