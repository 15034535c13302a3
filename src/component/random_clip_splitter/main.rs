use super::batch_orchestrator::{BatchEvent, BatchJob, BatchOrchestrator, BatchSummary};
use super::clip_extractor::{ClipMetadata, FfmpegClipExtractor};
use super::duration_probe::FfprobeDurationProbe;
use super::error::SplitError;
use super::ffmpeg_command::EncodingProfile;
use crate::config::Config;
use crate::config::save::{add_recent_path, save_settings};
use crate::tools::{SourceFile, exclude_directory, scan_video_files, validate_directory_exists};
use anyhow::{Result, anyhow};
use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use rust_i18n::t;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 清單最多顯示的影片數量
const MAX_LISTED_FILES: usize = 20;

/// 本次工作的片段參數
struct Geometry {
    files: usize,
    clip_length: f64,
    clips_per_file: u32,
    margin: f64,
}

/// 隨機片段剪輯器
///
/// 流程：
/// 1. 選擇來源資料夾並掃描影片
/// 2. 輸入片段參數與輸出資料夾
/// 3. 確認後記錄最近使用的路徑與參數
/// 4. 背景執行批次工作，依事件更新進度條
pub struct RandomClipSplitter {
    config: Config,
    shutdown_signal: Arc<AtomicBool>,
}

impl RandomClipSplitter {
    pub const fn new(config: Config, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            config,
            shutdown_signal,
        }
    }

    /// 取回更新過歷史紀錄的設定
    #[must_use]
    pub fn into_config(self) -> Config {
        self.config
    }

    pub fn run(&mut self) -> Result<()> {
        println!("{}", style(t!("splitter.title")).cyan().bold());

        let Some(input_path) = self.prompt_input_path()? else {
            return Ok(());
        };
        let input_dir = PathBuf::from(&input_path);
        validate_directory_exists(&input_dir)?;

        println!("{}", style(t!("splitter.scanning")).dim());
        let sources = scan_video_files(
            &input_dir,
            &self.config.file_type_table,
            self.config.settings.splitter.recursive_scan,
        )?;

        if sources.is_empty() {
            println!("{}", style(t!("splitter.no_videos")).yellow());
            return Ok(());
        }

        print_sources(&sources);

        let Some(output_path) = self.prompt_output_path(&input_dir)? else {
            return Ok(());
        };

        // 輸出資料夾在來源資料夾底下時，不要把先前的片段當成來源
        let scanned = sources.len();
        let sources = exclude_directory(sources, Path::new(&output_path));
        if sources.len() < scanned {
            println!(
                "{}",
                style(t!("splitter.excluded_outputs", count = scanned - sources.len())).dim()
            );
        }
        if sources.is_empty() {
            println!("{}", style(t!("splitter.no_videos")).yellow());
            return Ok(());
        }

        let geometry = self.prompt_geometry(sources.len())?;

        let tag: String = Input::new()
            .with_prompt(t!("splitter.prompt_tag"))
            .default(self.config.settings.splitter.metadata_tag.clone())
            .allow_empty(true)
            .interact_text()?;
        let tag = tag.trim().to_string();

        let job = self.build_job(sources, &output_path, &geometry, &tag);
        job.validate()?;
        print_plan(&job, &self.config.settings.encoder.preset.to_string());

        let confirmed = Confirm::new()
            .with_prompt(t!("splitter.confirm"))
            .default(true)
            .interact()?;
        if !confirmed {
            println!("{}", style(t!("splitter.cancelled_by_user")).yellow());
            return Ok(());
        }

        self.remember(&input_path, &output_path, &geometry, &tag);

        let summary = self.execute(job)?;
        print_summary(&summary);

        Ok(())
    }

    fn prompt_input_path(&self) -> Result<Option<String>> {
        prompt_recent_path(
            &self.config.settings.recent_input_paths,
            &t!("splitter.prompt_input"),
            None,
        )
    }

    fn prompt_output_path(&self, input_dir: &Path) -> Result<Option<String>> {
        let suggestion = input_dir.join("splits").display().to_string();
        prompt_recent_path(
            &self.config.settings.recent_output_paths,
            &t!("splitter.prompt_output"),
            Some(suggestion),
        )
    }

    fn prompt_geometry(&self, available: usize) -> Result<Geometry> {
        let defaults = &self.config.settings.splitter;

        let files: usize = Input::new()
            .with_prompt(t!("splitter.prompt_files", available = available))
            .default(defaults.files_to_process)
            .validate_with(|value: &usize| -> Result<(), String> {
                if *value > 0 {
                    Ok(())
                } else {
                    Err(t!("splitter.must_be_positive").to_string())
                }
            })
            .interact_text()?;

        let clip_length = prompt_seconds(&t!("splitter.prompt_clip_length"), defaults.clip_length)?;

        let clips_per_file: u32 = Input::new()
            .with_prompt(t!("splitter.prompt_clips_per_file"))
            .default(defaults.clips_per_file)
            .validate_with(|value: &u32| -> Result<(), String> {
                if *value > 0 {
                    Ok(())
                } else {
                    Err(t!("splitter.must_be_positive").to_string())
                }
            })
            .interact_text()?;

        let margin = prompt_seconds(&t!("splitter.prompt_margin"), defaults.margin)?;

        Ok(Geometry {
            files,
            clip_length,
            clips_per_file,
            margin,
        })
    }

    fn build_job(
        &self,
        sources: Vec<SourceFile>,
        output_path: &str,
        geometry: &Geometry,
        tag: &str,
    ) -> BatchJob {
        let splitter = &self.config.settings.splitter;
        let encoder = &self.config.settings.encoder;

        BatchJob::new(sources, output_path)
            .with_files_requested(geometry.files)
            .with_selection(splitter.selection_mode)
            .with_geometry(geometry.clip_length, geometry.clips_per_file, geometry.margin)
            .with_overlap(splitter.overlap_policy)
            .with_output_extension(&encoder.output_extension)
            .with_metadata(ClipMetadata::from_tag(tag, &splitter.metadata_date))
            .with_seed(splitter.seed)
    }

    /// 工作被接受後寫入最近使用的路徑與參數，寫入失敗不影響工作
    fn remember(&mut self, input_path: &str, output_path: &str, geometry: &Geometry, tag: &str) {
        let settings = &mut self.config.settings;
        add_recent_path(&mut settings.recent_input_paths, input_path);
        add_recent_path(&mut settings.recent_output_paths, output_path);

        settings.splitter.files_to_process = geometry.files;
        settings.splitter.clip_length = geometry.clip_length;
        settings.splitter.clips_per_file = geometry.clips_per_file;
        settings.splitter.margin = geometry.margin;
        settings.splitter.metadata_tag = tag.to_string();

        if let Err(e) = save_settings(settings) {
            warn!("無法儲存設定: {e:#}");
        }
    }

    fn execute(&self, job: BatchJob) -> Result<BatchSummary> {
        // 前一次的中斷不應影響新的工作
        self.shutdown_signal.store(false, Ordering::SeqCst);

        let profile = EncodingProfile::from(self.config.settings.encoder.preset);
        let orchestrator = BatchOrchestrator::new(
            FfprobeDurationProbe,
            FfmpegClipExtractor::new(profile),
            Arc::clone(&self.shutdown_signal),
        );

        let clips_per_file = u64::from(job.clips_per_file);
        let total_clips = job.files_to_process() as u64 * clips_per_file;

        println!();
        println!("{}", style(t!("splitter.starting")).cyan());
        let handle = orchestrator.spawn(job)?;

        let progress_bar = ProgressBar::new(total_clips);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
                .progress_chars("#>-"),
        );

        for event in handle.events() {
            match &event {
                BatchEvent::FileStarted { source, .. } => {
                    progress_bar.set_message(file_name(source));
                }
                BatchEvent::ClipExtracted { .. } | BatchEvent::ClipFailed { .. } => {
                    progress_bar.inc(1);
                }
                BatchEvent::FileSkipped { .. } => progress_bar.inc(clips_per_file),
                _ => {}
            }

            if let Some(line) = render_event(&event) {
                progress_bar.println(line);
            }
        }

        let summary = handle
            .join()
            .map_err(|_| anyhow!(t!("splitter.worker_panicked").to_string()))?;

        if summary.cancelled {
            progress_bar.abandon_with_message(t!("splitter.interrupted").to_string());
        } else {
            progress_bar.finish_with_message(t!("splitter.done").to_string());
        }

        info!(
            "隨機剪輯結束 - 片段成功: {}, 失敗: {}",
            summary.clips_extracted, summary.clips_failed
        );

        Ok(summary)
    }
}

/// 從最近使用的路徑中選擇，或輸入新路徑；按 ESC 回傳 None
fn prompt_recent_path(
    recent_paths: &[String],
    prompt: &str,
    suggestion: Option<String>,
) -> Result<Option<String>> {
    let input_new = || -> Result<Option<String>> {
        let mut input = Input::<String>::new().with_prompt(prompt);
        if let Some(suggestion) = &suggestion {
            input = input.default(suggestion.clone());
        }
        let path = input.interact_text()?;
        Ok(Some(path.trim().to_string()))
    };

    if recent_paths.is_empty() {
        return input_new();
    }

    let mut options: Vec<String> = recent_paths
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let indicator = if Path::new(p).exists() { "✓" } else { "✗" };
            format!("{} [{}] {}", i + 1, indicator, p)
        })
        .collect();
    options.push(t!("splitter.enter_new_path").to_string());

    println!("{}", style(t!("common.esc_hint")).dim());

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(&options)
        .default(0)
        .interact_opt()?;

    match selection {
        None => Ok(None),
        Some(idx) if idx < recent_paths.len() => Ok(Some(recent_paths[idx].clone())),
        Some(_) => input_new(),
    }
}

fn prompt_seconds(prompt: &str, default: f64) -> Result<f64> {
    let value: f64 = Input::new()
        .with_prompt(prompt)
        .default(default)
        .validate_with(|value: &f64| -> Result<(), String> {
            if value.is_finite() && *value > 0.0 {
                Ok(())
            } else {
                Err(t!("splitter.must_be_positive").to_string())
            }
        })
        .interact_text()?;
    Ok(value)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

fn print_sources(sources: &[SourceFile]) {
    let total_size: u64 = sources.iter().map(|s| s.size).sum();
    println!(
        "{}",
        style(t!(
            "splitter.found_videos",
            count = sources.len(),
            size = format!("{:.2}", total_size as f64 / 1024.0 / 1024.0 / 1024.0)
        ))
        .green()
    );

    for (index, file) in sources.iter().take(MAX_LISTED_FILES).enumerate() {
        let size_mb = file.size as f64 / 1024.0 / 1024.0;
        println!("  {}. {} ({:.2} MB)", index + 1, file.file_name(), size_mb);
    }
    if sources.len() > MAX_LISTED_FILES {
        println!(
            "  {}",
            style(t!("splitter.more_files", count = sources.len() - MAX_LISTED_FILES)).dim()
        );
    }
    println!();
}

fn print_plan(job: &BatchJob, preset: &str) {
    println!();
    println!("{}", style(t!("splitter.plan_title")).cyan().bold());
    println!(
        "  {} {}",
        style(t!("splitter.plan_files")).dim(),
        job.files_to_process()
    );
    println!(
        "  {} {} x {:.2}s",
        style(t!("splitter.plan_clips")).dim(),
        job.clips_per_file,
        job.clip_length
    );
    println!("  {} {:.2}s", style(t!("splitter.plan_margin")).dim(), job.margin);
    println!("  {} {}", style(t!("splitter.plan_preset")).dim(), preset);
    println!(
        "  {} {}",
        style(t!("splitter.plan_output")).dim(),
        job.output_root.display()
    );
    println!();
}

/// 轉成要顯示在進度條上方的文字，開始與結束事件由摘要處理
fn render_event(event: &BatchEvent) -> Option<String> {
    let locale = rust_i18n::locale();
    let text = event_text(event, &locale)?;

    let line = match event {
        BatchEvent::FileStarted { .. } => style(text).cyan().to_string(),
        BatchEvent::ClipExtracted { replaced: false, .. } => {
            format!("  {} {}", style("✓").green(), text)
        }
        BatchEvent::ClipExtracted { replaced: true, .. } => {
            format!("  {} {}", style("✓").yellow(), text)
        }
        BatchEvent::ClipFailed { .. } => format!("  {} {}", style("✗").red(), text),
        BatchEvent::FileSkipped { .. } => format!("{} {}", style("⤳").yellow(), text),
        BatchEvent::FileCompleted { .. } => style(text).dim().to_string(),
        _ => style(text).yellow().to_string(),
    };
    Some(line)
}

/// 以指定語系產生事件文字，不含顏色
fn event_text(event: &BatchEvent, locale: &str) -> Option<String> {
    let text = match event {
        BatchEvent::Started { .. } | BatchEvent::Completed(_) => return None,
        BatchEvent::SelectionClamped {
            requested,
            available,
        } => t!(
            "events.selection_clamped",
            locale = locale,
            requested = requested,
            available = available
        ),
        BatchEvent::FileStarted {
            position,
            total,
            source,
        } => t!(
            "events.file_started",
            locale = locale,
            position = position,
            total = total,
            name = file_name(source)
        ),
        BatchEvent::ClipExtracted {
            index,
            output,
            replaced,
            ..
        } => {
            let key = if *replaced {
                "events.clip_replaced"
            } else {
                "events.clip_extracted"
            };
            t!(key, locale = locale, index = index, name = file_name(output))
        }
        BatchEvent::ClipFailed {
            source,
            index,
            error,
        } => t!(
            "events.clip_failed",
            locale = locale,
            index = index,
            name = file_name(source),
            reason = error_text(error, locale)
        ),
        BatchEvent::FileSkipped { source, error } => t!(
            "events.file_skipped",
            locale = locale,
            name = file_name(source),
            reason = error_text(error, locale)
        ),
        BatchEvent::FileCompleted {
            source,
            extracted,
            failed,
        } => t!(
            "events.file_completed",
            locale = locale,
            name = file_name(source),
            extracted = extracted,
            failed = failed
        ),
        BatchEvent::Cancelled { remaining_files } => {
            t!("events.cancelled", locale = locale, remaining = remaining_files)
        }
    };
    Some(text.to_string())
}

fn error_text(error: &SplitError, locale: &str) -> String {
    match error {
        SplitError::UnreadableMedia { path, reason } => t!(
            "errors.unreadable",
            locale = locale,
            name = file_name(path),
            reason = reason
        ),
        SplitError::InsufficientDuration { duration, required } => t!(
            "errors.insufficient_duration",
            locale = locale,
            duration = format!("{duration:.2}"),
            required = format!("{required:.2}")
        ),
        SplitError::TranscodeFailed { stderr } => {
            t!("errors.transcode_failed", locale = locale, stderr = stderr)
        }
        SplitError::InvalidJobParameters(reason) => {
            t!("errors.invalid_job", locale = locale, reason = reason)
        }
    }
    .to_string()
}

fn print_summary(summary: &BatchSummary) {
    println!();
    println!("{}", style(t!("splitter.summary_title")).cyan().bold());
    println!(
        "  {} {}",
        t!("splitter.summary_files_completed"),
        style(summary.files_completed).green()
    );
    if summary.files_skipped > 0 {
        println!(
            "  {} {}",
            t!("splitter.summary_files_skipped"),
            style(summary.files_skipped).yellow()
        );
    }
    println!(
        "  {} {}",
        t!("splitter.summary_clips_extracted"),
        style(summary.clips_extracted).green()
    );
    if summary.clips_failed > 0 {
        println!(
            "  {} {}",
            t!("splitter.summary_clips_failed"),
            style(summary.clips_failed).red()
        );
    }
    if summary.clips_replaced > 0 {
        println!(
            "  {} {}",
            t!("splitter.summary_clips_replaced"),
            style(summary.clips_replaced).yellow()
        );
    }
    if summary.cancelled {
        println!();
        println!("{}", style(t!("splitter.interrupted")).yellow());
    }
}
