use super::clip_extractor::{ClipExtractor, ClipMetadata, ClipRequest};
use super::clip_plan::{OverlapPolicy, clip_file_name, plan};
use super::duration_probe::DurationProbe;
use super::error::SplitError;
use crate::tools::{SourceFile, ensure_directory_exists};
use crossbeam_channel::{Receiver, unbounded};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

pub const DEFAULT_CLIP_LENGTH: f64 = 59.0;
pub const DEFAULT_CLIPS_PER_FILE: u32 = 5;
pub const DEFAULT_MARGIN: f64 = 59.0;
pub const DEFAULT_OUTPUT_EXTENSION: &str = "mp4";

/// 檔案挑選方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionMode {
    /// 不重複隨機抽樣
    #[default]
    Random,
    /// 依掃描順序取前 N 個
    InOrder,
}

/// 一次批次工作的完整參數，建立後不再修改
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub sources: Vec<SourceFile>,
    pub files_requested: usize,
    pub selection: SelectionMode,
    pub clip_length: f64,
    pub clips_per_file: u32,
    pub margin: f64,
    pub overlap: OverlapPolicy,
    pub output_root: PathBuf,
    pub output_extension: String,
    pub metadata: ClipMetadata,
    pub seed: Option<u64>,
}

impl BatchJob {
    #[must_use]
    pub fn new(sources: Vec<SourceFile>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            files_requested: sources.len(),
            sources,
            selection: SelectionMode::default(),
            clip_length: DEFAULT_CLIP_LENGTH,
            clips_per_file: DEFAULT_CLIPS_PER_FILE,
            margin: DEFAULT_MARGIN,
            overlap: OverlapPolicy::default(),
            output_root: output_root.into(),
            output_extension: DEFAULT_OUTPUT_EXTENSION.to_string(),
            metadata: ClipMetadata::new(),
            seed: None,
        }
    }

    #[must_use]
    pub const fn with_files_requested(mut self, files_requested: usize) -> Self {
        self.files_requested = files_requested;
        self
    }

    #[must_use]
    pub const fn with_selection(mut self, selection: SelectionMode) -> Self {
        self.selection = selection;
        self
    }

    /// 片段幾何：長度、每個影片的片段數、頭尾保留秒數
    #[must_use]
    pub const fn with_geometry(mut self, clip_length: f64, clips_per_file: u32, margin: f64) -> Self {
        self.clip_length = clip_length;
        self.clips_per_file = clips_per_file;
        self.margin = margin;
        self
    }

    #[must_use]
    pub const fn with_overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    #[must_use]
    pub fn with_output_extension(mut self, extension: &str) -> Self {
        self.output_extension = extension.trim().trim_start_matches('.').to_string();
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: ClipMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    #[must_use]
    pub const fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// 實際會處理的影片數量
    #[must_use]
    pub fn files_to_process(&self) -> usize {
        self.files_requested.min(self.sources.len())
    }

    /// 在碰觸任何檔案之前檢查參數
    pub fn validate(&self) -> Result<(), SplitError> {
        if !self.clip_length.is_finite() || self.clip_length <= 0.0 {
            return Err(SplitError::invalid(format!(
                "片段長度必須大於 0: {}",
                self.clip_length
            )));
        }
        if !self.margin.is_finite() || self.margin <= 0.0 {
            return Err(SplitError::invalid(format!(
                "頭尾保留秒數必須大於 0: {}",
                self.margin
            )));
        }
        if self.clips_per_file == 0 {
            return Err(SplitError::invalid("每個影片至少要有 1 個片段"));
        }
        if self.files_requested == 0 {
            return Err(SplitError::invalid("至少要處理 1 個影片"));
        }
        if self.sources.is_empty() {
            return Err(SplitError::invalid("沒有可處理的影片"));
        }
        if self.output_extension.is_empty() {
            return Err(SplitError::invalid("輸出副檔名不可為空"));
        }
        if self.output_root.as_os_str().is_empty() {
            return Err(SplitError::invalid("未指定輸出資料夾"));
        }
        if self.output_root.exists() && !self.output_root.is_dir() {
            return Err(SplitError::invalid(format!(
                "輸出路徑不是資料夾: {}",
                self.output_root.display()
            )));
        }
        Ok(())
    }
}

/// 建立輸出資料夾（已存在時不做任何事）並確認可寫入
///
/// 權限位元無法反映擁有者與 root 的差異，因此實際建立一個檔案再刪除
fn prepare_output_root(output_root: &Path) -> Result<(), SplitError> {
    ensure_directory_exists(output_root).map_err(|e| SplitError::invalid(format!("{e:#}")))?;

    let marker = output_root.join(format!(".write_check_{}", std::process::id()));
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&marker)
        .map_err(|e| {
            SplitError::invalid(format!("輸出資料夾無法寫入 {}: {e}", output_root.display()))
        })?;
    if let Err(e) = fs::remove_file(&marker) {
        warn!("無法刪除寫入測試檔 {}: {e}", marker.display());
    }
    Ok(())
}

fn job_rng(job: &BatchJob) -> StdRng {
    job.seed
        .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64)
}

/// 要求數量超過可用檔案時的調整紀錄
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionClamp {
    pub requested: usize,
    pub available: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub files: Vec<SourceFile>,
    pub clamped: Option<SelectionClamp>,
}

/// 挑選要處理的影片
///
/// 要求數量大於可用數量時改為全部處理並記錄調整，不視為錯誤
pub fn select_sources<R: Rng + ?Sized>(
    sources: &[SourceFile],
    requested: usize,
    mode: SelectionMode,
    rng: &mut R,
) -> Selection {
    let available = sources.len();
    let count = requested.min(available);
    let clamped = (requested > available).then_some(SelectionClamp {
        requested,
        available,
    });

    let files = match mode {
        SelectionMode::Random => rand::seq::index::sample(rng, available, count)
            .into_vec()
            .into_iter()
            .map(|i| sources[i].clone())
            .collect(),
        SelectionMode::InOrder => sources.iter().take(count).cloned().collect(),
    };

    Selection { files, clamped }
}

/// 批次統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub files_selected: usize,
    pub files_completed: usize,
    pub files_skipped: usize,
    pub clips_extracted: usize,
    pub clips_failed: usize,
    /// 成功的片段中，覆蓋了本批次先前輸出的數量
    pub clips_replaced: usize,
    pub cancelled: bool,
}

impl BatchSummary {
    /// 實際留在輸出資料夾中的片段數
    #[must_use]
    pub const fn clips_on_disk(&self) -> usize {
        self.clips_extracted - self.clips_replaced
    }

    fn add(&mut self, tally: ClipTally) {
        self.clips_extracted += tally.extracted as usize;
        self.clips_failed += tally.failed as usize;
        self.clips_replaced += tally.replaced as usize;
    }
}

/// 批次進度事件，依發生順序送出
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    SelectionClamped {
        requested: usize,
        available: usize,
    },
    Started {
        files: usize,
        clips_per_file: u32,
    },
    FileStarted {
        position: usize,
        total: usize,
        source: PathBuf,
    },
    /// `replaced` 為 true 代表輸出檔名與本批次較早的片段相同，先前的片段已被覆蓋
    ClipExtracted {
        source: PathBuf,
        index: u32,
        output: PathBuf,
        replaced: bool,
    },
    ClipFailed {
        source: PathBuf,
        index: u32,
        error: SplitError,
    },
    /// 長度探測或片段規劃失敗，整個影片跳過
    FileSkipped {
        source: PathBuf,
        error: SplitError,
    },
    FileCompleted {
        source: PathBuf,
        extracted: u32,
        failed: u32,
    },
    Cancelled {
        remaining_files: usize,
    },
    /// 最後一個事件，即使全部失敗也一定會送出
    Completed(BatchSummary),
}

impl BatchEvent {
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::ClipFailed { .. } | Self::FileSkipped { .. })
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().to_string())
}

impl fmt::Display for BatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelectionClamped {
                requested,
                available,
            } => write!(
                f,
                "要求處理 {requested} 個影片，但只找到 {available} 個，改為處理 {available} 個"
            ),
            Self::Started {
                files,
                clips_per_file,
            } => write!(f, "開始處理 {files} 個影片，每個影片 {clips_per_file} 個片段"),
            Self::FileStarted {
                position,
                total,
                source,
            } => write!(f, "[{position}/{total}] 處理中: {}", display_name(source)),
            Self::ClipExtracted {
                index,
                output,
                replaced,
                ..
            } => {
                write!(f, "  片段 {index} 已建立: {}", display_name(output))?;
                if *replaced {
                    write!(f, "（覆蓋了同名的片段）")?;
                }
                Ok(())
            }
            Self::ClipFailed {
                source,
                index,
                error,
            } => write!(f, "  片段 {index} 失敗 ({}): {error}", display_name(source)),
            Self::FileSkipped { source, error } => {
                write!(f, "跳過 {}: {error}", display_name(source))
            }
            Self::FileCompleted {
                source,
                extracted,
                failed,
            } => write!(
                f,
                "完成: {}（成功 {extracted}，失敗 {failed}）",
                display_name(source)
            ),
            Self::Cancelled { remaining_files } => {
                write!(f, "收到中斷信號，尚有 {remaining_files} 個影片未處理")
            }
            Self::Completed(summary) => {
                write!(
                    f,
                    "處理完成 - 影片: 完成 {} / 跳過 {}，片段: 成功 {} / 失敗 {}",
                    summary.files_completed,
                    summary.files_skipped,
                    summary.clips_extracted,
                    summary.clips_failed
                )?;
                if summary.clips_replaced > 0 {
                    write!(f, "，其中 {} 個覆蓋了同名片段", summary.clips_replaced)?;
                }
                Ok(())
            }
        }
    }
}

/// 單一影片的處理階段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileStage {
    Pending,
    Probing,
    Planning,
    Extracting(u32),
    Completed,
    Errored,
}

fn advance(stage: &mut FileStage, next: FileStage, source: &Path) {
    debug!("{}: {:?} -> {:?}", display_name(source), stage, next);
    *stage = next;
}

#[derive(Debug, Clone, Copy, Default)]
struct ClipTally {
    extracted: u32,
    failed: u32,
    replaced: u32,
}

enum FileOutcome {
    Completed(ClipTally),
    Skipped,
    Interrupted(ClipTally),
}

/// 批次流程：挑選影片，逐一探測長度、規劃片段、擷取片段
///
/// 單一影片或片段的失敗只會產生錯誤事件，不會中止整批工作；
/// 所有處理都在同一個執行緒內依序進行
pub struct BatchOrchestrator<P, E> {
    probe: P,
    extractor: E,
    shutdown_signal: Arc<AtomicBool>,
}

impl<P: DurationProbe, E: ClipExtractor> BatchOrchestrator<P, E> {
    pub const fn new(probe: P, extractor: E, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            probe,
            extractor,
            shutdown_signal,
        }
    }

    /// 同步執行整批工作，事件依序交給 `sink`
    ///
    /// 只有參數無效時回傳錯誤，此時不會送出任何事件
    pub fn run<R, F>(
        &self,
        job: &BatchJob,
        rng: &mut R,
        mut sink: F,
    ) -> Result<BatchSummary, SplitError>
    where
        R: Rng + ?Sized,
        F: FnMut(BatchEvent),
    {
        job.validate()?;
        prepare_output_root(&job.output_root)?;
        Ok(self.execute(job, rng, &mut sink))
    }

    /// 使用工作指定的種子（或系統亂數）執行
    pub fn run_with_seed<F>(&self, job: &BatchJob, sink: F) -> Result<BatchSummary, SplitError>
    where
        F: FnMut(BatchEvent),
    {
        let mut rng = job_rng(job);
        self.run(job, &mut rng, sink)
    }

    fn is_cancelled(&self) -> bool {
        self.shutdown_signal.load(Ordering::SeqCst)
    }

    fn execute<R, F>(&self, job: &BatchJob, rng: &mut R, sink: &mut F) -> BatchSummary
    where
        R: Rng + ?Sized,
        F: FnMut(BatchEvent),
    {
        let selection = select_sources(&job.sources, job.files_requested, job.selection, rng);

        if let Some(clamp) = selection.clamped {
            warn!(
                "要求處理 {} 個影片，但只有 {} 個可用",
                clamp.requested, clamp.available
            );
            sink(BatchEvent::SelectionClamped {
                requested: clamp.requested,
                available: clamp.available,
            });
        }

        let total = selection.files.len();
        let mut summary = BatchSummary {
            files_selected: total,
            ..BatchSummary::default()
        };

        info!(
            "開始隨機剪輯，共 {total} 個影片，每個 {} 個片段",
            job.clips_per_file
        );
        sink(BatchEvent::Started {
            files: total,
            clips_per_file: job.clips_per_file,
        });

        let mut written_outputs = HashSet::new();

        for (position, source) in selection.files.iter().enumerate() {
            if self.is_cancelled() {
                summary.cancelled = true;
                sink(BatchEvent::Cancelled {
                    remaining_files: total - position,
                });
                break;
            }

            sink(BatchEvent::FileStarted {
                position: position + 1,
                total,
                source: source.path.clone(),
            });

            let stem = source.path.file_stem().map_or_else(
                || format!("clip_{}", position + 1),
                |s| s.to_string_lossy().to_string(),
            );

            match self.process_file(job, source, &stem, &mut written_outputs, rng, sink) {
                FileOutcome::Completed(tally) => {
                    summary.files_completed += 1;
                    summary.add(tally);
                }
                FileOutcome::Skipped => summary.files_skipped += 1,
                FileOutcome::Interrupted(tally) => {
                    summary.add(tally);
                    summary.cancelled = true;
                    sink(BatchEvent::Cancelled {
                        remaining_files: total - position,
                    });
                    break;
                }
            }
        }

        info!(
            "隨機剪輯完成 - 影片: 完成 {}, 跳過 {}; 片段: 成功 {}, 失敗 {}",
            summary.files_completed,
            summary.files_skipped,
            summary.clips_extracted,
            summary.clips_failed
        );
        sink(BatchEvent::Completed(summary));

        summary
    }

    fn process_file<R, F>(
        &self,
        job: &BatchJob,
        source: &SourceFile,
        stem: &str,
        written_outputs: &mut HashSet<PathBuf>,
        rng: &mut R,
        sink: &mut F,
    ) -> FileOutcome
    where
        R: Rng + ?Sized,
        F: FnMut(BatchEvent),
    {
        let path = source.path.as_path();
        let mut stage = FileStage::Pending;

        advance(&mut stage, FileStage::Probing, path);
        let duration = match self.probe.probe(path) {
            Ok(duration) if duration.is_finite() && duration > 0.0 => duration,
            Ok(duration) => {
                let error = SplitError::unreadable(path, format!("影片長度無效: {duration}"));
                return Self::skip_file(&mut stage, path, error, sink);
            }
            Err(e) => return Self::skip_file(&mut stage, path, e, sink),
        };
        debug!("{}: 長度 {duration:.2}s", display_name(path));

        advance(&mut stage, FileStage::Planning, path);
        let clips = match plan(
            duration,
            job.clip_length,
            job.clips_per_file,
            job.margin,
            job.overlap,
            rng,
        ) {
            Ok(clips) => clips,
            Err(e) => return Self::skip_file(&mut stage, path, e, sink),
        };

        let mut tally = ClipTally::default();

        for spec in &clips {
            if self.is_cancelled() {
                warn!("收到中斷信號，停止處理 {}", display_name(path));
                return FileOutcome::Interrupted(tally);
            }

            advance(&mut stage, FileStage::Extracting(spec.index), path);
            let output = job
                .output_root
                .join(clip_file_name(stem, spec.index, &job.output_extension));
            let request = ClipRequest {
                source: path,
                spec,
                output: &output,
                metadata: &job.metadata,
            };

            match self.extractor.extract(&request) {
                Ok(()) => {
                    tally.extracted += 1;
                    let replaced = !written_outputs.insert(output.clone());
                    if replaced {
                        tally.replaced += 1;
                        warn!("片段覆蓋了本批次先前的輸出: {}", output.display());
                    }
                    info!(
                        "片段完成 [{:.2}s - {:.2}s]: {}",
                        spec.start,
                        spec.end,
                        output.display()
                    );
                    sink(BatchEvent::ClipExtracted {
                        source: path.to_path_buf(),
                        index: spec.index,
                        output,
                        replaced,
                    });
                }
                Err(e) => {
                    tally.failed += 1;
                    error!("片段失敗 {} #{}: {e}", path.display(), spec.index);
                    sink(BatchEvent::ClipFailed {
                        source: path.to_path_buf(),
                        index: spec.index,
                        error: e,
                    });
                }
            }
        }

        advance(&mut stage, FileStage::Completed, path);
        sink(BatchEvent::FileCompleted {
            source: path.to_path_buf(),
            extracted: tally.extracted,
            failed: tally.failed,
        });

        FileOutcome::Completed(tally)
    }

    fn skip_file<F>(stage: &mut FileStage, path: &Path, error: SplitError, sink: &mut F) -> FileOutcome
    where
        F: FnMut(BatchEvent),
    {
        warn!("跳過 {} ({:?} 階段): {error}", path.display(), stage);
        advance(stage, FileStage::Errored, path);
        sink(BatchEvent::FileSkipped {
            source: path.to_path_buf(),
            error,
        });
        FileOutcome::Skipped
    }
}

impl<P, E> BatchOrchestrator<P, E>
where
    P: DurationProbe + Send + 'static,
    E: ClipExtractor + Send + 'static,
{
    /// 在背景執行緒執行整批工作
    ///
    /// 參數檢查在呼叫端執行緒完成，無效時直接回傳錯誤、不會啟動執行緒
    pub fn spawn(self, job: BatchJob) -> Result<BatchHandle, SplitError> {
        job.validate()?;
        prepare_output_root(&job.output_root)?;

        let (sender, receiver) = unbounded();
        let worker = thread::spawn(move || {
            let mut rng = job_rng(&job);
            self.execute(&job, &mut rng, &mut |event: BatchEvent| {
                // 接收端已關閉時只是沒有人看進度，工作照常完成
                let _ = sender.send(event);
            })
        });

        Ok(BatchHandle {
            events: receiver,
            worker,
        })
    }
}

/// 背景批次工作的事件接收端
pub struct BatchHandle {
    events: Receiver<BatchEvent>,
    worker: JoinHandle<BatchSummary>,
}

impl BatchHandle {
    /// 依序取得事件，背景工作結束後迭代器停止
    pub fn events(&self) -> crossbeam_channel::Iter<'_, BatchEvent> {
        self.events.iter()
    }

    pub fn join(self) -> thread::Result<BatchSummary> {
        self.worker.join()
    }
}
