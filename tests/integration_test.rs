//! 整合測試 - 以假的探測器與擷取器驗證掃描、挑選與輸出流程
//!
//! 不需要 ffmpeg，擷取器直接寫出空白檔案

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use random_clip_splitter::component::random_clip_splitter::{
    BatchEvent, BatchJob, BatchOrchestrator, ClipExtractor, ClipMetadata, ClipRequest,
    DurationProbe, OverlapPolicy, SelectionMode, SplitError,
};
use random_clip_splitter::config::FileTypeTable;
use random_clip_splitter::tools::scan_video_files;
use tempfile::TempDir;

/// 依檔名回傳長度，找不到的檔案視為無法讀取
struct NamedDurations(HashMap<String, f64>);

impl DurationProbe for NamedDurations {
    fn probe(&self, path: &Path) -> Result<f64, SplitError> {
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        self.0
            .get(&name)
            .copied()
            .ok_or_else(|| SplitError::unreadable(path, "moov atom not found"))
    }
}

/// 寫出片段檔並記錄每個片段的時間範圍
#[derive(Clone, Default)]
struct WritingExtractor {
    written: Arc<Mutex<Vec<(PathBuf, f64, f64)>>>,
}

impl ClipExtractor for WritingExtractor {
    fn extract(&self, request: &ClipRequest<'_>) -> Result<(), SplitError> {
        let tags: Vec<String> = request
            .metadata
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        fs::write(request.output, tags.join("\n"))
            .map_err(|e| SplitError::transcode_failed(e.to_string()))?;
        self.written.lock().unwrap().push((
            request.output.to_path_buf(),
            request.spec.start,
            request.spec.end,
        ));
        Ok(())
    }
}

fn video_table() -> FileTypeTable {
    FileTypeTable {
        video_file: vec![".mp4".to_string(), ".mkv".to_string()],
    }
}

fn create_library(root: &Path) {
    fs::create_dir_all(root.join("season 1")).unwrap();
    fs::write(root.join("pilot.mp4"), b"video").unwrap();
    fs::write(root.join("season 1").join("episode.mkv"), b"video").unwrap();
    fs::write(root.join("season 1").join("broken.mp4"), b"video").unwrap();
    fs::write(root.join("notes.txt"), b"not a video").unwrap();
}

fn durations() -> NamedDurations {
    NamedDurations(HashMap::from([
        ("pilot.mp4".to_string(), 1800.0),
        ("episode.mkv".to_string(), 1500.0),
    ]))
}

#[test]
fn test_scanned_library_produces_named_clips() {
    let temp_dir = TempDir::new().unwrap();
    let library = temp_dir.path().join("library");
    let output_root = temp_dir.path().join("splits");
    create_library(&library);

    let sources = scan_video_files(&library, &video_table(), true).unwrap();
    assert_eq!(sources.len(), 3);

    let extractor = WritingExtractor::default();
    let written = Arc::clone(&extractor.written);
    let orchestrator =
        BatchOrchestrator::new(durations(), extractor, Arc::new(AtomicBool::new(false)));
    let job = BatchJob::new(sources, &output_root)
        .with_geometry(59.0, 5, 59.0)
        .with_metadata(ClipMetadata::from_tag("Abobi", "2000-06-27"));

    let mut events = Vec::new();
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let summary = orchestrator
        .run(&job, &mut rng, |event| events.push(event))
        .unwrap();

    assert_eq!(summary.files_selected, 3);
    assert_eq!(summary.files_completed, 2);
    assert_eq!(summary.files_skipped, 1);
    assert_eq!(summary.clips_extracted, 10);
    assert_eq!(summary.clips_failed, 0);

    for stem in ["pilot", "episode"] {
        for index in 1..=5 {
            let clip = output_root.join(format!("{stem} - {index}.mp4"));
            assert!(clip.exists(), "缺少 {}", clip.display());
            let content = fs::read_to_string(&clip).unwrap();
            assert!(content.contains("artist=Abobi"));
            assert!(content.contains("comment=Created by Abobi"));
            assert!(content.contains("date=2000-06-27"));
        }
    }
    assert!(!output_root.join("broken - 1.mp4").exists());

    for (path, start, end) in written.lock().unwrap().iter() {
        let duration = if path.to_string_lossy().contains("pilot") {
            1800.0
        } else {
            1500.0
        };
        assert!(*start >= 59.0);
        assert!(end + 59.0 <= duration + 1e-9);
        assert!((end - start - 59.0).abs() < 1e-9);
    }

    assert!(matches!(events.first(), Some(BatchEvent::Started { files: 3, .. })));
    assert!(matches!(events.last(), Some(BatchEvent::Completed(s)) if *s == summary));
}

#[test]
fn test_flat_scan_and_in_order_selection() {
    let temp_dir = TempDir::new().unwrap();
    let library = temp_dir.path().join("library");
    create_library(&library);

    let sources = scan_video_files(&library, &video_table(), false).unwrap();
    assert_eq!(sources.len(), 1, "只掃描第一層時不應包含子資料夾");

    let orchestrator = BatchOrchestrator::new(
        durations(),
        WritingExtractor::default(),
        Arc::new(AtomicBool::new(false)),
    );
    let job = BatchJob::new(sources, temp_dir.path().join("out"))
        .with_files_requested(4)
        .with_selection(SelectionMode::InOrder)
        .with_geometry(30.0, 3, 60.0)
        .with_overlap(OverlapPolicy::Avoid);

    let mut events = Vec::new();
    let summary = orchestrator
        .run(&job, &mut ChaCha8Rng::seed_from_u64(1), |e| events.push(e))
        .unwrap();

    assert_eq!(
        events.first(),
        Some(&BatchEvent::SelectionClamped {
            requested: 4,
            available: 1
        })
    );
    assert_eq!(summary.clips_extracted, 3);
}

#[test]
fn test_same_seed_reproduces_the_same_batch() {
    let temp_dir = TempDir::new().unwrap();
    let library = temp_dir.path().join("library");
    create_library(&library);
    let sources = scan_video_files(&library, &video_table(), true).unwrap();

    let run_once = |output: PathBuf| {
        let extractor = WritingExtractor::default();
        let written = Arc::clone(&extractor.written);
        let orchestrator =
            BatchOrchestrator::new(durations(), extractor, Arc::new(AtomicBool::new(false)));
        let job = BatchJob::new(sources.clone(), &output)
            .with_files_requested(2)
            .with_geometry(20.0, 4, 30.0)
            .with_seed(Some(77));
        orchestrator.run_with_seed(&job, |_| {}).unwrap();

        let clips: Vec<(String, f64)> = written
            .lock()
            .unwrap()
            .iter()
            .map(|(path, start, _)| {
                (
                    path.file_name().unwrap().to_string_lossy().to_string(),
                    *start,
                )
            })
            .collect();
        clips
    };

    let first = run_once(temp_dir.path().join("first"));
    let second = run_once(temp_dir.path().join("second"));
    assert_eq!(first, second);
}

#[test]
fn test_background_run_can_be_interrupted() {
    let temp_dir = TempDir::new().unwrap();
    let library = temp_dir.path().join("library");
    create_library(&library);
    let sources = scan_video_files(&library, &video_table(), true).unwrap();

    // 開始前就收到中斷信號，不應產生任何片段
    let shutdown_signal = Arc::new(AtomicBool::new(true));
    let orchestrator = BatchOrchestrator::new(
        durations(),
        WritingExtractor::default(),
        Arc::clone(&shutdown_signal),
    );
    let output_root = temp_dir.path().join("out");
    let handle = orchestrator
        .spawn(BatchJob::new(sources, &output_root).with_seed(Some(3)))
        .unwrap();

    let events: Vec<BatchEvent> = handle.events().collect();
    let summary = handle.join().unwrap();

    assert!(shutdown_signal.load(Ordering::SeqCst));
    assert!(summary.cancelled);
    assert_eq!(summary.clips_extracted, 0);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, BatchEvent::Cancelled { remaining_files: 3 }))
            .count(),
        1
    );
    assert!(matches!(events.last(), Some(BatchEvent::Completed(_))));
    assert_eq!(fs::read_dir(&output_root).unwrap().count(), 0);
}
