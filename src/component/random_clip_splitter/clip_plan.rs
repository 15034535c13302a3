use super::error::SplitError;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// 同一支影片內的片段是否允許重疊
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverlapPolicy {
    /// 每個片段各自獨立抽樣，可能重疊
    #[default]
    Allow,
    /// 片段依時間排序且互不重疊
    Avoid,
}

/// 單一片段的時間範圍，`index` 從 1 開始，用於輸出檔名
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipSpec {
    pub index: u32,
    pub start: f64,
    pub end: f64,
}

impl ClipSpec {
    #[must_use]
    pub fn length(&self) -> f64 {
        self.end - self.start
    }
}

/// 切出片段所需的最短影片長度
#[must_use]
pub fn required_span(clip_length: f64, clip_count: u32, margin: f64, overlap: OverlapPolicy) -> f64 {
    match overlap {
        OverlapPolicy::Allow => 2.0 * margin + clip_length,
        OverlapPolicy::Avoid => 2.0 * margin + f64::from(clip_count) * clip_length,
    }
}

/// 規劃隨機片段
///
/// 起點在 `[margin, source_duration - clip_length - margin]` 內均勻抽樣，
/// 影片太短時回傳 `InsufficientDuration`，不會截短片段。
/// 片段長度、保留秒數或影片長度不是有限正數時回傳 `InvalidJobParameters`
pub fn plan<R: Rng + ?Sized>(
    source_duration: f64,
    clip_length: f64,
    clip_count: u32,
    margin: f64,
    overlap: OverlapPolicy,
    rng: &mut R,
) -> Result<Vec<ClipSpec>, SplitError> {
    if !is_positive_finite(clip_length) {
        return Err(SplitError::invalid(format!("片段長度必須大於 0: {clip_length}")));
    }
    if !is_positive_finite(margin) {
        return Err(SplitError::invalid(format!("頭尾保留秒數必須大於 0: {margin}")));
    }
    // 無限長度會讓抽樣範圍失去上界
    if source_duration.is_infinite() {
        return Err(SplitError::invalid(format!("影片長度無效: {source_duration}")));
    }

    let required = required_span(clip_length, clip_count, margin, overlap);

    // 以 !(>=) 判斷，NaN 也會被擋下
    if !(source_duration >= required) {
        return Err(SplitError::InsufficientDuration {
            duration: source_duration,
            required,
        });
    }

    let clips = match overlap {
        OverlapPolicy::Allow => {
            let latest_start = source_duration - clip_length - margin;
            (1..=clip_count)
                .map(|index| {
                    let start = draw(rng, margin, latest_start);
                    ClipSpec {
                        index,
                        start,
                        end: start + clip_length,
                    }
                })
                .collect()
        }
        OverlapPolicy::Avoid => {
            // 把多餘的時間隨機分配到片段之間
            let slack = source_duration - required;
            let mut offsets: Vec<f64> = (0..clip_count).map(|_| draw(rng, 0.0, slack)).collect();
            offsets.sort_by(f64::total_cmp);

            offsets
                .iter()
                .zip(1..=clip_count)
                .map(|(offset, index)| {
                    let start = margin + offset + f64::from(index - 1) * clip_length;
                    ClipSpec {
                        index,
                        start,
                        end: start + clip_length,
                    }
                })
                .collect()
        }
    };

    Ok(clips)
}

fn is_positive_finite(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn draw<R: Rng + ?Sized>(rng: &mut R, low: f64, high: f64) -> f64 {
    if high > low {
        rng.random_range(low..=high)
    } else {
        low
    }
}

/// 輸出檔名：`{stem} - {index}.{ext}`
#[must_use]
pub fn clip_file_name(stem: &str, index: u32, extension: &str) -> String {
    format!("{stem} - {index}.{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const EPSILON: f64 = 1e-9;

    fn assert_within_bounds(clips: &[ClipSpec], duration: f64, clip_length: f64, margin: f64) {
        for clip in clips {
            assert!(clip.start >= margin, "start {} < margin {}", clip.start, margin);
            assert!(
                clip.end + margin <= duration + EPSILON,
                "end {} + margin {} > duration {}",
                clip.end,
                margin,
                duration
            );
            assert!((clip.length() - clip_length).abs() < EPSILON);
        }
    }

    #[test]
    fn test_plan_returns_requested_count_within_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        for step in 0..200 {
            let clip_length = 5.0 + f64::from(step % 7) * 3.5;
            let margin = 1.0 + f64::from(step % 5) * 10.0;
            let duration = 2.0 * margin + clip_length + f64::from(step) * 1.25;
            let count = 1 + step % 9;

            let clips =
                plan(duration, clip_length, count, margin, OverlapPolicy::Allow, &mut rng).unwrap();

            assert_eq!(clips.len(), count as usize);
            assert_within_bounds(&clips, duration, clip_length, margin);
        }
    }

    #[test]
    fn test_plan_indices_are_one_based_and_ordered() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let clips = plan(1000.0, 30.0, 4, 10.0, OverlapPolicy::Allow, &mut rng).unwrap();

        let indices: Vec<u32> = clips.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_plan_exact_boundary_has_single_start() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let clips = plan(300.0, 60.0, 3, 120.0, OverlapPolicy::Allow, &mut rng).unwrap();

        assert_eq!(clips.len(), 3);
        for clip in &clips {
            assert!((clip.start - 120.0).abs() < EPSILON);
            assert!((clip.end - 180.0).abs() < EPSILON);
        }
    }

    #[test]
    fn test_plan_too_short_fails_with_no_clips() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let result = plan(299.0, 60.0, 3, 120.0, OverlapPolicy::Allow, &mut rng);

        match result {
            Err(SplitError::InsufficientDuration { duration, required }) => {
                assert!((duration - 299.0).abs() < EPSILON);
                assert!((required - 300.0).abs() < EPSILON);
            }
            other => panic!("預期 InsufficientDuration，實際為 {other:?}"),
        }
    }

    #[test]
    fn test_plan_short_durations_always_fail() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for tenth in 0..100 {
            let duration = f64::from(tenth) * 0.1;
            assert!(plan(duration, 5.0, 2, 3.0, OverlapPolicy::Allow, &mut rng).is_err());
        }
        assert!(plan(f64::NAN, 5.0, 2, 3.0, OverlapPolicy::Allow, &mut rng).is_err());
    }

    #[test]
    fn test_plan_infinite_duration_is_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);

        for overlap in [OverlapPolicy::Allow, OverlapPolicy::Avoid] {
            assert!(matches!(
                plan(f64::INFINITY, 10.0, 1, 5.0, overlap, &mut rng),
                Err(SplitError::InvalidJobParameters(_))
            ));
        }
        assert!(plan(f64::NEG_INFINITY, 10.0, 1, 5.0, OverlapPolicy::Allow, &mut rng).is_err());
    }

    #[test]
    fn test_plan_rejects_non_positive_geometry() {
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        let cases = [
            (0.0, 5.0),
            (-10.0, 5.0),
            (f64::NAN, 5.0),
            (10.0, 0.0),
            (10.0, -1.0),
            (10.0, f64::INFINITY),
        ];

        for (clip_length, margin) in cases {
            assert!(
                matches!(
                    plan(600.0, clip_length, 2, margin, OverlapPolicy::Allow, &mut rng),
                    Err(SplitError::InvalidJobParameters(_))
                ),
                "clip_length={clip_length}, margin={margin} 應該被拒絕"
            );
        }
    }

    #[test]
    fn test_plan_same_seed_same_clips() {
        let first = plan(600.0, 20.0, 5, 30.0, OverlapPolicy::Allow, &mut ChaCha8Rng::seed_from_u64(9))
            .unwrap();
        let second =
            plan(600.0, 20.0, 5, 30.0, OverlapPolicy::Allow, &mut ChaCha8Rng::seed_from_u64(9))
                .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_plan_avoid_overlap_keeps_clips_apart() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);

        for _ in 0..100 {
            let clips = plan(400.0, 40.0, 6, 20.0, OverlapPolicy::Avoid, &mut rng).unwrap();

            assert_eq!(clips.len(), 6);
            assert_within_bounds(&clips, 400.0, 40.0, 20.0);
            for pair in clips.windows(2) {
                assert!(pair[1].start >= pair[0].end - EPSILON);
                assert_eq!(pair[1].index, pair[0].index + 1);
            }
        }
    }

    #[test]
    fn test_plan_avoid_overlap_needs_room_for_every_clip() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        // Allow 模式可以，但 Avoid 模式需要 2*20 + 6*40 = 280 秒
        assert!(plan(279.0, 40.0, 6, 20.0, OverlapPolicy::Allow, &mut rng).is_ok());
        assert!(matches!(
            plan(279.0, 40.0, 6, 20.0, OverlapPolicy::Avoid, &mut rng),
            Err(SplitError::InsufficientDuration { .. })
        ));
    }

    #[test]
    fn test_clip_file_name() {
        let names: Vec<String> = (1..=3).map(|i| clip_file_name("movie", i, "mp4")).collect();
        assert_eq!(names, vec!["movie - 1.mp4", "movie - 2.mp4", "movie - 3.mp4"]);
    }
}
