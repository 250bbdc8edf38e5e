//! Change detection between the last sent frame and a target frame.
//!
//! Dirty keys are grouped into runs in one left to right scan. A run keeps
//! growing over clean gaps as long as the next dirty key still fits in the
//! same report, since a report costs the same whether it carries one key or
//! a full chunk. Trailing clean keys are never included.

use std::ops::Range;

use gmmk_rgb_core::Color;

/// Largest possible per-key delta
pub const MAX_DELTA: u32 = 255 * 3;

/// One contiguous span of keys sent in a single report
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunDiff {
    pub offset: usize,
    pub length: usize,
}

impl RunDiff {
    pub const fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.length
    }
}

/// How the change of a single key is measured
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeltaMetric {
    /// Absolute value of the signed sum of the channel differences.
    /// Opposite channel changes cancel out, so a red to green swap reads as 0.
    #[default]
    ChannelSum,
    /// Sum of the absolute channel differences
    Manhattan,
}

impl DeltaMetric {
    pub fn delta(self, from: Color, to: Color) -> u32 {
        let channels = [
            to.r as i32 - from.r as i32,
            to.g as i32 - from.g as i32,
            to.b as i32 - from.b as i32,
        ];
        match self {
            Self::ChannelSum => channels.iter().sum::<i32>().unsigned_abs(),
            Self::Manhattan => channels.iter().map(|c| c.unsigned_abs()).sum(),
        }
    }
}

/// Delta a key may change by before it counts as dirty
#[inline(always)]
pub fn tolerance(accuracy: f32) -> f32 {
    (1.0 - accuracy) * MAX_DELTA as f32
}

/// Group the keys that differ between `shadow` and `next` into runs of at
/// most `max_run` keys.
pub fn compute_runs(
    shadow: &[Color],
    next: &[Color],
    accuracy: f32,
    max_run: usize,
    metric: DeltaMetric,
) -> Vec<RunDiff> {
    let tolerance = tolerance(accuracy);
    let max_run = max_run.max(1);
    let mut runs = Vec::new();
    let mut open: Option<RunDiff> = None;

    let dirty = shadow
        .iter()
        .zip(next)
        .enumerate()
        .filter(|(_, (from, to))| metric.delta(**from, **to) as f32 > tolerance)
        .map(|(i, _)| i);

    for index in dirty {
        match open {
            // absorb the gap, the key still lands in the same report
            Some(ref mut run) if index - run.offset < max_run => {
                run.length = index - run.offset + 1
            },
            Some(run) => {
                runs.push(run);
                open = Some(RunDiff {
                    offset: index,
                    length: 1,
                });
            },
            None => {
                open = Some(RunDiff {
                    offset: index,
                    length: 1,
                })
            },
        }
    }
    runs.extend(open);
    runs
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn frame(len: usize) -> Vec<Color> {
        vec![Color::WHITE; len]
    }

    #[test]
    fn identical_frames_have_no_runs() {
        let a = frame(126);
        assert!(compute_runs(&a, &a, 1.0, 18, DeltaMetric::ChannelSum).is_empty());
    }

    #[test]
    fn separate_spans() {
        let shadow = frame(126);
        let mut next = shadow.clone();
        next[0..5].fill(Color::RED);
        next[100] = Color::BLUE;
        let runs = compute_runs(&shadow, &next, 1.0, 18, DeltaMetric::ChannelSum);
        assert_eq!(
            runs,
            vec![
                RunDiff {
                    offset: 0,
                    length: 5
                },
                RunDiff {
                    offset: 100,
                    length: 1
                },
            ]
        );
    }

    #[test]
    fn gaps_are_filled_within_a_report() {
        let shadow = frame(126);
        let mut next = shadow.clone();
        next[10] = Color::BLACK;
        next[20] = Color::BLACK;
        next[27] = Color::BLACK;
        next[28] = Color::BLACK;
        let runs = compute_runs(&shadow, &next, 1.0, 18, DeltaMetric::ChannelSum);
        assert_eq!(
            runs,
            vec![
                RunDiff {
                    offset: 10,
                    length: 18
                },
                RunDiff {
                    offset: 28,
                    length: 1
                },
            ]
        );
    }

    #[test]
    fn long_span_is_split() {
        let shadow = frame(126);
        let next = vec![Color::BLACK; 126];
        let runs = compute_runs(&shadow, &next, 1.0, 18, DeltaMetric::ChannelSum);
        assert_eq!(runs.len(), 7);
        assert!(runs.iter().all(|r| r.length == 18));
    }

    #[test]
    fn accuracy_tolerates_small_changes() {
        let shadow = frame(4);
        let mut next = shadow.clone();
        next[1] = Color::new(250, 250, 250); // delta 15
        next[2] = Color::new(0, 0, 0); // delta 765
        assert_eq!(
            compute_runs(&shadow, &next, 1.0, 18, DeltaMetric::ChannelSum).len(),
            1
        );
        let runs = compute_runs(&shadow, &next, 0.9, 18, DeltaMetric::ChannelSum);
        assert_eq!(
            runs,
            vec![RunDiff {
                offset: 2,
                length: 1
            }]
        );
        assert!(compute_runs(&shadow, &next, 0.0, 18, DeltaMetric::ChannelSum).is_empty());
    }

    #[test]
    fn channel_sum_cancels_opposite_changes() {
        let shadow = vec![Color::RED];
        let next = vec![Color::GREEN];
        assert!(compute_runs(&shadow, &next, 1.0, 18, DeltaMetric::ChannelSum).is_empty());
        assert_eq!(
            compute_runs(&shadow, &next, 1.0, 18, DeltaMetric::Manhattan).len(),
            1
        );
        assert_eq!(DeltaMetric::Manhattan.delta(Color::RED, Color::GREEN), 510);
    }

    proptest! {
        #[test]
        fn runs_cover_every_dirty_key_once(
            dirty in proptest::collection::vec(any::<bool>(), 126),
            max_run in 1usize..=18,
        ) {
            let shadow = frame(126);
            let next: Vec<Color> = dirty
                .iter()
                .map(|d| if *d { Color::BLACK } else { Color::WHITE })
                .collect();
            let runs = compute_runs(&shadow, &next, 1.0, max_run, DeltaMetric::ChannelSum);

            let mut covered = vec![false; 126];
            let mut last_end = 0;
            for run in &runs {
                prop_assert!(run.length >= 1 && run.length <= max_run);
                prop_assert!(run.offset >= last_end, "runs overlap or are unordered");
                // runs start and end on dirty keys
                prop_assert!(dirty[run.offset]);
                prop_assert!(dirty[run.offset + run.length - 1]);
                for i in run.range() {
                    covered[i] = true;
                }
                last_end = run.offset + run.length;
            }
            for (i, d) in dirty.iter().enumerate() {
                if *d {
                    prop_assert!(covered[i], "dirty key {} not covered", i);
                }
            }
        }
    }
}
