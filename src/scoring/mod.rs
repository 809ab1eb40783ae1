//! Shape-score engine: composite lower-is-better metric over a file listing.
//!
//! ```text
//! score = total_files * 10
//!       + total_lines * 0.1
//!       + sum over files with lines > threshold of (lines - threshold)^2 * 0.01
//! ```
//!
//! The quadratic term makes files far beyond the threshold dominate — the
//! point is to punish outsized files much harder than linear growth would.

#![allow(clippy::cast_precision_loss)]

use crate::store::records::FileEntry;

/// Compute the shape score, rounded to 2 decimal places.
///
/// Totals are passed in rather than derived from `files` because callers may
/// have truncated the listing after computing aggregates (or vice versa);
/// the caller owns that ordering decision.
#[must_use]
pub fn shape_score(files: &[FileEntry], total_files: u64, total_lines: u64, threshold: i64) -> f64 {
    let file_penalty = total_files as f64 * 10.0;
    let line_penalty = total_lines as f64 * 0.1;

    let large_file_penalty: f64 = files
        .iter()
        .filter_map(|file| {
            let lines = i64::try_from(file.lines).unwrap_or(i64::MAX);
            (lines > threshold).then(|| {
                let excess = (lines - threshold) as f64;
                excess * excess * 0.01
            })
        })
        .sum();

    round_to(file_penalty + line_penalty + large_file_penalty, 2)
}

/// Average lines per file, rounded to 1 decimal place. Zero when empty.
#[must_use]
pub fn average_lines(total_lines: u64, total_files: u64) -> f64 {
    if total_files == 0 {
        return 0.0;
    }
    round_to(total_lines as f64 / total_files as f64, 1)
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals.try_into().unwrap_or(2));
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, lines: u64) -> FileEntry {
        FileEntry {
            path: path.to_string(),
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            lines,
        }
    }

    #[test]
    fn empty_listing_scores_zero() {
        assert_eq!(shape_score(&[], 0, 0, 100), 0.0);
    }

    #[test]
    fn single_large_file_worked_example() {
        // 1 file * 10 + 150 lines * 0.1 + (150-100)^2 * 0.01 = 10 + 15 + 25
        let files = vec![entry("big.py", 150)];
        assert_eq!(shape_score(&files, 1, 150, 100), 50.0);
    }

    #[test]
    fn two_file_scenario_worked_example() {
        // 2 files * 10 + 300 lines * 0.1 + (250-100)^2 * 0.01 = 20 + 30 + 225
        let files = vec![entry("b.py", 250), entry("a.py", 50)];
        assert_eq!(shape_score(&files, 2, 300, 100), 275.0);
    }

    #[test]
    fn files_at_or_below_threshold_incur_no_quadratic_penalty() {
        let files = vec![entry("a.rs", 100), entry("b.rs", 40)];
        assert_eq!(shape_score(&files, 2, 140, 100), 20.0 + 14.0);
    }

    #[test]
    fn zero_threshold_penalizes_every_file() {
        // (10 - 0)^2 * 0.01 = 1.0 on top of 10 + 1.
        let files = vec![entry("a.rs", 10)];
        assert_eq!(shape_score(&files, 1, 10, 0), 12.0);
    }

    #[test]
    fn negative_threshold_behaves_like_zero_baseline() {
        // excess = 10 - (-10) = 20 → 4.0
        let files = vec![entry("a.rs", 10)];
        assert_eq!(shape_score(&files, 1, 10, -10), 10.0 + 1.0 + 4.0);
    }

    #[test]
    fn result_is_rounded_to_two_decimals() {
        // 1 file, 7 lines: 10 + 0.7 + (7-5)^2*0.01 = 10.74
        let files = vec![entry("a.rs", 7)];
        assert_eq!(shape_score(&files, 1, 7, 5), 10.74);
    }

    #[test]
    fn quadratic_term_dominates_for_outliers() {
        let one_huge = vec![entry("huge.rs", 1100)];
        let many_medium: Vec<FileEntry> =
            (0..10).map(|i| entry(&format!("m{i}.rs"), 110)).collect();
        // Same total lines; the single outlier must score far worse.
        let huge = shape_score(&one_huge, 1, 1100, 100);
        let medium = shape_score(&many_medium, 10, 1100, 100);
        assert!(huge > medium * 5.0, "huge={huge} medium={medium}");
    }

    #[test]
    fn average_lines_rounds_to_one_decimal() {
        assert_eq!(average_lines(0, 0), 0.0);
        assert_eq!(average_lines(300, 2), 150.0);
        assert_eq!(average_lines(100, 3), 33.3);
        assert_eq!(average_lines(200, 3), 66.7);
    }
}
