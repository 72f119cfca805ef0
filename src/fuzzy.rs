//! Approximate substring matching for file name searches.
//!
//! Scores follow the usual "partial ratio" idea: slide the shorter string
//! across the longer one, score each alignment by how many characters the two
//! sides share in order, and keep the best alignment. A query with a typo or a
//! few missing letters still lands close to 100 against the right file name.

/// Default minimum score for a fuzzy match.
pub const DEFAULT_THRESHOLD: u8 = 60;

/// Returns true when `pattern` matches `candidate` closely enough.
///
/// Matching is case-insensitive. An empty pattern matches everything, and a
/// literal substring matches without scoring.
///
/// # Examples
///
/// ```
/// use dropclear::fuzzy::matches;
///
/// assert!(matches("Quarterly-Report.pdf", "report", 60));
/// assert!(matches("Quarterly-Report.pdf", "reprot", 60));
/// assert!(!matches("holiday.jpg", "invoice", 60));
/// ```
pub fn matches(candidate: &str, pattern: &str, threshold: u8) -> bool {
    if pattern.is_empty() {
        return true;
    }
    let candidate = candidate.to_lowercase();
    let pattern = pattern.to_lowercase();
    if candidate.contains(&pattern) {
        return true;
    }
    partial_ratio(&candidate, &pattern) >= threshold
}

/// Best alignment score between the shorter and the longer string, 0 to 100.
///
/// Case-sensitive; [`matches`] lowercases before calling it.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    if short.is_empty() {
        return if long.is_empty() { 100 } else { 0 };
    }

    let n = short.len() as isize;
    let m = long.len() as isize;
    let mut best = 0.0_f64;

    // Windows hang off either end so that a query overlapping the start or
    // the end of the candidate still gets scored.
    for start in (1 - n)..m {
        let from = start.max(0) as usize;
        let to = (start + n).min(m) as usize;
        let score = ratio(&short, &long[from..to]);
        if score > best {
            best = score;
            if best >= 100.0 {
                break;
            }
        }
    }

    best.round() as u8
}

/// Indel similarity of two character sequences, 0.0 to 100.0.
fn ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(a, b) as f64 / total as f64
}

/// Length of the longest common subsequence.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut row = vec![0usize; b.len() + 1];
    for &ca in a {
        let mut diagonal = 0;
        for (j, &cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb {
                diagonal + 1
            } else {
                above.max(row[j])
            };
            diagonal = above;
        }
    }
    row[b.len()]
}
