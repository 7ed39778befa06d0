use rayon::prelude::*;
use tracing::debug;

use ecb_core::text_utils::char_to_byte;
use ecb_core::{CutoffPoint, Entry, Page};

use crate::config::FuzzyParams;
use crate::line_mid::MONTH_ABBREVIATIONS;
use crate::strategy::{BoundaryStrategy, slice_page};

use super::peaks::{find_peaks, plateau};
use super::similarity::{BigramProfile, similarity};

/// A fixed-width window of page text.
#[derive(Debug, Clone)]
pub struct Segment {
    /// Body page the window was cut from (0-based).
    pub page: usize,
    /// Char offset of the window within the page.
    pub start: usize,
    pub text: String,
}

#[derive(Debug, Clone)]
struct MonthTarget {
    text: String,
    profile: BigramProfile,
}

/// Locates entry ends by scanning pages for strings resembling "Month YY".
///
/// OCR often mangles the closing date so badly that the terminator pattern
/// misses it. This slides a window over each page, scores every window
/// against each month target by bigram cosine similarity, and takes
/// acceptable peaks as entry ends. The cut is refined by trimming the last
/// window of a peak's plateau from the right while the score improves.
#[derive(Debug, Clone)]
pub struct FuzzyLocator {
    targets: Vec<MonthTarget>,
    params: FuzzyParams,
}

impl FuzzyLocator {
    pub fn new(year: &str, params: FuzzyParams) -> Self {
        let targets = MONTH_ABBREVIATIONS
            .iter()
            .map(|month| {
                let text = format!("{} {}", month, year);
                let profile = BigramProfile::new(&text);
                MonthTarget { text, profile }
            })
            .collect();
        Self { targets, params }
    }

    /// The target strings, e.g. `"Jan 08"`.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|t| t.text.as_str())
    }

    pub fn params(&self) -> FuzzyParams {
        self.params
    }

    /// Whether a peak score is high enough to consider.
    pub fn accepts(&self, score: f64) -> bool {
        score >= self.params.acceptance_threshold
    }

    /// One window of `segment_length` chars starting at every char offset.
    ///
    /// Windows running past the end of the page are shorter.
    pub fn segments(&self, page: &Page) -> Vec<Segment> {
        let chars: Vec<char> = page.text.chars().collect();
        let width = self.params.segment_length;
        (0..chars.len())
            .map(|start| Segment {
                page: page.index,
                start,
                text: chars[start..(start + width).min(chars.len())].iter().collect(),
            })
            .collect()
    }

    /// Cutoffs for one page as char offsets, before merging.
    fn candidates(&self, page: &Page) -> Vec<CutoffPoint> {
        let segments = self.segments(page);
        let profiles: Vec<BigramProfile> =
            segments.iter().map(|s| BigramProfile::new(&s.text)).collect();
        let degenerate = profiles.iter().filter(|p| p.is_degenerate()).count();
        if degenerate > 0 {
            debug!(page = page.number(), degenerate, "windows without bigrams scored 0");
        }

        let mut found = Vec::new();
        for target in &self.targets {
            let series: Vec<f64> = profiles
                .iter()
                .map(|p| similarity(p, &target.profile))
                .collect();
            for peak in find_peaks(&series) {
                if !self.accepts(series[peak]) {
                    continue;
                }
                let run = plateau(&series, peak);
                let last = &segments[run.end - 1];
                let (offset, score) = trim_right(last, &target.profile);
                if score > 0.0 {
                    found.push(CutoffPoint { offset, score });
                }
            }
        }
        found
    }

    /// Merged cutoffs for one page, as byte offsets in ascending order.
    pub fn locate(&self, page: &Page) -> Vec<CutoffPoint> {
        merge_cutoffs(self.candidates(page), self.params.closeness)
            .into_iter()
            .map(|c| CutoffPoint {
                offset: char_to_byte(&page.text, c.offset),
                score: c.score,
            })
            .collect()
    }
}

impl BoundaryStrategy for FuzzyLocator {
    fn name(&self) -> &'static str {
        "fuzzy"
    }

    fn cutoffs(&self, page: &Page) -> Vec<CutoffPoint> {
        self.locate(page)
    }

    fn segment(&self, pages: &[Page]) -> Vec<Entry> {
        pages
            .par_iter()
            .map(|page| slice_page(page, &self.locate(page)))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Shorten `segment` from the right while similarity strictly improves.
///
/// Returns the char offset just past the kept text and its score.
fn trim_right(segment: &Segment, target: &BigramProfile) -> (usize, f64) {
    let chars: Vec<char> = segment.text.chars().collect();
    let mut best = similarity(&BigramProfile::new(&segment.text), target);
    let mut removed = 0;
    while removed + 1 < chars.len() {
        let candidate: String = chars[..chars.len() - removed - 1].iter().collect();
        let score = similarity(&BigramProfile::new(&candidate), target);
        if score <= best {
            break;
        }
        best = score;
        removed += 1;
    }
    (segment.start + chars.len() - removed, best)
}

/// Collapse cutoffs within `closeness` of each other, keeping the higher score.
///
/// Candidates are visited best first (ties by offset) and a candidate is kept
/// only when no kept point lies within range, so no two kept points are ever
/// `closeness` or less apart. Offsets and `closeness` only need to share a
/// unit; the locator merges in chars before converting to bytes. The result
/// is sorted by offset.
pub fn merge_cutoffs(
    candidates: impl IntoIterator<Item = CutoffPoint>,
    closeness: usize,
) -> Vec<CutoffPoint> {
    let mut ranked: Vec<CutoffPoint> = candidates.into_iter().collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.offset.cmp(&b.offset)));

    let mut kept: Vec<CutoffPoint> = Vec::new();
    for candidate in ranked {
        if kept
            .iter()
            .all(|k| k.offset.abs_diff(candidate.offset) > closeness)
        {
            kept.push(candidate);
        }
    }
    kept.sort_by_key(|c| c.offset);
    kept
}
