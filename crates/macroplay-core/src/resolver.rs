//! Turns an action's region (and, for text actions, its query) into the
//! absolute rectangle to act on.

use crate::action::TextSearch;
use crate::error::LocateError;
use crate::geometry::{Rect, Region};
use crate::lang::normalize_lang_spec;
use crate::platform::{TextFragment, TextLocator};
use std::collections::BTreeMap;

/// Searches narrower or shorter than this are not attempted.
pub const MIN_SEARCH_SIDE: i32 = 5;
/// Fragments with confidence in `[0, MIN_CONFIDENCE)` are noise.
pub const MIN_CONFIDENCE: f64 = 15.0;
/// Adjacent fragments joined to recover a word split by layout.
pub const MAX_JOIN: usize = 3;

/// A fragment run that matched the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub rect: Rect,
    pub text: String,
    pub similarity: f64,
    pub score: f64,
}

pub struct RegionResolver<'a> {
    text: &'a dyn TextLocator,
}

impl<'a> RegionResolver<'a> {
    pub fn new(text: &'a dyn TextLocator) -> Self {
        Self { text }
    }

    /// Fixed regions need no recognition.
    pub fn area(region: &Region, base: &Rect) -> Rect {
        region.resolve(base)
    }

    /// Locate the requested occurrence of `search.word`. `Ok(None)` means
    /// "not visible right now"; `Err(LocateError::Unavailable)` means it never will be.
    pub fn find_text(&self, search: &TextSearch, base: &Rect, scale: f64) -> Result<Option<Rect>, LocateError> {
        let area = search.region.resolve(base);
        if area.width() < MIN_SEARCH_SIDE || area.height() < MIN_SEARCH_SIDE || search.is_blank() {
            return Ok(None);
        }
        let installed = self.text.available_languages();
        if installed.is_empty() {
            return Err(LocateError::Unavailable);
        }
        let lang = normalize_lang_spec(&search.ocr_lang, &installed);
        let fragments = self.text.locate(area, &lang, if scale > 0.0 { scale } else { 1.0 })?;
        let found = select(&fragments, &search.word, search.index, search.count);
        tracing::debug!(
            word = %search.word,
            lang = %lang,
            fragments = fragments.len(),
            found = ?found,
            "text search"
        );
        Ok(found)
    }
}

/// Pick the `index`-th (1-based, reading order) match of `target`, clamped to
/// the last one. When `expected_count > 0` and fewer matches are visible the
/// whole attempt counts as a miss.
pub fn select(fragments: &[TextFragment], target: &str, index: u32, expected_count: u32) -> Option<Rect> {
    let matches = candidates(fragments, target);
    if matches.is_empty() || (expected_count > 0 && matches.len() < expected_count as usize) {
        return None;
    }
    let i = (index.max(1) as usize - 1).min(matches.len() - 1);
    Some(matches[i].rect)
}

/// Every fragment run that passes the length and similarity filters, in reading order.
pub fn candidates(fragments: &[TextFragment], target: &str) -> Vec<Candidate> {
    let target = normalize_text(target);
    let tlen = target.chars().count();
    if tlen == 0 {
        return Vec::new();
    }
    let threshold = similarity_threshold(tlen);
    let min_len = tlen.min(4).max((tlen as f64 * 0.6) as usize);
    let max_len = (tlen as f64 * 1.4) as usize + 2;
    let tolerance = ((tlen as f64 * 0.3) as usize).max(2);

    let mut lines: BTreeMap<u32, Vec<Word<'_>>> = BTreeMap::new();
    for f in fragments {
        if f.confidence >= 0.0 && f.confidence < MIN_CONFIDENCE {
            continue;
        }
        let norm = normalize_text(&f.text);
        if norm.is_empty() {
            continue;
        }
        lines.entry(f.line).or_default().push(Word { norm, fragment: f });
    }

    let mut out = Vec::new();
    for words in lines.values_mut() {
        words.sort_by_key(|w| (w.fragment.bbox.top, w.fragment.bbox.left));
        for start in 0..words.len() {
            let mut joined = String::new();
            let mut raw: Vec<&str> = Vec::new();
            let mut rect = words[start].fragment.bbox;
            let mut conf_sum = 0.0;
            for (k, w) in words[start..].iter().take(MAX_JOIN).enumerate() {
                if k > 0 && !adjacent(&words[start + k - 1].fragment.bbox, &w.fragment.bbox) {
                    break;
                }
                joined.push_str(&w.norm);
                raw.push(&w.fragment.text);
                rect = rect.union(&w.fragment.bbox);
                conf_sum += w.fragment.confidence.max(0.0);

                let len = joined.chars().count();
                if len > max_len {
                    break;
                }
                if len < min_len || len.abs_diff(tlen) > tolerance {
                    continue;
                }
                let similarity = strsim::normalized_levenshtein(&joined, &target);
                if similarity < threshold {
                    continue;
                }
                let confidence = conf_sum / (k + 1) as f64;
                out.push(Candidate {
                    rect,
                    text: raw.join(" "),
                    similarity,
                    score: confidence / 100.0 * 0.6 + similarity * 0.4,
                });
            }
        }
    }
    out.sort_by(|a, b| {
        (a.rect.top, a.rect.left)
            .cmp(&(b.rect.top, b.rect.left))
            .then(b.score.total_cmp(&a.score))
    });
    out
}

struct Word<'f> {
    norm: String,
    fragment: &'f TextFragment,
}

/// Short words must match almost exactly; long ones tolerate recognition noise.
pub fn similarity_threshold(target_len: usize) -> f64 {
    if target_len >= 12 {
        0.82
    } else if target_len >= 8 {
        0.85
    } else {
        0.90
    }
}

fn adjacent(prev: &Rect, cur: &Rect) -> bool {
    let gap = cur.left - prev.right;
    gap <= 2 || f64::from(gap) <= f64::from(prev.height().max(cur.height())) * 1.4
}

/// Case-, diacritic- and punctuation-insensitive form used for matching.
pub fn normalize_text(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .map(fold)
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

fn fold(c: char) -> char {
    match c {
        'ё' => 'е',
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'č' => 'c',
        'ď' => 'd',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'ī' => 'i',
        'ł' => 'l',
        'ñ' | 'ń' | 'ň' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => 'o',
        'ř' => 'r',
        'ś' | 'š' | 'ş' => 's',
        'ť' => 't',
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => 'u',
        'ý' | 'ÿ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(text: &str, left: i32, top: i32, width: i32, conf: f64, line: u32) -> TextFragment {
        TextFragment::new(text, Rect::from_size(left, top, width, 20), conf, line)
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize_text("  Ёлка, Café! "), "елкаcafe");
        assert_eq!(normalize_text("snake_case-42"), "snake_case42");
        assert_eq!(normalize_text("!!"), "");
    }

    #[test]
    fn thresholds_relax_with_length() {
        assert_eq!(similarity_threshold(3), 0.90);
        assert_eq!(similarity_threshold(8), 0.85);
        assert_eq!(similarity_threshold(15), 0.82);
    }

    #[test]
    fn exact_word_found() {
        let frags = [frag("Start", 10, 10, 50, 90.0, 1), frag("Options", 80, 10, 70, 90.0, 1)];
        assert_eq!(select(&frags, "start", 1, 0), Some(Rect::from_size(10, 10, 50, 20)));
    }

    #[test]
    fn noisy_long_word_tolerated() {
        let frags = [frag("Возрождеиие", 0, 0, 120, 80.0, 1)];
        assert!(select(&frags, "Возрождение", 1, 0).is_some());
        let frags = [frag("Vozr", 0, 0, 40, 80.0, 1)];
        assert!(select(&frags, "Возрождение", 1, 0).is_none());
    }

    #[test]
    fn low_confidence_ignored_but_unknown_kept() {
        assert!(select(&[frag("Start", 0, 0, 50, 10.0, 1)], "Start", 1, 0).is_none());
        assert!(select(&[frag("Start", 0, 0, 50, -1.0, 1)], "Start", 1, 0).is_some());
    }

    #[test]
    fn split_word_is_joined() {
        let frags = [frag("Settin", 100, 50, 60, 85.0, 3), frag("gs", 163, 50, 20, 85.0, 3)];
        let rect = select(&frags, "Settings", 1, 0).unwrap();
        assert_eq!(rect, Rect::from_points(100, 50, 182, 69));
    }

    #[test]
    fn distant_fragments_not_joined() {
        let frags = [frag("Settin", 100, 50, 60, 85.0, 3), frag("gs", 400, 50, 20, 85.0, 3)];
        assert!(select(&frags, "Settings", 1, 0).is_none());
    }

    #[test]
    fn different_lines_not_joined() {
        let frags = [frag("Settin", 100, 50, 60, 85.0, 3), frag("gs", 163, 50, 20, 85.0, 4)];
        assert!(select(&frags, "Settings", 1, 0).is_none());
    }

    #[test]
    fn occurrence_in_reading_order() {
        let frags = [
            frag("Buy", 300, 100, 40, 90.0, 2),
            frag("Buy", 10, 100, 40, 90.0, 2),
            frag("Buy", 500, 10, 40, 90.0, 1),
        ];
        assert_eq!(select(&frags, "buy", 1, 0).map(|r| r.left), Some(500));
        assert_eq!(select(&frags, "buy", 2, 0).map(|r| r.left), Some(10));
        assert_eq!(select(&frags, "buy", 3, 0).map(|r| r.left), Some(300));
        assert_eq!(select(&frags, "buy", 9, 0).map(|r| r.left), Some(300));
    }

    #[test]
    fn expected_count_forces_miss() {
        let frags = [frag("Buy", 10, 100, 40, 90.0, 2), frag("Buy", 300, 100, 40, 90.0, 2)];
        assert!(select(&frags, "buy", 1, 3).is_none());
        assert!(select(&frags, "buy", 1, 2).is_some());
    }

    struct Fixed(Vec<TextFragment>, Vec<String>);

    impl TextLocator for Fixed {
        fn available_languages(&self) -> Vec<String> {
            self.1.clone()
        }

        fn locate(&self, _area: Rect, lang: &str, _scale: f64) -> Result<Vec<TextFragment>, LocateError> {
            assert_eq!(lang, "eng");
            Ok(self.0.clone())
        }
    }

    #[test]
    fn find_text_guards() {
        let locator = Fixed(vec![frag("Start", 10, 10, 50, 90.0, 1)], vec!["eng".into()]);
        let resolver = RegionResolver::new(&locator);
        let base = Rect::from_size(0, 0, 200, 200);
        let mut search = TextSearch::new("Start", Region::Absolute(Rect::from_size(0, 0, 100, 100)));
        search.ocr_lang = "en".into();
        assert!(resolver.find_text(&search, &base, 1.0).unwrap().is_some());

        search.region = Region::Absolute(Rect::from_size(0, 0, 4, 100));
        assert_eq!(resolver.find_text(&search, &base, 1.0), Ok(None));

        let none = Fixed(vec![], vec![]);
        let search = TextSearch::new("Start", Region::default());
        assert_eq!(
            RegionResolver::new(&none).find_text(&search, &base, 1.0),
            Err(LocateError::Unavailable)
        );
    }
}
