use crate::error::{EngineError, Result};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use rust_stemmers::{Algorithm, Stemmer};
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

/// Multi-word domain terms that are indexed as a single token.
pub const DOMAIN_PHRASES: &[&str] = &[
    "artificial intelligence",
    "big data",
    "computer vision",
    "cyber security",
    "data science",
    "deep learning",
    "image processing",
    "information retrieval",
    "internet of things",
    "machine learning",
    "natural language processing",
    "reinforcement learning",
    "signal processing",
    "software engineering",
    "wireless sensor networks",
];

pub const PHRASE_JOINER: char = '_';

lazy_static! {
    static ref PHRASE_RE: Regex = {
        // Longer phrases first: the regex alternation is leftmost-first, so at any
        // position the longest known phrase wins.
        let mut phrases: Vec<&str> = DOMAIN_PHRASES.to_vec();
        phrases.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        let alternation = phrases
            .iter()
            .map(|p| p.split_whitespace().map(regex::escape).collect::<Vec<_>>().join(r"\s+"))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"\b(?:{alternation})\b")).expect("valid phrase regex")
    };
    static ref NON_TOKEN_RE: Regex = Regex::new(r"[^\p{L}\p{N}_\s]+").expect("valid regex");
    static ref WS_RE: Regex = Regex::new(r"\s+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let general: &[&str] = &[
            "a","about","above","after","again","against","all","also","am","an","and","any","are","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","cannot","could",
            "did","do","does","doing","down","during",
            "each","etc","few","for","from","further",
            "had","has","have","having","he","her","here","hers","herself","him","himself","his","how",
            "i","if","in","into","is","it","its","itself",
            "me","more","most","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","should","so","some","such",
            "than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
            "under","until","up","very",
            "was","we","were","what","when","where","which","while","who","whom","why","will","with","would",
            "you","your","yours","yourself","yourselves",
            // contraction stems left behind once apostrophes are stripped
            "aren","couldn","didn","doesn","don","hadn","hasn","haven","isn","let","ll","mustn","shan","shouldn","ve","wasn","weren","won","wouldn",
        ];
        let domain: &[&str] = &[
            "area","areas","assistant","associate","based","college","currently","department","dr","faculty",
            "field","fields","include","includes","including","institute","interest","interested","interests",
            "member","prof","professor","received","research","researcher","university","using","various",
            "work","worked","working","works",
        ];
        general.iter().chain(domain.iter()).copied().collect()
    };
}

/// Preprocessing knobs that must be identical at build and query time, so they
/// are persisted with the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerSettings {
    /// Tokens shorter than this (in chars) are dropped. Merged phrases are exempt.
    pub min_token_len: usize,
    pub stem: bool,
    /// Lowercased, sorted and deduplicated.
    pub extra_stopwords: Vec<String>,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self { min_token_len: 3, stem: false, extra_stopwords: Vec::new() }
    }
}

impl AnalyzerSettings {
    pub fn with_extra_stopwords<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extra_stopwords.extend(
            words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty() && !w.starts_with('#')),
        );
        self.extra_stopwords.sort();
        self.extra_stopwords.dedup();
        self
    }

    /// Loads a newline-separated stopword list. Blank lines and `#` comments are ignored.
    pub fn with_stopwords_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| EngineError::Stopwords { path: path.to_path_buf(), source })?;
        Ok(self.with_extra_stopwords(text.lines()))
    }
}

#[derive(Debug, Clone)]
pub struct Preprocessor {
    settings: AnalyzerSettings,
    extra_stopwords: HashSet<String>,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(AnalyzerSettings::default())
    }
}

impl Preprocessor {
    pub fn new(settings: AnalyzerSettings) -> Self {
        let extra_stopwords = settings.extra_stopwords.iter().cloned().collect();
        Self { settings, extra_stopwords }
    }

    pub fn settings(&self) -> &AnalyzerSettings {
        &self.settings
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        let lower = token.to_lowercase();
        STOPWORDS.contains(lower.as_str()) || self.extra_stopwords.contains(&lower)
    }

    /// Normalize and tokenize `text`. Never fails; `None` and blank input give no tokens.
    pub fn tokenize(&self, text: Option<&str>) -> Vec<String> {
        let text = match text {
            Some(t) if !t.trim().is_empty() => t,
            _ => return Vec::new(),
        };
        let plain = strip_markup(text);
        // Joiners in the output come only from phrase merging.
        let lowered = plain.to_lowercase().replace(PHRASE_JOINER, " ");
        let merged = merge_phrases(&lowered);
        let cleaned = NON_TOKEN_RE.replace_all(&merged, " ");

        let mut tokens = Vec::new();
        for raw in cleaned.split_whitespace() {
            let is_phrase = raw.contains(PHRASE_JOINER);
            if !is_phrase && raw.chars().count() < self.settings.min_token_len {
                continue;
            }
            if self.is_stopword(raw) {
                continue;
            }
            let token = if self.settings.stem && !is_phrase {
                let stem = STEMMER.stem(raw).into_owned();
                if self.is_stopword(&stem) {
                    continue;
                }
                stem
            } else {
                raw.to_string()
            };
            tokens.push(token);
        }
        tokens
    }
}

/// Tokenize with the default settings.
pub fn preprocess(text: &str) -> Vec<String> {
    Preprocessor::default().tokenize(Some(text))
}

/// NFKC-normalize, decode entities and drop tags along with `<script>` and
/// `<style>` bodies. Text nodes are joined with a space so adjacent block
/// elements never glue words together.
fn strip_markup(text: &str) -> String {
    let normalized: String = text.nfkc().collect();
    if !normalized.contains('<') && !normalized.contains('&') {
        return normalized;
    }
    let fragment = Html::parse_fragment(&normalized);
    let parts: Vec<&str> = fragment
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node
                .parent()
                .and_then(|p| p.value().as_element().map(|e| matches!(e.name(), "script" | "style")))
                .unwrap_or(false);
            (!hidden).then_some(&**text)
        })
        .collect();
    parts.join(" ")
}

/// Joins every known phrase into one token, scanning left to right.
fn merge_phrases(lowered: &str) -> String {
    PHRASE_RE
        .replace_all(lowered, |caps: &Captures| {
            WS_RE.replace_all(&caps[0], PHRASE_JOINER.to_string().as_str()).into_owned()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_html_and_decodes_entities() {
        let t = preprocess("<p>Signal&nbsp;<b>Processing</b> &amp; Robotics</p><div>Control</div>");
        assert_eq!(t, vec!["signal_processing", "robotics", "control"]);
    }

    #[test]
    fn merges_longest_phrase_first() {
        let t = preprocess("Natural Language Processing and deep   learning");
        assert_eq!(t, vec!["natural_language_processing", "deep_learning"]);
    }

    #[test]
    fn phrases_respect_word_boundaries() {
        let t = preprocess("deep learnings");
        assert_eq!(t, vec!["deep", "learnings"]);
    }

    #[test]
    fn phrase_spanning_stopword_survives() {
        let t = preprocess("Internet of Things security");
        assert_eq!(t, vec!["internet_of_things", "security"]);
    }

    #[test]
    fn drops_stopwords_short_tokens_and_punctuation() {
        let t = preprocess("The Professor's work: VLSI, 5G & IoT!");
        assert_eq!(t, vec!["vlsi", "iot"]);
    }

    #[test]
    fn skips_script_and_style_bodies() {
        let t = preprocess("<style>.robotics { color: red }</style><p>Vision</p><script>var tracking = 1;</script>");
        assert_eq!(t, vec!["vision"]);
    }

    #[test]
    fn typed_underscores_split_words() {
        assert!(preprocess("_ __ the_ of_the a_b x_").is_empty());
        assert_eq!(preprocess("snake_case machine_learning"), vec!["snake", "case", "machine_learning"]);
        let p = Preprocessor::new(AnalyzerSettings { stem: true, ..Default::default() });
        assert_eq!(p.tokenize(Some("robot_networks")), vec!["robot", "network"]);
    }

    #[test]
    fn none_and_blank_give_nothing() {
        let p = Preprocessor::default();
        assert!(p.tokenize(None).is_empty());
        assert!(p.tokenize(Some("   ")).is_empty());
        assert!(p.tokenize(Some("<br/>")).is_empty());
    }

    #[test]
    fn fullwidth_forms_fold() {
        assert_eq!(preprocess("ＲＯＢＯＴＩＣＳ"), vec!["robotics"]);
    }

    #[test]
    fn extra_stopwords_are_case_insensitive() {
        let settings = AnalyzerSettings::default().with_extra_stopwords(["Robotics", "# comment", ""]);
        assert_eq!(settings.extra_stopwords, vec!["robotics".to_string()]);
        let p = Preprocessor::new(settings);
        assert_eq!(p.tokenize(Some("Robotics and Control")), vec!["control"]);
    }

    #[test]
    fn stemming_leaves_phrases_alone() {
        let p = Preprocessor::new(AnalyzerSettings { stem: true, ..Default::default() });
        assert_eq!(p.tokenize(Some("networks computing machine learning")), vec!["network", "comput", "machine_learning"]);
    }
}
