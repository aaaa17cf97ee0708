//! Keyword extraction: tokenize, filter stopwords, count, rank.

use dogecloud_core::{ConfigError, Keyword};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w[\w']*").expect("token pattern is valid"));

/// Words that never become keywords.
#[derive(Debug, Clone, Default)]
pub struct StopwordSet {
    words: HashSet<String>,
    case_insensitive: bool,
}

impl StopwordSet {
    pub fn new(case_insensitive: bool) -> Self {
        Self {
            words: HashSet::new(),
            case_insensitive,
        }
    }

    /// One word per line; blank lines are ignored.
    pub fn from_lines(text: &str, case_insensitive: bool) -> Self {
        let mut set = Self::new(case_insensitive);
        for line in text.lines() {
            set.insert(line);
        }
        set
    }

    pub fn load(path: &Path, case_insensitive: bool) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::ResourceUnreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let set = Self::from_lines(&text, case_insensitive);
        info!("Loaded {} stopwords from {}", set.len(), path.display());
        Ok(set)
    }

    pub fn insert(&mut self, word: &str) {
        let word = word.trim();
        if word.is_empty() {
            return;
        }
        if self.case_insensitive {
            self.words.insert(word.to_lowercase());
        } else {
            self.words.insert(word.to_string());
        }
    }

    pub fn contains(&self, token: &str) -> bool {
        if self.case_insensitive {
            self.words.contains(&token.to_lowercase())
        } else {
            self.words.contains(token)
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ExtractionOptions {
    pub max_words: usize,
    /// Tokens shorter than this many characters are dropped.
    pub min_word_length: usize,
    /// Fold `term`+`s` into `term` when both occur.
    pub merge_plurals: bool,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            max_words: 200,
            min_word_length: 2,
            merge_plurals: true,
        }
    }
}

#[derive(Debug)]
struct TermCount {
    first_seen: usize,
    total: u32,
    // Surface forms in first-seen order with their counts.
    casings: Vec<(String, u32)>,
}

impl TermCount {
    fn display_form(&self) -> &str {
        let mut best: Option<&(String, u32)> = None;
        for casing in &self.casings {
            if best.map_or(true, |b| casing.1 > b.1) {
                best = Some(casing);
            }
        }
        best.map(|b| b.0.as_str()).unwrap_or_default()
    }
}

#[derive(Debug)]
struct Ranked {
    term: String,
    weight: u32,
    first_seen: usize,
}

/// Rank the terms of `text` by occurrence count.
///
/// Ties keep first-appearance order, and at most `max_words` keywords come back.
pub fn extract_keywords(
    text: &str,
    stopwords: &StopwordSet,
    options: &ExtractionOptions,
) -> Vec<Keyword> {
    let mut counts: HashMap<String, TermCount> = HashMap::new();

    for (index, found) in TOKEN.find_iter(text).enumerate() {
        let token = found.as_str();
        if token.chars().count() < options.min_word_length {
            continue;
        }
        if token.chars().all(|c| c.is_numeric()) || !token.chars().any(char::is_alphanumeric) {
            continue;
        }
        if stopwords.contains(token) {
            continue;
        }

        let entry = counts
            .entry(token.to_lowercase())
            .or_insert_with(|| TermCount {
                first_seen: index,
                total: 0,
                casings: Vec::new(),
            });
        entry.total += 1;
        match entry.casings.iter_mut().find(|(form, _)| form == token) {
            Some((_, n)) => *n += 1,
            None => entry.casings.push((token.to_string(), 1)),
        }
    }

    let mut ranked: Vec<Ranked> = counts
        .values()
        .map(|count| Ranked {
            term: count.display_form().to_string(),
            weight: count.total,
            first_seen: count.first_seen,
        })
        .collect();
    ranked.sort_by_key(|r| r.first_seen);

    if options.merge_plurals {
        ranked = merge_plurals(ranked);
    }

    ranked.sort_by(|a, b| {
        b.weight
            .cmp(&a.weight)
            .then_with(|| a.first_seen.cmp(&b.first_seen))
    });
    ranked.truncate(options.max_words);

    debug!("Extracted {} keywords", ranked.len());
    ranked
        .into_iter()
        .map(|r| Keyword::new(r.term, r.weight))
        .collect()
}

fn merge_plurals(ranked: Vec<Ranked>) -> Vec<Ranked> {
    let index: HashMap<String, usize> = ranked
        .iter()
        .enumerate()
        .map(|(i, r)| (r.term.clone(), i))
        .collect();

    let mut merged_into: Vec<Option<usize>> = vec![None; ranked.len()];
    for (i, r) in ranked.iter().enumerate() {
        let Some(singular) = r.term.strip_suffix('s') else {
            continue;
        };
        if singular.is_empty() {
            continue;
        }
        if let Some(&target) = index.get(singular) {
            merged_into[i] = Some(target);
        }
    }

    // "dogss" -> "dogs" -> "dog": follow the chain to a term that is kept.
    // Each hop strips a letter, so the chain ends.
    let root = |mut i: usize| {
        while let Some(next) = merged_into[i] {
            i = next;
        }
        i
    };

    let mut out: Vec<Option<Ranked>> = ranked.into_iter().map(Some).collect();
    for i in 0..out.len() {
        if merged_into[i].is_none() {
            continue;
        }
        let target = root(i);
        if let Some(plural) = out[i].take() {
            if let Some(singular) = out[target].as_mut() {
                singular.weight += plural.weight;
                singular.first_seen = singular.first_seen.min(plural.first_seen);
            }
        }
    }
    out.into_iter().flatten().collect()
}
