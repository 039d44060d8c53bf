//! Text normalization: markup stripping, emoticon removal (counted),
//! lowercasing, punctuation stripping, stopword removal.

use regex::Regex;
use std::collections::BTreeSet;

const FEATURE_NAMES: [&str; 3] = ["tokens", "chars", "emoticons"];

///
/// FilterOutput
///
/// One batch after `classic_filter`: cleaned texts, per-document numeric
/// features, and the batch vocabulary in first-seen order.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterOutput {
    pub texts: Vec<String>,
    pub feature_names: Vec<String>,
    pub features: Vec<Vec<f64>>,
    pub vocab: Vec<String>,
}

///
/// TextFilter
///

#[derive(Debug)]
pub struct TextFilter {
    stopwords: BTreeSet<String>,
    markup: Regex,
    emoticon: Regex,
    spaces: Regex,
    word: Regex,
}

impl TextFilter {
    #[must_use]
    pub fn new(stopwords: impl IntoIterator<Item = String>) -> Self {
        Self {
            stopwords: stopwords
                .into_iter()
                .map(|word| word.to_lowercase())
                .collect(),
            // Markup tags of the forum export, e.g. <br>, </span>, <img ...>.
            markup: Regex::new(r"<\s*/?\s*[^\s<>]+(?:\s+[^\s<>]+)*\s*>").unwrap(),
            emoticon: Regex::new(r"(?::\s?\w+\s?:|<[/\\]?3|[:;=8B][-^]?[3DdOoPp@$*\\)(/|])")
                .unwrap(),
            spaces: Regex::new(r"\s{2,}").unwrap(),
            word: Regex::new(r"\b\w\w+\b").unwrap(),
        }
    }

    /// Strip markup and emoticons, returning the cleaned text and the
    /// number of emoticons removed.
    #[must_use]
    pub fn strip_markup(&self, text: &str) -> (String, usize) {
        let without_tags = self.markup.replace_all(text, " ");
        let emoticons = self.emoticon.find_iter(&without_tags).count();
        let without_emoticons = self.emoticon.replace_all(&without_tags, " ");
        let collapsed = self.spaces.replace_all(&without_emoticons, " ");

        (collapsed.trim().to_string(), emoticons)
    }

    /// Lowercase, keep word tokens only, and drop stopwords.
    #[must_use]
    pub fn tokens(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();

        self.word
            .find_iter(&lowered)
            .map(|token| token.as_str().to_string())
            .filter(|token| !self.stopwords.contains(token))
            .collect()
    }

    /// The full normalization pass over one batch.
    #[must_use]
    pub fn classic_filter(&self, batch: &[String]) -> FilterOutput {
        let mut output = FilterOutput {
            feature_names: FEATURE_NAMES.iter().map(ToString::to_string).collect(),
            ..FilterOutput::default()
        };
        let mut seen = BTreeSet::new();

        for text in batch {
            let (stripped, emoticons) = self.strip_markup(text);
            let tokens = self.tokens(&stripped);

            output.features.push(vec![
                tokens.len() as f64,
                stripped.chars().count() as f64,
                emoticons as f64,
            ]);

            for token in &tokens {
                if seen.insert(token.clone()) {
                    output.vocab.push(token.clone());
                }
            }

            output.texts.push(tokens.join(" "));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> TextFilter {
        TextFilter::new(["and".to_string(), "the".to_string()])
    }

    #[test]
    fn markup_tags_are_stripped() {
        let (text, emoticons) = filter().strip_markup("big <b>pike</b> caught<br>today");
        assert_eq!(text, "big pike caught today");
        assert_eq!(emoticons, 0);
    }

    #[test]
    fn emoticons_are_counted_and_removed() {
        let (text, emoticons) = filter().strip_markup("nice catch :) see you ;P");
        assert_eq!(emoticons, 2);
        assert!(!text.contains(':'));
        assert!(text.starts_with("nice catch"));
    }

    #[test]
    fn tokens_are_lowercased_and_stopword_free() {
        let tokens = filter().tokens("The Pike and the Perch");
        assert_eq!(tokens, vec!["pike", "perch"]);
    }

    #[test]
    fn classic_filter_reports_features_and_vocab() {
        let batch = vec![
            "The pike <b>bites</b> :)".to_string(),
            "perch and pike".to_string(),
        ];
        let output = filter().classic_filter(&batch);

        assert_eq!(output.texts, vec!["pike bites", "perch pike"]);
        assert_eq!(output.feature_names, vec!["tokens", "chars", "emoticons"]);
        assert_eq!(output.features[0][0], 2.0);
        assert_eq!(output.features[0][2], 1.0);
        // First-seen order, duplicates dropped.
        assert_eq!(output.vocab, vec!["pike", "bites", "perch"]);
    }
}
