use crate::error::TextError;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

///
/// VectorizerKind
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorizerKind {
    #[default]
    Bags,
    TfIdf,
    Embedding,
}

///
/// AveragerKind
///
/// How an embedding vectorizer folds token vectors into one document
/// vector.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AveragerKind {
    #[default]
    Mean,
    TfIdf,
}

///
/// NgramRange
///
/// Inclusive n-gram sizes fed into the vocabulary, e.g. (1, 2) emits
/// unigrams and bigrams.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct NgramRange {
    pub min: usize,
    pub max: usize,
}

impl Default for NgramRange {
    fn default() -> Self {
        Self { min: 1, max: 1 }
    }
}

impl NgramRange {
    pub(crate) fn sizes(self) -> impl Iterator<Item = usize> {
        self.min.max(1)..=self.max.max(self.min).max(1)
    }
}

///
/// AnalysisConfig
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub vectorizer: VectorizerKind,
    pub batch_size: usize,
    pub min_df: usize,
    pub ngram_range: NgramRange,
    pub averager: AveragerKind,
    pub stopwords: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            vectorizer: VectorizerKind::Bags,
            batch_size: 32,
            min_df: 1,
            ngram_range: NgramRange::default(),
            averager: AveragerKind::Mean,
            stopwords: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TextError> {
        let raw = fs::read_to_string(path)?;

        Ok(toml::from_str(&raw)?)
    }
}
