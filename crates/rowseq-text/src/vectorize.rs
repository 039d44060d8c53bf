//! Vocabulary extraction and the three vector models: bag-of-words
//! counts, tf-idf weights, and averaged pre-trained embeddings.
//!
//! Models fit incrementally batch by batch (`observe`), are sealed with
//! `finalize`, and then transform batches into dense vectors. Fitted
//! models persist as JSON.

use crate::{
    config::{AveragerKind, NgramRange},
    error::TextError,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::Path,
};

fn save_model<M: Serialize>(model: &M, path: &Path) -> Result<(), TextError> {
    fs::write(path, serde_json::to_vec_pretty(model)?)?;

    Ok(())
}

fn load_model<M: DeserializeOwned>(path: &Path) -> Result<M, TextError> {
    Ok(serde_json::from_slice(&fs::read(path)?)?)
}

///
/// Vocabulary
///
/// Term→index mapping built from document frequencies. Terms seen in
/// fewer than `min_df` documents are pruned at `finalize`; indices are
/// assigned in sorted term order.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Vocabulary {
    min_df: usize,
    ngram_range: NgramRange,
    document_frequency: BTreeMap<String, usize>,
    documents_seen: usize,
    index: BTreeMap<String, usize>,
}

impl Vocabulary {
    #[must_use]
    pub fn new(min_df: usize, ngram_range: NgramRange) -> Self {
        Self {
            min_df: min_df.max(1),
            ngram_range,
            ..Self::default()
        }
    }

    /// N-grams of one cleaned document (whitespace-tokenized).
    #[must_use]
    pub fn terms(&self, text: &str) -> Vec<String> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let mut terms = Vec::new();

        for size in self.ngram_range.sizes() {
            for window in tokens.windows(size) {
                terms.push(window.join(" "));
            }
        }

        terms
    }

    /// Count document frequencies for one batch.
    pub fn observe(&mut self, docs: &[String]) {
        for doc in docs {
            self.documents_seen += 1;
            let unique: BTreeSet<String> = self.terms(doc).into_iter().collect();
            for term in unique {
                *self.document_frequency.entry(term).or_insert(0) += 1;
            }
        }
    }

    /// Prune rare terms and assign indices. Further `observe` calls are
    /// ignored by `transform`-side lookups once sealed.
    pub fn finalize(&mut self) {
        self.document_frequency
            .retain(|_, frequency| *frequency >= self.min_df);
        self.index = self
            .document_frequency
            .keys()
            .enumerate()
            .map(|(position, term)| (term.clone(), position))
            .collect();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[must_use]
    pub fn terms_in_order(&self) -> Vec<String> {
        self.index.keys().cloned().collect()
    }

    fn index_of(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    const fn documents_seen(&self) -> usize {
        self.documents_seen
    }

    fn document_frequency_of(&self, term: &str) -> usize {
        self.document_frequency.get(term).copied().unwrap_or(0)
    }

    /// Raw term counts of one document over the sealed vocabulary.
    fn counts(&self, doc: &str) -> Vec<f64> {
        let mut counts = vec![0.0; self.index.len()];
        for term in self.terms(doc) {
            if let Some(position) = self.index_of(&term) {
                counts[position] += 1.0;
            }
        }

        counts
    }
}

///
/// BagOfWords
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct BagOfWords {
    vocabulary: Vocabulary,
}

impl BagOfWords {
    #[must_use]
    pub fn new(min_df: usize, ngram_range: NgramRange) -> Self {
        Self {
            vocabulary: Vocabulary::new(min_df, ngram_range),
        }
    }

    pub fn observe(&mut self, docs: &[String]) {
        self.vocabulary.observe(docs);
    }

    pub fn finalize(&mut self) {
        self.vocabulary.finalize();
    }

    #[must_use]
    pub const fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// `[N x vocab]` term counts.
    #[must_use]
    pub fn transform(&self, docs: &[String]) -> Vec<Vec<f64>> {
        docs.iter().map(|doc| self.vocabulary.counts(doc)).collect()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TextError> {
        save_model(self, path.as_ref())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TextError> {
        load_model(path.as_ref())
    }
}

///
/// TfIdf
///
/// Smoothed idf (`ln((1 + n) / (1 + df)) + 1`) over the sealed
/// vocabulary; transformed rows are L2-normalized.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct TfIdf {
    vocabulary: Vocabulary,
    idf: Vec<f64>,
}

impl TfIdf {
    #[must_use]
    pub fn new(min_df: usize, ngram_range: NgramRange) -> Self {
        Self {
            vocabulary: Vocabulary::new(min_df, ngram_range),
            idf: Vec::new(),
        }
    }

    pub fn observe(&mut self, docs: &[String]) {
        self.vocabulary.observe(docs);
    }

    pub fn finalize(&mut self) {
        self.vocabulary.finalize();

        let documents = self.vocabulary.documents_seen() as f64;
        self.idf = self
            .vocabulary
            .terms_in_order()
            .iter()
            .map(|term| {
                let frequency = self.vocabulary.document_frequency_of(term) as f64;
                ((1.0 + documents) / (1.0 + frequency)).ln() + 1.0
            })
            .collect();
    }

    #[must_use]
    pub const fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Idf weight of one term, if it survived pruning.
    #[must_use]
    pub fn weight(&self, term: &str) -> Option<f64> {
        self.vocabulary
            .index_of(term)
            .and_then(|position| self.idf.get(position).copied())
    }

    /// `[N x vocab]` L2-normalized tf-idf rows.
    #[must_use]
    pub fn transform(&self, docs: &[String]) -> Vec<Vec<f64>> {
        docs.iter()
            .map(|doc| {
                let mut row = self.vocabulary.counts(doc);
                for (value, idf) in row.iter_mut().zip(&self.idf) {
                    *value *= idf;
                }

                let norm = row.iter().map(|value| value * value).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for value in &mut row {
                        *value /= norm;
                    }
                }

                row
            })
            .collect()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TextError> {
        save_model(self, path.as_ref())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TextError> {
        load_model(path.as_ref())
    }
}

///
/// EmbeddingAverager
///
/// Folds pre-trained token embeddings into one document vector, either by
/// plain mean or weighted by tf-idf. Training embeddings is out of scope;
/// the table is supplied by the caller.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct EmbeddingAverager {
    embeddings: BTreeMap<String, Vec<f64>>,
    dimension: usize,
    averager: AveragerKind,
    tf_idf: Option<TfIdf>,
}

impl EmbeddingAverager {
    pub fn new(
        embeddings: BTreeMap<String, Vec<f64>>,
        averager: AveragerKind,
        tf_idf: Option<TfIdf>,
    ) -> Result<Self, TextError> {
        let dimension = embeddings
            .values()
            .next()
            .map(Vec::len)
            .ok_or_else(|| TextError::input("embedding table is empty"))?;

        if embeddings.values().any(|vector| vector.len() != dimension) {
            return Err(TextError::input("embedding vectors have mixed dimensions"));
        }
        if averager == AveragerKind::TfIdf && tf_idf.is_none() {
            return Err(TextError::input(
                "tf_idf averaging needs a fitted tf-idf model",
            ));
        }

        Ok(Self {
            embeddings,
            dimension,
            averager,
            tf_idf,
        })
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Feed the attached weighting model. A no-op for plain mean
    /// averaging.
    pub fn observe(&mut self, docs: &[String]) {
        if let Some(model) = &mut self.tf_idf {
            model.observe(docs);
        }
    }

    pub fn finalize(&mut self) {
        if let Some(model) = &mut self.tf_idf {
            model.finalize();
        }
    }

    /// `[N x dimension]` averaged document vectors. Out-of-table tokens
    /// contribute nothing; a document with no known token maps to zeros.
    #[must_use]
    pub fn transform(&self, docs: &[String]) -> Vec<Vec<f64>> {
        docs.iter().map(|doc| self.average(doc)).collect()
    }

    fn average(&self, doc: &str) -> Vec<f64> {
        let mut sum = vec![0.0; self.dimension];
        let mut total_weight = 0.0;

        for token in doc.split_whitespace() {
            let Some(vector) = self.embeddings.get(token) else {
                continue;
            };
            let weight = match self.averager {
                AveragerKind::Mean => 1.0,
                AveragerKind::TfIdf => self
                    .tf_idf
                    .as_ref()
                    .and_then(|model| model.weight(token))
                    .unwrap_or(0.0),
            };
            if weight == 0.0 {
                continue;
            }

            for (slot, value) in sum.iter_mut().zip(vector) {
                *slot += value * weight;
            }
            total_weight += weight;
        }

        if total_weight > 0.0 {
            for slot in &mut sum {
                *slot /= total_weight;
            }
        }

        sum
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TextError> {
        save_model(self, path.as_ref())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TextError> {
        load_model(path.as_ref())
    }
}

///
/// Vectorizer
///
/// Dispatch over the three models with one observe/finalize/transform
/// surface for the pipeline.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Vectorizer {
    Bags(BagOfWords),
    TfIdf(TfIdf),
    Embedding(EmbeddingAverager),
}

impl Vectorizer {
    pub fn observe(&mut self, docs: &[String]) {
        match self {
            Self::Bags(model) => model.observe(docs),
            Self::TfIdf(model) => model.observe(docs),
            Self::Embedding(model) => model.observe(docs),
        }
    }

    pub fn finalize(&mut self) {
        match self {
            Self::Bags(model) => model.finalize(),
            Self::TfIdf(model) => model.finalize(),
            Self::Embedding(model) => model.finalize(),
        }
    }

    #[must_use]
    pub fn transform(&self, docs: &[String]) -> Vec<Vec<f64>> {
        match self {
            Self::Bags(model) => model.transform(docs),
            Self::TfIdf(model) => model.transform(docs),
            Self::Embedding(model) => model.transform(docs),
        }
    }

    /// Output labels: vocabulary terms, or embedding component names.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        match self {
            Self::Bags(model) => model.vocabulary().terms_in_order(),
            Self::TfIdf(model) => model.vocabulary().terms_in_order(),
            Self::Embedding(model) => (0..model.dimension())
                .map(|component| format!("dim_{component}"))
                .collect(),
        }
    }
}
