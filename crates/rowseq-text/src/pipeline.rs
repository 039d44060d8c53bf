//! The batch driver: walks a bound table in position slices, filters each
//! batch, fits the configured vectorizer, then transforms every batch and
//! collects the outputs. Two passes over the table, constant batches in
//! memory.

use crate::{
    config::{AnalysisConfig, AveragerKind, VectorizerKind},
    error::TextError,
    filter::TextFilter,
    vectorize::{BagOfWords, EmbeddingAverager, TfIdf, Vectorizer},
};
use rowseq::{Session, Slice};
use std::{collections::BTreeMap, fs, io::Write, path::Path};

///
/// PipelineOutput
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PipelineOutput {
    pub labels: Vec<String>,
    pub feature_names: Vec<String>,
    pub features: Vec<Vec<f64>>,
    pub vectors: Vec<Vec<f64>>,
}

impl PipelineOutput {
    /// Write the classic three-file layout: `features.txt`, `vocab.txt`,
    /// `vectors.txt`, semicolon-separated.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<(), TextError> {
        let dir = dir.as_ref();

        let mut features = fs::File::create(dir.join("features.txt"))?;
        writeln!(features, "{}", self.feature_names.join(";"))?;
        for row in &self.features {
            writeln!(features, "{}", join_numbers(row))?;
        }

        fs::write(dir.join("vocab.txt"), self.labels.join(";"))?;

        let mut vectors = fs::File::create(dir.join("vectors.txt"))?;
        writeln!(vectors, "{}", self.labels.join(";"))?;
        for row in &self.vectors {
            writeln!(vectors, "{}", join_numbers(row))?;
        }

        Ok(())
    }
}

fn join_numbers(row: &[f64]) -> String {
    row.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

///
/// Pipeline
///

#[derive(Debug)]
pub struct Pipeline {
    config: AnalysisConfig,
    filter: TextFilter,
    embeddings: Option<BTreeMap<String, Vec<f64>>>,
}

impl Pipeline {
    #[must_use]
    pub fn new(config: AnalysisConfig) -> Self {
        let filter = TextFilter::new(config.stopwords.clone());

        Self {
            config,
            filter,
            embeddings: None,
        }
    }

    /// Required when `config.vectorizer = "embedding"`.
    #[must_use]
    pub fn with_embeddings(mut self, embeddings: BTreeMap<String, Vec<f64>>) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    /// Run both passes over the bound table, reading `column` of each row.
    pub fn run(&self, session: &Session, column: &str) -> Result<PipelineOutput, TextError> {
        let total = session.len()?;
        let batch_size = self.config.batch_size.max(1);

        let mut output = PipelineOutput::default();
        let mut vectorizer = self.build_vectorizer()?;

        // Pass 1: filter, collect features, feed the vocabulary.
        let mut start = 0usize;
        while start < total {
            let batch = self.read_batch(session, column, start, batch_size)?;
            let filtered = self.filter.classic_filter(&batch);

            if output.feature_names.is_empty() {
                output.feature_names = filtered.feature_names;
            }
            output.features.extend(filtered.features);
            vectorizer.observe(&filtered.texts);

            start += batch_size;
        }
        vectorizer.finalize();
        output.labels = vectorizer.labels();

        // Pass 2: transform with the sealed model.
        let mut start = 0usize;
        while start < total {
            let batch = self.read_batch(session, column, start, batch_size)?;
            let filtered = self.filter.classic_filter(&batch);
            output.vectors.extend(vectorizer.transform(&filtered.texts));

            start += batch_size;
        }

        Ok(output)
    }

    fn build_vectorizer(&self) -> Result<Vectorizer, TextError> {
        let min_df = self.config.min_df;
        let ngram_range = self.config.ngram_range;

        Ok(match self.config.vectorizer {
            VectorizerKind::Bags => Vectorizer::Bags(BagOfWords::new(min_df, ngram_range)),
            VectorizerKind::TfIdf => Vectorizer::TfIdf(TfIdf::new(min_df, ngram_range)),
            VectorizerKind::Embedding => {
                let embeddings = self
                    .embeddings
                    .clone()
                    .ok_or_else(|| TextError::input("embedding vectorizer needs a table"))?;
                // Tf-idf weighting needs a model of its own; pass 1 fits it
                // alongside the (fixed) embedding table.
                let tf_idf = (self.config.averager == AveragerKind::TfIdf)
                    .then(|| TfIdf::new(min_df, ngram_range));

                Vectorizer::Embedding(EmbeddingAverager::new(
                    embeddings,
                    self.config.averager,
                    tf_idf,
                )?)
            }
        })
    }

    fn read_batch(
        &self,
        session: &Session,
        column: &str,
        start: usize,
        batch_size: usize,
    ) -> Result<Vec<String>, TextError> {
        let slice = Slice::new(Some(start as i64), Some((start + batch_size) as i64));
        let rows = session.get_slice(slice)?;

        Ok(rows
            .into_iter()
            .map(|row| {
                row.get(column)
                    .and_then(|value| value.as_text())
                    .unwrap_or("")
                    .to_string()
            })
            .collect())
    }
}
