//! BM25 lexical index over the pattern library.
//!
//! Standard Okapi BM25 with term-frequency saturation (k1) and document
//! length normalization (b). Scores are min-max friendly: the raw corpus
//! scores are normalized to 0–1 by the maximum before fusion.

use std::collections::HashMap;

/// Term frequency saturation and length-normalization parameters.
#[derive(Debug, Clone)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
    pub min_term_length: usize,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: 1.2,
            b: 0.75,
            min_term_length: 2,
        }
    }
}

struct DocEntry {
    term_freq: HashMap<String, usize>,
    len: usize,
}

/// Immutable index built once at curation time and shared read-only.
pub struct Bm25Index {
    params: Bm25Params,
    docs: Vec<DocEntry>,
    /// Document frequency per term across the corpus.
    doc_freq: HashMap<String, usize>,
    avg_doc_len: f64,
}

pub fn tokenize(text: &str, min_term_length: usize) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| s.len() >= min_term_length)
        .map(String::from)
        .collect()
}

impl Bm25Index {
    pub fn build<'a>(corpus: impl Iterator<Item = &'a str>, params: Bm25Params) -> Self {
        let mut docs = Vec::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in corpus {
            let tokens = tokenize(doc, params.min_term_length);
            let mut term_freq: HashMap<String, usize> = HashMap::new();
            for term in &tokens {
                *term_freq.entry(term.clone()).or_insert(0) += 1;
            }
            for term in term_freq.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            docs.push(DocEntry {
                len: tokens.len(),
                term_freq,
            });
        }

        let avg_doc_len = if docs.is_empty() {
            0.0
        } else {
            docs.iter().map(|d| d.len).sum::<usize>() as f64 / docs.len() as f64
        };

        Self {
            params,
            docs,
            doc_freq,
            avg_doc_len,
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn idf(&self, term: &str) -> f64 {
        let n = self.docs.len() as f64;
        let df = self.doc_freq.get(term).copied().unwrap_or(0) as f64;
        if df == 0.0 {
            return 0.0;
        }
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Score every document against the query, normalized to 0–1 by the
    /// corpus maximum. Index positions match the build-time corpus order.
    pub fn scores(&self, query: &str) -> Vec<f64> {
        if self.docs.is_empty() {
            return Vec::new();
        }
        let query_terms = tokenize(query, self.params.min_term_length);

        let mut idf_cache: HashMap<&str, f64> = HashMap::new();
        for term in &query_terms {
            idf_cache
                .entry(term.as_str())
                .or_insert_with(|| self.idf(term));
        }

        let mut scores: Vec<f64> = self
            .docs
            .iter()
            .map(|doc| {
                let mut score = 0.0;
                for term in &query_terms {
                    let tf = doc.term_freq.get(term.as_str()).copied().unwrap_or(0) as f64;
                    if tf == 0.0 {
                        continue;
                    }
                    let idf = idf_cache.get(term.as_str()).copied().unwrap_or(0.0);
                    let numerator = tf * (self.params.k1 + 1.0);
                    let denominator = tf
                        + self.params.k1
                            * (1.0 - self.params.b
                                + self.params.b * (doc.len as f64 / self.avg_doc_len));
                    score += idf * (numerator / denominator);
                }
                score
            })
            .collect();

        let max = scores.iter().cloned().fold(0.0_f64, f64::max);
        if max > 0.0 {
            for s in scores.iter_mut() {
                *s /= max;
            }
        }
        scores
    }
}
