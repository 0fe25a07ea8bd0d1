//! Inverted index and document store
//!
//! # Components
//!
//! - `Document` / `Field`: the indexed record and its searchable fields
//! - `tokenize`: text analysis shared with the query engine
//! - `Indexer`: per-field postings plus the document store behind one lock

mod document;
mod tokenizer;

pub use document::{Document, Field};
pub use tokenizer::{is_stopword, query_terms, tokenize, words};

use crate::{Result, SumiError};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// One document's occurrences of a term in one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub document_id: String,
    pub term_frequency: u32,
    /// Positions in the field's raw token stream, ascending
    pub positions: Vec<u32>,
}

/// Result of indexing a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// The document was new to the index
    Inserted,
    /// An existing document with the same id was replaced
    Replaced,
}

/// Summary counts over the index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub document_count: usize,
    /// Distinct (field, term) postings lists
    pub term_count: usize,
}

/// Occurrence of one query term in one field of a candidate
#[derive(Debug, Clone, PartialEq)]
pub struct TermMatch {
    pub field: Field,
    pub term: String,
    pub term_frequency: u32,
    pub first_position: u32,
}

/// A document matching at least one query term
#[derive(Debug, Clone)]
pub struct Candidate {
    pub document: Arc<Document>,
    pub matches: Vec<TermMatch>,
}

/// Corpus statistics captured with a candidate set
#[derive(Debug, Clone, Default)]
pub struct CorpusStats {
    pub total_documents: usize,
    document_frequency: HashMap<(Field, String), usize>,
}

impl CorpusStats {
    /// Number of documents whose `field` contains `term`
    pub fn document_frequency(&self, field: Field, term: &str) -> usize {
        self.document_frequency
            .get(&(field, term.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

type FieldTerms = HashMap<(Field, String), Vec<u32>>;

#[derive(Debug)]
struct StoredDocument {
    document: Arc<Document>,
    generation: u64,
    terms: Vec<(Field, String)>,
    title_words: HashSet<String>,
}

#[derive(Debug, Default)]
struct IndexState {
    postings: HashMap<(Field, String), Vec<Posting>>,
    documents: HashMap<String, StoredDocument>,
    /// Unstemmed title word -> number of documents whose title contains it
    title_words: BTreeMap<String, usize>,
    next_generation: u64,
}

impl IndexState {
    fn generation_of(&self, document_id: &str) -> Option<u64> {
        self.documents.get(document_id).map(|d| d.generation)
    }

    fn detach(&mut self, document_id: &str) -> Option<StoredDocument> {
        let stored = self.documents.remove(document_id)?;

        for key in &stored.terms {
            if let Some(list) = self.postings.get_mut(key) {
                list.retain(|p| p.document_id != document_id);
                if list.is_empty() {
                    self.postings.remove(key);
                }
            }
        }

        for word in &stored.title_words {
            if let Some(count) = self.title_words.get_mut(word) {
                *count -= 1;
                if *count == 0 {
                    self.title_words.remove(word);
                }
            }
        }

        Some(stored)
    }

    fn attach(&mut self, document: Document, field_terms: FieldTerms, title_words: HashSet<String>) {
        self.next_generation += 1;
        let id = document.id.clone();
        let mut terms = Vec::with_capacity(field_terms.len());

        for (key, positions) in field_terms {
            self.postings.entry(key.clone()).or_default().push(Posting {
                document_id: id.clone(),
                term_frequency: positions.len() as u32,
                positions,
            });
            terms.push(key);
        }

        for word in &title_words {
            *self.title_words.entry(word.clone()).or_insert(0) += 1;
        }

        self.documents.insert(
            id,
            StoredDocument {
                document: Arc::new(document),
                generation: self.next_generation,
                terms,
                title_words,
            },
        );
    }
}

/// Owner of the inverted index and the document store
///
/// Readers share a lock; each commit takes it exclusively, so a document's
/// postings are swapped as one unit.
#[derive(Debug, Default)]
pub struct Indexer {
    state: RwLock<IndexState>,
}

impl Indexer {
    /// Creates an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a document or replaces the one with the same id
    ///
    /// Tokenization happens outside the write lock. If another writer
    /// replaced the same document in the meantime the update is retried once;
    /// a second conflict drops it with `SumiError::IndexConsistency`.
    ///
    /// # Returns
    ///
    /// * `Ok(IndexOutcome)` - The document is searchable
    /// * `Err(SumiError)` - The update was dropped; the index is unchanged
    pub fn index(&self, document: Document) -> Result<IndexOutcome> {
        let mut observed = self.read()?.generation_of(&document.id);
        let field_terms = analyze(&document);
        let title_words: HashSet<String> = words(&document.title).collect();

        for attempt in 0..2 {
            let mut state = self.write()?;
            let current = state.generation_of(&document.id);
            if current != observed {
                tracing::debug!(
                    "Document {} changed during indexing (attempt {})",
                    document.url,
                    attempt + 1
                );
                observed = current;
                continue;
            }

            let outcome = match state.detach(&document.id) {
                Some(_) => IndexOutcome::Replaced,
                None => IndexOutcome::Inserted,
            };
            state.attach(document, field_terms, title_words);
            return Ok(outcome);
        }

        Err(SumiError::IndexConsistency {
            document_id: document.id,
        })
    }

    /// Removes a document and all of its postings
    ///
    /// Returns true if the document was present.
    pub fn remove(&self, document_id: &str) -> Result<bool> {
        Ok(self.write()?.detach(document_id).is_some())
    }

    /// Returns a copy of the postings list for a field and term
    pub fn postings(&self, field: Field, term: &str) -> Result<Vec<Posting>> {
        Ok(self
            .read()?
            .postings
            .get(&(field, term.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    /// Looks up a document by id
    pub fn get(&self, document_id: &str) -> Result<Option<Arc<Document>>> {
        Ok(self
            .read()?
            .documents
            .get(document_id)
            .map(|d| d.document.clone()))
    }

    /// Number of indexed documents
    pub fn len(&self) -> usize {
        self.read().map(|s| s.documents.len()).unwrap_or(0)
    }

    /// Returns true if nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> Result<IndexStats> {
        let state = self.read()?;
        Ok(IndexStats {
            document_count: state.documents.len(),
            term_count: state.postings.len(),
        })
    }

    /// Gathers every document matching any of `terms`, with corpus statistics
    ///
    /// Both come from the same snapshot of the index. Candidates are returned
    /// in document id order.
    pub fn candidates(&self, terms: &[String]) -> Result<(Vec<Candidate>, CorpusStats)> {
        self.candidates_in(terms, &Field::ALL)
    }

    /// Like [`Indexer::candidates`], matching only inside `fields`
    pub fn candidates_in(
        &self,
        terms: &[String],
        fields: &[Field],
    ) -> Result<(Vec<Candidate>, CorpusStats)> {
        let state = self.read()?;
        let mut stats = CorpusStats {
            total_documents: state.documents.len(),
            document_frequency: HashMap::new(),
        };
        let mut matches: BTreeMap<&str, Vec<TermMatch>> = BTreeMap::new();

        for term in terms {
            for &field in fields {
                let key = (field, term.clone());
                let Some(list) = state.postings.get(&key) else {
                    continue;
                };
                stats.document_frequency.insert(key, list.len());

                for posting in list {
                    matches
                        .entry(posting.document_id.as_str())
                        .or_default()
                        .push(TermMatch {
                            field,
                            term: term.clone(),
                            term_frequency: posting.term_frequency,
                            first_position: posting.positions.first().copied().unwrap_or(0),
                        });
                }
            }
        }

        let candidates = matches
            .into_iter()
            .filter_map(|(id, matches)| {
                state.documents.get(id).map(|stored| Candidate {
                    document: stored.document.clone(),
                    matches,
                })
            })
            .collect();

        Ok((candidates, stats))
    }

    /// Title words starting with `prefix`, with their document counts
    ///
    /// Only words longer than the prefix are returned.
    pub fn title_words_with_prefix(&self, prefix: &str) -> Result<Vec<(String, usize)>> {
        let state = self.read()?;
        Ok(state
            .title_words
            .range(prefix.to_string()..)
            .take_while(|(word, _)| word.starts_with(prefix))
            .filter(|(word, _)| word.len() > prefix.len())
            .map(|(word, count)| (word.clone(), *count))
            .collect())
    }

    /// Title words longer than `min_len` characters with their document counts
    pub fn title_words(&self, min_len: usize) -> Result<Vec<(String, usize)>> {
        let state = self.read()?;
        Ok(state
            .title_words
            .iter()
            .filter(|(word, _)| word.chars().count() > min_len)
            .map(|(word, count)| (word.clone(), *count))
            .collect())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, IndexState>> {
        self.state.read().map_err(|_| SumiError::Poisoned("index"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, IndexState>> {
        self.state.write().map_err(|_| SumiError::Poisoned("index"))
    }
}

/// Tokenizes every field of a document into per-term position lists
fn analyze(document: &Document) -> FieldTerms {
    let mut terms: FieldTerms = HashMap::new();
    for field in Field::ALL {
        for (term, position) in tokenize(&document.field_text(field)) {
            terms.entry((field, term)).or_default().push(position);
        }
    }
    terms
}
