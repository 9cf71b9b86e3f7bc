// Shici Search Engine
// Facade owning the alphabet, the knowledge table and the corpus

use std::path::Path;

use crate::alphabet::Alphabet;
use crate::corpus::{Corpus, Poem};
use crate::executor::{execute, ExecuteStrategy};
use crate::hanzi::HanziDict;
use crate::matcher::{compile, Matcher};
use crate::parser::{parse, Cond};
use crate::types::{CompileError, LoadError, ParseError, QueryResult, SearchError};

/// Corpus statistics reported by [`PoetrySearch::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub poems: usize,
    pub sentences: usize,
    pub alphabet_size: usize,
    pub hanzi_records: usize,
}

/// The poetry search engine.
///
/// Owns the process-lifetime state (alphabet, knowledge table, corpus) and
/// threads it through parse, compile and run. Loading happens once, single
/// threaded; afterwards everything is read-only and queries can run freely.
///
/// ```no_run
/// # use shici::PoetrySearch;
/// let mut search = PoetrySearch::new();
/// search.load_hanzi("hanzi.json")?;
/// search.load_poetry("poetry.csv")?;
/// let results = search.search("[木木木|山]")?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Default)]
pub struct PoetrySearch {
    alphabet: Alphabet,
    dict: HanziDict,
    corpus: Corpus,
}

impl PoetrySearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the hanzi knowledge JSON. Returns the number of records.
    pub fn load_hanzi<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, LoadError> {
        self.dict.load_json(path, &mut self.alphabet)
    }

    /// Load hanzi knowledge from a JSON string (fixtures, tests).
    pub fn load_hanzi_str(&mut self, json: &str) -> Result<usize, LoadError> {
        self.dict.load_json_str(json, &mut self.alphabet)
    }

    /// Load the poetry CSV. Returns the number of poems added.
    pub fn load_poetry<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, LoadError> {
        self.corpus.load_csv(path, &mut self.alphabet)
    }

    /// Load poetry from CSV text (fixtures, tests).
    pub fn load_poetry_str(&mut self, csv: &str) -> Result<usize, LoadError> {
        self.corpus.load_csv_str(csv, &mut self.alphabet)
    }

    /// Parse a condition expression against the current alphabet.
    pub fn parse(&self, query: &str) -> Result<Cond, ParseError> {
        parse(query, &self.alphabet)
    }

    /// Lower a condition to a matcher against the current knowledge table.
    pub fn compile(&self, cond: &Cond) -> Result<Matcher, CompileError> {
        compile(cond, &self.dict, &self.alphabet)
    }

    /// Run a compiled matcher over the whole corpus (parallel).
    pub fn run(&self, matcher: &Matcher) -> Vec<QueryResult> {
        self.run_with(matcher, ExecuteStrategy::Parallel)
    }

    /// Run a compiled matcher with an explicit scheduling strategy.
    pub fn run_with(&self, matcher: &Matcher, strategy: ExecuteStrategy) -> Vec<QueryResult> {
        execute(matcher, self.corpus.poems(), strategy)
    }

    /// One-shot query: parse, compile, run.
    pub fn search(&self, query: &str) -> Result<Vec<QueryResult>, SearchError> {
        let cond = self.parse(query)?;
        let matcher = self.compile(&cond)?;
        Ok(self.run(&matcher))
    }

    /// Full poem details by corpus id.
    pub fn poetry_by_id(&self, id: usize) -> Option<&Poem> {
        self.corpus.poem(id)
    }

    /// Sentences drawn entirely from `charset`: `(sentence, poetry_id)`,
    /// at most one per poem.
    pub fn covered(&self, charset: &str) -> Vec<(String, usize)> {
        self.corpus.sentences_covered_by(charset, &self.alphabet)
    }

    /// Decode an interned sentence of a poem back to a string.
    pub fn sentence_text(&self, poem: &Poem, index: usize) -> Option<String> {
        poem.sentences.get(index).map(|s| s.decode(&self.alphabet))
    }

    pub fn stats(&self) -> Stats {
        Stats {
            poems: self.corpus.len(),
            sentences: self.corpus.sentence_count(),
            alphabet_size: self.alphabet.len(),
            hanzi_records: self.dict.len(),
        }
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HANZI: &str = r#"[
        {"index": 1, "char": "山", "strokes": 3, "radicals": "山",
         "frequency": 259, "pinyin": ["shan1"]},
        {"index": 2, "char": "水", "strokes": 4, "radicals": "水",
         "frequency": 312, "pinyin": ["shui3"]},
        {"index": 3, "char": "好", "strokes": 6, "radicals": "女",
         "frequency": 82, "pinyin": ["hao3", "hao4"]}
    ]"#;

    const POETRY: &str = "\
title,dynasty,author,content
a,唐,x,山水好。
b,唐,y,水山。好水！
";

    fn engine() -> PoetrySearch {
        let mut search = PoetrySearch::new();
        search.load_hanzi_str(HANZI).unwrap();
        search.load_poetry_str(POETRY).unwrap();
        search
    }

    #[test]
    fn test_end_to_end_search() {
        let search = engine();
        let results = search.search("<水好>").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].poetry_id, 1);
        assert_eq!(results[0].match_positions, vec![1]);
    }

    #[test]
    fn test_parse_errors_surface() {
        let search = engine();
        assert!(matches!(
            search.search("[山"),
            Err(SearchError::Parse(ParseError::Bracket { .. }))
        ));
    }

    #[test]
    fn test_poetry_by_id() {
        let search = engine();
        let poem = search.poetry_by_id(1).unwrap();
        assert_eq!(poem.title, "b");
        assert_eq!(search.sentence_text(poem, 0).unwrap(), "水山");
        assert!(search.poetry_by_id(9).is_none());
    }

    #[test]
    fn test_stats() {
        let search = engine();
        let stats = search.stats();
        assert_eq!(stats.poems, 2);
        assert_eq!(stats.sentences, 3);
        assert_eq!(stats.hanzi_records, 3);
        assert!(stats.alphabet_size >= 3);
    }

    #[test]
    fn test_covered() {
        let search = engine();
        let covered = search.covered("山水好");
        assert_eq!(covered.len(), 2);
        assert_eq!(covered[0], ("山水好".to_string(), 0));
        assert_eq!(covered[1], ("水山".to_string(), 1));
    }
}
