// Shici Poetry Corpus
// CSV ingest and the poem/sentence model

use std::io::BufRead;
use std::path::Path;

use tracing::{info, warn};

use crate::alphabet::{Alphabet, CharCode, CodedText};
use crate::types::LoadError;

/// Sentence-terminal punctuation: 、fullwidth comma, ideographic full stop,
/// fullwidth exclamation and question marks.
const TERMINATORS: [char; 4] = ['\u{FF0C}', '\u{3002}', '\u{FF01}', '\u{FF1F}'];

/// One poem with its content split into sentences.
#[derive(Debug, Clone)]
pub struct Poem {
    /// Corpus-assigned id (insertion order).
    pub id: usize,

    pub title: String,
    pub dynasty: String,
    pub author: String,

    /// Full content, interned.
    pub content: CodedText,

    /// Content split at terminal punctuation; empty sentences dropped.
    pub sentences: Vec<CodedText>,
}

/// The poetry corpus.
#[derive(Debug, Default, Clone)]
pub struct Corpus {
    poems: Vec<Poem>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load poems from a CSV file: one header line, then
    /// `title,dynasty,author,content` rows.
    ///
    /// Fields may be wrapped in double quotes; commas inside quoted fields are
    /// NOT escaped; the row is split on every comma, the format the corpus
    /// files are produced with. Rows with fewer than four fields are
    /// skipped with a warning. Returns the number of poems added.
    pub fn load_csv<P: AsRef<Path>>(
        &mut self,
        path: P,
        alphabet: &mut Alphabet,
    ) -> Result<usize, LoadError> {
        let file = std::fs::File::open(path)?;
        self.load_csv_reader(std::io::BufReader::new(file), alphabet)
    }

    /// Load poems from CSV text (fixtures, tests).
    pub fn load_csv_str(&mut self, csv: &str, alphabet: &mut Alphabet) -> Result<usize, LoadError> {
        self.load_csv_reader(csv.as_bytes(), alphabet)
    }

    fn load_csv_reader<R: BufRead>(
        &mut self,
        reader: R,
        alphabet: &mut Alphabet,
    ) -> Result<usize, LoadError> {
        let mut lines = reader.lines();
        // header
        if lines.next().transpose()?.is_none() {
            return Ok(0);
        }

        let mut added = 0;
        let mut skipped = 0;
        for line in lines {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            match parse_csv_line(&line) {
                Some((title, dynasty, author, content)) => {
                    self.add_poem(title, dynasty, author, content, alphabet);
                    added += 1;
                }
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(skipped, "skipped malformed poetry rows");
        }
        info!(poems = self.poems.len(), "poetry corpus loaded");
        Ok(added)
    }

    /// Insert one poem, interning its content and splitting sentences.
    pub fn add_poem(
        &mut self,
        title: &str,
        dynasty: &str,
        author: &str,
        content: &str,
        alphabet: &mut Alphabet,
    ) -> usize {
        let id = self.poems.len();
        let content = CodedText::intern(content, alphabet);
        let sentences = split_sentences(&content, alphabet);
        self.poems.push(Poem {
            id,
            title: title.to_string(),
            dynasty: dynasty.to_string(),
            author: author.to_string(),
            content,
            sentences,
        });
        id
    }

    pub fn poem(&self, id: usize) -> Option<&Poem> {
        self.poems.get(id)
    }

    pub fn poems(&self) -> &[Poem] {
        &self.poems
    }

    pub fn len(&self) -> usize {
        self.poems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poems.is_empty()
    }

    /// Total number of sentences across the corpus.
    pub fn sentence_count(&self) -> usize {
        self.poems.iter().map(|p| p.sentences.len()).sum()
    }

    /// Sentences drawn entirely from `charset`, reported as
    /// `(sentence, poetry_id)`; at most one sentence per poem.
    pub fn sentences_covered_by(
        &self,
        charset: &str,
        alphabet: &Alphabet,
    ) -> Vec<(String, usize)> {
        let allowed: Vec<CharCode> = CodedText::lookup(charset, alphabet)
            .iter()
            .copied()
            .filter(|&c| c != crate::alphabet::ILLEGAL)
            .collect();

        let mut result = Vec::new();
        for poem in &self.poems {
            for sentence in &poem.sentences {
                if sentence.iter().all(|c| allowed.contains(c)) {
                    result.push((sentence.decode(alphabet), poem.id));
                    break;
                }
            }
        }
        result
    }
}

/// Naive CSV row split: every comma is a separator, then symmetric double
/// quotes are trimmed. Quoted commas are not handled.
fn parse_csv_line(line: &str) -> Option<(&str, &str, &str, &str)> {
    let mut fields = line.split(',');
    let title = trim_quotes(fields.next()?);
    let dynasty = trim_quotes(fields.next()?);
    let author = trim_quotes(fields.next()?);
    let content = trim_quotes(fields.next()?);
    Some((title, dynasty, author, content))
}

fn trim_quotes(field: &str) -> &str {
    if field.len() >= 2 && field.starts_with('"') && field.ends_with('"') {
        &field[1..field.len() - 1]
    } else {
        field
    }
}

/// Split content at terminal punctuation, dropping empty sentences.
fn split_sentences(content: &CodedText, alphabet: &Alphabet) -> Vec<CodedText> {
    let mut result = Vec::new();
    let mut current = Vec::new();
    for &code in content.iter() {
        let is_terminator = alphabet
            .char_of(code)
            .map(|ch| TERMINATORS.contains(&ch))
            .unwrap_or(false);
        if is_terminator {
            if !current.is_empty() {
                result.push(CodedText(std::mem::take(&mut current)));
            }
        } else {
            current.push(code);
        }
    }
    if !current.is_empty() {
        result.push(CodedText(current));
    }
    result
}
