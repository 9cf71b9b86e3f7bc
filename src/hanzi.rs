// Shici Hanzi Knowledge Table
// Per-character records: strokes, pinyin, radical, frequency, structure, decompositions

use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::alphabet::{Alphabet, CharCode, CodedText, ILLEGAL};
use crate::types::LoadError;

fn default_structure() -> String {
    "U0".to_string()
}

/// One entry of the hanzi knowledge JSON, as found on disk.
///
/// `traditional`, `chaizi` and `structure` are optional; `structure` defaults
/// to `"U0"` (unclassified). The `index` field is carried by the data format
/// but codes are assigned in array order regardless.
#[derive(Debug, Clone, Deserialize)]
pub struct HanziEntry {
    #[serde(default)]
    pub index: u32,

    #[serde(rename = "char")]
    pub character: String,

    pub strokes: u32,
    pub radicals: String,
    pub frequency: u32,
    pub pinyin: Vec<String>,

    #[serde(default)]
    pub traditional: String,

    #[serde(default)]
    pub chaizi: Vec<String>,

    #[serde(default = "default_structure")]
    pub structure: String,
}

/// In-memory record for one interned character.
#[derive(Debug, Clone)]
pub struct HanziRecord {
    /// Traditional form, possibly empty.
    pub traditional: String,

    pub strokes: u32,

    /// Pinyin spellings, each with an optional tone digit 0–4 suffix.
    pub pinyin: Vec<String>,

    pub radical: String,

    /// Frequency rank; smaller = more common.
    pub frequency: u32,

    /// Structure tag: one letter plus optional subgroup digit.
    pub structure: String,

    /// Component decompositions, each a sequence of interned codes.
    pub chaizi: Vec<Vec<CharCode>>,
}

/// Knowledge table indexed by interned code.
#[derive(Debug, Default, Clone)]
pub struct HanziDict {
    records: Vec<Option<HanziRecord>>,
}

impl HanziDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the knowledge JSON from a file.
    ///
    /// Returns the number of records loaded. Entries with an empty `char`
    /// field are skipped with a warning; a malformed file is a hard error.
    pub fn load_json<P: AsRef<Path>>(
        &mut self,
        path: P,
        alphabet: &mut Alphabet,
    ) -> Result<usize, LoadError> {
        let text = std::fs::read_to_string(path)?;
        self.load_json_str(&text, alphabet)
    }

    /// Load the knowledge JSON from a string (fixtures, tests).
    pub fn load_json_str(
        &mut self,
        json: &str,
        alphabet: &mut Alphabet,
    ) -> Result<usize, LoadError> {
        let entries: Vec<HanziEntry> = serde_json::from_str(json)?;
        let total = entries.len();
        let loaded = self.extend_from_entries(entries, alphabet);
        if loaded < total {
            warn!(skipped = total - loaded, "skipped malformed hanzi entries");
        }
        info!(loaded, alphabet = alphabet.len(), "hanzi knowledge loaded");
        Ok(loaded)
    }

    /// Insert pre-built entries, interning characters in array order.
    pub fn extend_from_entries(
        &mut self,
        entries: Vec<HanziEntry>,
        alphabet: &mut Alphabet,
    ) -> usize {
        let mut loaded = 0;
        for entry in entries {
            let Some(ch) = entry.character.chars().next() else {
                continue;
            };
            let code = alphabet.intern_or_create(ch);
            if code == ILLEGAL {
                continue;
            }
            let chaizi = entry
                .chaizi
                .iter()
                .map(|decomp| CodedText::intern(decomp, alphabet).0)
                .collect();
            let record = HanziRecord {
                traditional: entry.traditional,
                strokes: entry.strokes,
                pinyin: entry.pinyin,
                radical: entry.radicals,
                frequency: entry.frequency,
                structure: entry.structure,
                chaizi,
            };
            if self.records.len() <= code as usize {
                self.records.resize(code as usize + 1, None);
            }
            self.records[code as usize] = Some(record);
            loaded += 1;
        }
        loaded
    }

    /// The record behind an interned code, if the character is in the table.
    pub fn record(&self, code: CharCode) -> Option<&HanziRecord> {
        self.records.get(code as usize).and_then(|r| r.as_ref())
    }

    /// Iterate all `(code, record)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (CharCode, &HanziRecord)> {
        self.records
            .iter()
            .enumerate()
            .filter_map(|(code, record)| record.as_ref().map(|r| (code as CharCode, r)))
    }

    /// Number of records in the table.
    pub fn len(&self) -> usize {
        self.records.iter().filter(|r| r.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"index": 1, "char": "木", "strokes": 4, "radicals": "木",
         "frequency": 694, "pinyin": ["mu4"]},
        {"index": 2, "char": "林", "strokes": 8, "radicals": "木",
         "frequency": 324, "pinyin": ["lin2"], "chaizi": ["木木"],
         "structure": "A1", "traditional": "林"}
    ]"#;

    #[test]
    fn test_load_assigns_codes_in_order() {
        let mut alphabet = Alphabet::new();
        let mut dict = HanziDict::new();
        let loaded = dict.load_json_str(SAMPLE, &mut alphabet).unwrap();
        assert_eq!(loaded, 2);
        assert_eq!(alphabet.lookup('木'), 0);
        assert_eq!(alphabet.lookup('林'), 1);
        assert_eq!(dict.record(0).unwrap().strokes, 4);
        assert_eq!(dict.record(1).unwrap().strokes, 8);
    }

    #[test]
    fn test_defaults() {
        let mut alphabet = Alphabet::new();
        let mut dict = HanziDict::new();
        dict.load_json_str(SAMPLE, &mut alphabet).unwrap();
        let mu = dict.record(0).unwrap();
        assert_eq!(mu.structure, "U0");
        assert!(mu.traditional.is_empty());
        assert!(mu.chaizi.is_empty());
        let lin = dict.record(1).unwrap();
        assert_eq!(lin.structure, "A1");
    }

    #[test]
    fn test_chaizi_components_are_interned() {
        let mut alphabet = Alphabet::new();
        let mut dict = HanziDict::new();
        dict.load_json_str(SAMPLE, &mut alphabet).unwrap();
        let mu = alphabet.lookup('木');
        assert_eq!(dict.record(1).unwrap().chaizi, vec![vec![mu, mu]]);
    }

    #[test]
    fn test_unknown_code_has_no_record() {
        let dict = HanziDict::new();
        assert!(dict.record(7).is_none());
        assert!(dict.record(ILLEGAL).is_none());
    }

    #[test]
    fn test_malformed_json_is_fatal() {
        let mut alphabet = Alphabet::new();
        let mut dict = HanziDict::new();
        let err = dict.load_json_str("{not json", &mut alphabet);
        assert!(matches!(err, Err(LoadError::Json(_))));
    }

    #[test]
    fn test_empty_char_entry_skipped() {
        let mut alphabet = Alphabet::new();
        let mut dict = HanziDict::new();
        let json = r#"[{"index": 1, "char": "", "strokes": 1, "radicals": "",
                        "frequency": 1, "pinyin": []}]"#;
        let loaded = dict.load_json_str(json, &mut alphabet).unwrap();
        assert_eq!(loaded, 0);
        assert!(dict.is_empty());
    }
}
