//! # Shici: Classical Chinese Poetry Pattern Search
//!
//! A search engine over a corpus of classical Chinese poetry. A condition
//! expression constrains characters by identity, stroke count, pinyin,
//! structure, frequency rank or component decomposition (chaizi), and the
//! engine returns every sentence of every poem that matches.
//!
//! ## Condition language
//!
//! | Syntax | Meaning |
//! |---|---|
//! | `*` | any character |
//! | `4` | stroke count equals 4 |
//! | `$100` | frequency rank equals 100 |
//! | `@A2` | structure group `A`, subgroup 2 |
//! | `hao3`, `h?o`, `g?ng` | pinyin pattern (`?` wildcard, optional tone) |
//! | `山` | exactly that character |
//! | `[木木木,山]` | one character: decomposes with 木×3, or 山 |
//! | `<山水>` | 山 and 水 in either order |
//! | `(4)*` | any run of 4-stroke characters |
//! | `&`, `\|` | whole-sentence AND / OR |
//!
//! ## Pipeline
//!
//! Queries run as parse → compile → match:
//!
//! 1. **Lexer/Parser**: tokenize with pre-paired brackets, build a condition
//!    tree of per-character predicates and sequence combinators.
//! 2. **Compiler**: precompute for every character-level node the bitset of
//!    satisfying characters over the interned alphabet, then pick the
//!    cheapest admissible strategy per subtree (single bitset probe, fixed
//!    walk, regex over a per-sentence alphabet, bipartite matching,
//!    backtracking).
//! 3. **Executor**: scan every sentence of every poem, in parallel.
//!
//! ## Example Usage
//!
//! ```ignore
//! use shici::PoetrySearch;
//!
//! let mut search = PoetrySearch::new();
//! search.load_hanzi("hanzi_data.json")?;
//! search.load_poetry("poetry.csv")?;
//!
//! for result in search.search("*(4)*")? {
//!     let poem = search.poetry_by_id(result.poetry_id).unwrap();
//!     println!("{} — {}", poem.title, poem.author);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod alphabet;
pub mod corpus;
pub mod executor;
pub mod hanzi;
pub mod lexer;
pub mod matcher;
pub mod parser;
pub mod search;
pub mod types;

// Re-export main types and functions for convenience
pub use alphabet::{Alphabet, CharCode, CodedText, ILLEGAL};
pub use corpus::{Corpus, Poem};
pub use executor::{execute, ExecuteStrategy};
pub use hanzi::{HanziDict, HanziEntry, HanziRecord};
pub use matcher::{compile, satisfying_set, CharSet, Matcher, Strategy, INF_LENGTH};
pub use parser::{parse, Cond};
pub use search::{PoetrySearch, Stats};
pub use types::{
    CompileError, EvalError, LoadError, ParseError, QueryResult, SearchError,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
