// Shici Type Definitions
// Error channels for each engine stage and the query result record

use thiserror::Error;

/// Errors raised while tokenizing or parsing a condition expression.
///
/// Every positioned variant carries the byte range `[l, r)` of the offending
/// input so callers can point at the guilty spot in the query string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// An ASCII byte outside the condition language (e.g. `;` or `%`).
    #[error("illegal character at bytes {l}..{r}")]
    Lex { l: usize, r: usize },

    /// A bracket with no partner. `bracket` names the guilty token.
    #[error("unmatched {bracket} at bytes {l}..{r}")]
    Bracket {
        bracket: &'static str,
        l: usize,
        r: usize,
    },

    /// Unexpected token or malformed operand (`$`, `@`, structure literal).
    #[error("{message} at bytes {l}..{r}")]
    Syntax { message: String, l: usize, r: usize },

    /// The token stream ended while a condition was still open.
    #[error("unexpected end of condition")]
    UnexpectedEnd,
}

impl ParseError {
    /// Byte span of the offending input, when one is known.
    pub fn span(&self) -> Option<(usize, usize)> {
        match self {
            ParseError::Lex { l, r }
            | ParseError::Bracket { l, r, .. }
            | ParseError::Syntax { l, r, .. } => Some((*l, *r)),
            ParseError::UnexpectedEnd => None,
        }
    }
}

/// Errors raised while lowering a condition tree to a matcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("sequence matcher needs at least one sub-matcher")]
    EmptySequence,

    #[error("unordered matcher needs at least one sub-matcher")]
    EmptyUnordered,

    #[error("unordered matcher accepts only single-character sub-matchers")]
    NonSingleInUnordered,

    #[error("logic matcher needs at least one sub-matcher")]
    EmptyLogic,

    #[error("length bounds inverted: {lower} > {upper}")]
    InvertedBounds { lower: usize, upper: usize },

    #[error("invalid pinyin pattern '{pattern}': {error}")]
    Pinyin { pattern: String, error: String },

    #[error("sentence-level condition where a single character is required")]
    CharLevelExpected,
}

/// Errors raised while evaluating a matcher.
///
/// With the backtracking fallback in place every compiled matcher evaluates,
/// so this only surfaces through the regex renderer when it is handed a
/// subtree the regex language cannot express.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("{strategy} matcher cannot be rendered to a regex")]
    RegexUnsupported { strategy: &'static str },
}

/// Errors raised while loading the knowledge base or the poetry corpus.
///
/// Individual malformed rows are skipped with a warning; these variants are
/// file-level failures that abort the whole load call.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed hanzi json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Umbrella error for the one-shot query path (parse → compile → run).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// All sentence indices of one poem accepted by a query.
///
/// Poems without any accepted sentence are never reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    /// Corpus-assigned poem id.
    pub poetry_id: usize,

    /// Matching sentence indices within the poem, ascending.
    pub match_positions: Vec<usize>,
}
