// Shici Condition Matcher
// Predicate precompute, matcher compilation and the match strategies

use bitvec::prelude::*;
use regex::Regex;
use rustc_hash::FxHashMap;
use tracing::warn;

use crate::alphabet::{Alphabet, CharCode, CodedText};
use crate::hanzi::{HanziDict, HanziRecord};
use crate::parser::Cond;
use crate::types::{CompileError, EvalError};

/// Upper bound stand-in for "unbounded length".
pub const INF_LENGTH: usize = 0xFFF_FFFF;

/// Set of interned codes satisfying a character-level condition.
pub type CharSet = BitVec<usize, Lsb0>;

/// Fresh per-sentence letters for the regex translation. Sentences with more
/// distinct characters than this fall back to the backtracking path.
const SENTENCE_LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

// ---------------------------------------------------------------------------
// Predicate precompute
// ---------------------------------------------------------------------------

/// Bitmap over the alphabet of every character satisfying a character-level
/// condition. Sentence-level conditions are rejected.
///
/// Most predicates are answered by walking the knowledge table once. `Char`
/// and single-component `Chaizi` additionally set their own code directly, so
/// characters that only appear in poems (no knowledge record) still match
/// themselves.
pub fn satisfying_set(
    cond: &Cond,
    dict: &HanziDict,
    alphabet_len: usize,
) -> Result<CharSet, CompileError> {
    let empty = || bitvec![usize, Lsb0; 0; alphabet_len];
    let from_records = |pred: &dyn Fn(&HanziRecord) -> bool| {
        let mut set = empty();
        for (code, record) in dict.iter() {
            if (code as usize) < alphabet_len && pred(record) {
                set.set(code as usize, true);
            }
        }
        set
    };

    match cond {
        Cond::Wildcard => Ok(bitvec![usize, Lsb0; 1; alphabet_len]),
        Cond::Char(code) => {
            let mut set = empty();
            if (*code as usize) < alphabet_len {
                set.set(*code as usize, true);
            }
            Ok(set)
        }
        Cond::Strokes(n) => Ok(from_records(&|rec| rec.strokes == *n)),
        Cond::Freq(n) => Ok(from_records(&|rec| rec.frequency == *n)),
        Cond::Structure { group, sub_group } => {
            Ok(from_records(&|rec| structure_matches(rec, *group, *sub_group)))
        }
        Cond::Pinyin(pattern) => {
            let re = pinyin_regex(pattern)?;
            Ok(from_records(&|rec| rec.pinyin.iter().any(|p| re.is_match(p))))
        }
        Cond::Chaizi(target) => {
            let mut set = from_records(&|rec| chaizi_matches(rec, target));
            // a single-component target also matches the character itself
            if let [code] = target[..] {
                if (code as usize) < alphabet_len {
                    set.set(code as usize, true);
                }
            }
            Ok(set)
        }
        Cond::Comb(children) => {
            let mut iter = children.iter();
            let first = iter.next().ok_or(CompileError::EmptyLogic)?;
            let mut set = satisfying_set(first, dict, alphabet_len)?;
            for child in iter {
                set &= &satisfying_set(child, dict, alphabet_len)?;
            }
            Ok(set)
        }
        Cond::Option(children) => {
            let mut iter = children.iter();
            let first = iter.next().ok_or(CompileError::EmptyLogic)?;
            let mut set = satisfying_set(first, dict, alphabet_len)?;
            for child in iter {
                set |= &satisfying_set(child, dict, alphabet_len)?;
            }
            Ok(set)
        }
        _ => Err(CompileError::CharLevelExpected),
    }
}

fn structure_matches(record: &HanziRecord, group: char, sub_group: u8) -> bool {
    let bytes = record.structure.as_bytes();
    if bytes.first() != Some(&(group as u8)) {
        return false;
    }
    sub_group == 0 || bytes.get(1) == Some(&(b'0' + sub_group))
}

/// Compile a pinyin pattern: letters match themselves, `g` also matches `ɡ`
/// (U+0261), `?` matches any run of letters, and an optional tone digit is
/// appended unless the pattern already ends in one.
fn pinyin_regex(pattern: &str) -> Result<Regex, CompileError> {
    let mut re = String::from("^");
    let mut ends_with_digit = false;
    for ch in pattern.chars() {
        match ch {
            '?' => re.push_str("[a-zɡ]*"),
            'g' => re.push_str("[gɡ]"),
            c => re.push(c),
        }
        ends_with_digit = ch.is_ascii_digit();
    }
    if !ends_with_digit {
        re.push_str("[0-4]?");
    }
    re.push('$');
    Regex::new(&re).map_err(|e| CompileError::Pinyin {
        pattern: pattern.to_string(),
        error: e.to_string(),
    })
}

/// Does any decomposition of `record` contain the target components?
///
/// The target is walked left to right; a code equal to the immediately
/// preceding target code is skipped, and each run head demands its run length
/// as the minimum multiplicity in the decomposition. So `木木木` demands three
/// 木 while a target with separated duplicates only demands its longest run.
fn chaizi_matches(record: &HanziRecord, target: &[CharCode]) -> bool {
    if target.is_empty() {
        return false;
    }
    record
        .chaizi
        .iter()
        .any(|decomp| decomp_contains(decomp, target))
}

fn decomp_contains(decomp: &[CharCode], target: &[CharCode]) -> bool {
    for (i, &code) in target.iter().enumerate() {
        if i > 0 && code == target[i - 1] {
            continue;
        }
        let run = target[i..].iter().take_while(|&&c| c == code).count();
        let have = decomp.iter().filter(|&&c| c == code).count();
        if have < run {
            return false;
        }
    }
    true
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

/// Matching strategy, chosen at compile time from the condition class and the
/// length bounds of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One character against a precomputed bitset.
    Single,
    /// Fixed-length sequence, children consume their exact lengths in order.
    Static,
    /// Variable-length sequence, backtracking over child length splits.
    Dynamic,
    /// Variable-length sequence rendered to a conventional regex.
    Regex,
    /// Order-independent multiset match via maximum bipartite matching.
    Bipartite,
    /// Kleene-like repetition of a single child.
    Multi,
    /// Every child accepts the slice.
    And,
    /// Some child accepts the slice.
    Or,
}

impl Strategy {
    fn name(&self) -> &'static str {
        match self {
            Strategy::Single => "SingleMatcher",
            Strategy::Static => "SeqMatcher[Static]",
            Strategy::Dynamic => "SeqMatcher[Dynamic]",
            Strategy::Regex => "SeqMatcher[Regex]",
            Strategy::Bipartite => "BipartiteMatcher",
            Strategy::Multi => "MultiMatcher",
            Strategy::And => "And",
            Strategy::Or => "Or",
        }
    }
}

/// Compiled form of a condition tree.
///
/// Immutable after compilation and freely shared across worker threads.
/// `origin` keeps the diagnostic rendering of the condition a leaf was
/// compiled from.
#[derive(Debug, Clone, PartialEq)]
pub struct Matcher {
    strategy: Strategy,
    lower: usize,
    upper: usize,
    charset: Option<CharSet>,
    /// Repetition bounds; meaningful for `Multi` only.
    reps: (usize, usize),
    children: Vec<Matcher>,
    origin: Option<String>,
}

impl Matcher {
    /// Single-character matcher over a precomputed bitset.
    pub fn single(charset: CharSet, origin: Option<String>) -> Matcher {
        Matcher {
            strategy: Strategy::Single,
            lower: 1,
            upper: 1,
            charset: Some(charset),
            reps: (1, 1),
            children: Vec::new(),
            origin,
        }
    }

    /// Ordered sequence. Fixed total length compiles to `Static`; variable
    /// length prefers `Regex` when the subtree is regex-expressible and falls
    /// back to the backtracking `Dynamic` otherwise.
    pub fn sequence(children: Vec<Matcher>) -> Result<Matcher, CompileError> {
        if children.is_empty() {
            return Err(CompileError::EmptySequence);
        }
        let lower = children
            .iter()
            .fold(0usize, |acc, c| acc.saturating_add(c.lower))
            .min(INF_LENGTH);
        let upper = children
            .iter()
            .fold(0usize, |acc, c| acc.saturating_add(c.upper))
            .min(INF_LENGTH);
        let strategy = if lower == upper {
            Strategy::Static
        } else if children.iter().all(Matcher::supports_regex) {
            Strategy::Regex
        } else {
            Strategy::Dynamic
        };
        Ok(Matcher {
            strategy,
            lower,
            upper,
            charset: None,
            reps: (1, 1),
            children,
            origin: None,
        })
    }

    /// Order-independent sequence; every child must be `Single`.
    pub fn unordered(children: Vec<Matcher>) -> Result<Matcher, CompileError> {
        if children.is_empty() {
            return Err(CompileError::EmptyUnordered);
        }
        if children.iter().any(|c| c.strategy != Strategy::Single) {
            return Err(CompileError::NonSingleInUnordered);
        }
        let n = children.len();
        Ok(Matcher {
            strategy: Strategy::Bipartite,
            lower: n,
            upper: n,
            charset: None,
            reps: (1, 1),
            children,
            origin: None,
        })
    }

    /// Repetition of `child` between `lower` and `upper` times.
    pub fn multi(child: Matcher, lower: usize, upper: usize) -> Result<Matcher, CompileError> {
        if lower > upper {
            return Err(CompileError::InvertedBounds { lower, upper });
        }
        let length_lower = child.lower.saturating_mul(lower).min(INF_LENGTH);
        let length_upper = child.upper.saturating_mul(upper).min(INF_LENGTH);
        Ok(Matcher {
            strategy: Strategy::Multi,
            lower: length_lower,
            upper: length_upper,
            charset: None,
            reps: (lower, upper),
            children: vec![child],
            origin: None,
        })
    }

    /// Whole-sentence conjunction.
    pub fn logic_and(children: Vec<Matcher>) -> Result<Matcher, CompileError> {
        Matcher::logic(children, Strategy::And)
    }

    /// Whole-sentence disjunction.
    pub fn logic_or(children: Vec<Matcher>) -> Result<Matcher, CompileError> {
        Matcher::logic(children, Strategy::Or)
    }

    fn logic(children: Vec<Matcher>, strategy: Strategy) -> Result<Matcher, CompileError> {
        if children.is_empty() {
            return Err(CompileError::EmptyLogic);
        }
        let lower = children.iter().map(|c| c.lower).min().unwrap_or(0);
        let upper = children.iter().map(|c| c.upper).max().unwrap_or(0);
        Ok(Matcher {
            strategy,
            lower,
            upper,
            charset: None,
            reps: (1, 1),
            children,
            origin: None,
        })
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn lower_bound(&self) -> usize {
        self.lower
    }

    pub fn upper_bound(&self) -> usize {
        self.upper
    }

    pub fn children(&self) -> &[Matcher] {
        &self.children
    }

    pub fn charset(&self) -> Option<&CharSet> {
        self.charset.as_ref()
    }

    /// Whether this subtree can be rendered to a conventional regex:
    /// everything except `Bipartite` and `And`, recursively.
    pub fn supports_regex(&self) -> bool {
        !matches!(self.strategy, Strategy::Bipartite | Strategy::And)
            && self.children.iter().all(Matcher::supports_regex)
    }

    // -- evaluation --------------------------------------------------------

    /// Whole-sentence acceptance: the length must fit the matcher's bounds
    /// and the full slice must match.
    pub fn match_sentence(&self, sentence: &CodedText) -> bool {
        let n = sentence.len();
        n >= self.lower && n <= self.upper && self.matches(sentence, 0, n)
    }

    /// Indices of accepted sentences.
    pub fn batch_match(&self, sentences: &[CodedText]) -> Vec<usize> {
        sentences
            .iter()
            .enumerate()
            .filter(|(_, s)| self.match_sentence(s))
            .map(|(i, _)| i)
            .collect()
    }

    /// Does the matcher accept the half-open slice `[start, end)`?
    pub fn matches(&self, sentence: &CodedText, start: usize, end: usize) -> bool {
        match self.strategy {
            Strategy::Single => self.single_match(sentence, start, end),
            Strategy::Static => self.static_match(sentence, start, end),
            Strategy::Dynamic => self.dynamic_match(sentence, start, end),
            Strategy::Regex => self
                .try_regex_match(sentence, start, end)
                .unwrap_or_else(|| self.dynamic_match(sentence, start, end)),
            Strategy::Bipartite => self.bipartite_match(sentence, start, end),
            Strategy::Multi => self.multi_match(sentence, start, end),
            Strategy::And => self.children.iter().all(|c| c.matches(sentence, start, end)),
            Strategy::Or => self.children.iter().any(|c| c.matches(sentence, start, end)),
        }
    }

    fn single_match(&self, sentence: &CodedText, start: usize, end: usize) -> bool {
        if start >= end || start >= sentence.len() {
            return false;
        }
        let code = sentence[start] as usize;
        self.charset
            .as_ref()
            .map(|set| code < set.len() && set[code])
            .unwrap_or(false)
    }

    fn static_match(&self, sentence: &CodedText, start: usize, end: usize) -> bool {
        let mut pos = start;
        for child in &self.children {
            let next = pos + child.lower;
            if next > end || !child.matches(sentence, pos, next) {
                return false;
            }
            pos = next;
        }
        pos == end
    }

    /// Backtracking split enumeration over child length bounds.
    fn dynamic_match(&self, sentence: &CodedText, start: usize, end: usize) -> bool {
        fn split(children: &[Matcher], sentence: &CodedText, pos: usize, end: usize) -> bool {
            let Some((head, rest)) = children.split_first() else {
                return pos == end;
            };
            let max_len = head.upper.min(end - pos);
            let mut len = head.lower;
            while len <= max_len {
                if head.matches(sentence, pos, pos + len)
                    && split(rest, sentence, pos + len, end)
                {
                    return true;
                }
                len += 1;
            }
            false
        }
        split(&self.children, sentence, start, end)
    }

    /// Maximum bipartite matching between slice positions and children via
    /// augmenting-path DFS; accepts iff every position is saturated.
    fn bipartite_match(&self, sentence: &CodedText, start: usize, end: usize) -> bool {
        if start >= end {
            return false;
        }
        let m = end - start;
        let n = self.children.len();
        if m > n {
            return false;
        }

        let mut sat = vec![false; m * n];
        for i in 0..m {
            for (j, child) in self.children.iter().enumerate() {
                sat[i * n + j] = child.matches(sentence, start + i, end);
            }
        }

        fn augment(
            u: usize,
            n: usize,
            sat: &[bool],
            matched: &mut [Option<usize>],
            visited: &mut [bool],
        ) -> bool {
            for v in 0..n {
                if sat[u * n + v] && !visited[v] {
                    visited[v] = true;
                    let free = match matched[v] {
                        None => true,
                        Some(prev) => augment(prev, n, sat, matched, visited),
                    };
                    if free {
                        matched[v] = Some(u);
                        return true;
                    }
                }
            }
            false
        }

        let mut matched: Vec<Option<usize>> = vec![None; n];
        let mut saturated = 0;
        for u in 0..m {
            let mut visited = vec![false; n];
            if augment(u, n, &sat, &mut matched, &mut visited) {
                saturated += 1;
            }
        }
        saturated >= m
    }

    /// Repetition: the regex path when the subtree supports it, otherwise an
    /// enumeration of repetition counts. An empty slice matches iff zero
    /// repetitions are allowed.
    fn multi_match(&self, sentence: &CodedText, start: usize, end: usize) -> bool {
        if self.supports_regex() {
            if let Some(accepted) = self.try_regex_match(sentence, start, end) {
                return accepted;
            }
        }
        let Some(child) = self.children.first() else {
            return false;
        };
        let (lo_reps, hi_reps) = self.reps;

        fn repeat(
            child: &Matcher,
            sentence: &CodedText,
            pos: usize,
            end: usize,
            count: usize,
            lo: usize,
            hi: usize,
        ) -> bool {
            if pos == end {
                return count >= lo;
            }
            if count >= hi {
                return false;
            }
            let step_lo = child.lower.max(1);
            let step_hi = child.upper.min(end - pos);
            let mut len = step_lo;
            while len <= step_hi {
                if child.matches(sentence, pos, pos + len)
                    && repeat(child, sentence, pos + len, end, count + 1, lo, hi)
                {
                    return true;
                }
                len += 1;
            }
            false
        }
        repeat(child, sentence, start, end, 0, lo_reps, hi_reps)
    }

    /// Regex translation: map each distinct code of the slice to a fresh
    /// letter, render the subtree over that mapping and require a full match.
    /// Returns `None` when the slice has more distinct codes than the letter
    /// pool, in which case the caller backtracks instead.
    fn try_regex_match(&self, sentence: &CodedText, start: usize, end: usize) -> Option<bool> {
        let slice = &sentence[start.min(sentence.len())..end.min(sentence.len())];
        let mut mapping: FxHashMap<CharCode, char> = FxHashMap::default();
        for &code in slice {
            if !mapping.contains_key(&code) {
                if mapping.len() >= SENTENCE_LETTERS.len() {
                    return None;
                }
                mapping.insert(code, SENTENCE_LETTERS[mapping.len()] as char);
            }
        }
        let text: String = slice.iter().map(|code| mapping[code]).collect();

        let pattern = match self.render_regex(&mapping) {
            Ok(Some(pattern)) => pattern,
            Ok(None) => return Some(false),
            Err(err) => {
                warn!(%err, "matcher subtree not renderable to regex");
                return Some(false);
            }
        };
        match Regex::new(&format!("^{pattern}$")) {
            Ok(re) => Some(re.is_match(&text)),
            Err(err) => {
                warn!(%err, "per-sentence regex build failed");
                Some(false)
            }
        }
    }

    /// Render this subtree as a regex over the per-sentence letter mapping.
    ///
    /// `Ok(None)` means the subtree cannot match anything within this
    /// sentence (an empty character class), letting callers short-circuit.
    pub fn render_regex(
        &self,
        mapping: &FxHashMap<CharCode, char>,
    ) -> Result<Option<String>, EvalError> {
        match self.strategy {
            Strategy::Single => {
                let mut letters: Vec<char> = mapping
                    .iter()
                    .filter(|(&code, _)| {
                        self.charset
                            .as_ref()
                            .map(|set| (code as usize) < set.len() && set[code as usize])
                            .unwrap_or(false)
                    })
                    .map(|(_, &letter)| letter)
                    .collect();
                letters.sort_unstable();
                match letters.len() {
                    0 => Ok(None),
                    1 => Ok(Some(letters[0].to_string())),
                    _ => Ok(Some(format!("[{}]", letters.iter().collect::<String>()))),
                }
            }
            Strategy::Static | Strategy::Dynamic | Strategy::Regex => {
                let mut out = String::new();
                for child in &self.children {
                    match child.render_regex(mapping)? {
                        Some(part) => out.push_str(&part),
                        None => return Ok(None),
                    }
                }
                Ok(Some(out))
            }
            Strategy::Multi => {
                let (lo, hi) = self.reps;
                match self.children.first().map(|c| c.render_regex(mapping)) {
                    Some(rendered) => match rendered? {
                        Some(part) => {
                            let quantifier = if hi >= INF_LENGTH {
                                match lo {
                                    0 => "*".to_string(),
                                    1 => "+".to_string(),
                                    _ => format!("{{{lo},}}"),
                                }
                            } else {
                                format!("{{{lo},{hi}}}")
                            };
                            Ok(Some(format!("(?:{part}){quantifier}")))
                        }
                        // the child can never match: only zero repetitions remain
                        None if lo == 0 => Ok(Some(String::new())),
                        None => Ok(None),
                    },
                    None => Ok(None),
                }
            }
            Strategy::Or => {
                let mut parts = Vec::new();
                for child in &self.children {
                    if let Some(part) = child.render_regex(mapping)? {
                        parts.push(part);
                    }
                }
                if parts.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(format!("(?:{})", parts.join("|"))))
                }
            }
            Strategy::Bipartite => Err(EvalError::RegexUnsupported {
                strategy: "bipartite",
            }),
            Strategy::And => Err(EvalError::RegexUnsupported { strategy: "and" }),
        }
    }

    fn render_tree(&self, f: &mut std::fmt::Formatter<'_>, indent: usize) -> std::fmt::Result {
        let pad = " ".repeat(indent);
        write!(f, "{}{}", pad, self.strategy.name())?;
        if !self.children.is_empty() {
            writeln!(f, "(")?;
            for child in &self.children {
                child.render_tree(f, indent + 4)?;
                writeln!(f)?;
            }
            write!(f, "{pad})")
        } else if let Some(origin) = &self.origin {
            write!(f, "({origin})")
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Display for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.render_tree(f, 0)
    }
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

/// Lower a condition tree to a matcher tree.
pub fn compile(
    cond: &Cond,
    dict: &HanziDict,
    alphabet: &Alphabet,
) -> Result<Matcher, CompileError> {
    match cond {
        Cond::List(children) => {
            let compiled = children
                .iter()
                .map(|c| compile(c, dict, alphabet))
                .collect::<Result<Vec<_>, _>>()?;
            Matcher::sequence(compiled)
        }
        Cond::Unordered(children) => {
            let compiled = children
                .iter()
                .map(|c| compile(c, dict, alphabet))
                .collect::<Result<Vec<_>, _>>()?;
            Matcher::unordered(compiled)
        }
        Cond::Multi {
            child,
            lower,
            upper,
        } => Matcher::multi(compile(child, dict, alphabet)?, *lower, *upper),
        Cond::And(children) => {
            let compiled = children
                .iter()
                .map(|c| compile(c, dict, alphabet))
                .collect::<Result<Vec<_>, _>>()?;
            Matcher::logic_and(compiled)
        }
        Cond::Or(children) => {
            let compiled = children
                .iter()
                .map(|c| compile(c, dict, alphabet))
                .collect::<Result<Vec<_>, _>>()?;
            Matcher::logic_or(compiled)
        }
        char_level => {
            let set = satisfying_set(char_level, dict, alphabet.len())?;
            Ok(Matcher::single(set, Some(char_level.describe(alphabet))))
        }
    }
}
