// Shici Condition Parser
// Recursive descent over the bracket-paired token stream

use crate::alphabet::{Alphabet, CharCode};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::matcher::INF_LENGTH;
use crate::types::ParseError;

/// A condition over a single character or over a whole sentence.
///
/// Character-level variants (everything up to and including [`Cond::Option`])
/// constrain one character and occupy exactly one position; sentence-level
/// variants span a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cond {
    /// Exactly this interned character.
    Char(CharCode),
    /// Any character.
    Wildcard,
    /// Stroke count equals.
    Strokes(u32),
    /// Frequency rank equals.
    Freq(u32),
    /// Structure tag starts with `group`; `sub_group > 0` also pins the digit.
    Structure { group: char, sub_group: u8 },
    /// Pinyin pattern (`?` wildcard, `g` ≈ `ɡ`, optional tone digit).
    Pinyin(String),
    /// Some decomposition contains the target components (see matcher).
    Chaizi(Vec<CharCode>),
    /// Conjunction over a single character.
    Comb(Vec<Cond>),
    /// Disjunction over a single character.
    Option(Vec<Cond>),
    /// Ordered sequence over a sentence.
    List(Vec<Cond>),
    /// Order-independent sequence over a sentence.
    Unordered(Vec<Cond>),
    /// Kleene-like repetition of `child`, `lower..=upper` times.
    Multi {
        child: Box<Cond>,
        lower: usize,
        upper: usize,
    },
    /// All sub-conditions accept the sentence.
    And(Vec<Cond>),
    /// Any sub-condition accepts the sentence.
    Or(Vec<Cond>),
}

impl Cond {
    /// Whether this condition constrains a single character (length [1,1]).
    pub fn is_char_level(&self) -> bool {
        matches!(
            self,
            Cond::Char(_)
                | Cond::Wildcard
                | Cond::Strokes(_)
                | Cond::Freq(_)
                | Cond::Structure { .. }
                | Cond::Pinyin(_)
                | Cond::Chaizi(_)
                | Cond::Comb(_)
                | Cond::Option(_)
        )
    }

    /// Diagnostic rendering; characters decode through `alphabet`.
    pub fn describe(&self, alphabet: &Alphabet) -> String {
        let join = |conds: &[Cond]| {
            conds
                .iter()
                .map(|c| c.describe(alphabet))
                .collect::<Vec<_>>()
                .join(" ")
        };
        match self {
            Cond::Char(code) => format!("'{}'", alphabet.char_of(*code).unwrap_or('?')),
            Cond::Wildcard => "Any".to_string(),
            Cond::Strokes(n) => format!("Stroke={}", n),
            Cond::Freq(n) => format!("Freq={}", n),
            Cond::Structure { group, sub_group } => {
                if *sub_group > 0 {
                    format!("Struct={}{}", group, sub_group)
                } else {
                    format!("Struct={}", group)
                }
            }
            Cond::Pinyin(p) => format!("Pinyin={}", p),
            Cond::Chaizi(target) => {
                let chars: String = target
                    .iter()
                    .map(|&c| alphabet.char_of(c).unwrap_or('?'))
                    .collect();
                format!("Chaizi='{}'", chars)
            }
            Cond::Comb(conds) => format!("CombCond: [ {} ]", join(conds)),
            Cond::Option(conds) => format!("OptionCond: {{ {} }}", join(conds)),
            Cond::List(conds) => format!("CondList: ( {} )", join(conds)),
            Cond::Unordered(conds) => format!("Unordered: < {} >", join(conds)),
            Cond::Multi { child, .. } => format!("Multi: ( {} )*", child.describe(alphabet)),
            Cond::And(conds) => format!("And: ( {} )", join(conds)),
            Cond::Or(conds) => format!("Or: ( {} )", join(conds)),
        }
    }
}

/// Parse a condition expression against an alphabet.
///
/// Characters are looked up without allocating; a character the alphabet has
/// never seen becomes the ILLEGAL code and matches nothing.
pub fn parse(query: &str, alphabet: &Alphabet) -> Result<Cond, ParseError> {
    let tokens = tokenize(query)?;
    if tokens.is_empty() {
        return Err(ParseError::UnexpectedEnd);
    }
    let parser = Parser {
        tokens: &tokens,
        alphabet,
    };
    parser.parse_or(0, tokens.len())
}

struct Parser<'a> {
    tokens: &'a [Token],
    alphabet: &'a Alphabet,
}

impl<'a> Parser<'a> {
    fn syntax(&self, message: &str, token: &Token) -> ParseError {
        ParseError::Syntax {
            message: message.to_string(),
            l: token.l,
            r: token.r,
        }
    }

    /// Top-level token positions of `separator` within `[l, r)`, skipping
    /// bracketed groups via the pre-paired `nxt_pos`.
    fn split_top(&self, l: usize, r: usize, separator: TokenKind) -> Vec<(usize, usize)> {
        let mut parts = Vec::new();
        let mut seg_start = l;
        let mut pos = l;
        while pos < r {
            let token = &self.tokens[pos];
            match token.kind {
                TokenKind::LBracket | TokenKind::LParen | TokenKind::Lt => {
                    pos = token.nxt_pos + 1;
                }
                kind if kind == separator => {
                    parts.push((seg_start, pos));
                    seg_start = pos + 1;
                    pos += 1;
                }
                _ => pos += 1,
            }
        }
        parts.push((seg_start, r));
        parts
    }

    fn parse_or(&self, l: usize, r: usize) -> Result<Cond, ParseError> {
        let parts = self.split_top(l, r, TokenKind::Pipe);
        if parts.len() == 1 {
            return self.parse_and(l, r);
        }
        let mut children = Vec::with_capacity(parts.len());
        for (sl, sr) in parts {
            children.push(self.parse_and(sl, sr)?);
        }
        Ok(Cond::Or(children))
    }

    fn parse_and(&self, l: usize, r: usize) -> Result<Cond, ParseError> {
        let parts = self.split_top(l, r, TokenKind::Amp);
        if parts.len() == 1 {
            return self.parse_sequence(l, r);
        }
        let mut children = Vec::with_capacity(parts.len());
        for (sl, sr) in parts {
            children.push(self.parse_sequence(sl, sr)?);
        }
        Ok(Cond::And(children))
    }

    fn parse_sequence(&self, l: usize, r: usize) -> Result<Cond, ParseError> {
        let mut children = self.parse_sequence_elements(l, r)?;
        match children.len() {
            0 => Err(ParseError::UnexpectedEnd),
            1 => Ok(children.remove(0)),
            _ => Ok(Cond::List(children)),
        }
    }

    fn parse_sequence_elements(&self, l: usize, r: usize) -> Result<Vec<Cond>, ParseError> {
        let mut children = Vec::new();
        let mut pos = l;
        while pos < r {
            let token = &self.tokens[pos];
            match token.kind {
                TokenKind::LBracket => {
                    children.push(self.parse_option(pos)?);
                    pos = token.nxt_pos + 1;
                }
                TokenKind::Lt => {
                    children.push(self.parse_unordered(pos)?);
                    pos = token.nxt_pos + 1;
                }
                TokenKind::LParen => {
                    let inner = self.parse_or(pos + 1, token.nxt_pos)?;
                    pos = token.nxt_pos + 1;
                    if pos < r && self.tokens[pos].kind == TokenKind::Asterisk {
                        pos += 1;
                        children.push(Cond::Multi {
                            child: Box::new(inner),
                            lower: 0,
                            upper: INF_LENGTH,
                        });
                    } else {
                        children.push(inner);
                    }
                }
                _ => {
                    let (base, next) = self.parse_base(pos, r)?;
                    children.push(base);
                    pos = next;
                }
            }
        }
        Ok(children)
    }

    /// `[...]`: disjunction of alternatives. `,` and `|` both separate
    /// alternatives. Bare characters become chaizi components: adjacent
    /// characters merge into one target and a separator starts a new one, so
    /// `[木木木|山]` reads "decomposes with 木×3, or 山".
    fn parse_option(&self, open: usize) -> Result<Cond, ParseError> {
        let close = self.tokens[open].nxt_pos;
        let mut alts: Vec<Cond> = Vec::new();
        // true → the next character starts a fresh chaizi target
        let mut flush = true;
        let mut pos = open + 1;
        while pos < close {
            let token = &self.tokens[pos];
            match token.kind {
                TokenKind::Comma | TokenKind::Pipe => {
                    flush = true;
                    pos += 1;
                }
                TokenKind::LBracket => {
                    alts.push(self.parse_comb(pos)?);
                    pos = token.nxt_pos + 1;
                    flush = true;
                }
                _ => {
                    let (base, next) = self.parse_base(pos, close)?;
                    pos = next;
                    self.push_merging_chaizi(&mut alts, base, &mut flush);
                }
            }
        }
        if alts.is_empty() {
            return Err(self.syntax("empty option", &self.tokens[open]));
        }
        Ok(Cond::Option(alts))
    }

    /// Nested `[...]` inside an option: conjunction of base conditions with
    /// the same chaizi merging; `,` separates conjuncts.
    fn parse_comb(&self, open: usize) -> Result<Cond, ParseError> {
        let close = self.tokens[open].nxt_pos;
        let mut conds: Vec<Cond> = Vec::new();
        let mut flush = true;
        let mut pos = open + 1;
        while pos < close {
            let token = &self.tokens[pos];
            match token.kind {
                TokenKind::Comma => {
                    flush = true;
                    pos += 1;
                }
                _ => {
                    let (base, next) = self.parse_base(pos, close)?;
                    pos = next;
                    self.push_merging_chaizi(&mut conds, base, &mut flush);
                }
            }
        }
        if conds.is_empty() {
            return Err(self.syntax("empty combination", &self.tokens[open]));
        }
        Ok(Cond::Comb(conds))
    }

    /// `<...>`: the contents parse like a sequence; order-independence is
    /// applied at match time.
    fn parse_unordered(&self, open: usize) -> Result<Cond, ParseError> {
        let close = self.tokens[open].nxt_pos;
        let children = self.parse_sequence_elements(open + 1, close)?;
        if children.is_empty() {
            return Err(self.syntax("empty unordered sequence", &self.tokens[open]));
        }
        Ok(Cond::Unordered(children))
    }

    /// Append a base condition to `out`, merging a `Char` into the chaizi
    /// target it extends. `flush` set means the merge chain is broken.
    fn push_merging_chaizi(&self, out: &mut Vec<Cond>, base: Cond, flush: &mut bool) {
        if let Cond::Char(code) = base {
            if !*flush {
                if let Some(Cond::Chaizi(target)) = out.last_mut() {
                    target.push(code);
                    return;
                }
            }
            out.push(Cond::Chaizi(vec![code]));
            *flush = false;
        } else {
            out.push(base);
            *flush = true;
        }
    }

    /// One base condition starting at `pos`; returns the condition and the
    /// position after it.
    fn parse_base(&self, pos: usize, end: usize) -> Result<(Cond, usize), ParseError> {
        if pos >= end {
            return Err(ParseError::UnexpectedEnd);
        }
        let token = &self.tokens[pos];
        match token.kind {
            TokenKind::Asterisk => Ok((Cond::Wildcard, pos + 1)),
            TokenKind::Dollar => {
                let operand = self
                    .tokens
                    .get(pos + 1)
                    .filter(|_| pos + 1 < end)
                    .ok_or_else(|| self.syntax("expected frequency number after '$'", token))?;
                if operand.kind != TokenKind::Number {
                    return Err(self.syntax("expected frequency number after '$'", operand));
                }
                let freq = self.parse_number(operand)?;
                Ok((Cond::Freq(freq), pos + 2))
            }
            TokenKind::At => {
                let operand = self
                    .tokens
                    .get(pos + 1)
                    .filter(|_| pos + 1 < end)
                    .ok_or_else(|| self.syntax("expected structure literal after '@'", token))?;
                if operand.kind != TokenKind::Letters {
                    return Err(self.syntax("expected structure literal after '@'", operand));
                }
                let cond = self.parse_structure(operand)?;
                Ok((cond, pos + 2))
            }
            TokenKind::Number => {
                let strokes = self.parse_number(token)?;
                Ok((Cond::Strokes(strokes), pos + 1))
            }
            TokenKind::Letters => Ok((Cond::Pinyin(token.text.clone()), pos + 1)),
            TokenKind::Char => {
                let code = token
                    .text
                    .chars()
                    .next()
                    .map(|ch| self.alphabet.lookup(ch))
                    .unwrap_or(crate::alphabet::ILLEGAL);
                Ok((Cond::Char(code), pos + 1))
            }
            _ => Err(self.syntax("unexpected token", token)),
        }
    }

    fn parse_number(&self, token: &Token) -> Result<u32, ParseError> {
        token
            .text
            .parse::<u32>()
            .map_err(|_| self.syntax("number out of range", token))
    }

    /// A structure literal is one letter plus an optional subgroup digit.
    fn parse_structure(&self, token: &Token) -> Result<Cond, ParseError> {
        let bytes = token.text.as_bytes();
        let valid = match bytes {
            [g] => g.is_ascii_alphabetic(),
            [g, s] => g.is_ascii_alphabetic() && s.is_ascii_digit(),
            _ => false,
        };
        if !valid {
            return Err(self.syntax("invalid structure literal", token));
        }
        Ok(Cond::Structure {
            group: bytes[0] as char,
            sub_group: if bytes.len() == 2 { bytes[1] - b'0' } else { 0 },
        })
    }
}
