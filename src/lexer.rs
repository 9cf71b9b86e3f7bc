// Shici Condition Lexer
// Tokenizes condition expressions and pre-pairs brackets

use crate::types::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Any non-ASCII character (a Chinese character in practice).
    Char,
    /// Run of ASCII letters or `?`, with trailing digits absorbed
    /// (pinyin pattern, structure literal).
    Letters,
    /// Run of ASCII digits.
    Number,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Lt,
    Gt,
    Comma,
    Quote,
    Eq,
    At,
    Hash,
    Dollar,
    Asterisk,
    Question,
    Amp,
    Pipe,
}

/// One token with its source byte range.
///
/// For an opening bracket, `nxt_pos` is the index of its matching closing
/// token; for everything else it is simply the next index. The pairing
/// pre-pass removes the need for look-ahead in the parser.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub l: usize,
    pub r: usize,
    pub nxt_pos: usize,
}

fn single_token_kind(ch: char) -> Option<TokenKind> {
    match ch {
        '[' => Some(TokenKind::LBracket),
        ']' => Some(TokenKind::RBracket),
        '(' => Some(TokenKind::LParen),
        ')' => Some(TokenKind::RParen),
        '<' => Some(TokenKind::Lt),
        '>' => Some(TokenKind::Gt),
        ',' => Some(TokenKind::Comma),
        '"' => Some(TokenKind::Quote),
        '=' => Some(TokenKind::Eq),
        '@' => Some(TokenKind::At),
        '#' => Some(TokenKind::Hash),
        '$' => Some(TokenKind::Dollar),
        '*' => Some(TokenKind::Asterisk),
        '?' => Some(TokenKind::Question),
        '&' => Some(TokenKind::Amp),
        '|' => Some(TokenKind::Pipe),
        _ => None,
    }
}

fn bracket_name(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::LBracket => "'['",
        TokenKind::RBracket => "']'",
        TokenKind::LParen => "'('",
        TokenKind::RParen => "')'",
        TokenKind::Lt => "'<'",
        TokenKind::Gt => "'>'",
        _ => "bracket",
    }
}

/// Tokenize a condition string and pre-pair its brackets.
///
/// Whitespace is skipped. A letter run starts with an ASCII letter or `?` and
/// absorbs letters, `?` and digits (pinyin tone suffixes), so `hao3` and
/// `g?ng` are single tokens. Any other ASCII byte is a lexical error.
pub fn tokenize(query: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<(usize, char)> = query.char_indices().collect();
    let end_of = |i: usize| {
        chars
            .get(i)
            .map(|&(pos, _)| pos)
            .unwrap_or_else(|| query.len())
    };

    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let (start, ch) = chars[i];

        if ch == ' ' || ch == '\t' || ch == '\n' || ch == '\r' {
            i += 1;
        } else if ch.is_ascii_alphabetic() || ch == '?' {
            let mut j = i + 1;
            while j < chars.len() {
                let c = chars[j].1;
                if c.is_ascii_alphanumeric() || c == '?' {
                    j += 1;
                } else {
                    break;
                }
            }
            let r = end_of(j);
            tokens.push(Token {
                kind: TokenKind::Letters,
                text: query[start..r].to_string(),
                l: start,
                r,
                nxt_pos: 0,
            });
            i = j;
        } else if ch.is_ascii_digit() {
            let mut j = i + 1;
            while j < chars.len() && chars[j].1.is_ascii_digit() {
                j += 1;
            }
            let r = end_of(j);
            tokens.push(Token {
                kind: TokenKind::Number,
                text: query[start..r].to_string(),
                l: start,
                r,
                nxt_pos: 0,
            });
            i = j;
        } else if let Some(kind) = single_token_kind(ch) {
            let r = end_of(i + 1);
            tokens.push(Token {
                kind,
                text: ch.to_string(),
                l: start,
                r,
                nxt_pos: 0,
            });
            i += 1;
        } else if ch.is_ascii() {
            return Err(ParseError::Lex {
                l: start,
                r: end_of(i + 1),
            });
        } else {
            let r = end_of(i + 1);
            tokens.push(Token {
                kind: TokenKind::Char,
                text: ch.to_string(),
                l: start,
                r,
                nxt_pos: 0,
            });
            i += 1;
        }
    }

    pair_brackets(&mut tokens)?;
    Ok(tokens)
}

/// Fill `nxt_pos`: opening brackets point at their closing partner, everything
/// else at the following token. Reports the guilty token on imbalance.
fn pair_brackets(tokens: &mut [Token]) -> Result<(), ParseError> {
    let mut stack: Vec<(TokenKind, usize)> = Vec::new();
    for idx in 0..tokens.len() {
        tokens[idx].nxt_pos = idx + 1;
        let kind = tokens[idx].kind;
        let expected_open = match kind {
            TokenKind::LBracket | TokenKind::LParen | TokenKind::Lt => {
                stack.push((kind, idx));
                continue;
            }
            TokenKind::RBracket => TokenKind::LBracket,
            TokenKind::RParen => TokenKind::LParen,
            TokenKind::Gt => TokenKind::Lt,
            _ => continue,
        };
        match stack.pop() {
            Some((open_kind, open_idx)) if open_kind == expected_open => {
                tokens[open_idx].nxt_pos = idx;
            }
            _ => {
                return Err(ParseError::Bracket {
                    bracket: bracket_name(kind),
                    l: tokens[idx].l,
                    r: tokens[idx].r,
                });
            }
        }
    }
    if let Some((open_kind, open_idx)) = stack.pop() {
        return Err(ParseError::Bracket {
            bracket: bracket_name(open_kind),
            l: tokens[open_idx].l,
            r: tokens[open_idx].r,
        });
    }
    Ok(())
}
