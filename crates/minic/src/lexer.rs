//! The table-driven scanner.
//!
//! The recognizer is a DFA whose configuration is loaded from a text
//! description with the sections `alphabet:`, `states:`, `start:`,
//! `accept:`, `types:` and `transition:`. Scanning is maximal munch:
//! the longest prefix that ends in an accepting state becomes the next
//! token, and the accepting state's type names the token class.

use crate::token::{Token, TokenKind};
use crate::types::{Map, Set};

#[derive(Debug, thiserror::Error)]
pub enum LexError {
    #[error("DFA description error: {0}")]
    Config(String),

    #[error("line {line}: unrecognized character `{ch}`")]
    UnrecognizedChar { ch: char, line: u32 },
}

/// A DFA description parsed from its four-section text form.
#[derive(Debug)]
pub struct DfaConfig {
    alphabet: Set<char>,
    states: Set<String>,
    start: String,
    accept: Set<String>,
    types: Map<String, String>,
    transitions: Map<String, Map<char, String>>,
}

enum Section {
    None,
    Types,
    Transitions,
}

impl DfaConfig {
    pub fn parse(text: &str) -> Result<Self, LexError> {
        let mut alphabet = Set::default();
        let mut states = Set::default();
        let mut start = None;
        let mut accept = Set::default();
        let mut types = Map::default();
        let mut transitions: Map<String, Map<char, String>> = Map::default();

        let single_char = |word: &str| -> Result<char, LexError> {
            let mut chars = word.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => Ok(ch),
                _ => Err(LexError::Config(format!(
                    "`{word}` is not a single-character symbol"
                ))),
            }
        };

        let mut section = Section::None;
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                section = Section::None;
                continue;
            }

            if let Some(rest) = line.strip_prefix("alphabet:") {
                section = Section::None;
                for word in rest.split_whitespace() {
                    alphabet.insert(single_char(word)?);
                }
            } else if let Some(rest) = line.strip_prefix("states:") {
                section = Section::None;
                states.extend(rest.split_whitespace().map(str::to_owned));
            } else if let Some(rest) = line.strip_prefix("start:") {
                section = Section::None;
                start = Some(rest.trim().to_owned());
            } else if let Some(rest) = line.strip_prefix("accept:") {
                section = Section::None;
                accept.extend(rest.split_whitespace().map(str::to_owned));
            } else if line.starts_with("types:") {
                section = Section::Types;
            } else if line.starts_with("transition:") {
                section = Section::Transitions;
            } else {
                match section {
                    Section::Types => {
                        let mut words = line.split_whitespace();
                        match (words.next(), words.next(), words.next()) {
                            (Some(state), Some(class), None) => {
                                types.insert(state.to_owned(), class.to_owned());
                            }
                            _ => {
                                return Err(LexError::Config(format!(
                                    "malformed types line: {line:?}"
                                )))
                            }
                        }
                    }
                    Section::Transitions => {
                        let mut words = line.split_whitespace();
                        match (words.next(), words.next(), words.next(), words.next()) {
                            (Some(from), Some(symbol), Some(to), None) => {
                                transitions
                                    .entry(from.to_owned())
                                    .or_default()
                                    .insert(single_char(symbol)?, to.to_owned());
                            }
                            _ => {
                                return Err(LexError::Config(format!(
                                    "malformed transition line: {line:?}"
                                )))
                            }
                        }
                    }
                    Section::None => {
                        return Err(LexError::Config(format!("unexpected line: {line:?}")))
                    }
                }
            }
        }

        let start = start.ok_or_else(|| LexError::Config("missing start: section".into()))?;
        Ok(Self {
            alphabet,
            states,
            start,
            accept,
            types,
            transitions,
        })
    }

    /// Check the description's internal consistency: the start state and
    /// all accept states are declared, transitions only mention declared
    /// states and alphabet symbols, and every accept state carries a
    /// known token class.
    pub fn validate(&self) -> Result<(), LexError> {
        if !self.states.contains(&self.start) {
            return Err(LexError::Config(format!(
                "start state `{}` is not in the state set",
                self.start
            )));
        }
        if self.accept.is_empty() {
            return Err(LexError::Config("the accept state set is empty".into()));
        }
        for state in &self.accept {
            if !self.states.contains(state) {
                return Err(LexError::Config(format!(
                    "accept state `{state}` is not in the state set"
                )));
            }
            let class = self.types.get(state).ok_or_else(|| {
                LexError::Config(format!("accept state `{state}` has no type"))
            })?;
            if TokenKind::from_class(class).is_none() {
                return Err(LexError::Config(format!(
                    "accept state `{state}` has unknown token class `{class}`"
                )));
            }
        }
        for (from, edges) in &self.transitions {
            if !self.states.contains(from) {
                return Err(LexError::Config(format!(
                    "transition from undeclared state `{from}`"
                )));
            }
            for (symbol, to) in edges {
                if !self.alphabet.contains(symbol) {
                    return Err(LexError::Config(format!(
                        "transition on `{symbol}` which is not in the alphabet"
                    )));
                }
                if !self.states.contains(to) {
                    return Err(LexError::Config(format!(
                        "transition to undeclared state `{to}`"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// The maximal-munch scanner over a validated DFA description.
#[derive(Debug)]
pub struct Lexer {
    config: DfaConfig,
}

impl Lexer {
    pub fn new(config: DfaConfig) -> Result<Self, LexError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Scan `source` into a token sequence terminated by the EOF token.
    ///
    /// Whitespace separates tokens and is otherwise ignored. An `ID`
    /// whose lexeme is a keyword is reclassified to the keyword kind.
    pub fn tokenize(&self, source: &str) -> Result<Vec<Token>, LexError> {
        let chars: Vec<char> = source.chars().collect();
        let mut tokens = Vec::new();
        let mut line = 1u32;
        let mut pos = 0;

        while pos < chars.len() {
            let ch = chars[pos];
            if ch.is_whitespace() {
                if ch == '\n' {
                    line += 1;
                }
                pos += 1;
                continue;
            }

            let mut state = &self.config.start;
            let mut cursor = pos;
            let mut accepted: Option<(usize, &String)> = None;
            while cursor < chars.len() {
                let next = self
                    .config
                    .transitions
                    .get(state)
                    .and_then(|edges| edges.get(&chars[cursor]));
                match next {
                    Some(next) => {
                        state = next;
                        cursor += 1;
                        if self.config.accept.contains(state) {
                            accepted = Some((cursor, state));
                        }
                    }
                    None => break,
                }
            }

            let Some((end, state)) = accepted else {
                return Err(LexError::UnrecognizedChar { ch, line });
            };
            let lexeme: String = chars[pos..end].iter().collect();
            // validated: every accept state has a known class
            let class = &self.config.types[state];
            let mut kind = TokenKind::from_class(class).unwrap();
            if kind == TokenKind::Id {
                if let Some(keyword) = TokenKind::keyword(&lexeme) {
                    kind = keyword;
                }
            }
            tokens.push(Token { kind, lexeme, line });
            pos = end;
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            lexeme: "#".to_owned(),
            line,
        });
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang;

    fn lexer() -> Lexer {
        Lexer::new(DfaConfig::parse(lang::TOKEN_DFA).unwrap()).unwrap()
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        lexer()
            .tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn scans_a_minimal_program() {
        use TokenKind::*;
        assert_eq!(
            kinds("int main() { return 0; }"),
            [Int, Id, Lpar, Rpar, Lbr, Return, IntNum, Semi, Rbr, Eof]
        );
    }

    #[test]
    fn keywords_are_carved_out_of_identifiers() {
        use TokenKind::*;
        assert_eq!(kinds("while whilex x"), [While, Id, Id, Eof]);
    }

    #[test]
    fn numeric_literals_split_by_subtype() {
        let tokens = lexer().tokenize("5 3.14").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::IntNum);
        assert_eq!(tokens[0].lexeme, "5");
        assert_eq!(tokens[1].kind, TokenKind::FloatNum);
        assert_eq!(tokens[1].lexeme, "3.14");
    }

    #[test]
    fn two_character_operators_munch_maximally() {
        let tokens = lexer().tokenize("a <= b == c = d").unwrap();
        let pairs: Vec<(TokenKind, &str)> = tokens
            .iter()
            .map(|t| (t.kind, t.lexeme.as_str()))
            .collect();
        assert_eq!(
            pairs,
            [
                (TokenKind::Id, "a"),
                (TokenKind::RelOp, "<="),
                (TokenKind::Id, "b"),
                (TokenKind::RelOp, "=="),
                (TokenKind::Id, "c"),
                (TokenKind::Asg, "="),
                (TokenKind::Id, "d"),
                (TokenKind::Eof, "#"),
            ]
        );
    }

    #[test]
    fn lines_are_tracked() {
        let tokens = lexer().tokenize("a\nb\n\nc").unwrap();
        let lines: Vec<u32> = tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, [1, 2, 4, 4]);
    }

    #[test]
    fn unrecognized_characters_are_reported_with_their_line() {
        let err = lexer().tokenize("x;\n@").unwrap_err();
        match err {
            LexError::UnrecognizedChar { ch, line } => {
                assert_eq!(ch, '@');
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn inconsistent_descriptions_are_rejected() {
        let text = "\
            alphabet: a\n\
            states: s0\n\
            start: s1\n\
            accept: s0\n\
            types:\n\
            s0 ID\n";
        let config = DfaConfig::parse(text).unwrap();
        assert!(matches!(Lexer::new(config), Err(LexError::Config(_))));
    }
}
