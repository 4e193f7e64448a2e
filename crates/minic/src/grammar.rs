//! The grammar model: symbols, productions, and the rule-text loader.

use crate::types::{Map, Set};
use crate::util::display_fn;
use std::fmt;

/// The name of the end-of-input terminal.
pub const EOF_SYMBOL: &str = "#";

/// The left-hand side of the synthetic start production.
pub const AUGMENTED_START: &str = "S'";

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl SymbolId {
    pub(crate) fn from_raw(raw: usize) -> Self {
        Self(raw as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Y#{:03}", self.0)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductionId(pub(crate) u32);

impl ProductionId {
    /// The synthetic `S' -> <start>` production inserted by the loader.
    pub const AUGMENTED: Self = Self(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ProductionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P#{:03}", self.0)
    }
}

#[derive(Debug)]
pub struct Production {
    pub left: SymbolId,
    pub right: Vec<SymbolId>,
}

impl Production {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            write!(f, "{} ->", g.name(self.left))?;
            if self.right.is_empty() {
                f.write_str(" ε")?;
            } else {
                for sym in &self.right {
                    write!(f, " {}", g.name(*sym))?;
                }
            }
            Ok(())
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("the rule text contains no usable production")]
    NoProductions,
}

/// A context-free grammar, augmented with `S' -> <start>` at production 0.
#[derive(Debug)]
pub struct Grammar {
    names: Vec<String>,
    ids: Map<String, SymbolId>,
    productions: Vec<Production>,
    nonterminals: Set<SymbolId>,
    start: SymbolId,
    eof: SymbolId,
}

impl Grammar {
    /// Load a grammar from rule text.
    ///
    /// Each line has the form `LHS -> RHS1 | RHS2 | …`, with symbols
    /// separated by whitespace. Both `->` and `→` are accepted as the
    /// arrow, and a lone `ε` denotes an empty alternative. A line
    /// without an arrow is skipped. The start symbol is the left-hand
    /// side of the first rule.
    pub fn load(text: &str) -> Result<Self, GrammarError> {
        let mut raw: Vec<(String, Vec<String>)> = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (left, right_all) = match line.split_once("->").or_else(|| line.split_once('→')) {
                Some(split) => split,
                None => {
                    tracing::debug!("skipping rule line without an arrow: {:?}", line);
                    continue;
                }
            };
            let left = match left.split_whitespace().next() {
                Some(name) => name.to_owned(),
                None => {
                    tracing::debug!("skipping rule line without a left-hand side: {:?}", line);
                    continue;
                }
            };
            for alternative in right_all.split('|') {
                let symbols: Vec<String> = alternative
                    .split_whitespace()
                    .map(str::to_owned)
                    .collect();
                let symbols = if symbols.len() == 1 && symbols[0] == "ε" {
                    vec![]
                } else {
                    symbols
                };
                raw.push((left.clone(), symbols));
            }
        }

        if raw.is_empty() {
            return Err(GrammarError::NoProductions);
        }

        fn intern(names: &mut Vec<String>, ids: &mut Map<String, SymbolId>, name: &str) -> SymbolId {
            if let Some(&id) = ids.get(name) {
                return id;
            }
            let id = SymbolId(names.len() as u32);
            names.push(name.to_owned());
            ids.insert(name.to_owned(), id);
            id
        }

        let mut names = Vec::new();
        let mut ids = Map::default();
        let start = intern(&mut names, &mut ids, AUGMENTED_START);
        let eof = intern(&mut names, &mut ids, EOF_SYMBOL);

        let user_start = intern(&mut names, &mut ids, &raw[0].0);
        let mut productions = vec![Production {
            left: start,
            right: vec![user_start],
        }];
        let mut nonterminals = Set::default();
        nonterminals.insert(start);
        for (left, right) in &raw {
            let left = intern(&mut names, &mut ids, left);
            nonterminals.insert(left);
            let right = right
                .iter()
                .map(|sym| intern(&mut names, &mut ids, sym))
                .collect();
            productions.push(Production { left, right });
        }

        tracing::debug!(
            productions = productions.len(),
            symbols = names.len(),
            "grammar loaded"
        );

        Ok(Self {
            names,
            ids,
            productions,
            nonterminals,
            start,
            eof,
        })
    }

    /// The augmented start symbol `S'`.
    pub fn start(&self) -> SymbolId {
        self.start
    }

    /// The reserved end-of-input terminal `#`.
    pub fn eof(&self) -> SymbolId {
        self.eof
    }

    pub fn name(&self, id: SymbolId) -> &str {
        &self.names[id.index()]
    }

    pub fn symbol(&self, name: &str) -> Option<SymbolId> {
        self.ids.get(name).copied()
    }

    pub fn symbols(&self) -> impl Iterator<Item = SymbolId> + '_ {
        (0..self.names.len() as u32).map(SymbolId)
    }

    pub fn is_nonterminal(&self, id: SymbolId) -> bool {
        self.nonterminals.contains(&id)
    }

    pub fn is_terminal(&self, id: SymbolId) -> bool {
        !self.nonterminals.contains(&id)
    }

    pub fn terminals(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.symbols().filter(|sym| self.is_terminal(*sym))
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.symbols().filter(|sym| self.is_nonterminal(*sym))
    }

    pub fn production(&self, id: ProductionId) -> &Production {
        &self.productions[id.index()]
    }

    pub fn productions(&self) -> impl Iterator<Item = (ProductionId, &Production)> + '_ {
        self.productions
            .iter()
            .enumerate()
            .map(|(i, p)| (ProductionId(i as u32), p))
    }

    pub fn productions_of(&self, left: SymbolId) -> impl Iterator<Item = ProductionId> + '_ {
        self.productions()
            .filter_map(move |(id, p)| (p.left == left).then_some(id))
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#### terminals: ")?;
        for (i, t) in self.terminals().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(self.name(t))?;
        }
        write!(f, "\n#### nonterminals: ")?;
        for (i, n) in self.nonterminals().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(self.name(n))?;
        }
        writeln!(f, "\n#### productions:")?;
        for (id, p) in self.productions() {
            writeln!(f, "[{:02}] {}", id.index(), p.display(self))?;
        }
        Ok(())
    }
}
