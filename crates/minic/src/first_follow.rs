//! FIRST and FOLLOW set computation.
//!
//! Both computations iterate to a fixed point. Termination is guaranteed
//! because every set is bounded by the finite terminal alphabet and only
//! ever grows.

use crate::grammar::{Grammar, SymbolId};
use crate::util::display_fn;
use bit_set::BitSet;
use std::fmt;

/// A set of grammar symbols, backed by a bit set over symbol indices.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SymbolSet {
    inner: BitSet,
}

impl SymbolSet {
    pub fn contains(&self, id: SymbolId) -> bool {
        self.inner.contains(id.index())
    }

    pub fn insert(&mut self, id: SymbolId) -> bool {
        self.inner.insert(id.index())
    }

    /// Merge `other` into `self`, reporting whether anything was added.
    pub fn union_with(&mut self, other: &Self) -> bool {
        let before = self.inner.len();
        self.inner.union_with(&other.inner);
        self.inner.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.inner.iter().map(SymbolId::from_raw)
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            f.write_str("{ ")?;
            for (i, sym) in self.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                f.write_str(g.name(sym))?;
            }
            f.write_str(" }")
        })
    }
}

impl FromIterator<SymbolId> for SymbolSet {
    fn from_iter<I: IntoIterator<Item = SymbolId>>(iter: I) -> Self {
        let mut set = Self::default();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

/// FIRST sets for every grammar symbol, plus the nullable set.
#[derive(Debug)]
pub struct FirstSets {
    nullable: SymbolSet,
    sets: Vec<SymbolSet>,
}

impl FirstSets {
    pub fn new(g: &Grammar) -> Self {
        let nullable = nullable_set(g);

        // Terminals begin with themselves; nonterminal sets start empty
        // and are grown by relaxation sweeps.
        let mut sets: Vec<SymbolSet> = g
            .symbols()
            .map(|sym| {
                if g.is_terminal(sym) {
                    Some(sym).into_iter().collect()
                } else {
                    SymbolSet::default()
                }
            })
            .collect();

        while first_sweep(g, &nullable, &mut sets) {}

        Self { nullable, sets }
    }

    pub fn nullable(&self, id: SymbolId) -> bool {
        self.nullable.contains(id)
    }

    pub fn first(&self, id: SymbolId) -> &SymbolSet {
        &self.sets[id.index()]
    }

    /// `FIRST` of a sentential sequence, plus whether the whole sequence
    /// derives ε.
    pub fn of_seq(&self, seq: &[SymbolId]) -> (SymbolSet, bool) {
        let mut out = SymbolSet::default();
        for &sym in seq {
            out.union_with(self.first(sym));
            if !self.nullable.contains(sym) {
                return (out, false);
            }
        }
        (out, true)
    }
}

/// The set of nonterminals that derive ε.
fn nullable_set(g: &Grammar) -> SymbolSet {
    let mut nullable = SymbolSet::default();
    let mut changed = true;
    while changed {
        changed = false;
        for (_, p) in g.productions() {
            if nullable.contains(p.left) {
                continue;
            }
            if p.right.iter().all(|sym| nullable.contains(*sym)) {
                nullable.insert(p.left);
                changed = true;
            }
        }
    }
    nullable
}

/// One relaxation sweep of the FIRST constraints; reports whether any
/// set grew.
fn first_sweep(g: &Grammar, nullable: &SymbolSet, sets: &mut [SymbolSet]) -> bool {
    let mut changed = false;
    for (_, p) in g.productions() {
        for &sym in &p.right {
            if sym != p.left {
                let sub = sets[sym.index()].clone();
                changed |= sets[p.left.index()].union_with(&sub);
            }
            if !nullable.contains(sym) {
                break;
            }
        }
    }
    changed
}

/// FOLLOW sets for every nonterminal.
#[derive(Debug)]
pub struct FollowSets {
    sets: Vec<SymbolSet>,
}

impl FollowSets {
    pub fn new(g: &Grammar, first: &FirstSets) -> Self {
        let mut sets: Vec<SymbolSet> = g.symbols().map(|_| SymbolSet::default()).collect();
        sets[g.start().index()].insert(g.eof());

        while follow_sweep(g, first, &mut sets) {}

        Self { sets }
    }

    pub fn follow(&self, id: SymbolId) -> &SymbolSet {
        &self.sets[id.index()]
    }
}

/// One relaxation sweep of the FOLLOW constraints: for every occurrence
/// of a nonterminal B in `A -> α B β`, add `FIRST(β)` to `FOLLOW(B)`,
/// and `FOLLOW(A)` as well when β is empty or nullable.
fn follow_sweep(g: &Grammar, first: &FirstSets, sets: &mut [SymbolSet]) -> bool {
    let mut changed = false;
    for (_, p) in g.productions() {
        for (i, &sym) in p.right.iter().enumerate() {
            if !g.is_nonterminal(sym) {
                continue;
            }
            let (first_beta, beta_nullable) = first.of_seq(&p.right[i + 1..]);
            changed |= sets[sym.index()].union_with(&first_beta);
            if beta_nullable {
                let from_left = sets[p.left.index()].clone();
                changed |= sets[sym.index()].union_with(&from_left);
            }
        }
    }
    changed
}
