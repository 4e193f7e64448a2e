//! SLR(1) ACTION/GOTO table synthesis.

use crate::first_follow::FollowSets;
use crate::grammar::{Grammar, ProductionId, SymbolId};
use crate::lr0::{Automaton, StateId};
use crate::types::Map;
use crate::util::display_fn;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    Shift(StateId),
    Reduce(ProductionId),
    Accept,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shift(next) => write!(f, "s{}", next),
            Self::Reduce(p) => write!(f, "r{}", p.index()),
            Self::Accept => f.write_str("acc"),
        }
    }
}

/// A second, distinct action written into an occupied ACTION cell.
/// The new action wins; the collision is recorded, not silently lost.
#[derive(Debug)]
pub struct Conflict {
    pub state: StateId,
    pub symbol: SymbolId,
    pub old: Action,
    pub new: Action,
}

impl Conflict {
    fn kind(&self) -> &'static str {
        match (&self.old, &self.new) {
            (Action::Shift(_), _) | (_, Action::Shift(_)) => "shift/reduce",
            _ => "reduce/reduce",
        }
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            write!(
                f,
                "{} conflict in state {} on `{}`: {} vs {} (keeping {})",
                self.kind(),
                self.state,
                g.name(self.symbol),
                self.old,
                self.new,
                self.new,
            )
        })
    }
}

#[derive(Debug, Default)]
struct Row {
    actions: Map<SymbolId, Action>,
    gotos: Map<SymbolId, StateId>,
}

/// The SLR(1) parse table.
#[derive(Debug)]
pub struct ParseTable {
    rows: Vec<Row>,
    conflicts: Vec<Conflict>,
}

impl ParseTable {
    /// Derive the table from the canonical collection and FOLLOW sets.
    ///
    /// For a completed item of the augmented production, `ACTION[i][#]`
    /// is accept; for any other completed item of production `p` with
    /// left side `A`, `ACTION[i][a]` is reduce(p) for every `a` in
    /// `FOLLOW(A)`. Terminal transitions become shifts, nonterminal
    /// transitions become gotos. A cell written twice with different
    /// actions records a conflict and keeps the later write, so a
    /// non-SLR(1) grammar still yields a usable (if unsound) table.
    pub fn build(g: &Grammar, automaton: &Automaton, follow: &FollowSets) -> Self {
        let mut rows: Vec<Row> = (0..automaton.len()).map(|_| Row::default()).collect();
        let mut conflicts = Vec::new();

        fn set(
            rows: &mut [Row],
            conflicts: &mut Vec<Conflict>,
            state: StateId,
            symbol: SymbolId,
            action: Action,
        ) {
            use indexmap::map::Entry;
            match rows[state.index()].actions.entry(symbol) {
                Entry::Vacant(entry) => {
                    entry.insert(action);
                }
                Entry::Occupied(mut entry) => {
                    if *entry.get() != action {
                        conflicts.push(Conflict {
                            state,
                            symbol,
                            old: *entry.get(),
                            new: action,
                        });
                        entry.insert(action);
                    }
                }
            }
        }

        for (id, item_set) in automaton.states() {
            for item in item_set {
                if !item.is_complete(g) {
                    continue;
                }
                let p = g.production(item.production);
                if p.left == g.start() {
                    set(&mut rows, &mut conflicts, id, g.eof(), Action::Accept);
                } else {
                    for lookahead in follow.follow(p.left).iter() {
                        set(
                            &mut rows,
                            &mut conflicts,
                            id,
                            lookahead,
                            Action::Reduce(item.production),
                        );
                    }
                }
            }

            for sym in g.symbols() {
                let Some(target) = automaton.transition(id, sym) else {
                    continue;
                };
                if g.is_terminal(sym) {
                    set(&mut rows, &mut conflicts, id, sym, Action::Shift(target));
                } else {
                    rows[id.index()].gotos.insert(sym, target);
                }
            }
        }

        tracing::debug!(
            states = rows.len(),
            conflicts = conflicts.len(),
            "parse table built"
        );

        Self { rows, conflicts }
    }

    pub fn action(&self, state: StateId, symbol: SymbolId) -> Option<Action> {
        self.rows[state.index()].actions.get(&symbol).copied()
    }

    pub fn goto(&self, state: StateId, symbol: SymbolId) -> Option<StateId> {
        self.rows[state.index()].gotos.get(&symbol).copied()
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    /// The terminals with an action in `state`, sorted by name. Used
    /// for parse-error diagnostics.
    pub fn expected<'g>(&self, g: &'g Grammar, state: StateId) -> Vec<&'g str> {
        let mut names: Vec<&str> = self.rows[state.index()]
            .actions
            .keys()
            .map(|&sym| g.name(sym))
            .collect();
        names.sort_unstable();
        names
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            let terminals: Vec<_> = g.terminals().collect();
            let nonterminals: Vec<_> = g.nonterminals().filter(|&n| n != g.start()).collect();

            write!(f, "{:>6}", "state")?;
            for &t in &terminals {
                write!(f, "{:>8}", g.name(t))?;
            }
            for &n in &nonterminals {
                write!(f, "{:>8}", g.name(n))?;
            }
            writeln!(f)?;

            for (i, row) in self.rows.iter().enumerate() {
                write!(f, "{:>6}", i)?;
                for t in &terminals {
                    match row.actions.get(t) {
                        Some(action) => write!(f, "{:>8}", action.to_string())?,
                        None => write!(f, "{:>8}", "")?,
                    }
                }
                for n in &nonterminals {
                    match row.gotos.get(n) {
                        Some(target) => write!(f, "{:>8}", target)?,
                        None => write!(f, "{:>8}", "")?,
                    }
                }
                writeln!(f)?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::first_follow::FirstSets;

    const ARITH: &str = "\
        E -> E + T | T\n\
        T -> T * F | F\n\
        F -> ( E ) | i\n";

    fn build(rules: &str) -> (Grammar, ParseTable) {
        let g = Grammar::load(rules).unwrap();
        let first = FirstSets::new(&g);
        let follow = FollowSets::new(&g, &first);
        let automaton = Automaton::build(&g);
        let table = ParseTable::build(&g, &automaton, &follow);
        (g, table)
    }

    #[test]
    fn arithmetic_grammar_is_conflict_free() {
        let (_, table) = build(ARITH);
        assert!(table.conflicts().is_empty());
    }

    #[test]
    fn accept_sits_on_eof_after_the_start_symbol() {
        let g = Grammar::load(ARITH).unwrap();
        let first = FirstSets::new(&g);
        let follow = FollowSets::new(&g, &first);
        let automaton = Automaton::build(&g);
        let table = ParseTable::build(&g, &automaton, &follow);

        let e = g.symbol("E").unwrap();
        let after_e = automaton.transition(crate::lr0::StateId::START, e).unwrap();
        assert_eq!(table.action(after_e, g.eof()), Some(Action::Accept));
    }

    #[test]
    fn initial_state_shifts_on_leading_terminals() {
        let (g, table) = build(ARITH);
        for name in ["(", "i"] {
            let sym = g.symbol(name).unwrap();
            assert!(matches!(
                table.action(crate::lr0::StateId::START, sym),
                Some(Action::Shift(_))
            ));
        }
        assert_eq!(table.expected(&g, crate::lr0::StateId::START), ["(", "i"]);
    }

    #[test]
    fn ambiguous_grammar_yields_conflicts_but_still_a_table() {
        // S -> S S | a is ambiguous; SLR construction collides but the
        // last write must win and the table must remain usable.
        let (_, table) = build("S -> S S | a");
        assert!(!table.conflicts().is_empty());
        assert!(table
            .conflicts()
            .iter()
            .all(|c| c.old != c.new));
    }
}
