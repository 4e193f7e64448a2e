//! LR(0) items and the canonical collection.

use crate::grammar::{Grammar, ProductionId, SymbolId};
use crate::types::{Map, Queue};
use crate::util::display_fn;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(u32);

impl StateId {
    /// The initial state, `closure({(0, 0)})`.
    pub const START: Self = Self(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// An LR(0) item: a production with a dot position in `0..=rhs.len()`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Item {
    pub production: ProductionId,
    pub dot: usize,
}

impl Item {
    /// True when the dot has reached the end of the production.
    pub fn is_complete(&self, g: &Grammar) -> bool {
        self.dot == g.production(self.production).right.len()
    }

    /// The symbol immediately after the dot, if any.
    pub fn next_symbol(&self, g: &Grammar) -> Option<SymbolId> {
        g.production(self.production).right.get(self.dot).copied()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            let p = g.production(self.production);
            write!(f, "{} ->", g.name(p.left))?;
            for (i, sym) in p.right.iter().enumerate() {
                if i == self.dot {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.name(*sym))?;
            }
            if self.dot == p.right.len() {
                f.write_str(" .")?;
            }
            Ok(())
        })
    }
}

/// A set of items. Equality is structural, which is what decides state
/// merging during construction.
pub type ItemSet = BTreeSet<Item>;

/// Close an item set: for every item with the dot before a nonterminal
/// `B`, add `(p, 0)` for every production of `B`, until nothing new is
/// added.
pub fn closure(g: &Grammar, mut set: ItemSet) -> ItemSet {
    let mut queue: Queue<Item> = set.iter().copied().collect();
    while let Some(item) = queue.pop() {
        let Some(sym) = item.next_symbol(g) else {
            continue;
        };
        if !g.is_nonterminal(sym) {
            continue;
        }
        for production in g.productions_of(sym) {
            let item = Item { production, dot: 0 };
            if set.insert(item) {
                queue.push(item);
            }
        }
    }
    set
}

/// Advance the dot over `sym` for every item that allows it, then close
/// the result. Empty when no item has the dot before `sym`.
pub fn goto(g: &Grammar, set: &ItemSet, sym: SymbolId) -> ItemSet {
    let moved: ItemSet = set
        .iter()
        .filter(|item| item.next_symbol(g) == Some(sym))
        .map(|item| Item {
            production: item.production,
            dot: item.dot + 1,
        })
        .collect();
    if moved.is_empty() {
        moved
    } else {
        closure(g, moved)
    }
}

/// The canonical collection of LR(0) item sets plus its transition map.
#[derive(Debug)]
pub struct Automaton {
    states: Vec<ItemSet>,
    transitions: Map<(StateId, SymbolId), StateId>,
}

impl Automaton {
    /// Build the collection breadth-first from `closure({(0, 0)})`,
    /// computing goto for every known state and every grammar symbol.
    /// Any non-empty result not structurally equal to an existing state
    /// becomes a new state; the transition is recorded either way.
    pub fn build(g: &Grammar) -> Self {
        let initial = closure(
            g,
            ItemSet::from([Item {
                production: ProductionId::AUGMENTED,
                dot: 0,
            }]),
        );

        let mut states = vec![initial.clone()];
        let mut ids: Map<ItemSet, StateId> = Map::default();
        ids.insert(initial, StateId::START);
        let mut transitions = Map::default();

        let mut pending = std::collections::VecDeque::from([StateId::START]);
        while let Some(current) = pending.pop_front() {
            let item_set = states[current.index()].clone();
            for sym in g.symbols() {
                let next = goto(g, &item_set, sym);
                if next.is_empty() {
                    continue;
                }
                let target = match ids.get(&next) {
                    Some(&existing) => existing,
                    None => {
                        let id = StateId(states.len() as u32);
                        states.push(next.clone());
                        ids.insert(next, id);
                        pending.push_back(id);
                        id
                    }
                };
                transitions.insert((current, sym), target);
            }
        }

        tracing::debug!(states = states.len(), "canonical collection built");

        Self {
            states,
            transitions,
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state(&self, id: StateId) -> &ItemSet {
        &self.states[id.index()]
    }

    pub fn states(&self) -> impl Iterator<Item = (StateId, &ItemSet)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(i, set)| (StateId(i as u32), set))
    }

    pub fn transition(&self, from: StateId, sym: SymbolId) -> Option<StateId> {
        self.transitions.get(&(from, sym)).copied()
    }

    pub fn transitions(&self) -> impl Iterator<Item = (StateId, SymbolId, StateId)> + '_ {
        self.transitions
            .iter()
            .map(|(&(from, sym), &to)| (from, sym, to))
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (id, set) in self.states() {
                writeln!(f, "I{}:", id)?;
                for item in set {
                    writeln!(f, "  {}", item.display(g))?;
                }
            }
            writeln!(f, "transitions:")?;
            for (from, sym, to) in self.transitions() {
                writeln!(f, "  I{} --{}--> I{}", from, g.name(sym), to)?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Set;

    const ARITH: &str = "\
        E -> E + T | T\n\
        T -> T * F | F\n\
        F -> ( E ) | i\n";

    #[test]
    fn closure_is_idempotent() {
        let g = Grammar::load(ARITH).unwrap();
        let initial = closure(
            &g,
            ItemSet::from([Item {
                production: ProductionId::AUGMENTED,
                dot: 0,
            }]),
        );
        assert_eq!(closure(&g, initial.clone()), initial);
    }

    #[test]
    fn initial_closure_contains_all_leading_items() {
        let g = Grammar::load(ARITH).unwrap();
        let initial = closure(
            &g,
            ItemSet::from([Item {
                production: ProductionId::AUGMENTED,
                dot: 0,
            }]),
        );
        // S' -> . E pulls in every production of E, T and F at dot 0.
        assert_eq!(initial.len(), 7);
        assert!(initial.iter().all(|item| item.dot == 0));
    }

    #[test]
    fn arithmetic_grammar_has_twelve_states() {
        let g = Grammar::load(ARITH).unwrap();
        let automaton = Automaton::build(&g);
        assert_eq!(automaton.len(), 12);
    }

    #[test]
    fn every_state_is_reachable_from_the_start() {
        let g = Grammar::load(ARITH).unwrap();
        let automaton = Automaton::build(&g);

        let mut reached = Set::default();
        reached.insert(StateId::START);
        let mut pending = vec![StateId::START];
        while let Some(state) = pending.pop() {
            for sym in g.symbols() {
                if let Some(next) = automaton.transition(state, sym) {
                    if reached.insert(next) {
                        pending.push(next);
                    }
                }
            }
        }
        assert_eq!(reached.len(), automaton.len());
    }

    #[test]
    fn goto_over_unrelated_symbol_is_empty() {
        let g = Grammar::load(ARITH).unwrap();
        let automaton = Automaton::build(&g);
        let plus = g.symbol("+").unwrap();
        // State 0 has no item with the dot before `+`.
        assert!(goto(&g, automaton.state(StateId::START), plus).is_empty());
    }
}
