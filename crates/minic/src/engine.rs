//! The table-driven shift-reduce parse engine.

use crate::grammar::{Grammar, ProductionId, SymbolId};
use crate::lr0::StateId;
use crate::table::{Action, ParseTable};

/// A terminal-classified token as consumed by the engine.
#[derive(Debug, Clone)]
pub struct InputToken {
    pub symbol: SymbolId,
    pub lexeme: String,
    pub line: u32,
}

/// Per-production semantic actions driven by the engine.
///
/// `shift` turns a just-consumed terminal into a value-stack entry
/// (`None` for structural terminals that carry no value). `reduce`
/// receives the popped children in left-to-right order and synthesizes
/// the value for the production's left-hand side.
pub trait Reduce {
    type Value;

    fn shift(&mut self, token: &InputToken) -> Option<Self::Value>;

    fn reduce(
        &mut self,
        production: ProductionId,
        children: Vec<Option<Self::Value>>,
    ) -> Result<Option<Self::Value>, ReduceError>;
}

/// A reduction callback received children it cannot build a node from.
#[derive(Debug, thiserror::Error)]
#[error("cannot reduce production {production:?}: {message}")]
pub struct ReduceError {
    pub production: ProductionId,
    pub message: String,
}

impl ReduceError {
    pub fn new(production: ProductionId, message: impl Into<String>) -> Self {
        Self {
            production,
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error(
        "syntax error at line {line}: state {state} has no action for `{symbol}` \
         (expected one of: {expected})"
    )]
    MissingAction {
        state: StateId,
        symbol: String,
        line: u32,
        expected: String,
    },

    #[error("syntax error: state {state} has no goto for `{symbol}`")]
    MissingGoto { state: StateId, symbol: String },

    #[error("state stack underflow while reducing production {production:?}")]
    StackUnderflow { production: ProductionId },

    #[error("input was exhausted before the parser accepted")]
    Incomplete,

    #[error("the parse accepted without producing a value")]
    EmptyParse,

    #[error(transparent)]
    Reduce(#[from] ReduceError),
}

/// The engine drives a state stack and a value stack in lock-step over
/// the token stream. No backtracking, no lookahead beyond the current
/// token; a missing ACTION or GOTO entry is fatal.
pub struct ParseEngine<'g, R> {
    grammar: &'g Grammar,
    table: &'g ParseTable,
    reducer: R,
}

impl<'g, R: Reduce> ParseEngine<'g, R> {
    pub fn new(grammar: &'g Grammar, table: &'g ParseTable, reducer: R) -> Self {
        Self {
            grammar,
            table,
            reducer,
        }
    }

    /// Run the engine to acceptance. The token stream must be terminated
    /// by the `#` end-of-input terminal.
    pub fn parse(mut self, tokens: &[InputToken]) -> Result<R::Value, ParseError> {
        let mut states = vec![StateId::START];
        let mut values: Vec<Option<R::Value>> = Vec::new();
        let mut index = 0;

        loop {
            let Some(token) = tokens.get(index) else {
                return Err(ParseError::Incomplete);
            };
            let state = *states.last().unwrap();

            match self.table.action(state, token.symbol) {
                None => {
                    return Err(ParseError::MissingAction {
                        state,
                        symbol: self.grammar.name(token.symbol).to_owned(),
                        line: token.line,
                        expected: self.table.expected(self.grammar, state).join(", "),
                    });
                }

                Some(Action::Shift(next)) => {
                    tracing::trace!(
                        "shift `{}` in state {state}, go to {next}",
                        self.grammar.name(token.symbol),
                    );
                    values.push(self.reducer.shift(token));
                    states.push(next);
                    index += 1;
                }

                Some(Action::Reduce(production)) => {
                    let p = self.grammar.production(production);
                    let n = p.right.len();
                    if states.len() <= n {
                        return Err(ParseError::StackUnderflow { production });
                    }
                    tracing::trace!(
                        "reduce by {} in state {state}",
                        p.display(self.grammar)
                    );

                    states.truncate(states.len() - n);
                    let children = values.split_off(values.len() - n);
                    let value = self.reducer.reduce(production, children)?;

                    let top = *states.last().unwrap();
                    let next = self.table.goto(top, p.left).ok_or_else(|| {
                        ParseError::MissingGoto {
                            state: top,
                            symbol: self.grammar.name(p.left).to_owned(),
                        }
                    })?;
                    states.push(next);
                    values.push(value);
                }

                Some(Action::Accept) => {
                    tracing::trace!("accept in state {state}");
                    return values.pop().flatten().ok_or(ParseError::EmptyParse);
                }
            }
        }
    }
}
