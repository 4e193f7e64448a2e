//! The C-like source language: its grammar, its scanner description,
//! and the per-production AST builders.
//!
//! The builder match arms are indexed by rule order in [`GRAMMAR`], so
//! the two must change together; `grammar_matches_builder_indices`
//! below pins the correspondence.

use crate::ast::{
    BinOp, Block, DataType, Expr, FunctionDef, IfStmt, Program, ReturnStmt, Stmt, VarDecl,
    WhileStmt,
};
use crate::engine::{InputToken, ParseEngine, ParseError, Reduce, ReduceError};
use crate::first_follow::{FirstSets, FollowSets};
use crate::grammar::{Grammar, GrammarError, ProductionId, SymbolId};
use crate::lexer::{DfaConfig, LexError, Lexer};
use crate::lr0::Automaton;
use crate::table::ParseTable;
use crate::token::{Token, TokenKind};

/// The grammar of the source language. Production indices follow rule
/// order, with the augmented `S' -> Prog` at index 0.
pub const GRAMMAR: &str = "\
Prog -> DeclList
DeclList -> DeclList Decl | Decl
Decl -> VarDecl | FunDecl
VarDecl -> Type ID SEMI | Type ID LBRACK INT_NUM RBRACK SEMI | Type ID ASG Expr SEMI
Type -> INT | FLOAT | VOID
FunDecl -> Type ID LPAR ParamList RPAR CompStmt
ParamList -> ParamList COMMA Param | Param | ε
Param -> Type ID | Type ID LBRACK RBRACK
CompStmt -> LBR StmtList RBR
StmtList -> StmtList Stmt | ε
Stmt -> VarDecl | OtherStmt
OtherStmt -> ExprStmt | CompStmt | IfStmt | LoopStmt | RetStmt
ExprStmt -> Expr SEMI | SEMI
IfStmt -> IF LPAR Expr RPAR CompStmt | IF LPAR Expr RPAR CompStmt ELSE Stmt
LoopStmt -> WHILE LPAR Expr RPAR Stmt
RetStmt -> RETURN Expr SEMI | RETURN SEMI
Expr -> ID ASG Expr | ID LBRACK Expr RBRACK ASG Expr | ID LPAR ArgList RPAR | SimpExpr
SimpExpr -> AddExpr REL_OP AddExpr | AddExpr
AddExpr -> AddExpr ADD Term | Term
Term -> Term MUL Fact | Fact
Fact -> ID | ID LBRACK Expr RBRACK | INT_NUM | FLOAT_NUM | LPAR Expr RPAR
ArgList -> ArgList COMMA Expr | Expr | ε
";

/// The scanner's DFA description for this language.
pub const TOKEN_DFA: &str = include_str!("token.dfa");

/// A value on the parse engine's value stack.
#[derive(Debug)]
pub enum SemVal {
    /// A shifted `REL_OP` lexeme.
    Op(String),
    /// An expression; also the shifted form of `ID` and literals.
    Expr(Expr),
    /// The resolved `Type` nonterminal.
    Type(DataType),
    /// A variable declaration or parameter.
    Decl(VarDecl),
    Stmt(Stmt),
    Block(Block),
    Params(Vec<VarDecl>),
    Args(Vec<Expr>),
    Program(Program),
    Func(FunctionDef),
}

/// Popped children of a reduction, with typed accessors that turn a
/// shape mismatch into a [`ReduceError`].
struct Children {
    production: ProductionId,
    items: Vec<Option<SemVal>>,
}

impl Children {
    fn new(production: ProductionId, items: Vec<Option<SemVal>>) -> Self {
        Self { production, items }
    }

    fn err(&self, i: usize, wanted: &str) -> ReduceError {
        ReduceError::new(
            self.production,
            format!("child {i} is not {wanted}"),
        )
    }

    fn take(&mut self, i: usize) -> Result<SemVal, ReduceError> {
        self.take_opt(i).ok_or_else(|| self.err(i, "a value"))
    }

    fn take_opt(&mut self, i: usize) -> Option<SemVal> {
        self.items.get_mut(i).and_then(Option::take)
    }

    fn expr(&mut self, i: usize) -> Result<Expr, ReduceError> {
        match self.take(i)? {
            SemVal::Expr(expr) => Ok(expr),
            _ => Err(self.err(i, "an expression")),
        }
    }

    fn op(&mut self, i: usize) -> Result<String, ReduceError> {
        match self.take(i)? {
            SemVal::Op(op) => Ok(op),
            _ => Err(self.err(i, "an operator")),
        }
    }

    fn ty(&mut self, i: usize) -> Result<DataType, ReduceError> {
        match self.take(i)? {
            SemVal::Type(ty) => Ok(ty),
            _ => Err(self.err(i, "a type")),
        }
    }

    /// An identifier leaf: its name and source line.
    fn ident(&mut self, i: usize) -> Result<(String, u32), ReduceError> {
        match self.take(i)? {
            SemVal::Expr(Expr::Ident { name, line, .. }) => Ok((name, line)),
            _ => Err(self.err(i, "an identifier")),
        }
    }

    /// An integer literal leaf, parsed.
    fn int_literal(&mut self, i: usize) -> Result<u32, ReduceError> {
        match self.take(i)? {
            SemVal::Expr(Expr::Literal { value, .. }) => value
                .parse()
                .map_err(|_| self.err(i, "an integer literal")),
            _ => Err(self.err(i, "an integer literal")),
        }
    }

    fn decl(&mut self, i: usize) -> Result<VarDecl, ReduceError> {
        match self.take(i)? {
            SemVal::Decl(decl) => Ok(decl),
            _ => Err(self.err(i, "a declaration")),
        }
    }

    fn block(&mut self, i: usize) -> Result<Block, ReduceError> {
        match self.take(i)? {
            SemVal::Block(block) => Ok(block),
            _ => Err(self.err(i, "a block")),
        }
    }

    fn params(&mut self, i: usize) -> Result<Vec<VarDecl>, ReduceError> {
        match self.take(i)? {
            SemVal::Params(params) => Ok(params),
            _ => Err(self.err(i, "a parameter list")),
        }
    }

    fn args(&mut self, i: usize) -> Result<Vec<Expr>, ReduceError> {
        match self.take(i)? {
            SemVal::Args(args) => Ok(args),
            _ => Err(self.err(i, "an argument list")),
        }
    }

    fn program(&mut self, i: usize) -> Result<Program, ReduceError> {
        match self.take(i)? {
            SemVal::Program(program) => Ok(program),
            _ => Err(self.err(i, "a program")),
        }
    }

    /// Coerce any statement-shaped child into a [`Stmt`].
    fn stmt(&mut self, i: usize) -> Result<Stmt, ReduceError> {
        match self.take(i)? {
            SemVal::Stmt(stmt) => Ok(stmt),
            SemVal::Decl(decl) => Ok(Stmt::Decl(decl)),
            SemVal::Block(block) => Ok(Stmt::Block(block)),
            SemVal::Expr(expr) => Ok(Stmt::Expr(expr)),
            _ => Err(self.err(i, "a statement")),
        }
    }

    /// Like [`Children::stmt`], but an absent child (an empty statement)
    /// is not an error.
    fn stmt_opt(&mut self, i: usize) -> Result<Option<Stmt>, ReduceError> {
        if self.items.get(i).map_or(true, |slot| slot.is_none()) {
            return Ok(None);
        }
        self.stmt(i).map(Some)
    }
}

/// The reduction actions for [`GRAMMAR`]: one arm per production.
///
/// Shifted `ID`, `INT_NUM`, `FLOAT_NUM` and `REL_OP` tokens become
/// value-stack leaves; every other terminal is structural and shifts as
/// `None`.
#[derive(Debug)]
pub struct AstBuilder {
    id: SymbolId,
    int_num: SymbolId,
    float_num: SymbolId,
    rel_op: SymbolId,
}

impl AstBuilder {
    pub fn new(grammar: &Grammar) -> Self {
        // the language grammar declares all four terminals; pinned by test
        let terminal = |name: &str| {
            grammar
                .symbol(name)
                .expect("value-carrying terminal is in the grammar")
        };
        Self {
            id: terminal("ID"),
            int_num: terminal("INT_NUM"),
            float_num: terminal("FLOAT_NUM"),
            rel_op: terminal("REL_OP"),
        }
    }
}

impl Reduce for AstBuilder {
    type Value = SemVal;

    fn shift(&mut self, token: &InputToken) -> Option<SemVal> {
        let sym = token.symbol;
        if sym == self.id {
            Some(SemVal::Expr(Expr::Ident {
                name: token.lexeme.clone(),
                ty: DataType::Unknown,
                line: token.line,
            }))
        } else if sym == self.int_num {
            Some(SemVal::Expr(Expr::Literal {
                value: token.lexeme.clone(),
                ty: DataType::Int,
                line: token.line,
            }))
        } else if sym == self.float_num {
            Some(SemVal::Expr(Expr::Literal {
                value: token.lexeme.clone(),
                ty: DataType::Float,
                line: token.line,
            }))
        } else if sym == self.rel_op {
            Some(SemVal::Op(token.lexeme.clone()))
        } else {
            None
        }
    }

    fn reduce(
        &mut self,
        production: ProductionId,
        children: Vec<Option<SemVal>>,
    ) -> Result<Option<SemVal>, ReduceError> {
        let mut c = Children::new(production, children);
        let value = match production.index() {
            // S' -> Prog, Prog -> DeclList
            0 | 1 => c.take(0)?,

            // DeclList -> DeclList Decl
            2 => {
                let mut program = c.program(0)?;
                match c.take(1)? {
                    SemVal::Decl(decl) => program.globals.push(decl),
                    SemVal::Func(func) => program.functions.push(func),
                    _ => return Err(c.err(1, "a declaration")),
                }
                SemVal::Program(program)
            }

            // DeclList -> Decl
            3 => {
                let mut program = Program::default();
                match c.take(0)? {
                    SemVal::Decl(decl) => program.globals.push(decl),
                    SemVal::Func(func) => program.functions.push(func),
                    _ => return Err(c.err(0, "a declaration")),
                }
                SemVal::Program(program)
            }

            // Decl -> VarDecl | FunDecl
            4 | 5 => c.take(0)?,

            // VarDecl -> Type ID SEMI
            6 => {
                let ty = c.ty(0)?;
                let (name, line) = c.ident(1)?;
                SemVal::Decl(VarDecl {
                    ty,
                    name,
                    init: None,
                    array_size: None,
                    line,
                })
            }

            // VarDecl -> Type ID LBRACK INT_NUM RBRACK SEMI
            7 => {
                let ty = c.ty(0)?;
                let (name, line) = c.ident(1)?;
                let size = c.int_literal(3)?;
                SemVal::Decl(VarDecl {
                    ty: ty.array_of(),
                    name,
                    init: None,
                    array_size: Some(size),
                    line,
                })
            }

            // VarDecl -> Type ID ASG Expr SEMI
            8 => {
                let ty = c.ty(0)?;
                let (name, line) = c.ident(1)?;
                let init = c.expr(3)?;
                SemVal::Decl(VarDecl {
                    ty,
                    name,
                    init: Some(init),
                    array_size: None,
                    line,
                })
            }

            // Type -> INT | FLOAT | VOID
            9 => SemVal::Type(DataType::Int),
            10 => SemVal::Type(DataType::Float),
            11 => SemVal::Type(DataType::Void),

            // FunDecl -> Type ID LPAR ParamList RPAR CompStmt
            12 => {
                let return_type = c.ty(0)?;
                let (name, line) = c.ident(1)?;
                let params = c.params(3)?;
                let body = c.block(5)?;
                SemVal::Func(FunctionDef {
                    return_type,
                    name,
                    params,
                    body,
                    line,
                })
            }

            // ParamList -> ParamList COMMA Param
            13 => {
                let mut params = c.params(0)?;
                params.push(c.decl(2)?);
                SemVal::Params(params)
            }
            // ParamList -> Param
            14 => SemVal::Params(vec![c.decl(0)?]),
            // ParamList -> ε
            15 => SemVal::Params(vec![]),

            // Param -> Type ID
            16 => {
                let ty = c.ty(0)?;
                let (name, line) = c.ident(1)?;
                SemVal::Decl(VarDecl {
                    ty,
                    name,
                    init: None,
                    array_size: None,
                    line,
                })
            }

            // Param -> Type ID LBRACK RBRACK
            17 => {
                let ty = c.ty(0)?;
                let (name, line) = c.ident(1)?;
                SemVal::Decl(VarDecl {
                    ty: ty.array_of(),
                    name,
                    init: None,
                    array_size: None,
                    line,
                })
            }

            // CompStmt -> LBR StmtList RBR
            18 => SemVal::Block(c.block(1)?),

            // StmtList -> StmtList Stmt
            19 => {
                let mut block = c.block(0)?;
                if let Some(stmt) = c.stmt_opt(1)? {
                    block.stmts.push(stmt);
                }
                SemVal::Block(block)
            }
            // StmtList -> ε
            20 => SemVal::Block(Block::default()),

            // unit statement productions; an absent child (the empty
            // statement) passes through untouched
            21 | 22 | 23 | 24 | 25 | 26 | 27 => return Ok(c.take_opt(0)),

            // ExprStmt -> Expr SEMI
            28 => c.take(0)?,
            // ExprStmt -> SEMI (the empty statement)
            29 => return Ok(None),

            // IfStmt -> IF LPAR Expr RPAR CompStmt
            30 => {
                let condition = c.expr(2)?;
                let then_branch = Box::new(c.stmt(4)?);
                let line = condition.line();
                SemVal::Stmt(Stmt::If(IfStmt {
                    condition,
                    then_branch,
                    else_branch: None,
                    line,
                }))
            }

            // IfStmt -> IF LPAR Expr RPAR CompStmt ELSE Stmt
            31 => {
                let condition = c.expr(2)?;
                let then_branch = Box::new(c.stmt(4)?);
                // `else ;` leaves no statement behind
                let else_branch = c.stmt_opt(6)?.map(Box::new);
                let line = condition.line();
                SemVal::Stmt(Stmt::If(IfStmt {
                    condition,
                    then_branch,
                    else_branch,
                    line,
                }))
            }

            // LoopStmt -> WHILE LPAR Expr RPAR Stmt
            32 => {
                let condition = c.expr(2)?;
                // `while (...) ;` gets an empty block as its body
                let body = Box::new(c.stmt_opt(4)?.unwrap_or(Stmt::Block(Block::default())));
                let line = condition.line();
                SemVal::Stmt(Stmt::While(WhileStmt {
                    condition,
                    body,
                    line,
                }))
            }

            // RetStmt -> RETURN Expr SEMI
            33 => {
                let value = c.expr(1)?;
                let line = value.line();
                SemVal::Stmt(Stmt::Return(ReturnStmt {
                    value: Some(value),
                    line,
                }))
            }
            // RetStmt -> RETURN SEMI
            34 => SemVal::Stmt(Stmt::Return(ReturnStmt {
                value: None,
                line: 0,
            })),

            // Expr -> ID ASG Expr
            35 => {
                let (name, line) = c.ident(0)?;
                let value = c.expr(2)?;
                SemVal::Expr(Expr::Assign {
                    target: Box::new(Expr::Ident {
                        name,
                        ty: DataType::Unknown,
                        line,
                    }),
                    value: Box::new(value),
                    ty: DataType::Unknown,
                    line,
                })
            }

            // Expr -> ID LBRACK Expr RBRACK ASG Expr
            36 => {
                let (name, line) = c.ident(0)?;
                let index = c.expr(2)?;
                let value = c.expr(5)?;
                SemVal::Expr(Expr::Assign {
                    target: Box::new(Expr::Index {
                        array: Box::new(Expr::Ident {
                            name,
                            ty: DataType::Unknown,
                            line,
                        }),
                        index: Box::new(index),
                        ty: DataType::Unknown,
                        line,
                    }),
                    value: Box::new(value),
                    ty: DataType::Unknown,
                    line,
                })
            }

            // Expr -> ID LPAR ArgList RPAR
            37 => {
                let (callee, line) = c.ident(0)?;
                let args = c.args(2)?;
                SemVal::Expr(Expr::Call {
                    callee,
                    args,
                    ty: DataType::Unknown,
                    line,
                })
            }

            // unit expression productions
            38 | 40 | 42 | 44 | 45 | 47 | 48 => c.take(0)?,

            // SimpExpr -> AddExpr REL_OP AddExpr
            39 => {
                let left = c.expr(0)?;
                let op = c.op(1)?;
                let right = c.expr(2)?;
                let op = BinOp::from_lexeme(&op)
                    .ok_or_else(|| c.err(1, "a relational operator"))?;
                let line = left.line();
                SemVal::Expr(Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                    ty: DataType::Unknown,
                    line,
                })
            }

            // AddExpr -> AddExpr ADD Term
            41 => {
                let left = c.expr(0)?;
                let right = c.expr(2)?;
                let line = left.line();
                SemVal::Expr(Expr::Binary {
                    op: BinOp::Add,
                    left: Box::new(left),
                    right: Box::new(right),
                    ty: DataType::Unknown,
                    line,
                })
            }

            // Term -> Term MUL Fact
            43 => {
                let left = c.expr(0)?;
                let right = c.expr(2)?;
                let line = left.line();
                SemVal::Expr(Expr::Binary {
                    op: BinOp::Mul,
                    left: Box::new(left),
                    right: Box::new(right),
                    ty: DataType::Unknown,
                    line,
                })
            }

            // Fact -> ID LBRACK Expr RBRACK
            46 => {
                let (name, line) = c.ident(0)?;
                let index = c.expr(2)?;
                SemVal::Expr(Expr::Index {
                    array: Box::new(Expr::Ident {
                        name,
                        ty: DataType::Unknown,
                        line,
                    }),
                    index: Box::new(index),
                    ty: DataType::Unknown,
                    line,
                })
            }

            // Fact -> LPAR Expr RPAR
            49 => SemVal::Expr(c.expr(1)?),

            // ArgList -> ArgList COMMA Expr
            50 => {
                let mut args = c.args(0)?;
                args.push(c.expr(2)?);
                SemVal::Args(args)
            }
            // ArgList -> Expr
            51 => SemVal::Args(vec![c.expr(0)?]),
            // ArgList -> ε
            52 => SemVal::Args(vec![]),

            other => {
                return Err(ReduceError::new(
                    production,
                    format!("no builder for production index {other}"),
                ))
            }
        };
        Ok(Some(value))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrontendError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error(transparent)]
    Lex(#[from] LexError),
}

/// The assembled front end for the source language: grammar, automaton,
/// parse table and scanner, built once and reused per compilation.
#[derive(Debug)]
pub struct Frontend {
    grammar: Grammar,
    automaton: Automaton,
    table: ParseTable,
    lexer: Lexer,
}

impl Frontend {
    pub fn new() -> Result<Self, FrontendError> {
        let grammar = Grammar::load(GRAMMAR)?;
        let first = FirstSets::new(&grammar);
        let follow = FollowSets::new(&grammar, &first);
        let automaton = Automaton::build(&grammar);
        let table = ParseTable::build(&grammar, &automaton, &follow);
        let lexer = Lexer::new(DfaConfig::parse(TOKEN_DFA)?)?;
        Ok(Self {
            grammar,
            automaton,
            table,
            lexer,
        })
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn automaton(&self) -> &Automaton {
        &self.automaton
    }

    pub fn table(&self) -> &ParseTable {
        &self.table
    }

    pub fn tokenize(&self, source: &str) -> Result<Vec<Token>, LexError> {
        self.lexer.tokenize(source)
    }

    /// Parse a token stream into the program AST.
    pub fn parse(&self, tokens: &[Token]) -> Result<Program, ParseError> {
        let input: Vec<InputToken> = tokens
            .iter()
            .map(|token| InputToken {
                // every token kind names a grammar terminal; pinned by test
                symbol: self
                    .grammar
                    .symbol(token.kind.terminal())
                    .expect("token kind names a grammar terminal"),
                lexeme: token.lexeme.clone(),
                line: token.line,
            })
            .collect();

        let engine = ParseEngine::new(&self.grammar, &self.table, AstBuilder::new(&self.grammar));
        match engine.parse(&input)? {
            SemVal::Program(program) => Ok(program),
            _ => Err(ReduceError::new(
                ProductionId::AUGMENTED,
                "the accepted value is not a program",
            )
            .into()),
        }
    }

    /// Tokenize and parse in one step.
    pub fn compile_source(&self, source: &str) -> Result<Program, CompileError> {
        let tokens = self.tokenize(source)?;
        Ok(self.parse(&tokens)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frontend() -> Frontend {
        Frontend::new().unwrap()
    }

    fn production_names(g: &Grammar, index: usize) -> (String, Vec<String>) {
        let p = g.production(ProductionId(index as u32));
        (
            g.name(p.left).to_owned(),
            p.right.iter().map(|&s| g.name(s).to_owned()).collect(),
        )
    }

    #[test]
    fn grammar_matches_builder_indices() {
        let g = Grammar::load(GRAMMAR).unwrap();
        assert_eq!(g.productions().count(), 53);

        let expect = |index: usize, left: &str, right: &[&str]| {
            let (l, r) = production_names(&g, index);
            assert_eq!(l, left, "production {index}");
            assert_eq!(r, right, "production {index}");
        };
        expect(0, "S'", &["Prog"]);
        expect(6, "VarDecl", &["Type", "ID", "SEMI"]);
        expect(7, "VarDecl", &["Type", "ID", "LBRACK", "INT_NUM", "RBRACK", "SEMI"]);
        expect(12, "FunDecl", &["Type", "ID", "LPAR", "ParamList", "RPAR", "CompStmt"]);
        expect(15, "ParamList", &[]);
        expect(29, "ExprStmt", &["SEMI"]);
        expect(
            31,
            "IfStmt",
            &["IF", "LPAR", "Expr", "RPAR", "CompStmt", "ELSE", "Stmt"],
        );
        expect(39, "SimpExpr", &["AddExpr", "REL_OP", "AddExpr"]);
        expect(46, "Fact", &["ID", "LBRACK", "Expr", "RBRACK"]);
        expect(52, "ArgList", &[]);
    }

    #[test]
    fn every_token_kind_names_a_grammar_terminal() {
        use TokenKind::*;
        let g = Grammar::load(GRAMMAR).unwrap();
        let kinds = [
            Int, Float, Void, If, Else, While, Return, Id, IntNum, FloatNum, Add, Mul, Asg,
            RelOp, Semi, Comma, Lpar, Rpar, Lbr, Rbr, Lbrack, Rbrack, Eof,
        ];
        for kind in kinds {
            let sym = g.symbol(kind.terminal());
            assert!(sym.is_some(), "missing terminal {}", kind.terminal());
            assert!(g.is_terminal(sym.unwrap()), "{} is not a terminal", kind.terminal());
        }
    }

    #[test]
    fn language_table_is_conflict_free() {
        assert!(frontend().table().conflicts().is_empty());
    }

    #[test]
    fn parses_a_minimal_program() {
        let program = frontend()
            .compile_source("int main() { int x = 5; return x; }")
            .unwrap();
        assert!(program.globals.is_empty());
        assert_eq!(program.functions.len(), 1);
        let main = &program.functions[0];
        assert_eq!(main.name, "main");
        assert_eq!(main.return_type, DataType::Int);
        assert_eq!(main.body.stmts.len(), 2);
        assert!(matches!(&main.body.stmts[0], Stmt::Decl(d) if d.name == "x"));
        assert!(matches!(
            &main.body.stmts[1],
            Stmt::Return(ReturnStmt { value: Some(_), .. })
        ));
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let program = frontend()
            .compile_source("int main() { int y = a + b * c; }")
            .unwrap();
        let Stmt::Decl(decl) = &program.functions[0].body.stmts[0] else {
            panic!("expected a declaration");
        };
        let Some(Expr::Binary { op, right, .. }) = &decl.init else {
            panic!("expected a binary initializer");
        };
        assert_eq!(*op, BinOp::Add);
        assert!(matches!(&**right, Expr::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn global_declarations_precede_functions() {
        let program = frontend()
            .compile_source("int g;\nfloat h = 1.5;\nvoid main() { }")
            .unwrap();
        assert_eq!(program.globals.len(), 2);
        assert_eq!(program.globals[0].name, "g");
        assert_eq!(program.globals[1].ty, DataType::Float);
        assert_eq!(program.functions.len(), 1);
    }

    #[test]
    fn arrays_calls_and_else_branches_take_shape() {
        let source = "\
            int a[10];\n\
            int f(int x, float y[]) { return x; }\n\
            int main() {\n\
                a[0] = f(1, a);\n\
                if (a[0] < 2) { a[1] = 1; } else { a[1] = 0; }\n\
                while (a[1] < 10) { a[1] = a[1] + 1; }\n\
            }\n";
        let program = frontend().compile_source(source).unwrap();

        assert_eq!(program.globals[0].array_size, Some(10));
        assert_eq!(program.globals[0].ty, DataType::IntArray);

        let f = &program.functions[0];
        assert_eq!(f.params.len(), 2);
        assert_eq!(f.params[1].ty, DataType::FloatArray);
        assert_eq!(f.params[1].array_size, None);

        let main = &program.functions[1];
        let Stmt::Expr(Expr::Assign { target, value, .. }) = &main.body.stmts[0] else {
            panic!("expected an array assignment");
        };
        assert!(matches!(&**target, Expr::Index { .. }));
        assert!(matches!(&**value, Expr::Call { ref callee, ref args, .. }
            if callee == "f" && args.len() == 2));

        let Stmt::If(if_stmt) = &main.body.stmts[1] else {
            panic!("expected an if statement");
        };
        assert!(if_stmt.else_branch.is_some());
        assert!(matches!(&main.body.stmts[2], Stmt::While(_)));
    }

    #[test]
    fn empty_statements_leave_no_trace() {
        let program = frontend()
            .compile_source("int main() { ; ; return 0; }")
            .unwrap();
        assert_eq!(program.functions[0].body.stmts.len(), 1);
    }

    #[test]
    fn assignments_chain_to_the_right() {
        let program = frontend()
            .compile_source("int main() { x = y = 1; }")
            .unwrap();
        let Stmt::Expr(Expr::Assign { value, .. }) = &program.functions[0].body.stmts[0] else {
            panic!("expected an assignment");
        };
        assert!(matches!(&**value, Expr::Assign { .. }));
    }

    #[test]
    fn syntax_errors_name_the_offender_and_the_expected_set() {
        let err = frontend()
            .compile_source("int main() { return }")
            .unwrap_err();
        let CompileError::Parse(ParseError::MissingAction { symbol, line, .. }) = err else {
            panic!("expected a missing-action error");
        };
        assert_eq!(symbol, "RBR");
        assert_eq!(line, 1);
    }

    #[test]
    fn round_trip_preserves_the_statement_structure() {
        let program = frontend()
            .compile_source("int main() { int x = 5; return x; }")
            .unwrap();
        let tree = program.tree();
        for needle in [
            "FunctionDef: int main()",
            "VariableDecl: int x",
            "Literal: 5 (int)",
            "ReturnStmt",
            "Identifier: x",
        ] {
            assert!(tree.contains(needle), "missing {needle:?} in:\n{tree}");
        }
    }
}
