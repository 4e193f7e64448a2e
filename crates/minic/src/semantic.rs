//! The semantic analyzer: a scope-stacked symbol table and an
//! error-accumulating type-checking walk.
//!
//! The walk never aborts: an unresolved name yields `Unknown`, which is
//! propagated and suppresses follow-on mismatch reports. Analysis
//! succeeds iff the accumulated error list is empty.

use crate::ast::{
    BinOp, Block, DataType, Expr, FunctionDef, Program, Stmt, VarDecl,
};
use crate::util::display_fn;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ScopeId(u32);

impl ScopeId {
    pub const GLOBAL: Self = Self(0);
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone)]
pub struct SymbolEntry {
    pub name: String,
    pub ty: DataType,
    pub scope: ScopeId,
    pub is_function: bool,
    pub param_types: Vec<DataType>,
    pub is_array: bool,
    pub array_size: Option<u32>,
    /// Sequential storage address; functions have none.
    pub address: Option<u32>,
}

/// The symbol table prunes on scope exit: leaving a scope purges every
/// entry declared in it, so lookups scan the active scope stack from
/// the innermost id outward. Shadowed outer names stay resident
/// underneath active inner names.
#[derive(Debug)]
pub struct SymbolTable {
    entries: Vec<SymbolEntry>,
    scope_stack: Vec<ScopeId>,
    next_scope: u32,
    next_address: u32,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            scope_stack: vec![ScopeId::GLOBAL],
            next_scope: 1,
            next_address: 0,
        }
    }

    pub fn current_scope(&self) -> ScopeId {
        *self.scope_stack.last().unwrap()
    }

    pub fn enter_scope(&mut self) {
        let scope = ScopeId(self.next_scope);
        self.next_scope += 1;
        self.scope_stack.push(scope);
        tracing::debug!("entering scope {scope}");
    }

    /// Pop the innermost scope and purge every entry it owns.
    pub fn exit_scope(&mut self) {
        if self.scope_stack.len() <= 1 {
            return;
        }
        let leaving = self.scope_stack.pop().unwrap();
        self.entries.retain(|entry| entry.scope != leaving);
        tracing::debug!("leaving scope {leaving}, back to {}", self.current_scope());
    }

    /// Declare a variable in the current scope. False when the name is
    /// already taken in this scope.
    pub fn declare_variable(&mut self, name: &str, ty: DataType, array_size: Option<u32>) -> bool {
        let scope = self.current_scope();
        if self
            .entries
            .iter()
            .any(|entry| entry.name == name && entry.scope == scope)
        {
            return false;
        }
        let address = self.next_address;
        self.next_address += 1;
        tracing::debug!("declaring {name}: {ty} in scope {scope} at address {address}");
        self.entries.push(SymbolEntry {
            name: name.to_owned(),
            ty,
            scope,
            is_function: false,
            param_types: Vec::new(),
            is_array: ty.is_array(),
            array_size,
            address: Some(address),
        });
        true
    }

    /// Declare a function. Functions always live in the global scope;
    /// false when one of this name already exists.
    pub fn declare_function(
        &mut self,
        name: &str,
        return_type: DataType,
        param_types: Vec<DataType>,
    ) -> bool {
        if self
            .entries
            .iter()
            .any(|entry| entry.name == name && entry.is_function)
        {
            return false;
        }
        tracing::debug!(
            "declaring function {name}: {return_type} with {} parameters",
            param_types.len()
        );
        self.entries.push(SymbolEntry {
            name: name.to_owned(),
            ty: return_type,
            scope: ScopeId::GLOBAL,
            is_function: true,
            param_types,
            is_array: false,
            array_size: None,
            address: None,
        });
        true
    }

    /// Find a name, scanning the active scopes innermost-first, then
    /// the global functions.
    pub fn lookup(&self, name: &str) -> Option<&SymbolEntry> {
        for &scope in self.scope_stack.iter().rev() {
            if let Some(entry) = self
                .entries
                .iter()
                .find(|entry| entry.name == name && entry.scope == scope)
            {
                return Some(entry);
            }
        }
        self.entries
            .iter()
            .find(|entry| entry.name == name && entry.is_function)
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Tabular rendering for debug tracing.
    pub fn display(&self) -> impl fmt::Display + '_ {
        display_fn(|f| {
            writeln!(
                f,
                "{:<15}{:>10}{:>8}{:>6}{:>6}",
                "name", "type", "scope", "func", "addr"
            )?;
            for entry in &self.entries {
                writeln!(
                    f,
                    "{:<15}{:>10}{:>8}{:>6}{:>6}",
                    entry.name,
                    entry.ty.to_string(),
                    entry.scope.to_string(),
                    if entry.is_function { "yes" } else { "no" },
                    entry
                        .address
                        .map(|a| a.to_string())
                        .unwrap_or_else(|| "-".to_owned()),
                )?;
            }
            Ok(())
        })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SemanticError {
    #[error("line {line}: variable `{name}` is not declared")]
    UndeclaredVariable { name: String, line: u32 },

    #[error("line {line}: function `{name}` is not declared")]
    UndeclaredFunction { name: String, line: u32 },

    #[error("line {line}: `{name}` is already declared in this scope")]
    Redeclaration { name: String, line: u32 },

    #[error("line {line}: function `{name}` is already declared")]
    FunctionRedeclaration { name: String, line: u32 },

    #[error("line {line}: initializer for `{name}` has type {found}, expected {expected}")]
    InitTypeMismatch {
        name: String,
        expected: DataType,
        found: DataType,
        line: u32,
    },

    #[error("line {line}: cannot assign {found} to a target of type {expected}")]
    AssignTypeMismatch {
        expected: DataType,
        found: DataType,
        line: u32,
    },

    #[error("line {line}: operands of `{op}` have mismatched types {left} and {right}")]
    OperandTypeMismatch {
        op: BinOp,
        left: DataType,
        right: DataType,
        line: u32,
    },

    #[error("line {line}: call to `{name}` passes {found} arguments, expected {expected}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        line: u32,
    },

    #[error("line {line}: argument {index} of `{name}` has type {found}, expected {expected}")]
    ArgumentTypeMismatch {
        name: String,
        index: usize,
        expected: DataType,
        found: DataType,
        line: u32,
    },
}

/// The analysis walk. Resolved types are written back into the tree as
/// a side effect.
#[derive(Debug, Default)]
pub struct Analyzer {
    table: SymbolTable,
    errors: Vec<SemanticError>,
}

impl Analyzer {
    /// Check a whole program: global declarations first, then each
    /// function in declaration order. Returns the accumulated errors,
    /// empty on success.
    pub fn analyze(program: &mut Program) -> Vec<SemanticError> {
        let mut analyzer = Self::default();
        for var in &mut program.globals {
            analyzer.check_var_decl(var);
        }
        for func in &mut program.functions {
            analyzer.check_function(func);
        }
        tracing::debug!("symbol table after analysis:\n{}", analyzer.table.display());
        analyzer.errors
    }

    fn check_function(&mut self, func: &mut FunctionDef) {
        let param_types: Vec<DataType> = func.params.iter().map(|p| p.ty).collect();
        if !self
            .table
            .declare_function(&func.name, func.return_type, param_types)
        {
            self.errors.push(SemanticError::FunctionRedeclaration {
                name: func.name.clone(),
                line: func.line,
            });
        }

        self.table.enter_scope();
        for param in &func.params {
            if !self
                .table
                .declare_variable(&param.name, param.ty, param.array_size)
            {
                self.errors.push(SemanticError::Redeclaration {
                    name: param.name.clone(),
                    line: param.line,
                });
            }
        }
        self.check_block(&mut func.body);
        self.table.exit_scope();
    }

    fn check_block(&mut self, block: &mut Block) {
        self.table.enter_scope();
        for stmt in &mut block.stmts {
            self.check_stmt(stmt);
        }
        self.table.exit_scope();
    }

    fn check_stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Decl(decl) => self.check_var_decl(decl),
            Stmt::Expr(expr) => {
                self.check_expr(expr);
            }
            Stmt::If(if_stmt) => {
                self.check_expr(&mut if_stmt.condition);
                self.check_stmt(&mut if_stmt.then_branch);
                if let Some(else_branch) = &mut if_stmt.else_branch {
                    self.check_stmt(else_branch);
                }
            }
            Stmt::While(while_stmt) => {
                self.check_expr(&mut while_stmt.condition);
                self.check_stmt(&mut while_stmt.body);
            }
            Stmt::Return(ret) => {
                if let Some(value) = &mut ret.value {
                    self.check_expr(value);
                }
            }
            Stmt::Block(block) => self.check_block(block),
        }
    }

    fn check_var_decl(&mut self, decl: &mut VarDecl) {
        if !self
            .table
            .declare_variable(&decl.name, decl.ty, decl.array_size)
        {
            self.errors.push(SemanticError::Redeclaration {
                name: decl.name.clone(),
                line: decl.line,
            });
        }
        if let Some(init) = &mut decl.init {
            let found = self.check_expr(init);
            if found != DataType::Unknown && found != decl.ty {
                self.errors.push(SemanticError::InitTypeMismatch {
                    name: decl.name.clone(),
                    expected: decl.ty,
                    found,
                    line: decl.line,
                });
            }
        }
    }

    /// Type an expression, reporting what it finds and writing the
    /// resolved type back into the node. Mismatches do not stop the
    /// walk; the left operand's type carries on.
    fn check_expr(&mut self, expr: &mut Expr) -> DataType {
        let ty = match expr {
            Expr::Ident { name, line, .. } => match self.table.lookup(name) {
                Some(entry) => entry.ty,
                None => {
                    self.errors.push(SemanticError::UndeclaredVariable {
                        name: name.clone(),
                        line: *line,
                    });
                    DataType::Unknown
                }
            },

            Expr::Literal { ty, .. } => *ty,

            Expr::Binary {
                op,
                left,
                right,
                line,
                ..
            } => {
                let op = *op;
                let line = *line;
                let left = self.check_expr(left);
                let right = self.check_expr(right);
                if left != DataType::Unknown && right != DataType::Unknown && left != right {
                    self.errors.push(SemanticError::OperandTypeMismatch {
                        op,
                        left,
                        right,
                        line,
                    });
                }
                if op.is_relational() {
                    DataType::Int
                } else {
                    left
                }
            }

            Expr::Assign {
                target,
                value,
                line,
                ..
            } => {
                let line = *line;
                let expected = self.check_expr(target);
                let found = self.check_expr(value);
                if expected != DataType::Unknown
                    && found != DataType::Unknown
                    && expected != found
                {
                    self.errors.push(SemanticError::AssignTypeMismatch {
                        expected,
                        found,
                        line,
                    });
                }
                expected
            }

            Expr::Call {
                callee, args, line, ..
            } => {
                let name = callee.clone();
                let line = *line;
                let mut arg_types = Vec::with_capacity(args.len());
                for arg in args.iter_mut() {
                    arg_types.push(self.check_expr(arg));
                }

                let callee = self
                    .table
                    .lookup(&name)
                    .filter(|entry| entry.is_function)
                    .map(|entry| (entry.ty, entry.param_types.clone()));
                match callee {
                    None => {
                        self.errors.push(SemanticError::UndeclaredFunction {
                            name,
                            line,
                        });
                        DataType::Unknown
                    }
                    Some((return_type, param_types)) => {
                        if arg_types.len() != param_types.len() {
                            self.errors.push(SemanticError::ArityMismatch {
                                name: name.clone(),
                                expected: param_types.len(),
                                found: arg_types.len(),
                                line,
                            });
                        }
                        for (index, (&found, &expected)) in
                            arg_types.iter().zip(&param_types).enumerate()
                        {
                            if found != DataType::Unknown && found != expected {
                                self.errors.push(SemanticError::ArgumentTypeMismatch {
                                    name: name.clone(),
                                    index: index + 1,
                                    expected,
                                    found,
                                    line,
                                });
                            }
                        }
                        return_type
                    }
                }
            }

            Expr::Index { array, index, .. } => {
                let array_ty = self.check_expr(array);
                self.check_expr(index);
                array_ty.element()
            }
        };
        expr.set_ty(ty);
        ty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::Frontend;

    fn analyze(source: &str) -> (Program, Vec<SemanticError>) {
        let mut program = Frontend::new().unwrap().compile_source(source).unwrap();
        let errors = Analyzer::analyze(&mut program);
        (program, errors)
    }

    #[test]
    fn top_level_redeclaration_is_reported_once() {
        let (_, errors) = analyze("int x; int x;");
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            SemanticError::Redeclaration { name, .. } if name == "x"
        ));
    }

    #[test]
    fn undeclared_assignment_target_resolves_to_unknown() {
        let (program, errors) = analyze("int main() { y = 1; }");
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            SemanticError::UndeclaredVariable { name, .. } if name == "y"
        ));
        let Stmt::Expr(assign) = &program.functions[0].body.stmts[0] else {
            panic!("expected an assignment statement");
        };
        assert_eq!(assign.ty(), DataType::Unknown);
    }

    #[test]
    fn shadowing_an_outer_scope_is_legal() {
        let (_, errors) = analyze("int x; int main() { int x = 1; { int x = 2; } }");
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn operand_mismatch_keeps_the_left_type() {
        let (program, errors) = analyze("int main() { int x; float y; x = x + y; }");
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            SemanticError::OperandTypeMismatch {
                left: DataType::Int,
                right: DataType::Float,
                ..
            }
        ));
        // x + y carries on with the left operand's type, so the
        // enclosing assignment is consistent.
        let Stmt::Expr(Expr::Assign { value, .. }) = &program.functions[0].body.stmts[2] else {
            panic!("expected an assignment");
        };
        assert_eq!(value.ty(), DataType::Int);
    }

    #[test]
    fn relational_operators_always_yield_int() {
        let (_, errors) = analyze("int main() { float a; float b; int c = a < b; }");
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn calls_check_declaration_arity_and_argument_types() {
        let add = "int add(int a, int b) { return a + b; }\n";

        let (_, errors) = analyze(&format!("{add}int main() {{ int x = add(1); }}"));
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            SemanticError::ArityMismatch {
                expected: 2,
                found: 1,
                ..
            }
        ));

        let (_, errors) = analyze(&format!("{add}int main() {{ int x = add(1, 2.5); }}"));
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            SemanticError::ArgumentTypeMismatch {
                index: 2,
                expected: DataType::Int,
                found: DataType::Float,
                ..
            }
        ));

        let (_, errors) = analyze("int main() { int x = missing(); }");
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            SemanticError::UndeclaredFunction { name, .. } if name == "missing"
        ));
    }

    #[test]
    fn function_redeclaration_is_reported() {
        let (_, errors) = analyze("void f() { } void f() { }");
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            SemanticError::FunctionRedeclaration { name, .. } if name == "f"
        ));
    }

    #[test]
    fn array_access_yields_the_element_type() {
        let (program, errors) = analyze("int a[4]; int main() { int x = a[0]; }");
        assert!(errors.is_empty(), "{errors:?}");
        let Stmt::Decl(decl) = &program.functions[0].body.stmts[0] else {
            panic!("expected a declaration");
        };
        assert_eq!(decl.init.as_ref().unwrap().ty(), DataType::Int);
    }

    #[test]
    fn analysis_accumulates_instead_of_stopping() {
        let (_, errors) = analyze("int main() { a = 1; b = 2; c = 3; }");
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn scope_exit_purges_and_uncovers_shadowed_entries() {
        let mut table = SymbolTable::new();
        assert!(table.declare_variable("x", DataType::Int, None));
        table.enter_scope();
        assert!(table.declare_variable("x", DataType::Float, None));
        assert_eq!(table.lookup("x").unwrap().ty, DataType::Float);
        table.exit_scope();
        assert_eq!(table.lookup("x").unwrap().ty, DataType::Int);
        assert!(!table.is_declared("nope"));
    }

    #[test]
    fn addresses_are_assigned_sequentially() {
        let mut table = SymbolTable::new();
        table.declare_variable("a", DataType::Int, None);
        table.declare_variable("b", DataType::Float, None);
        assert_eq!(table.lookup("a").unwrap().address, Some(0));
        assert_eq!(table.lookup("b").unwrap().address, Some(1));
    }
}
