//! Lowering the checked AST to three-address quadruples.
//!
//! Labels are allocated eagerly and placed inline as `label` quadruples;
//! there is no backpatching pass. Temporaries (`t0, t1, …`) and labels
//! (`L0, L1, …`) count up from zero in each generation run.

use crate::ast::{BinOp, Block, Expr, Program, Stmt};
use crate::util::display_fn;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// A named variable (or function, in `call` quadruples).
    Var(String),
    /// Literal text, carried verbatim.
    Imm(String),
    Temp(u32),
    Label(u32),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Var(name) => f.write_str(name),
            Self::Imm(text) => f.write_str(text),
            Self::Temp(n) => write!(f, "t{n}"),
            Self::Label(n) => write!(f, "L{n}"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum QuadOp {
    /// Arithmetic or relational operation, printed as its lexeme.
    Bin(BinOp),
    /// `(=, source, -, target)`
    Assign,
    /// `([], array, index, temp)` — array read
    Load,
    /// `([]=, array, index, value)` — array write
    Store,
    /// `(jz, condition, -, label)` — jump when the condition is false
    Jz,
    /// `(jmp, -, -, label)`
    Jmp,
    /// `(label, -, -, label)` — inline jump target
    Label,
    /// `(param, argument, -, -)`
    Param,
    /// `(call, function, argc, temp)`
    Call,
    /// `(return, value?, -, -)`
    Return,
    /// `(func, name, argc, -)` — function entry marker
    Func,
}

impl fmt::Display for QuadOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bin(op) => fmt::Display::fmt(op, f),
            Self::Assign => f.write_str("="),
            Self::Load => f.write_str("[]"),
            Self::Store => f.write_str("[]="),
            Self::Jz => f.write_str("jz"),
            Self::Jmp => f.write_str("jmp"),
            Self::Label => f.write_str("label"),
            Self::Param => f.write_str("param"),
            Self::Call => f.write_str("call"),
            Self::Return => f.write_str("return"),
            Self::Func => f.write_str("func"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quad {
    pub op: QuadOp,
    pub arg1: Option<Operand>,
    pub arg2: Option<Operand>,
    pub result: Option<Operand>,
}

fn opt(operand: &Option<Operand>) -> String {
    operand
        .as_ref()
        .map(Operand::to_string)
        .unwrap_or_else(|| "-".to_owned())
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.op,
            opt(&self.arg1),
            opt(&self.arg2),
            opt(&self.result)
        )
    }
}

/// Tabular listing of a quadruple sequence in emission order.
pub fn dump(quads: &[Quad]) -> impl fmt::Display + '_ {
    display_fn(|f| {
        writeln!(
            f,
            "{:>4}{:>8}{:>10}{:>10}{:>10}",
            "idx", "op", "arg1", "arg2", "result"
        )?;
        for (i, quad) in quads.iter().enumerate() {
            writeln!(
                f,
                "{:>4}{:>8}{:>10}{:>10}{:>10}",
                i,
                quad.op.to_string(),
                opt(&quad.arg1),
                opt(&quad.arg2),
                opt(&quad.result)
            )?;
        }
        Ok(())
    })
}

/// The quadruple generator. A fresh instance has both counters at zero;
/// re-running generation means starting from a fresh instance.
#[derive(Debug, Default)]
pub struct IrGenerator {
    quads: Vec<Quad>,
    next_temp: u32,
    next_label: u32,
}

impl IrGenerator {
    /// Lower a whole program: global initializers first, then each
    /// function behind its entry marker.
    pub fn generate(program: &Program) -> Vec<Quad> {
        let mut gen = Self::default();
        for var in &program.globals {
            if let Some(init) = &var.init {
                let src = gen.gen_expr(init);
                gen.emit(
                    QuadOp::Assign,
                    Some(src),
                    None,
                    Some(Operand::Var(var.name.clone())),
                );
            }
        }
        for func in &program.functions {
            gen.emit(
                QuadOp::Func,
                Some(Operand::Var(func.name.clone())),
                Some(Operand::Imm(func.params.len().to_string())),
                None,
            );
            gen.gen_block(&func.body);
        }
        tracing::debug!(quads = gen.quads.len(), "intermediate code generated");
        gen.quads
    }

    fn new_temp(&mut self) -> Operand {
        let t = Operand::Temp(self.next_temp);
        self.next_temp += 1;
        t
    }

    fn new_label(&mut self) -> u32 {
        let n = self.next_label;
        self.next_label += 1;
        n
    }

    fn emit(
        &mut self,
        op: QuadOp,
        arg1: Option<Operand>,
        arg2: Option<Operand>,
        result: Option<Operand>,
    ) {
        self.quads.push(Quad {
            op,
            arg1,
            arg2,
            result,
        });
    }

    fn emit_label(&mut self, label: u32) {
        self.emit(QuadOp::Label, None, None, Some(Operand::Label(label)));
    }

    fn gen_block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.gen_stmt(stmt);
        }
    }

    fn gen_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Decl(decl) => {
                if let Some(init) = &decl.init {
                    let src = self.gen_expr(init);
                    self.emit(
                        QuadOp::Assign,
                        Some(src),
                        None,
                        Some(Operand::Var(decl.name.clone())),
                    );
                }
            }

            Stmt::Expr(expr) => {
                self.gen_expr(expr);
            }

            Stmt::Block(block) => self.gen_block(block),

            Stmt::If(if_stmt) => {
                let cond = self.gen_expr(&if_stmt.condition);
                match &if_stmt.else_branch {
                    None => {
                        let false_label = self.new_label();
                        self.emit(
                            QuadOp::Jz,
                            Some(cond),
                            None,
                            Some(Operand::Label(false_label)),
                        );
                        self.gen_stmt(&if_stmt.then_branch);
                        self.emit_label(false_label);
                    }
                    Some(else_branch) => {
                        let false_label = self.new_label();
                        let end_label = self.new_label();
                        self.emit(
                            QuadOp::Jz,
                            Some(cond),
                            None,
                            Some(Operand::Label(false_label)),
                        );
                        self.gen_stmt(&if_stmt.then_branch);
                        self.emit(QuadOp::Jmp, None, None, Some(Operand::Label(end_label)));
                        self.emit_label(false_label);
                        self.gen_stmt(else_branch);
                        self.emit_label(end_label);
                    }
                }
            }

            Stmt::While(while_stmt) => {
                let start_label = self.new_label();
                let end_label = self.new_label();
                self.emit_label(start_label);
                let cond = self.gen_expr(&while_stmt.condition);
                self.emit(
                    QuadOp::Jz,
                    Some(cond),
                    None,
                    Some(Operand::Label(end_label)),
                );
                self.gen_stmt(&while_stmt.body);
                self.emit(QuadOp::Jmp, None, None, Some(Operand::Label(start_label)));
                self.emit_label(end_label);
            }

            Stmt::Return(ret) => {
                let value = ret.value.as_ref().map(|value| self.gen_expr(value));
                self.emit(QuadOp::Return, value, None, None);
            }
        }
    }

    /// Lower an expression, returning the operand that names its value.
    fn gen_expr(&mut self, expr: &Expr) -> Operand {
        match expr {
            Expr::Ident { name, .. } => Operand::Var(name.clone()),

            Expr::Literal { value, .. } => Operand::Imm(value.clone()),

            Expr::Binary {
                op, left, right, ..
            } => {
                let left = self.gen_expr(left);
                let right = self.gen_expr(right);
                let temp = self.new_temp();
                self.emit(QuadOp::Bin(*op), Some(left), Some(right), Some(temp.clone()));
                temp
            }

            Expr::Assign { target, value, .. } => match &**target {
                Expr::Index { array, index, .. } => {
                    let array = self.gen_expr(array);
                    let index = self.gen_expr(index);
                    let value = self.gen_expr(value);
                    self.emit(
                        QuadOp::Store,
                        Some(array),
                        Some(index),
                        Some(value.clone()),
                    );
                    value
                }
                target => {
                    let value = self.gen_expr(value);
                    let target = self.gen_expr(target);
                    self.emit(QuadOp::Assign, Some(value.clone()), None, Some(target));
                    value
                }
            },

            Expr::Call { callee, args, .. } => {
                let operands: Vec<Operand> =
                    args.iter().map(|arg| self.gen_expr(arg)).collect();
                for operand in operands.into_iter().rev() {
                    self.emit(QuadOp::Param, Some(operand), None, None);
                }
                let temp = self.new_temp();
                self.emit(
                    QuadOp::Call,
                    Some(Operand::Var(callee.clone())),
                    Some(Operand::Imm(args.len().to_string())),
                    Some(temp.clone()),
                );
                temp
            }

            Expr::Index { array, index, .. } => {
                let array = self.gen_expr(array);
                let index = self.gen_expr(index);
                let temp = self.new_temp();
                self.emit(QuadOp::Load, Some(array), Some(index), Some(temp.clone()));
                temp
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::Frontend;

    fn lower(source: &str) -> Vec<Quad> {
        let program = Frontend::new().unwrap().compile_source(source).unwrap();
        IrGenerator::generate(&program)
    }

    fn ops(quads: &[Quad]) -> Vec<String> {
        quads.iter().map(|q| q.op.to_string()).collect()
    }

    #[test]
    fn if_else_lowers_with_eagerly_placed_labels() {
        let quads = lower("int main() { if (a < b) { x = 1; } else { x = 0; } }");
        assert_eq!(
            ops(&quads),
            ["func", "<", "jz", "=", "jmp", "label", "=", "label"]
        );
        // comparison into t0, tested by the conditional jump
        assert_eq!(quads[1].result, Some(Operand::Temp(0)));
        assert_eq!(quads[2].arg1, Some(Operand::Temp(0)));
        assert_eq!(quads[2].result, Some(Operand::Label(0)));
        // then-jump to the end label, false label next, end label last
        assert_eq!(quads[4].result, Some(Operand::Label(1)));
        assert_eq!(quads[5].result, Some(Operand::Label(0)));
        assert_eq!(quads[7].result, Some(Operand::Label(1)));
    }

    #[test]
    fn if_without_else_places_only_the_false_label() {
        let quads = lower("int main() { if (a < b) { x = 1; } }");
        assert_eq!(ops(&quads), ["func", "<", "jz", "=", "label"]);
        assert_eq!(quads[2].result, Some(Operand::Label(0)));
        assert_eq!(quads[4].result, Some(Operand::Label(0)));
    }

    #[test]
    fn while_loops_jump_back_to_the_start_label() {
        let quads = lower("int main() { while (i < 10) { i = i + 1; } }");
        assert_eq!(
            ops(&quads),
            ["func", "label", "<", "jz", "+", "=", "jmp", "label"]
        );
        assert_eq!(quads[1].result, Some(Operand::Label(0)));
        assert_eq!(quads[3].result, Some(Operand::Label(1)));
        assert_eq!(quads[6].result, Some(Operand::Label(0)));
        assert_eq!(quads[7].result, Some(Operand::Label(1)));
    }

    #[test]
    fn binary_chains_thread_through_temporaries() {
        let quads = lower("int main() { x = a + b * c; }");
        assert_eq!(ops(&quads), ["func", "*", "+", "="]);
        assert_eq!(quads[1].result, Some(Operand::Temp(0)));
        assert_eq!(quads[2].arg2, Some(Operand::Temp(0)));
        assert_eq!(quads[2].result, Some(Operand::Temp(1)));
        assert_eq!(quads[3].arg1, Some(Operand::Temp(1)));
        assert_eq!(quads[3].result, Some(Operand::Var("x".into())));
    }

    #[test]
    fn call_arguments_are_passed_in_reverse_order() {
        let quads = lower("int main() { int r = add(x, y); }");
        assert_eq!(ops(&quads), ["func", "param", "param", "call", "="]);
        assert_eq!(quads[1].arg1, Some(Operand::Var("y".into())));
        assert_eq!(quads[2].arg1, Some(Operand::Var("x".into())));
        assert_eq!(quads[3].arg1, Some(Operand::Var("add".into())));
        assert_eq!(quads[3].arg2, Some(Operand::Imm("2".into())));
    }

    #[test]
    fn array_reads_and_writes_use_the_bracket_operators() {
        let quads = lower("int main() { a[i] = b[j]; }");
        assert_eq!(ops(&quads), ["func", "[]", "[]="]);
        assert_eq!(quads[1].arg1, Some(Operand::Var("b".into())));
        assert_eq!(quads[1].result, Some(Operand::Temp(0)));
        assert_eq!(quads[2].arg1, Some(Operand::Var("a".into())));
        assert_eq!(quads[2].arg2, Some(Operand::Var("i".into())));
        assert_eq!(quads[2].result, Some(Operand::Temp(0)));
    }

    #[test]
    fn returns_with_and_without_a_value() {
        let quads = lower("void f() { return; } int g() { return x; }");
        assert_eq!(ops(&quads), ["func", "return", "func", "return"]);
        assert_eq!(quads[1].arg1, None);
        assert_eq!(quads[3].arg1, Some(Operand::Var("x".into())));
    }

    #[test]
    fn counters_reset_between_runs() {
        let program = Frontend::new()
            .unwrap()
            .compile_source("int main() { x = a + b; while (x < 9) { x = x + 1; } }")
            .unwrap();
        let first = IrGenerator::generate(&program);
        let second = IrGenerator::generate(&program);
        assert_eq!(first, second);
    }

    #[test]
    fn global_initializers_lower_ahead_of_functions() {
        let quads = lower("int g = 4; int main() { }");
        assert_eq!(ops(&quads), ["=", "func"]);
        assert_eq!(quads[0].result, Some(Operand::Var("g".into())));
    }

    #[test]
    fn dump_is_tabular_and_indexed() {
        let quads = lower("int main() { x = 1; }");
        let text = dump(&quads).to_string();
        assert!(text.contains("idx"));
        assert!(text.contains("func"));
        assert!(text.lines().count() >= 3);
    }
}
