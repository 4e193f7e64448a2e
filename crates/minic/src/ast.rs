//! The abstract syntax tree.
//!
//! The tree is a strict single-owner hierarchy: functions and global
//! declarations are owned by the program node, statements by their
//! enclosing block, sub-expressions by their parent expression. A
//! missing initializer or else branch is an explicit `Option`.
//!
//! Every expression carries a resolved [`DataType`], `Unknown` until the
//! semantic analyzer fills it in.

use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DataType {
    Int,
    Float,
    Void,
    IntArray,
    FloatArray,
    Unknown,
}

impl DataType {
    /// The array type with this element type. Only meaningful for the
    /// two scalar numeric types.
    pub fn array_of(self) -> DataType {
        match self {
            Self::Int => Self::IntArray,
            Self::Float => Self::FloatArray,
            _ => Self::Unknown,
        }
    }

    /// The element type of an array type.
    pub fn element(self) -> DataType {
        match self {
            Self::IntArray => Self::Int,
            Self::FloatArray => Self::Float,
            _ => Self::Unknown,
        }
    }

    pub fn is_array(self) -> bool {
        matches!(self, Self::IntArray | Self::FloatArray)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Void => "void",
            Self::IntArray => "int[]",
            Self::FloatArray => "float[]",
            Self::Unknown => "unknown",
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Mul,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl BinOp {
    pub fn from_lexeme(lexeme: &str) -> Option<Self> {
        Some(match lexeme {
            "+" => Self::Add,
            "*" => Self::Mul,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "==" => Self::Eq,
            "!=" => Self::Ne,
            _ => return None,
        })
    }

    /// Relational operators always yield `int`, regardless of operand
    /// type.
    pub fn is_relational(self) -> bool {
        !matches!(self, Self::Add | Self::Mul)
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Mul => "*",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
        })
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Program {
    pub globals: Vec<VarDecl>,
    pub functions: Vec<FunctionDef>,
}

#[derive(Debug, PartialEq)]
pub struct FunctionDef {
    pub return_type: DataType,
    pub name: String,
    pub params: Vec<VarDecl>,
    pub body: Block,
    pub line: u32,
}

#[derive(Debug, PartialEq)]
pub struct VarDecl {
    pub ty: DataType,
    pub name: String,
    pub init: Option<Expr>,
    /// Declared element count; `None` for scalars and unsized array
    /// parameters.
    pub array_size: Option<u32>,
    pub line: u32,
}

#[derive(Debug, Default, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, PartialEq)]
pub enum Stmt {
    Decl(VarDecl),
    Expr(Expr),
    If(IfStmt),
    While(WhileStmt),
    Return(ReturnStmt),
    Block(Block),
}

#[derive(Debug, PartialEq)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_branch: Box<Stmt>,
    pub else_branch: Option<Box<Stmt>>,
    pub line: u32,
}

#[derive(Debug, PartialEq)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Box<Stmt>,
    pub line: u32,
}

#[derive(Debug, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub line: u32,
}

#[derive(Debug, PartialEq)]
pub enum Expr {
    Ident {
        name: String,
        ty: DataType,
        line: u32,
    },
    Literal {
        value: String,
        ty: DataType,
        line: u32,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        ty: DataType,
        line: u32,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
        ty: DataType,
        line: u32,
    },
    Call {
        callee: String,
        args: Vec<Expr>,
        ty: DataType,
        line: u32,
    },
    Index {
        array: Box<Expr>,
        index: Box<Expr>,
        ty: DataType,
        line: u32,
    },
}

impl Expr {
    pub fn ty(&self) -> DataType {
        match self {
            Self::Ident { ty, .. }
            | Self::Literal { ty, .. }
            | Self::Binary { ty, .. }
            | Self::Assign { ty, .. }
            | Self::Call { ty, .. }
            | Self::Index { ty, .. } => *ty,
        }
    }

    pub(crate) fn set_ty(&mut self, new: DataType) {
        match self {
            Self::Ident { ty, .. }
            | Self::Literal { ty, .. }
            | Self::Binary { ty, .. }
            | Self::Assign { ty, .. }
            | Self::Call { ty, .. }
            | Self::Index { ty, .. } => *ty = new,
        }
    }

    pub fn line(&self) -> u32 {
        match self {
            Self::Ident { line, .. }
            | Self::Literal { line, .. }
            | Self::Binary { line, .. }
            | Self::Assign { line, .. }
            | Self::Call { line, .. }
            | Self::Index { line, .. } => *line,
        }
    }
}

// ---- indented tree form ----

fn tree_line(out: &mut String, prefix: &str, last: bool, content: &str) {
    out.push_str(prefix);
    out.push_str(if last { "└── " } else { "├── " });
    out.push_str(content);
    out.push('\n');
}

fn child_prefix(prefix: &str, last: bool) -> String {
    format!("{prefix}{}", if last { "    " } else { "│   " })
}

impl Program {
    /// Render the indented tree form used for inspection and golden
    /// comparisons.
    pub fn tree(&self) -> String {
        let mut out = String::from("Program\n");
        let total = self.globals.len() + self.functions.len();
        let mut index = 0;
        for var in &self.globals {
            index += 1;
            var.tree_into(&mut out, "", index == total);
        }
        for func in &self.functions {
            index += 1;
            func.tree_into(&mut out, "", index == total);
        }
        out
    }
}

impl VarDecl {
    fn describe(&self) -> String {
        match self.array_size {
            Some(size) => format!("VariableDecl: {} {}[{}]", self.ty, self.name, size),
            None => format!("VariableDecl: {} {}", self.ty, self.name),
        }
    }

    fn tree_into(&self, out: &mut String, prefix: &str, last: bool) {
        tree_line(out, prefix, last, &self.describe());
        if let Some(init) = &self.init {
            init.tree_into(out, &child_prefix(prefix, last), true);
        }
    }
}

impl FunctionDef {
    fn tree_into(&self, out: &mut String, prefix: &str, last: bool) {
        tree_line(
            out,
            prefix,
            last,
            &format!("FunctionDef: {} {}()", self.return_type, self.name),
        );
        let prefix = child_prefix(prefix, last);
        if !self.params.is_empty() {
            tree_line(out, &prefix, false, "Parameters:");
            let param_prefix = child_prefix(&prefix, false);
            for (i, param) in self.params.iter().enumerate() {
                param.tree_into(out, &param_prefix, i + 1 == self.params.len());
            }
        }
        self.body.tree_into(out, &prefix, true);
    }
}

impl Block {
    fn tree_into(&self, out: &mut String, prefix: &str, last: bool) {
        tree_line(out, prefix, last, "CompoundStmt {}");
        let prefix = child_prefix(prefix, last);
        for (i, stmt) in self.stmts.iter().enumerate() {
            stmt.tree_into(out, &prefix, i + 1 == self.stmts.len());
        }
    }
}

impl Stmt {
    fn tree_into(&self, out: &mut String, prefix: &str, last: bool) {
        match self {
            Self::Decl(decl) => decl.tree_into(out, prefix, last),
            Self::Expr(expr) => expr.tree_into(out, prefix, last),
            Self::Block(block) => block.tree_into(out, prefix, last),
            Self::If(if_stmt) => {
                tree_line(out, prefix, last, "IfStmt");
                let prefix = child_prefix(prefix, last);
                tree_line(out, &prefix, false, "Condition:");
                if_stmt
                    .condition
                    .tree_into(out, &child_prefix(&prefix, false), true);
                let then_last = if_stmt.else_branch.is_none();
                tree_line(out, &prefix, then_last, "Then:");
                if_stmt
                    .then_branch
                    .tree_into(out, &child_prefix(&prefix, then_last), true);
                if let Some(else_branch) = &if_stmt.else_branch {
                    tree_line(out, &prefix, true, "Else:");
                    else_branch.tree_into(out, &child_prefix(&prefix, true), true);
                }
            }
            Self::While(while_stmt) => {
                tree_line(out, prefix, last, "WhileStmt");
                let prefix = child_prefix(prefix, last);
                tree_line(out, &prefix, false, "Condition:");
                while_stmt
                    .condition
                    .tree_into(out, &child_prefix(&prefix, false), true);
                tree_line(out, &prefix, true, "Body:");
                while_stmt
                    .body
                    .tree_into(out, &child_prefix(&prefix, true), true);
            }
            Self::Return(ret) => {
                tree_line(out, prefix, last, "ReturnStmt");
                if let Some(value) = &ret.value {
                    value.tree_into(out, &child_prefix(prefix, last), true);
                }
            }
        }
    }
}

impl Expr {
    fn tree_into(&self, out: &mut String, prefix: &str, last: bool) {
        match self {
            Self::Ident { name, .. } => {
                tree_line(out, prefix, last, &format!("Identifier: {name}"));
            }
            Self::Literal { value, ty, .. } => {
                tree_line(out, prefix, last, &format!("Literal: {value} ({ty})"));
            }
            Self::Binary {
                op, left, right, ..
            } => {
                tree_line(out, prefix, last, &format!("BinaryOp: {op}"));
                let prefix = child_prefix(prefix, last);
                left.tree_into(out, &prefix, false);
                right.tree_into(out, &prefix, true);
            }
            Self::Assign { target, value, .. } => {
                tree_line(out, prefix, last, "Assignment");
                let prefix = child_prefix(prefix, last);
                target.tree_into(out, &prefix, false);
                value.tree_into(out, &prefix, true);
            }
            Self::Call { callee, args, .. } => {
                tree_line(out, prefix, last, &format!("FunctionCall: {callee}"));
                let prefix = child_prefix(prefix, last);
                for (i, arg) in args.iter().enumerate() {
                    arg.tree_into(out, &prefix, i + 1 == args.len());
                }
            }
            Self::Index { array, index, .. } => {
                tree_line(out, prefix, last, "ArrayAccess");
                let prefix = child_prefix(prefix, last);
                array.tree_into(out, &prefix, false);
                index.tree_into(out, &prefix, true);
            }
        }
    }
}

// ---- JSON form ----

fn json_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

fn pad(out: &mut String, level: usize) {
    for _ in 0..level * 2 {
        out.push(' ');
    }
}

fn json_array<T>(
    out: &mut String,
    level: usize,
    key: &str,
    items: &[T],
    mut write: impl FnMut(&mut String, usize, &T),
) {
    pad(out, level);
    out.push_str(&format!("\"{key}\": [\n"));
    for (i, item) in items.iter().enumerate() {
        write(out, level + 1, item);
        if i + 1 < items.len() {
            out.push(',');
        }
        out.push('\n');
    }
    pad(out, level);
    out.push(']');
}

impl Program {
    /// Render the JSON-like form used for inspection and golden
    /// comparisons.
    pub fn to_json(&self) -> String {
        let mut out = String::new();
        self.json_into(&mut out, 0);
        out.push('\n');
        out
    }

    fn json_into(&self, out: &mut String, level: usize) {
        pad(out, level);
        out.push_str("{\n");
        pad(out, level + 1);
        out.push_str("\"type\": \"Program\",\n");
        json_array(out, level + 1, "globalVariables", &self.globals, |out, l, v| {
            v.json_into(out, l)
        });
        out.push_str(",\n");
        json_array(out, level + 1, "functions", &self.functions, |out, l, f| {
            f.json_into(out, l)
        });
        out.push('\n');
        pad(out, level);
        out.push('}');
    }
}

impl VarDecl {
    fn json_into(&self, out: &mut String, level: usize) {
        pad(out, level);
        out.push_str("{\n");
        pad(out, level + 1);
        out.push_str("\"type\": \"VariableDecl\",\n");
        pad(out, level + 1);
        out.push_str(&format!("\"varType\": \"{}\",\n", self.ty));
        pad(out, level + 1);
        out.push_str(&format!("\"name\": \"{}\",\n", json_escape(&self.name)));
        pad(out, level + 1);
        out.push_str(&format!("\"isArray\": {},\n", self.ty.is_array()));
        pad(out, level + 1);
        out.push_str(&format!("\"arraySize\": {}", self.array_size.unwrap_or(0)));
        if let Some(init) = &self.init {
            out.push_str(",\n");
            pad(out, level + 1);
            out.push_str("\"initializer\":\n");
            init.json_into(out, level + 1);
        }
        out.push('\n');
        pad(out, level);
        out.push('}');
    }
}

impl FunctionDef {
    fn json_into(&self, out: &mut String, level: usize) {
        pad(out, level);
        out.push_str("{\n");
        pad(out, level + 1);
        out.push_str("\"type\": \"FunctionDef\",\n");
        pad(out, level + 1);
        out.push_str(&format!("\"returnType\": \"{}\",\n", self.return_type));
        pad(out, level + 1);
        out.push_str(&format!("\"name\": \"{}\",\n", json_escape(&self.name)));
        json_array(out, level + 1, "parameters", &self.params, |out, l, p| {
            p.json_into(out, l)
        });
        out.push_str(",\n");
        pad(out, level + 1);
        out.push_str("\"body\":\n");
        self.body.json_into(out, level + 1);
        out.push('\n');
        pad(out, level);
        out.push('}');
    }
}

impl Block {
    fn json_into(&self, out: &mut String, level: usize) {
        pad(out, level);
        out.push_str("{\n");
        pad(out, level + 1);
        out.push_str("\"type\": \"CompoundStmt\",\n");
        json_array(out, level + 1, "statements", &self.stmts, |out, l, s| {
            s.json_into(out, l)
        });
        out.push('\n');
        pad(out, level);
        out.push('}');
    }
}

impl Stmt {
    fn json_into(&self, out: &mut String, level: usize) {
        match self {
            Self::Decl(decl) => decl.json_into(out, level),
            Self::Expr(expr) => expr.json_into(out, level),
            Self::Block(block) => block.json_into(out, level),
            Self::If(if_stmt) => {
                pad(out, level);
                out.push_str("{\n");
                pad(out, level + 1);
                out.push_str("\"type\": \"IfStmt\",\n");
                pad(out, level + 1);
                out.push_str("\"condition\":\n");
                if_stmt.condition.json_into(out, level + 1);
                out.push_str(",\n");
                pad(out, level + 1);
                out.push_str("\"thenStmt\":\n");
                if_stmt.then_branch.json_into(out, level + 1);
                if let Some(else_branch) = &if_stmt.else_branch {
                    out.push_str(",\n");
                    pad(out, level + 1);
                    out.push_str("\"elseStmt\":\n");
                    else_branch.json_into(out, level + 1);
                }
                out.push('\n');
                pad(out, level);
                out.push('}');
            }
            Self::While(while_stmt) => {
                pad(out, level);
                out.push_str("{\n");
                pad(out, level + 1);
                out.push_str("\"type\": \"WhileStmt\",\n");
                pad(out, level + 1);
                out.push_str("\"condition\":\n");
                while_stmt.condition.json_into(out, level + 1);
                out.push_str(",\n");
                pad(out, level + 1);
                out.push_str("\"body\":\n");
                while_stmt.body.json_into(out, level + 1);
                out.push('\n');
                pad(out, level);
                out.push('}');
            }
            Self::Return(ret) => {
                pad(out, level);
                out.push_str("{\n");
                pad(out, level + 1);
                out.push_str("\"type\": \"ReturnStmt\"");
                if let Some(value) = &ret.value {
                    out.push_str(",\n");
                    pad(out, level + 1);
                    out.push_str("\"value\":\n");
                    value.json_into(out, level + 1);
                }
                out.push('\n');
                pad(out, level);
                out.push('}');
            }
        }
    }
}

impl Expr {
    fn json_into(&self, out: &mut String, level: usize) {
        pad(out, level);
        out.push_str("{\n");
        match self {
            Self::Ident { name, .. } => {
                pad(out, level + 1);
                out.push_str("\"type\": \"Identifier\",\n");
                pad(out, level + 1);
                out.push_str(&format!("\"name\": \"{}\"", json_escape(name)));
            }
            Self::Literal { value, ty, .. } => {
                pad(out, level + 1);
                out.push_str("\"type\": \"Literal\",\n");
                pad(out, level + 1);
                out.push_str(&format!("\"value\": \"{}\",\n", json_escape(value)));
                pad(out, level + 1);
                out.push_str(&format!("\"dataType\": \"{ty}\""));
            }
            Self::Binary {
                op, left, right, ..
            } => {
                pad(out, level + 1);
                out.push_str("\"type\": \"BinaryOp\",\n");
                pad(out, level + 1);
                out.push_str(&format!("\"operator\": \"{op}\",\n"));
                pad(out, level + 1);
                out.push_str("\"left\":\n");
                left.json_into(out, level + 1);
                out.push_str(",\n");
                pad(out, level + 1);
                out.push_str("\"right\":\n");
                right.json_into(out, level + 1);
            }
            Self::Assign { target, value, .. } => {
                pad(out, level + 1);
                out.push_str("\"type\": \"Assignment\",\n");
                pad(out, level + 1);
                out.push_str("\"target\":\n");
                target.json_into(out, level + 1);
                out.push_str(",\n");
                pad(out, level + 1);
                out.push_str("\"value\":\n");
                value.json_into(out, level + 1);
            }
            Self::Call { callee, args, .. } => {
                pad(out, level + 1);
                out.push_str("\"type\": \"FunctionCall\",\n");
                pad(out, level + 1);
                out.push_str(&format!(
                    "\"functionName\": \"{}\",\n",
                    json_escape(callee)
                ));
                json_array(out, level + 1, "arguments", args, |out, l, a| {
                    a.json_into(out, l)
                });
            }
            Self::Index { array, index, .. } => {
                pad(out, level + 1);
                out.push_str("\"type\": \"ArrayAccess\",\n");
                pad(out, level + 1);
                out.push_str("\"array\":\n");
                array.json_into(out, level + 1);
                out.push_str(",\n");
                pad(out, level + 1);
                out.push_str("\"index\":\n");
                index.json_into(out, level + 1);
            }
        }
        out.push('\n');
        pad(out, level);
        out.push('}');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Program {
        Program {
            globals: vec![],
            functions: vec![FunctionDef {
                return_type: DataType::Int,
                name: "main".into(),
                params: vec![],
                body: Block {
                    stmts: vec![
                        Stmt::Decl(VarDecl {
                            ty: DataType::Int,
                            name: "x".into(),
                            init: Some(Expr::Literal {
                                value: "5".into(),
                                ty: DataType::Int,
                                line: 1,
                            }),
                            array_size: None,
                            line: 1,
                        }),
                        Stmt::Return(ReturnStmt {
                            value: Some(Expr::Ident {
                                name: "x".into(),
                                ty: DataType::Unknown,
                                line: 1,
                            }),
                            line: 1,
                        }),
                    ],
                },
                line: 1,
            }],
        }
    }

    #[test]
    fn tree_form_shows_the_statement_structure() {
        let tree = sample().tree();
        assert!(tree.starts_with("Program\n"));
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

    #[test]
    fn json_form_carries_kinds_and_types() {
        let json = sample().to_json();
        for needle in [
            "\"type\": \"Program\"",
            "\"type\": \"FunctionDef\"",
            "\"returnType\": \"int\"",
            "\"type\": \"VariableDecl\"",
            "\"dataType\": \"int\"",
            "\"type\": \"ReturnStmt\"",
        ] {
            assert!(json.contains(needle), "missing {needle:?} in:\n{json}");
        }
    }

    #[test]
    fn json_strings_are_escaped() {
        assert_eq!(json_escape("a\"b\\c\nd"), "a\\\"b\\\\c\\nd");
    }

    #[test]
    fn relational_operators_are_classified() {
        assert!(BinOp::Lt.is_relational());
        assert!(BinOp::Eq.is_relational());
        assert!(!BinOp::Add.is_relational());
        assert_eq!(BinOp::from_lexeme("<="), Some(BinOp::Le));
        assert_eq!(BinOp::from_lexeme("&&"), None);
    }
}
