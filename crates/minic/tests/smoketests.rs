use minic::ir::IrGenerator;
use minic::lang::Frontend;
use minic::semantic::{Analyzer, SemanticError};

const SOURCE: &str = "\
int limit = 100;
int square(int n) {
    return n * n;
}
int main() {
    int total = 0;
    int i = 0;
    while (i < 10) {
        if (square(i) < limit) {
            total = total + square(i);
        } else {
            total = limit;
        }
        i = i + 1;
    }
    return total;
}
";

#[test]
fn the_full_pipeline_runs_end_to_end() {
    let frontend = Frontend::new().unwrap();
    assert!(frontend.table().conflicts().is_empty());

    let tokens = frontend.tokenize(SOURCE).unwrap();
    let mut program = frontend.parse(&tokens).unwrap();
    assert_eq!(program.globals.len(), 1);
    assert_eq!(program.functions.len(), 2);

    let errors = Analyzer::analyze(&mut program);
    assert!(errors.is_empty(), "{errors:?}");

    let quads = IrGenerator::generate(&program);
    let func_markers = quads
        .iter()
        .filter(|q| q.op == minic::ir::QuadOp::Func)
        .count();
    assert_eq!(func_markers, 2);
    // the global initializer lowers ahead of the first function
    assert_eq!(quads[0].op, minic::ir::QuadOp::Assign);
}

#[test]
fn semantic_diagnostics_do_not_block_code_generation() {
    let frontend = Frontend::new().unwrap();
    let mut program = frontend
        .compile_source("int main() { undeclared = 3; }")
        .unwrap();
    let errors = Analyzer::analyze(&mut program);
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors[0],
        SemanticError::UndeclaredVariable { .. }
    ));

    // the generator runs on whatever AST shape it receives
    let quads = IrGenerator::generate(&program);
    assert_eq!(quads.len(), 2);
}

#[test]
fn parse_failures_are_fatal_and_descriptive() {
    let frontend = Frontend::new().unwrap();
    let err = frontend
        .compile_source("int main() { int x = ; }")
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("SEMI"), "{message}");
    assert!(message.contains("expected one of"), "{message}");
}

#[test]
fn serialized_forms_agree_on_the_tree_shape() {
    let frontend = Frontend::new().unwrap();
    let program = frontend.compile_source(SOURCE).unwrap();

    let tree = program.tree();
    let json = program.to_json();
    assert!(tree.contains("FunctionDef: int square()"));
    assert!(tree.contains("WhileStmt"));
    assert!(json.contains("\"name\": \"square\""));
    assert!(json.contains("\"type\": \"WhileStmt\""));
}
