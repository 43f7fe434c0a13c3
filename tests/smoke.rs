// SolvraPad smoke tests for the cell dialect frontend.
// Covers: arithmetic, assignment, function definition, control flow, imports.

use solvrapad::{
    ast::{self, BinaryOp, Expr, Stmt},
    parser, tokenizer,
};

fn tokenize_and_parse(source: &str) -> Result<ast::Program, parser::ParseError> {
    let mut tokenizer = tokenizer::Tokenizer::new(source);
    let tokens = tokenizer.tokenize().unwrap();
    let mut parser = parser::Parser::new(tokens);
    parser.parse()
}

#[test]
fn test_arithmetic() {
    let program = tokenize_and_parse("1 + 2 * 3 - 4 / 2;").unwrap();
    assert!(format!("{:?}", program).contains("Binary"));
}

#[test]
fn test_variable_declaration() {
    let program = tokenize_and_parse("let mut x = 42; x = x + 1;").unwrap();
    match &program.statements[0] {
        Stmt::VariableDecl { name, mutable, .. } => {
            assert_eq!(name, "x");
            assert!(mutable);
        }
        other => panic!("expected variable declaration, found {other:?}"),
    }
}

#[test]
fn test_bare_assignment_defines_module_attribute() {
    let program = tokenize_and_parse("x = 1").unwrap();
    match &program.statements[0] {
        Stmt::Expression {
            expr: Expr::Assignment { .. },
        } => {}
        other => panic!("expected assignment expression, found {other:?}"),
    }
}

#[test]
fn test_function_definition() {
    let program = tokenize_and_parse("fn add(a, b) { return a + b; }").unwrap();
    match &program.statements[0] {
        Stmt::FunctionDecl { name, params, .. } => {
            assert_eq!(name, "add");
            assert_eq!(params.len(), 2);
        }
        other => panic!("expected function declaration, found {other:?}"),
    }
}

#[test]
fn test_if_else() {
    let program = tokenize_and_parse("if x > 0 { y = 1 } else { y = -1 }").unwrap();
    match &program.statements[0] {
        Stmt::If { else_branch, .. } => assert!(else_branch.is_some()),
        other => panic!("expected if statement, found {other:?}"),
    }
}

#[test]
fn test_while_loop() {
    let program = tokenize_and_parse("let i = 0; while i < 10 { i = i + 1; }").unwrap();
    assert!(matches!(program.statements[1], Stmt::While { .. }));
}

#[test]
fn test_compound_assignment_desugars_to_add() {
    let program = tokenize_and_parse("x += 2").unwrap();
    match &program.statements[0] {
        Stmt::Expression {
            expr: Expr::Assignment { value, .. },
        } => {
            assert!(matches!(
                **value,
                Expr::Binary {
                    operator: BinaryOp::Add,
                    ..
                }
            ));
        }
        other => panic!("expected assignment, found {other:?}"),
    }
}

#[test]
fn test_import_statement() {
    let program = tokenize_and_parse("import pkg.sub").unwrap();
    match &program.statements[0] {
        Stmt::Import { path, .. } => assert_eq!(path, &["pkg", "sub"]),
        other => panic!("expected import, found {other:?}"),
    }
}

#[test]
fn test_parse_error_reports_position() {
    let err = tokenize_and_parse("fn demo(").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("line 1"), "unexpected message: {message}");
}
