//! End-to-end parsing of realistic build scripts

use grove_parser::ast::utils::may_have_an_effect;
use grove_parser::ast::{Expression, Statement};
use grove_parser::{parse, ParseErrorKind};

const BUILD_SCRIPT: &str = r#"
import org.gradle.api.*
import java.util.Map.Entry as Pair

/* project coordinates */
group = 'org.acme'
def version = "1.0"

def describe(name, count) {
    if (count > 1) {
        return name + " x" + count
    } else {
        return name
    }
}

def i = 0
while (i < 3) {
    println describe('task', i)
    i = i + 1
}
"#;

#[test]
fn test_parse_build_script() {
    let module = parse(BUILD_SCRIPT).expect("script should parse");

    assert!(module.package.is_none());
    assert_eq!(module.star_imports.len(), 1);
    assert_eq!(module.imports[0].class_name, "java.util.Map.Entry");
    assert_eq!(module.imports[0].alias, "Pair");
    assert_eq!(module.methods.len(), 1);
    assert_eq!(module.methods[0].name, "describe");
    assert_eq!(module.statements.len(), 4);
    assert!(matches!(module.statements[3], Statement::While(_)));
}

#[test]
fn test_effects_of_build_script() {
    let module = parse(BUILD_SCRIPT).unwrap();
    let effects: Vec<bool> = module.statements.iter().map(may_have_an_effect).collect();
    assert_eq!(effects, vec![true, false, false, true]);
}

#[test]
fn test_statement_lines() {
    let module = parse(BUILD_SCRIPT).unwrap();
    assert_eq!(module.statements[0].span().line, 6);
    assert_eq!(module.methods[0].span.line, 9);
}

#[test]
fn test_else_on_next_line() {
    let module = parse("if (a)\n  println 1\nelse\n  println 2").unwrap();
    let Statement::If(stmt) = &module.statements[0] else {
        panic!("expected if");
    };
    assert!(stmt.else_branch.is_some());
}

#[test]
fn test_call_in_parentheses() {
    let module = parse("println('hi')").unwrap();
    let Statement::Expression(stmt) = &module.statements[0] else {
        panic!("expected expression");
    };
    assert!(matches!(&stmt.expression, Expression::MethodCall(call) if call.arguments.len() == 1));
}

#[test]
fn test_unclosed_block_reports_eof() {
    let errors = parse("def foo() {\n  println 1\n").unwrap_err();
    assert!(matches!(errors[0].kind, ParseErrorKind::UnexpectedEof { .. }));
}
