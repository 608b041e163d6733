//! Helpers for inspecting script ASTs.

use super::*;

/// Whether executing `statement` could have an observable effect.
///
/// Conservative: anything not recognised as inert counts as an effect.
/// Inert statements are constant expression statements, `def` declarations
/// without an initializer or with a constant one, `return` of nothing or of
/// a constant, and blocks made only of inert statements.
pub fn may_have_an_effect(statement: &Statement) -> bool {
    match statement {
        Statement::Expression(s) => !s.expression.is_constant(),
        Statement::Declaration(s) => !matches!(&s.initializer, None | Some(Expression::Constant(_))),
        Statement::Return(s) => !matches!(&s.value, None | Some(Expression::Constant(_))),
        Statement::Block(s) => s.statements.iter().any(may_have_an_effect),
        Statement::If(_) | Statement::While(_) => true,
    }
}

/// Names declared with `def` anywhere inside `statements`, nested blocks included.
pub fn declared_names(statements: &[Statement]) -> Vec<String> {
    struct Collector(Vec<String>);

    impl Visitor for Collector {
        fn visit_statement(&mut self, stmt: &Statement) {
            if let Statement::Declaration(decl) = stmt {
                self.0.push(decl.name.clone());
            }
            visitor::walk_statement(self, stmt);
        }
    }

    let mut collector = Collector(Vec::new());
    for stmt in statements {
        collector.visit_statement(stmt);
    }
    collector.0
}
