//! AST visitor pattern for traversing the syntax tree
//!
//! Each visit method has a default implementation that calls the
//! corresponding walk function, so implementors only override the nodes
//! they care about.
//!
//! ```rust
//! use grove_parser::ast::visitor::walk_expression;
//! use grove_parser::ast::*;
//!
//! struct CountCalls(usize);
//!
//! impl Visitor for CountCalls {
//!     fn visit_expression(&mut self, expr: &Expression) {
//!         if matches!(expr, Expression::MethodCall(_)) {
//!             self.0 += 1;
//!         }
//!         walk_expression(self, expr);
//!     }
//! }
//! ```

use super::*;

/// Read-only AST visitor
pub trait Visitor: Sized {
    fn visit_module(&mut self, module: &ModuleNode) {
        walk_module(self, module);
    }

    fn visit_method(&mut self, method: &MethodNode) {
        walk_method(self, method);
    }

    fn visit_statement(&mut self, stmt: &Statement) {
        walk_statement(self, stmt);
    }

    fn visit_expression(&mut self, expr: &Expression) {
        walk_expression(self, expr);
    }
}

pub fn walk_module<V: Visitor>(visitor: &mut V, module: &ModuleNode) {
    for stmt in &module.statements {
        visitor.visit_statement(stmt);
    }
    for method in &module.methods {
        visitor.visit_method(method);
    }
}

pub fn walk_method<V: Visitor>(visitor: &mut V, method: &MethodNode) {
    for stmt in &method.body {
        visitor.visit_statement(stmt);
    }
}

pub fn walk_statement<V: Visitor>(visitor: &mut V, stmt: &Statement) {
    match stmt {
        Statement::Expression(s) => visitor.visit_expression(&s.expression),
        Statement::Declaration(s) => {
            if let Some(init) = &s.initializer {
                visitor.visit_expression(init);
            }
        }
        Statement::If(s) => {
            visitor.visit_expression(&s.condition);
            visitor.visit_statement(&s.then_branch);
            if let Some(else_branch) = &s.else_branch {
                visitor.visit_statement(else_branch);
            }
        }
        Statement::While(s) => {
            visitor.visit_expression(&s.condition);
            visitor.visit_statement(&s.body);
        }
        Statement::Return(s) => {
            if let Some(value) = &s.value {
                visitor.visit_expression(value);
            }
        }
        Statement::Block(s) => {
            for stmt in &s.statements {
                visitor.visit_statement(stmt);
            }
        }
    }
}

pub fn walk_expression<V: Visitor>(visitor: &mut V, expr: &Expression) {
    match expr {
        Expression::Constant(_) | Expression::Variable(_) | Expression::Class(_) => {}
        Expression::Property(e) => visitor.visit_expression(&e.object),
        Expression::MethodCall(e) => {
            if let Some(receiver) = &e.receiver {
                visitor.visit_expression(receiver);
            }
            for arg in &e.arguments {
                visitor.visit_expression(arg);
            }
        }
        Expression::Binary(e) => {
            visitor.visit_expression(&e.left);
            visitor.visit_expression(&e.right);
        }
        Expression::Unary(e) => visitor.visit_expression(&e.operand),
        Expression::Assignment(e) => visitor.visit_expression(&e.value),
        Expression::List(e) => {
            for element in &e.elements {
                visitor.visit_expression(element);
            }
        }
    }
}

/// Mutating AST visitor, used by passes that rewrite expressions in place
pub trait VisitorMut: Sized {
    fn visit_module_mut(&mut self, module: &mut ModuleNode) {
        walk_module_mut(self, module);
    }

    fn visit_method_mut(&mut self, method: &mut MethodNode) {
        walk_method_mut(self, method);
    }

    fn visit_statement_mut(&mut self, stmt: &mut Statement) {
        walk_statement_mut(self, stmt);
    }

    fn visit_expression_mut(&mut self, expr: &mut Expression) {
        walk_expression_mut(self, expr);
    }
}

pub fn walk_module_mut<V: VisitorMut>(visitor: &mut V, module: &mut ModuleNode) {
    for stmt in &mut module.statements {
        visitor.visit_statement_mut(stmt);
    }
    for method in &mut module.methods {
        visitor.visit_method_mut(method);
    }
}

pub fn walk_method_mut<V: VisitorMut>(visitor: &mut V, method: &mut MethodNode) {
    for stmt in &mut method.body {
        visitor.visit_statement_mut(stmt);
    }
}

pub fn walk_statement_mut<V: VisitorMut>(visitor: &mut V, stmt: &mut Statement) {
    match stmt {
        Statement::Expression(s) => visitor.visit_expression_mut(&mut s.expression),
        Statement::Declaration(s) => {
            if let Some(init) = &mut s.initializer {
                visitor.visit_expression_mut(init);
            }
        }
        Statement::If(s) => {
            visitor.visit_expression_mut(&mut s.condition);
            visitor.visit_statement_mut(&mut s.then_branch);
            if let Some(else_branch) = &mut s.else_branch {
                visitor.visit_statement_mut(else_branch);
            }
        }
        Statement::While(s) => {
            visitor.visit_expression_mut(&mut s.condition);
            visitor.visit_statement_mut(&mut s.body);
        }
        Statement::Return(s) => {
            if let Some(value) = &mut s.value {
                visitor.visit_expression_mut(value);
            }
        }
        Statement::Block(s) => {
            for stmt in &mut s.statements {
                visitor.visit_statement_mut(stmt);
            }
        }
    }
}

pub fn walk_expression_mut<V: VisitorMut>(visitor: &mut V, expr: &mut Expression) {
    match expr {
        Expression::Constant(_) | Expression::Variable(_) | Expression::Class(_) => {}
        Expression::Property(e) => visitor.visit_expression_mut(&mut e.object),
        Expression::MethodCall(e) => {
            if let Some(receiver) = &mut e.receiver {
                visitor.visit_expression_mut(receiver);
            }
            for arg in &mut e.arguments {
                visitor.visit_expression_mut(arg);
            }
        }
        Expression::Binary(e) => {
            visitor.visit_expression_mut(&mut e.left);
            visitor.visit_expression_mut(&mut e.right);
        }
        Expression::Unary(e) => visitor.visit_expression_mut(&mut e.operand),
        Expression::Assignment(e) => visitor.visit_expression_mut(&mut e.value),
        Expression::List(e) => {
            for element in &mut e.elements {
                visitor.visit_expression_mut(element);
            }
        }
    }
}
