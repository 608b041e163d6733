//! Abstract syntax tree for Grove scripts
//!
//! A script parses into a [`ModuleNode`]: an optional package declaration,
//! imports, the top-level statement block (the body of the generated `run`
//! method) and the methods declared with `def name(...) { ... }`.

pub mod utils;
pub mod visitor;

pub use visitor::{Visitor, VisitorMut};

use crate::token::Span;

/// Root of a parsed script.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleNode {
    pub package: Option<PackageNode>,
    pub imports: Vec<ImportNode>,
    pub star_imports: Vec<StarImportNode>,
    /// Top-level statements in source order
    pub statements: Vec<Statement>,
    pub methods: Vec<MethodNode>,
    pub span: Span,
}

impl ModuleNode {
    pub fn has_package(&self) -> bool {
        self.package.is_some()
    }

    /// Add a star import unless the package is already imported.
    pub fn add_star_import(&mut self, package_name: &str) {
        let package_name = normalize_package(package_name);
        if !self
            .star_imports
            .iter()
            .any(|import| import.package_name == package_name)
        {
            self.star_imports.push(StarImportNode {
                package_name,
                span: Span::default(),
            });
        }
    }
}

/// Star-import packages always carry a trailing dot so candidates are
/// built by plain concatenation.
fn normalize_package(package_name: &str) -> String {
    if package_name.ends_with('.') {
        package_name.to_string()
    } else {
        format!("{}.", package_name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackageNode {
    pub name: String,
    pub span: Span,
}

/// `import a.b.C` or `import a.b.C as D`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportNode {
    pub class_name: String,
    pub alias: String,
    pub span: Span,
}

/// `import a.b.*`
#[derive(Debug, Clone, PartialEq)]
pub struct StarImportNode {
    /// Package name including the trailing dot, e.g. `org.gradle.api.`
    pub package_name: String,
    pub span: Span,
}

impl StarImportNode {
    pub fn new(package_name: &str, span: Span) -> Self {
        Self {
            package_name: normalize_package(package_name),
            span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodNode {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Expression(ExpressionStatement),
    Declaration(DeclarationStatement),
    If(IfStatement),
    While(WhileStatement),
    Return(ReturnStatement),
    Block(BlockStatement),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Expression(s) => s.span,
            Statement::Declaration(s) => s.span,
            Statement::If(s) => s.span,
            Statement::While(s) => s.span,
            Statement::Return(s) => s.span,
            Statement::Block(s) => s.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStatement {
    pub expression: Expression,
    pub span: Span,
}

/// `def name` or `def name = initializer`
#[derive(Debug, Clone, PartialEq)]
pub struct DeclarationStatement {
    pub name: String,
    pub initializer: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub condition: Expression,
    pub then_branch: Box<Statement>,
    pub else_branch: Option<Box<Statement>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    pub condition: Expression,
    pub body: Box<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    pub value: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockStatement {
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Constant(ConstantExpression),
    Variable(VariableExpression),
    /// A resolved class reference; produced by semantic analysis, never by the parser
    Class(ClassExpression),
    Property(PropertyExpression),
    MethodCall(MethodCallExpression),
    Binary(BinaryExpression),
    Unary(UnaryExpression),
    Assignment(AssignmentExpression),
    List(ListExpression),
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::Constant(e) => e.span,
            Expression::Variable(e) => e.span,
            Expression::Class(e) => e.span,
            Expression::Property(e) => e.span,
            Expression::MethodCall(e) => e.span,
            Expression::Binary(e) => e.span,
            Expression::Unary(e) => e.span,
            Expression::Assignment(e) => e.span,
            Expression::List(e) => e.span,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Expression::Constant(_))
    }

    /// The dotted name spelled by a chain of variable and property
    /// accesses, e.g. `java.util.Map` for `java.util.Map`.
    pub fn dotted_name(&self) -> Option<String> {
        match self {
            Expression::Variable(v) => Some(v.name.clone()),
            Expression::Property(p) => p
                .object
                .dotted_name()
                .map(|prefix| format!("{}.{}", prefix, p.property)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantExpression {
    pub value: Literal,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableExpression {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassExpression {
    /// Fully qualified binary name, e.g. `java.util.Map$Entry`
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyExpression {
    pub object: Box<Expression>,
    pub property: String,
    pub span: Span,
}

/// `method(args)`, `method args` or `receiver.method(args)`
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCallExpression {
    /// `None` for calls on the script itself
    pub receiver: Option<Box<Expression>>,
    pub method: String,
    pub arguments: Vec<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    pub operator: BinaryOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    pub operator: UnaryOperator,
    pub operand: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentExpression {
    pub target: String,
    pub value: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListExpression {
    pub elements: Vec<Expression>,
    pub span: Span,
}
