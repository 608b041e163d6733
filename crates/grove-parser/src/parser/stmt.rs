//! Statement, declaration and header parsing

use super::{ParseError, Parser};
use crate::ast::*;
use crate::token::{Span, Token};

impl Parser {
    /// `package a.b.c`
    pub(super) fn parse_package(&mut self) -> Result<PackageNode, ParseError> {
        let start = self.expect(Token::Package)?;
        let (name, end) = self.parse_qualified_name(false)?;
        Ok(PackageNode {
            name,
            span: start.merge(&end),
        })
    }

    /// `import a.b.C`, `import a.b.C as D` or `import a.b.*`
    pub(super) fn parse_import(&mut self, module: &mut ModuleNode) -> Result<(), ParseError> {
        let start = self.expect(Token::Import)?;
        if self.check(&Token::Static) {
            return Err(ParseError::invalid_syntax(
                "static imports are not supported",
                self.current_span(),
            ));
        }

        let (name, end) = self.parse_qualified_name(true)?;
        if let Some(package) = name.strip_suffix(".*") {
            module
                .star_imports
                .push(StarImportNode::new(package, start.merge(&end)));
            return Ok(());
        }

        let (alias, end) = if self.eat(&Token::As) {
            self.expect_identifier("import alias")?
        } else {
            let simple = name.rsplit('.').next().unwrap_or(&name).to_string();
            (simple, end)
        };
        module.imports.push(ImportNode {
            class_name: name,
            alias,
            span: start.merge(&end),
        });
        Ok(())
    }

    /// Dotted identifier list. With `allow_star`, a trailing `.*` is kept in
    /// the returned name.
    fn parse_qualified_name(&mut self, allow_star: bool) -> Result<(String, Span), ParseError> {
        let (mut name, mut end) = self.expect_identifier("name")?;
        while self.eat(&Token::Dot) {
            if allow_star && self.check(&Token::Star) {
                end = self.advance().1;
                name.push_str(".*");
                break;
            }
            let (segment, span) = self.expect_identifier("name")?;
            name.push('.');
            name.push_str(&segment);
            end = span;
        }
        Ok((name, end))
    }

    /// `def name(` starts a method, any other `def` a local declaration.
    pub(super) fn is_method_declaration(&self) -> bool {
        matches!(self.peek_nth(1), Token::Identifier(_)) && matches!(self.peek_nth(2), Token::LeftParen)
    }

    /// `def name(a, b) { body }`
    pub(super) fn parse_method(&mut self) -> Result<MethodNode, ParseError> {
        let start = self.expect(Token::Def)?;
        let (name, _) = self.expect_identifier("method name")?;
        self.expect(Token::LeftParen)?;
        self.skip_newlines();

        let mut parameters = Vec::new();
        while !self.check(&Token::RightParen) {
            let (param, span) = self.expect_identifier("parameter name")?;
            if parameters.iter().any(|p: &Parameter| p.name == param) {
                return Err(ParseError::invalid_syntax(
                    format!("duplicate parameter '{}'", param),
                    span,
                ));
            }
            parameters.push(Parameter { name: param, span });
            self.skip_newlines();
            if !self.eat(&Token::Comma) {
                break;
            }
            self.skip_newlines();
        }
        self.expect(Token::RightParen)?;
        self.skip_newlines();

        let body = self.parse_block()?;
        Ok(MethodNode {
            name,
            parameters,
            span: start.merge(&body.span),
            body: body.statements,
        })
    }

    pub(super) fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match self.current() {
            Token::Def => self.parse_declaration(),
            Token::If => self.parse_if(),
            Token::While => self.parse_while(),
            Token::Return => self.parse_return(),
            Token::LeftBrace => Ok(Statement::Block(self.parse_block()?)),
            Token::Package | Token::Import => Err(ParseError::invalid_syntax(
                format!("{} is only allowed at the top of a script", self.current()),
                self.current_span(),
            )),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_declaration(&mut self) -> Result<Statement, ParseError> {
        if self.is_method_declaration() {
            return Err(ParseError::invalid_syntax(
                "method definition not expected here",
                self.current_span(),
            ));
        }
        let start = self.expect(Token::Def)?;
        let (name, mut span) = self.expect_identifier("variable or method name")?;
        span = start.merge(&span);

        let initializer = if self.eat(&Token::Assign) {
            self.skip_newlines();
            let value = self.parse_expression()?;
            span = span.merge(&value.span());
            Some(value)
        } else {
            None
        };

        Ok(Statement::Declaration(DeclarationStatement {
            name,
            initializer,
            span,
        }))
    }

    fn parse_condition(&mut self) -> Result<Expression, ParseError> {
        self.expect(Token::LeftParen)?;
        self.skip_newlines();
        let condition = self.parse_expression()?;
        self.skip_newlines();
        self.expect(Token::RightParen)?;
        self.skip_newlines();
        Ok(condition)
    }

    fn parse_if(&mut self) -> Result<Statement, ParseError> {
        let start = self.expect(Token::If)?;
        let condition = self.parse_condition()?;
        let then_branch = self.parse_statement()?;
        let mut span = start.merge(&then_branch.span());

        // `else` may sit on the line after the then-branch
        let mut lookahead = 0;
        while matches!(self.peek_nth(lookahead), Token::Newline) {
            lookahead += 1;
        }
        let else_branch = if matches!(self.peek_nth(lookahead), Token::Else) {
            self.skip_newlines();
            self.expect(Token::Else)?;
            self.skip_newlines();
            let stmt = self.parse_statement()?;
            span = span.merge(&stmt.span());
            Some(Box::new(stmt))
        } else {
            None
        };

        Ok(Statement::If(IfStatement {
            condition,
            then_branch: Box::new(then_branch),
            else_branch,
            span,
        }))
    }

    fn parse_while(&mut self) -> Result<Statement, ParseError> {
        let start = self.expect(Token::While)?;
        let condition = self.parse_condition()?;
        let body = self.parse_statement()?;
        Ok(Statement::While(WhileStatement {
            condition,
            span: start.merge(&body.span()),
            body: Box::new(body),
        }))
    }

    fn parse_return(&mut self) -> Result<Statement, ParseError> {
        let start = self.expect(Token::Return)?;
        let value = match self.current() {
            Token::Newline | Token::Semicolon | Token::RightBrace | Token::Eof => None,
            _ => Some(self.parse_expression()?),
        };
        let span = match &value {
            Some(value) => start.merge(&value.span()),
            None => start,
        };
        Ok(Statement::Return(ReturnStatement { value, span }))
    }

    pub(super) fn parse_block(&mut self) -> Result<BlockStatement, ParseError> {
        let start = self.expect(Token::LeftBrace)?;
        let mut statements = Vec::new();

        self.skip_separators();
        while !self.check(&Token::RightBrace) && !self.at_eof() {
            statements.push(self.parse_statement()?);
            self.expect_statement_end(true)?;
            self.skip_separators();
        }

        let end = self.expect(Token::RightBrace)?;
        Ok(BlockStatement {
            statements,
            span: start.merge(&end),
        })
    }

    /// Expression statement, including command calls without parentheses:
    /// `println "hi", 2` or `logger.info "x"`.
    fn parse_expression_statement(&mut self) -> Result<Statement, ParseError> {
        let expression = self.parse_expression()?;

        let expression = if self.current().starts_command_argument() {
            let start = expression.span();
            let (receiver, method) = match expression {
                Expression::Variable(v) => (None, v.name),
                Expression::Property(p) => (Some(p.object), p.property),
                _ => return Err(self.unexpected("end of statement")),
            };
            let mut arguments = vec![self.parse_expression()?];
            while self.eat(&Token::Comma) {
                self.skip_newlines();
                arguments.push(self.parse_expression()?);
            }
            let span = arguments
                .last()
                .map_or(start, |last| start.merge(&last.span()));
            Expression::MethodCall(MethodCallExpression {
                receiver,
                method,
                arguments,
                span,
            })
        } else {
            expression
        };

        Ok(Statement::Expression(ExpressionStatement {
            span: expression.span(),
            expression,
        }))
    }
}
