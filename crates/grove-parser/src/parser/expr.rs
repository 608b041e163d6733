//! Expression parsing
//!
//! Precedence, lowest first: assignment, `||`, `&&`, equality, relational,
//! additive, multiplicative, unary, postfix (calls and property access).

use super::{ParseError, Parser};
use crate::ast::*;
use crate::token::Token;

impl Parser {
    pub(super) fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expression, ParseError> {
        let target = self.parse_binary(0)?;
        if !self.check(&Token::Assign) {
            return Ok(target);
        }
        let assign_span = self.advance().1;
        self.skip_newlines();

        let Expression::Variable(variable) = target else {
            return Err(ParseError::invalid_syntax(
                "invalid assignment target",
                assign_span,
            ));
        };
        let value = self.parse_assignment()?;
        Ok(Expression::Assignment(AssignmentExpression {
            span: variable.span.merge(&value.span()),
            target: variable.name,
            value: Box::new(value),
        }))
    }

    /// Precedence climbing over the binary operator table.
    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expression, ParseError> {
        let mut left = self.parse_unary()?;

        while let Some((operator, precedence)) = binary_operator(self.current()) {
            if precedence < min_precedence {
                break;
            }
            self.advance();
            self.skip_newlines();
            let right = self.parse_binary(precedence + 1)?;
            left = Expression::Binary(BinaryExpression {
                span: left.span().merge(&right.span()),
                operator,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        let operator = match self.current() {
            Token::Bang => UnaryOperator::Not,
            Token::Minus => UnaryOperator::Negate,
            _ => return self.parse_postfix(),
        };
        let start = self.advance().1;
        let operand = self.parse_unary()?;
        Ok(Expression::Unary(UnaryExpression {
            span: start.merge(&operand.span()),
            operator,
            operand: Box::new(operand),
        }))
    }

    fn parse_postfix(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_primary()?;

        while self.eat(&Token::Dot) {
            self.skip_newlines();
            let (name, name_span) = self.expect_identifier("property or method name")?;
            if self.check(&Token::LeftParen) {
                let (arguments, end) = self.parse_arguments()?;
                expr = Expression::MethodCall(MethodCallExpression {
                    span: expr.span().merge(&end),
                    receiver: Some(Box::new(expr)),
                    method: name,
                    arguments,
                });
            } else {
                expr = Expression::Property(PropertyExpression {
                    span: expr.span().merge(&name_span),
                    object: Box::new(expr),
                    property: name,
                });
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        let span = self.current_span();
        let literal = match self.current().clone() {
            Token::IntLiteral(value) => Literal::Integer(value),
            Token::FloatLiteral(value) => Literal::Float(value),
            Token::StringLiteral(value) => Literal::String(value),
            Token::True => Literal::Boolean(true),
            Token::False => Literal::Boolean(false),
            Token::Null => Literal::Null,
            Token::Identifier(name) => {
                self.advance();
                if self.check(&Token::LeftParen) {
                    let (arguments, end) = self.parse_arguments()?;
                    return Ok(Expression::MethodCall(MethodCallExpression {
                        receiver: None,
                        method: name,
                        arguments,
                        span: span.merge(&end),
                    }));
                }
                return Ok(Expression::Variable(VariableExpression { name, span }));
            }
            Token::LeftParen => {
                self.advance();
                self.skip_newlines();
                let expr = self.parse_expression()?;
                self.skip_newlines();
                self.expect(Token::RightParen)?;
                return Ok(expr);
            }
            Token::LeftBracket => return self.parse_list(),
            _ => return Err(self.unexpected("expression")),
        };
        self.advance();
        Ok(Expression::Constant(ConstantExpression {
            value: literal,
            span,
        }))
    }

    fn parse_list(&mut self) -> Result<Expression, ParseError> {
        let start = self.expect(Token::LeftBracket)?;
        self.skip_newlines();
        let mut elements = Vec::new();
        while !self.check(&Token::RightBracket) {
            elements.push(self.parse_expression()?);
            self.skip_newlines();
            if !self.eat(&Token::Comma) {
                break;
            }
            self.skip_newlines();
        }
        let end = self.expect(Token::RightBracket)?;
        Ok(Expression::List(ListExpression {
            elements,
            span: start.merge(&end),
        }))
    }

    /// Parenthesized, comma separated call arguments.
    fn parse_arguments(&mut self) -> Result<(Vec<Expression>, crate::token::Span), ParseError> {
        self.expect(Token::LeftParen)?;
        self.skip_newlines();
        let mut arguments = Vec::new();
        while !self.check(&Token::RightParen) {
            arguments.push(self.parse_expression()?);
            self.skip_newlines();
            if !self.eat(&Token::Comma) {
                break;
            }
            self.skip_newlines();
        }
        let end = self.expect(Token::RightParen)?;
        Ok((arguments, end))
    }
}

fn binary_operator(token: &Token) -> Option<(BinaryOperator, u8)> {
    let entry = match token {
        Token::PipePipe => (BinaryOperator::Or, 1),
        Token::AmpAmp => (BinaryOperator::And, 2),
        Token::EqualEqual => (BinaryOperator::Equal, 3),
        Token::BangEqual => (BinaryOperator::NotEqual, 3),
        Token::Less => (BinaryOperator::Less, 4),
        Token::LessEqual => (BinaryOperator::LessEqual, 4),
        Token::Greater => (BinaryOperator::Greater, 4),
        Token::GreaterEqual => (BinaryOperator::GreaterEqual, 4),
        Token::Plus => (BinaryOperator::Add, 5),
        Token::Minus => (BinaryOperator::Subtract, 5),
        Token::Star => (BinaryOperator::Multiply, 6),
        Token::Slash => (BinaryOperator::Divide, 6),
        Token::Percent => (BinaryOperator::Modulo, 6),
        _ => return None,
    };
    Some(entry)
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::parse;

    fn expression(source: &str) -> Expression {
        let module = parse(source).unwrap();
        match module.statements.into_iter().next() {
            Some(Statement::Expression(stmt)) => stmt.expression,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let Expression::Binary(add) = expression("1 + 2 * 3") else {
            panic!("expected binary");
        };
        assert_eq!(add.operator, BinaryOperator::Add);
        assert!(matches!(*add.right, Expression::Binary(ref mul) if mul.operator == BinaryOperator::Multiply));
    }

    #[test]
    fn test_left_associativity() {
        let Expression::Binary(sub) = expression("5 - 2 - 1") else {
            panic!("expected binary");
        };
        assert!(matches!(*sub.left, Expression::Binary(_)));
        assert!(matches!(*sub.right, Expression::Constant(_)));
    }

    #[test]
    fn test_command_call() {
        let Expression::MethodCall(call) = expression("println \"hi\", 2") else {
            panic!("expected call");
        };
        assert!(call.receiver.is_none());
        assert_eq!(call.method, "println");
        assert_eq!(call.arguments.len(), 2);
    }

    #[test]
    fn test_command_call_on_receiver() {
        let Expression::MethodCall(call) = expression("logger.info 'x'") else {
            panic!("expected call");
        };
        assert_eq!(call.method, "info");
        assert!(matches!(call.receiver.as_deref(), Some(Expression::Variable(v)) if v.name == "logger"));
    }

    #[test]
    fn test_dotted_property_chain() {
        let expr = expression("java.util.Map.Entry");
        assert_eq!(expr.dotted_name().as_deref(), Some("java.util.Map.Entry"));
    }

    #[test]
    fn test_method_call_chain() {
        let Expression::MethodCall(call) = expression("'abc'.toUpperCase()") else {
            panic!("expected call");
        };
        assert!(call.arguments.is_empty());
        assert!(matches!(call.receiver.as_deref(), Some(Expression::Constant(_))));
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let Expression::Assignment(outer) = expression("a = b = 3") else {
            panic!("expected assignment");
        };
        assert_eq!(outer.target, "a");
        assert!(matches!(*outer.value, Expression::Assignment(_)));
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert!(parse("1 = 2").is_err());
    }

    #[test]
    fn test_multiline_arguments() {
        let Expression::MethodCall(call) = expression("foo(\n  1,\n  2\n)") else {
            panic!("expected call");
        };
        assert_eq!(call.arguments.len(), 2);
    }

    #[test]
    fn test_list_literal() {
        let Expression::List(list) = expression("[1, 'two', [3]]") else {
            panic!("expected list");
        };
        assert_eq!(list.elements.len(), 3);
    }

    #[test]
    fn test_unary() {
        let Expression::Unary(neg) = expression("-x") else {
            panic!("expected unary");
        };
        assert_eq!(neg.operator, UnaryOperator::Negate);
    }
}
