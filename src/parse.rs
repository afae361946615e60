use std::fmt::Display;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn as_char(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
        }
    }
}

impl TryFrom<char> for BinaryOp {
    type Error = char;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c {
            '+' => Ok(BinaryOp::Add),
            '-' => Ok(BinaryOp::Sub),
            '*' => Ok(BinaryOp::Mul),
            '/' => Ok(BinaryOp::Div),
            c => Err(c),
        }
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// An arithmetic expression over single-character operands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    /// A single digit.
    Literal(char),
    /// A single letter.
    Variable(char),
    Binary {
        left: Box<Expression>,
        op: BinaryOp,
        right: Box<Expression>,
    },
    Paren(Box<Expression>),
}

impl Expression {
    pub fn binary(left: Expression, op: BinaryOp, right: Expression) -> Self {
        Expression::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn paren(inner: Expression) -> Self {
        Expression::Paren(Box::new(inner))
    }

    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) -> V::Output {
        match self {
            Expression::Literal(value) => visitor.visit_literal(*value),
            Expression::Variable(name) => visitor.visit_variable(*name),
            Expression::Binary { left, op, right } => visitor.visit_binary(left, *op, right),
            Expression::Paren(inner) => visitor.visit_paren(inner),
        }
    }
}

/// One method per [`Expression`] variant; walk a tree with [`Expression::accept`].
pub trait Visitor {
    type Output;

    fn visit_literal(&mut self, value: char) -> Self::Output;
    fn visit_variable(&mut self, name: char) -> Self::Output;
    fn visit_binary(&mut self, left: &Expression, op: BinaryOp, right: &Expression)
    -> Self::Output;
    fn visit_paren(&mut self, inner: &Expression) -> Self::Output;
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    #[error("empty expression")]
    Empty,
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("missing operand")]
    MissingOperand,
    #[error("unclosed '('")]
    UnclosedParen,
    #[error("unmatched ')'")]
    UnmatchedParen,
    #[error("operand without an operator")]
    DanglingOperand,
}

#[derive(Error, Debug, Diagnostic)]
#[error("Invalid expression: {reason}")]
#[diagnostic(help(
    "use single digits and letters, the operators `+ - * /` and balanced parentheses"
))]
pub struct InvalidExpression {
    #[source_code]
    src: NamedSource<String>,

    #[label("here")]
    bad_bit: SourceSpan,

    pub reason: Reason,
}

impl InvalidExpression {
    /// Byte offset of the offending position; the input length for errors at the end.
    pub fn offset(&self) -> usize {
        self.bad_bit.offset()
    }
}

/// Operators and parens as they appear on the operator stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Symbol {
    Binary(BinaryOp),
    LeftParen,
    RightParen,
    /// Virtual end of input, lower than everything so it forces the final reductions.
    End,
}

impl Symbol {
    fn priority(self) -> i8 {
        match self {
            Symbol::LeftParen => 10,
            Symbol::Binary(BinaryOp::Mul | BinaryOp::Div) => 2,
            Symbol::Binary(BinaryOp::Add | BinaryOp::Sub) => 1,
            Symbol::RightParen => 0,
            Symbol::End => -1,
        }
    }
}

enum Input {
    Operand(Expression),
    Symbol(Symbol),
}

/// Operator-precedence parser with one stack of expressions and one of
/// pending operators.
pub struct Parser<'de> {
    filename: Option<&'de str>,
    whole: &'de str,
    /// Expressions with the byte offset they start at.
    expressions: Vec<(Expression, usize)>,
    operators: Vec<(Symbol, usize)>,
}

impl<'de> Parser<'de> {
    pub fn new(filename: Option<&'de str>, whole: &'de str) -> Self {
        Parser {
            filename,
            whole,
            expressions: Vec::new(),
            operators: Vec::new(),
        }
    }

    pub fn parse(mut self) -> Result<Expression, InvalidExpression> {
        if self.whole.is_empty() {
            return Err(self.error(Reason::Empty, 0, 0));
        }

        let mut cursor = 0;
        loop {
            if let Some(&(Symbol::End, _)) = self.operators.last() {
                return self.finish();
            }

            let c = self.whole[cursor..].chars().next();
            let width = c.map_or(0, char::len_utf8);

            match self.classify(cursor, c)? {
                Input::Symbol(Symbol::RightParen) if self.top() == Some(Symbol::LeftParen) => {
                    let Some((_, open)) = self.operators.pop() else {
                        unreachable!("top() saw an open paren")
                    };
                    let (inner, _) = self.pop_operand(cursor)?;
                    trace!("close paren at {cursor}");
                    self.expressions.push((Expression::paren(inner), open));
                    cursor += width;
                }
                Input::Symbol(symbol) => {
                    let shift = match self.top() {
                        None | Some(Symbol::LeftParen) => true,
                        Some(top) => top.priority() < symbol.priority(),
                    };
                    if shift {
                        self.check_shift(symbol, cursor)?;
                        trace!("shift {symbol:?} at {cursor}");
                        self.operators.push((symbol, cursor));
                        cursor += width;
                    } else {
                        self.reduce(cursor)?;
                    }
                }
                Input::Operand(operand) => {
                    trace!("operand {operand:?} at {cursor}");
                    self.expressions.push((operand, cursor));
                    cursor += width;
                }
            }
        }
    }

    fn classify(&self, at: usize, c: Option<char>) -> Result<Input, InvalidExpression> {
        let Some(c) = c else {
            return Ok(Input::Symbol(Symbol::End));
        };
        Ok(match c {
            '(' => Input::Symbol(Symbol::LeftParen),
            ')' => Input::Symbol(Symbol::RightParen),
            '0'..='9' => Input::Operand(Expression::Literal(c)),
            'a'..='z' | 'A'..='Z' => Input::Operand(Expression::Variable(c)),
            c => match BinaryOp::try_from(c) {
                Ok(op) => Input::Symbol(Symbol::Binary(op)),
                Err(c) => return Err(self.error(Reason::UnexpectedChar(c), at, c.len_utf8())),
            },
        })
    }

    fn top(&self) -> Option<Symbol> {
        self.operators.last().map(|&(symbol, _)| symbol)
    }

    /// A `)` only shifts when nothing is open, and the end only shifts once
    /// everything before it is reduced; both mean the parens don't balance.
    fn check_shift(&self, symbol: Symbol, at: usize) -> Result<(), InvalidExpression> {
        match (symbol, self.operators.last()) {
            (Symbol::RightParen, _) => Err(self.error(Reason::UnmatchedParen, at, 1)),
            (Symbol::End, Some(&(Symbol::LeftParen, open))) => {
                Err(self.error(Reason::UnclosedParen, open, 1))
            }
            _ => Ok(()),
        }
    }

    fn reduce(&mut self, at: usize) -> Result<(), InvalidExpression> {
        let Some((Symbol::Binary(op), op_at)) = self.operators.pop() else {
            unreachable!("reduce only runs with a binary operator on top")
        };
        let (right, _) = self.pop_operand(at)?;
        let (left, start) = self.pop_operand(op_at)?;
        trace!("reduce {op} at {op_at}");
        self.expressions
            .push((Expression::binary(left, op, right), start));
        Ok(())
    }

    fn pop_operand(&mut self, at: usize) -> Result<(Expression, usize), InvalidExpression> {
        self.expressions
            .pop()
            .ok_or_else(|| self.error(Reason::MissingOperand, at, 1))
    }

    fn finish(mut self) -> Result<Expression, InvalidExpression> {
        let end = self.whole.len();
        match self.expressions.len() {
            0 => Err(self.error(Reason::MissingOperand, end, 0)),
            1 => {
                let (expression, _) = self.pop_operand(end)?;
                Ok(expression)
            }
            _ => {
                let start = self.expressions[1].1;
                Err(self.error(Reason::DanglingOperand, start, 1))
            }
        }
    }

    fn error(&self, reason: Reason, at: usize, len: usize) -> InvalidExpression {
        // keep the label inside the source
        let len = len.min(self.whole.len().saturating_sub(at));
        InvalidExpression {
            src: NamedSource::new(self.filename.unwrap_or("<input>"), self.whole.to_string()),
            bad_bit: SourceSpan::from((at, len)),
            reason,
        }
    }
}

/// Parses a whole expression such as `(1+2)*x`.
pub fn parse(text: &str) -> Result<Expression, InvalidExpression> {
    Parser::new(None, text).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(text: &str) -> Reason {
        parse(text).expect_err("should not parse").reason
    }

    #[test]
    fn priorities() {
        assert!(Symbol::LeftParen.priority() > Symbol::Binary(BinaryOp::Mul).priority());
        assert!(Symbol::Binary(BinaryOp::Div).priority() > Symbol::Binary(BinaryOp::Sub).priority());
        assert!(Symbol::Binary(BinaryOp::Add).priority() > Symbol::RightParen.priority());
        assert!(Symbol::RightParen.priority() > Symbol::End.priority());
    }

    #[test]
    fn single_operands() {
        assert_eq!(parse("7").unwrap(), Expression::Literal('7'));
        assert_eq!(parse("Q").unwrap(), Expression::Variable('Q'));
    }

    #[test]
    fn equal_priorities_reduce_left() {
        let expected = Expression::binary(
            Expression::binary(Expression::Literal('8'), BinaryOp::Div, Expression::Literal('4')),
            BinaryOp::Mul,
            Expression::Literal('2'),
        );
        assert_eq!(parse("8/4*2").unwrap(), expected);
    }

    #[test]
    fn nested_parens() {
        let expected = Expression::paren(Expression::paren(Expression::Variable('x')));
        assert_eq!(parse("((x))").unwrap(), expected);
    }

    #[test]
    fn malformed_input() {
        assert_eq!(reason(""), Reason::Empty);
        assert_eq!(reason("1 + 2"), Reason::UnexpectedChar(' '));
        assert_eq!(reason("1+"), Reason::MissingOperand);
        assert_eq!(reason("+1"), Reason::MissingOperand);
        assert_eq!(reason("1++2"), Reason::MissingOperand);
        assert_eq!(reason("()"), Reason::MissingOperand);
        assert_eq!(reason("(1+2"), Reason::UnclosedParen);
        assert_eq!(reason("1)"), Reason::UnmatchedParen);
        assert_eq!(reason("(1))"), Reason::UnmatchedParen);
        assert_eq!(reason("12"), Reason::DanglingOperand);
        assert_eq!(reason("1(2)"), Reason::DanglingOperand);
    }

    #[test]
    fn error_offsets() {
        assert_eq!(parse("1+2 ").unwrap_err().offset(), 3);
        assert_eq!(parse("2*(1+2").unwrap_err().offset(), 2);
        assert_eq!(parse("1+2)").unwrap_err().offset(), 3);
        assert_eq!(parse("ab").unwrap_err().offset(), 1);
        assert_eq!(parse("1-").unwrap_err().offset(), 1);
    }
}
