//! Front-end pieces for a Pascal-like language: a lexical scanner that
//! covers its input with positioned lexemes, and an operator-precedence
//! parser for single-character arithmetic expressions.

pub mod dump;
pub mod eval;
pub mod lex;
pub mod parse;

pub use dump::{DumpVisitor, dump};
pub use eval::{Environment, EvalError, evaluate};
pub use lex::{Lexeme, LexemeKind, Lexer, tokenize};
pub use parse::{BinaryOp, Expression, InvalidExpression, Parser, Reason, Visitor, parse};
