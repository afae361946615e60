use std::collections::HashMap;

use miette::Diagnostic;
use thiserror::Error;
use tracing::trace;

use crate::parse::{BinaryOp, Expression, Visitor};

#[derive(Error, Debug, Clone, PartialEq, Diagnostic)]
pub enum EvalError {
    #[error("unbound variable '{0}'")]
    #[diagnostic(
        code(eval::unbound_variable),
        help("bind it with `--var NAME=VALUE`")
    )]
    UnboundVariable(char),

    #[error("division by zero")]
    #[diagnostic(code(eval::division_by_zero))]
    DivisionByZero,
}

/// Values for the single-letter variables of an expression.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    values: HashMap<char, f64>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: char) -> Option<f64> {
        self.values.get(&name).copied()
    }

    pub fn define(&mut self, name: char, value: f64) {
        self.values.insert(name, value);
    }
}

impl FromIterator<(char, f64)> for Environment {
    fn from_iter<T: IntoIterator<Item = (char, f64)>>(iter: T) -> Self {
        Environment {
            values: iter.into_iter().collect(),
        }
    }
}

pub struct Evaluator<'env> {
    environment: &'env Environment,
}

impl<'env> Evaluator<'env> {
    pub fn new(environment: &'env Environment) -> Self {
        Evaluator { environment }
    }
}

impl Visitor for Evaluator<'_> {
    type Output = Result<f64, EvalError>;

    fn visit_literal(&mut self, value: char) -> Self::Output {
        Ok(value.to_digit(10).map_or(0.0, f64::from))
    }

    fn visit_variable(&mut self, name: char) -> Self::Output {
        self.environment
            .get(name)
            .ok_or(EvalError::UnboundVariable(name))
    }

    fn visit_binary(&mut self, left: &Expression, op: BinaryOp, right: &Expression) -> Self::Output {
        let lhs = left.accept(self)?;
        let rhs = right.accept(self)?;
        let value = match op {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            BinaryOp::Div if rhs == 0.0 => return Err(EvalError::DivisionByZero),
            BinaryOp::Div => lhs / rhs,
        };
        trace!("{lhs} {op} {rhs} = {value}");
        Ok(value)
    }

    fn visit_paren(&mut self, inner: &Expression) -> Self::Output {
        inner.accept(self)
    }
}

pub fn evaluate(expression: &Expression, environment: &Environment) -> Result<f64, EvalError> {
    expression.accept(&mut Evaluator::new(environment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    fn eval(text: &str, environment: &Environment) -> Result<f64, EvalError> {
        evaluate(&parse(text).expect("valid expression"), environment)
    }

    #[test]
    fn precedence_and_parens() {
        let environment = Environment::new();
        assert_eq!(eval("1+2*4", &environment), Ok(9.0));
        assert_eq!(eval("(1+2)*4", &environment), Ok(12.0));
        assert_eq!(eval("8-4-2", &environment), Ok(2.0));
        assert_eq!(eval("9/2", &environment), Ok(4.5));
    }

    #[test]
    fn variables() {
        let environment: Environment = [('s', 10.0), ('d', 1.5), ('t', 0.5)].into_iter().collect();
        assert_eq!(eval("s+4+d-t", &environment), Ok(15.0));
        assert_eq!(eval("s*x", &environment), Err(EvalError::UnboundVariable('x')));
    }

    #[test]
    fn division_by_zero() {
        let mut environment = Environment::new();
        environment.define('z', 0.0);
        assert_eq!(eval("1/z", &environment), Err(EvalError::DivisionByZero));
        assert_eq!(eval("1/(3-3)", &environment), Err(EvalError::DivisionByZero));
    }
}
