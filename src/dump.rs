use std::fmt::Display;

use crate::parse::{BinaryOp, Expression, Visitor};

/// Renders a tree as `Binary(Literal(1)+Paren(Variable(x)))`.
#[derive(Debug, Default)]
pub struct DumpVisitor {
    out: String,
}

impl DumpVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> String {
        self.out
    }
}

impl Visitor for DumpVisitor {
    type Output = ();

    fn visit_literal(&mut self, value: char) {
        self.out.push_str("Literal(");
        self.out.push(value);
        self.out.push(')');
    }

    fn visit_variable(&mut self, name: char) {
        self.out.push_str("Variable(");
        self.out.push(name);
        self.out.push(')');
    }

    fn visit_binary(&mut self, left: &Expression, op: BinaryOp, right: &Expression) {
        self.out.push_str("Binary(");
        left.accept(self);
        self.out.push(op.as_char());
        right.accept(self);
        self.out.push(')');
    }

    fn visit_paren(&mut self, inner: &Expression) {
        self.out.push_str("Paren(");
        inner.accept(self);
        self.out.push(')');
    }
}

pub fn dump(expression: &Expression) -> String {
    let mut visitor = DumpVisitor::new();
    expression.accept(&mut visitor);
    visitor.finish()
}

impl Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&dump(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_every_variant() {
        let expression = Expression::binary(
            Expression::Variable('x'),
            BinaryOp::Div,
            Expression::paren(Expression::Literal('0')),
        );
        assert_eq!(dump(&expression), "Binary(Variable(x)/Paren(Literal(0)))");
        assert_eq!(expression.to_string(), dump(&expression));
    }

    #[test]
    fn visitor_is_reusable_until_finished() {
        let mut visitor = DumpVisitor::new();
        Expression::Literal('1').accept(&mut visitor);
        Expression::Variable('y').accept(&mut visitor);
        assert_eq!(visitor.finish(), "Literal(1)Variable(y)");
    }
}
