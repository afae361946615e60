use pascal_front::{DumpVisitor, Environment, Expression, Reason, Visitor, dump, evaluate, parse};

fn tree(text: &str) -> String {
    dump(&parse(text).unwrap())
}

#[test]
fn parse_single_operations() {
    assert_eq!(tree("1+2"), "Binary(Literal(1)+Literal(2))");
    assert_eq!(tree("5-2"), "Binary(Literal(5)-Literal(2))");
    assert_eq!(tree("5*0"), "Binary(Literal(5)*Literal(0))");
    assert_eq!(tree("s/0"), "Binary(Variable(s)/Literal(0))");
}

#[test]
fn parse_left_associative_chain() {
    assert_eq!(
        tree("s+4+d-t"),
        "Binary(Binary(Binary(Variable(s)+Literal(4))+Variable(d))-Variable(t))"
    );
}

#[test]
fn parse_precedence() {
    assert_eq!(
        tree("s+4*d-t"),
        "Binary(Binary(Variable(s)+Binary(Literal(4)*Variable(d)))-Variable(t))"
    );
    assert_eq!(
        tree("1+2*4"),
        "Binary(Literal(1)+Binary(Literal(2)*Literal(4)))"
    );
}

#[test]
fn parse_parens() {
    assert_eq!(
        tree("(1+2)*4"),
        "Binary(Paren(Binary(Literal(1)+Literal(2)))*Literal(4))"
    );
    assert_eq!(
        tree("1+(2*4)"),
        "Binary(Literal(1)+Paren(Binary(Literal(2)*Literal(4))))"
    );
    assert_eq!(tree("(3)"), "Paren(Literal(3))");
}

#[test]
fn parse_nested_parens() {
    assert_eq!(
        tree("d+(f+5)*8-(4+(f-3)/3)"),
        "Binary(Binary(Variable(d)+Binary(Paren(Binary(Variable(f)+Literal(5)))*Literal(8)))-Paren(Binary(Literal(4)+Binary(Paren(Binary(Variable(f)-Literal(3)))/Literal(3)))))"
    );
}

#[test]
fn parse_display_matches_dump() {
    let expression = parse("a*(b-1)").unwrap();
    assert_eq!(expression.to_string(), "Binary(Variable(a)*Paren(Binary(Variable(b)-Literal(1))))");
}

#[test]
fn parse_rejects_malformed_input() {
    for (text, reason) in [
        ("", Reason::Empty),
        ("(1+2", Reason::UnclosedParen),
        ("1+2)", Reason::UnmatchedParen),
        ("*3", Reason::MissingOperand),
        ("3*", Reason::MissingOperand),
        ("x y", Reason::UnexpectedChar(' ')),
        ("1^2", Reason::UnexpectedChar('^')),
        ("xy", Reason::DanglingOperand),
    ] {
        let error = parse(text).expect_err(text);
        assert_eq!(error.reason, reason, "{text:?}");
    }
}

/// Counts nodes, to show the tree can be walked from outside the crate.
struct Count;

impl Visitor for Count {
    type Output = usize;

    fn visit_literal(&mut self, _: char) -> usize {
        1
    }

    fn visit_variable(&mut self, _: char) -> usize {
        1
    }

    fn visit_binary(
        &mut self,
        left: &Expression,
        _: pascal_front::BinaryOp,
        right: &Expression,
    ) -> usize {
        1 + left.accept(self) + right.accept(self)
    }

    fn visit_paren(&mut self, inner: &Expression) -> usize {
        1 + inner.accept(self)
    }
}

#[test]
fn custom_visitor() {
    let expression = parse("(1+2)*4").unwrap();
    assert_eq!(expression.accept(&mut Count), 6);

    let mut dumper = DumpVisitor::new();
    expression.accept(&mut dumper);
    assert_eq!(dumper.finish(), dump(&expression));
}

#[test]
fn evaluate_parsed_expression() {
    let environment: Environment = [('d', 2.0), ('f', 1.0)].into_iter().collect();
    let expression = parse("d+(f+5)*8-(4+(f-3)/2)").unwrap();
    assert_eq!(evaluate(&expression, &environment), Ok(47.0));
}
