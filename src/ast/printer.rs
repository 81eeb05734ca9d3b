use crate::ast::*;

pub fn to_sexp(program: &Program) -> String {
    let mut buf = String::new();
    for stmt in &program.statements {
        sexp_stmt(&mut buf, stmt);
        buf.push('\n');
    }
    buf
}

pub fn to_json(program: &Program) -> String {
    serde_json::to_string_pretty(program).expect("AST should be serializable")
}

fn sexp_stmt(buf: &mut String, stmt: &Stmt) {
    match stmt {
        Stmt::Expression(e) => sexp_expr(buf, &e.expression),
        Stmt::Assign(a) => {
            buf.push_str("(=");
            for target in &a.targets {
                buf.push(' ');
                if let [name] = target.as_slice() {
                    buf.push_str(name);
                } else {
                    buf.push('(');
                    buf.push_str(&target.join(" "));
                    buf.push(')');
                }
            }
            buf.push(' ');
            if let [value] = a.values.as_slice() {
                sexp_expr(buf, value);
            } else {
                buf.push_str("(tuple");
                for value in &a.values {
                    buf.push(' ');
                    sexp_expr(buf, value);
                }
                buf.push(')');
            }
            buf.push(')');
        }
        Stmt::CompoundAssign(c) => {
            buf.push('(');
            buf.push_str(&c.operator.to_string());
            buf.push_str("= ");
            buf.push_str(&c.name);
            buf.push(' ');
            sexp_expr(buf, &c.value);
            buf.push(')');
        }
        Stmt::Print(p) => {
            buf.push_str("(print ");
            sexp_expr(buf, &p.expression);
            buf.push(')');
        }
        Stmt::Exit(e) => {
            buf.push_str("(exit");
            if let Some(ref value) = e.value {
                buf.push(' ');
                sexp_expr(buf, value);
            }
            buf.push(')');
        }
        Stmt::If(i) => {
            buf.push_str("(if ");
            sexp_expr(buf, &i.condition);
            buf.push(' ');
            sexp_block(buf, &i.then_branch);
            if let Some(ref else_branch) = i.else_branch {
                buf.push(' ');
                sexp_block(buf, else_branch);
            }
            buf.push(')');
        }
        Stmt::While(w) => {
            buf.push_str("(while ");
            sexp_expr(buf, &w.condition);
            buf.push(' ');
            sexp_block(buf, &w.body);
            buf.push(')');
        }
    }
}

fn sexp_block(buf: &mut String, statements: &[Stmt]) {
    buf.push_str("(block");
    for stmt in statements {
        buf.push(' ');
        sexp_stmt(buf, stmt);
    }
    buf.push(')');
}

fn sexp_expr(buf: &mut String, expr: &Expr) {
    match expr {
        Expr::Binary(b) => {
            buf.push('(');
            buf.push_str(&b.operator.to_string());
            buf.push(' ');
            sexp_expr(buf, &b.left);
            buf.push(' ');
            sexp_expr(buf, &b.right);
            buf.push(')');
        }
        Expr::Unary(u) => {
            buf.push('(');
            buf.push_str(&u.operator.to_string());
            buf.push(' ');
            sexp_expr(buf, &u.operand);
            buf.push(')');
        }
        Expr::Literal(l) => match &l.value {
            LiteralValue::Integer(n) => buf.push_str(&n.to_string()),
            LiteralValue::Float(n) => buf.push_str(&format!("{n:?}")),
            LiteralValue::String(s) => {
                buf.push('"');
                buf.push_str(s);
                buf.push('"');
            }
            LiteralValue::Bool(b) => buf.push_str(if *b { "true" } else { "false" }),
            LiteralValue::Nil => buf.push_str("nil"),
        },
        Expr::Grouping(g) => {
            buf.push_str("(group ");
            sexp_expr(buf, &g.expression);
            buf.push(')');
        }
        Expr::Variable(v) => buf.push_str(&v.name),
        Expr::Logical(l) => {
            buf.push('(');
            buf.push_str(&l.operator.to_string());
            buf.push(' ');
            sexp_expr(buf, &l.left);
            buf.push(' ');
            sexp_expr(buf, &l.right);
            buf.push(')');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(value: i64, offset: usize) -> Expr {
        Expr::Literal(LiteralExpr {
            value: LiteralValue::Integer(value),
            span: Span::new(offset, 1),
        })
    }

    #[test]
    fn sexp_binary_expression() {
        let program = Program {
            statements: vec![Stmt::Expression(ExprStmt {
                expression: Expr::Binary(BinaryExpr {
                    left: Box::new(int(1, 0)),
                    operator: BinaryOp::Add,
                    right: Box::new(Expr::Binary(BinaryExpr {
                        left: Box::new(int(2, 4)),
                        operator: BinaryOp::Multiply,
                        right: Box::new(int(3, 8)),
                        span: Span::new(4, 5),
                    })),
                    span: Span::new(0, 9),
                }),
                span: Span::new(0, 9),
            })],
        };
        assert_eq!(to_sexp(&program).trim(), "(+ 1 (* 2 3))");
    }

    #[test]
    fn sexp_tuple_assignment() {
        let program = Program {
            statements: vec![Stmt::Assign(AssignStmt {
                targets: vec![vec!["a".to_string(), "b".to_string()]],
                values: vec![int(1, 7), int(2, 10)],
                span: Span::new(0, 11),
            })],
        };
        assert_eq!(to_sexp(&program).trim(), "(= (a b) (tuple 1 2))");
    }

    #[test]
    fn json_output_is_valid() {
        let program = Program {
            statements: vec![Stmt::Assign(AssignStmt {
                targets: vec![vec!["x".to_string()]],
                values: vec![int(4, 4)],
                span: Span::new(0, 5),
            })],
        };
        let json = to_json(&program);
        let parsed: serde_json::Value =
            serde_json::from_str(&json).expect("JSON output should be valid");
        assert_eq!(parsed["statements"][0]["type"], "Assign");
        assert_eq!(parsed["statements"][0]["targets"][0][0], "x");
    }
}
