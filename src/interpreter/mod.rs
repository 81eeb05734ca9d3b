pub mod store;
pub mod value;

use std::io::Write;

use crate::ast::*;
use crate::error::RuntimeError;
use crate::interpreter::store::VariableStore;
use crate::interpreter::value::Value;
use crate::scanner::token::Span;

/// How one evaluation pass ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunSignal {
    /// Keep going. Carries the value to display, if the pass produced one.
    Continue(Option<Value>),
    /// The program ran `exit`. Carries the exit payload.
    Terminate(Value),
}

impl RunSignal {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Continue(_) => 0,
            Self::Terminate(value) => value.exit_code(),
        }
    }
}

pub struct Interpreter {
    /// Writer for print output (allows testing without stdout)
    writer: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    pub fn with_writer(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }

    /// Run `program` against `store`.
    ///
    /// The display value is the value of the last top-level statement when
    /// that statement is a bare expression that did not produce `nil`.
    pub fn evaluate(
        &mut self,
        program: &Program,
        store: &mut VariableStore,
    ) -> Result<RunSignal, RuntimeError> {
        tracing::debug!(statements = program.statements.len(), "evaluating program");
        let mut last = Value::Nil;
        for stmt in &program.statements {
            match self.execute_stmt(stmt, store) {
                Ok(value) => last = value,
                Err(RuntimeError::Exit { value }) => {
                    tracing::debug!(%value, "program requested exit");
                    return Ok(RunSignal::Terminate(value));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(RunSignal::Continue((!last.is_nil()).then_some(last)))
    }

    fn execute_block(
        &mut self,
        statements: &[Stmt],
        store: &mut VariableStore,
    ) -> Result<(), RuntimeError> {
        statements
            .iter()
            .try_for_each(|s| self.execute_stmt(s, store).map(|_| ()))
    }

    fn execute_stmt(&mut self, stmt: &Stmt, store: &mut VariableStore) -> Result<Value, RuntimeError> {
        match stmt {
            Stmt::Expression(e) => evaluate_expr(&e.expression, store),
            Stmt::Assign(a) => {
                let values = a
                    .values
                    .iter()
                    .map(|v| evaluate_expr(v, store))
                    .collect::<Result<Vec<_>, _>>()?;
                for target in &a.targets {
                    for (name, value) in target.iter().zip(&values) {
                        store.write(name, value.clone());
                    }
                }
                Ok(Value::Nil)
            }
            Stmt::CompoundAssign(c) => {
                let right = evaluate_expr(&c.value, store)?;
                let updated = apply_binary(c.operator, &store.read(&c.name), &right, c.span)?;
                store.write(&c.name, updated);
                Ok(Value::Nil)
            }
            Stmt::Print(p) => {
                let value = evaluate_expr(&p.expression, store)?;
                writeln!(self.writer, "{value}").map_err(|e| {
                    RuntimeError::with_span(format!("failed to write output: {e}"), p.span)
                })?;
                Ok(Value::Nil)
            }
            Stmt::Exit(e) => {
                let value = match &e.value {
                    Some(expr) => evaluate_expr(expr, store)?,
                    None => Value::Nil,
                };
                Err(RuntimeError::Exit { value })
            }
            Stmt::If(i) => {
                if evaluate_expr(&i.condition, store)?.is_truthy() {
                    self.execute_block(&i.then_branch, store)?;
                } else if let Some(ref else_branch) = i.else_branch {
                    self.execute_block(else_branch, store)?;
                }
                Ok(Value::Nil)
            }
            Stmt::While(w) => {
                while evaluate_expr(&w.condition, store)?.is_truthy() {
                    self.execute_block(&w.body, store)?;
                }
                Ok(Value::Nil)
            }
        }
    }
}

fn evaluate_expr(expr: &Expr, store: &VariableStore) -> Result<Value, RuntimeError> {
    match expr {
        Expr::Literal(l) => Ok(match &l.value {
            LiteralValue::Integer(n) => Value::Int(*n),
            LiteralValue::Float(n) => Value::Float(*n),
            LiteralValue::String(s) => Value::Str(s.clone()),
            LiteralValue::Bool(b) => Value::Bool(*b),
            LiteralValue::Nil => Value::Nil,
        }),
        Expr::Grouping(g) => evaluate_expr(&g.expression, store),
        Expr::Variable(v) => Ok(store.read(&v.name)),
        Expr::Unary(u) => {
            let operand = evaluate_expr(&u.operand, store)?;
            match (u.operator, operand) {
                (UnaryOp::Not, operand) => Ok(Value::Bool(!operand.is_truthy())),
                (UnaryOp::Negate, Value::Int(n)) => n
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| RuntimeError::with_span("integer overflow", u.span)),
                (UnaryOp::Negate, Value::Float(n)) => Ok(Value::Float(-n)),
                (UnaryOp::Negate, other) => Err(RuntimeError::with_span(
                    format!("operand of '-' must be a number, found {}", other.type_name()),
                    u.span,
                )),
            }
        }
        Expr::Binary(b) => {
            let left = evaluate_expr(&b.left, store)?;
            let right = evaluate_expr(&b.right, store)?;
            apply_binary(b.operator, &left, &right, b.span)
        }
        Expr::Logical(l) => {
            let left = evaluate_expr(&l.left, store)?;
            let short_circuit = match l.operator {
                LogicalOp::Or => left.is_truthy(),
                LogicalOp::And => !left.is_truthy(),
            };
            if short_circuit {
                Ok(left)
            } else {
                evaluate_expr(&l.right, store)
            }
        }
    }
}

fn apply_binary(op: BinaryOp, left: &Value, right: &Value, span: Span) -> Result<Value, RuntimeError> {
    match op {
        BinaryOp::Add => match (left, right) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
            _ => arithmetic(op, left, right, span, i64::checked_add, |a, b| a + b),
        },
        BinaryOp::Subtract => arithmetic(op, left, right, span, i64::checked_sub, |a, b| a - b),
        BinaryOp::Multiply => arithmetic(op, left, right, span, i64::checked_mul, |a, b| a * b),
        BinaryOp::Divide => {
            let (a, b) = numeric_operands(op, left, right, span)?;
            if b == 0.0 {
                return Err(RuntimeError::with_span("division by zero", span));
            }
            Ok(Value::Float(a / b))
        }
        BinaryOp::Remainder => match (left, right) {
            (Value::Int(_), Value::Int(0)) => Err(RuntimeError::with_span("division by zero", span)),
            (Value::Int(a), Value::Int(b)) => a
                .checked_rem_euclid(*b)
                .map(Value::Int)
                .ok_or_else(|| RuntimeError::with_span("integer overflow", span)),
            _ => {
                let (a, b) = numeric_operands(op, left, right, span)?;
                if b == 0.0 {
                    return Err(RuntimeError::with_span("division by zero", span));
                }
                Ok(Value::Float(a.rem_euclid(b)))
            }
        },
        BinaryOp::Equal => Ok(Value::Bool(left.is_equal(right))),
        BinaryOp::NotEqual => Ok(Value::Bool(!left.is_equal(right))),
        BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
            let ordering = match (left, right) {
                (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                _ => match (left.as_f64(), right.as_f64()) {
                    (Some(a), Some(b)) => a.partial_cmp(&b),
                    _ => {
                        return Err(RuntimeError::with_span(
                            format!(
                                "cannot compare {} with {}",
                                left.type_name(),
                                right.type_name()
                            ),
                            span,
                        ));
                    }
                },
            };
            let result = ordering.is_some_and(|o| match op {
                BinaryOp::Less => o.is_lt(),
                BinaryOp::LessEqual => o.is_le(),
                BinaryOp::Greater => o.is_gt(),
                _ => o.is_ge(),
            });
            Ok(Value::Bool(result))
        }
    }
}

/// Integer arithmetic when both sides are ints, float arithmetic otherwise.
fn arithmetic(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    span: Span,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        return int_op(*a, *b)
            .map(Value::Int)
            .ok_or_else(|| RuntimeError::with_span("integer overflow", span));
    }
    let (a, b) = numeric_operands(op, left, right, span)?;
    Ok(Value::Float(float_op(a, b)))
}

fn numeric_operands(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    span: Span,
) -> Result<(f64, f64), RuntimeError> {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(RuntimeError::with_span(
            format!(
                "unsupported operand types for {op}: {} and {}",
                left.type_name(),
                right.type_name()
            ),
            span,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputBuffer;
    use crate::parser::Parser;
    use crate::scanner;
    use rstest::rstest;

    fn program(source: &str) -> Program {
        let tokens = scanner::scan(source).expect("scan should succeed");
        Parser::new(tokens).parse().expect("parse should succeed")
    }

    fn run_in(source: &str, store: &mut VariableStore) -> Result<RunSignal, RuntimeError> {
        let mut interp = Interpreter::with_writer(Box::new(Vec::<u8>::new()));
        interp.evaluate(&program(source), store)
    }

    fn run(source: &str) -> Vec<String> {
        let buffer = OutputBuffer::default();
        let mut store = VariableStore::with_sink(None, Box::new(std::io::sink()));
        let mut interp = Interpreter::with_writer(Box::new(buffer.clone()));
        interp
            .evaluate(&program(source), &mut store)
            .expect("evaluate should succeed");
        buffer.lines()
    }

    fn run_err(source: &str) -> RuntimeError {
        let mut store = VariableStore::with_sink(None, Box::new(std::io::sink()));
        run_in(source, &mut store).unwrap_err()
    }

    fn display(source: &str) -> Option<Value> {
        let mut store = VariableStore::with_sink(None, Box::new(std::io::sink()));
        match run_in(source, &mut store).expect("evaluate should succeed") {
            RunSignal::Continue(value) => value,
            other => panic!("expected Continue, got {other:?}"),
        }
    }

    #[rstest]
    #[case("print 1 + 2", "3")]
    #[case("print 10 - 3", "7")]
    #[case("print 2 * 3", "6")]
    #[case("print 10 / 4", "2.5")]
    #[case("print 10 / 2", "5.0")]
    #[case("print 7 % 3", "1")]
    #[case("print -7 % 3", "2")]
    #[case("print 1 + 0.5", "1.5")]
    #[case("print -5", "-5")]
    #[case("print \"ab\" + \"cd\"", "abcd")]
    fn arithmetic(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(run(source), vec![expected]);
    }

    #[rstest]
    #[case("print 1 < 2", "true")]
    #[case("print 2 <= 1.5", "false")]
    #[case("print \"a\" < \"b\"", "true")]
    #[case("print 1 == 1.0", "true")]
    #[case("print nil == nil", "true")]
    #[case("print 1 != \"1\"", "true")]
    #[case("print !nil", "true")]
    #[case("print nil or \"yes\"", "yes")]
    #[case("print false and missing", "false")]
    fn comparisons_and_logic(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(run(source), vec![expected]);
    }

    #[test]
    fn chained_assignment_writes_every_target() {
        assert_eq!(run("a = b = 3\nprint a + b"), vec!["6"]);
    }

    #[test]
    fn tuple_assignment_swaps() {
        assert_eq!(run("a, b = 1, 2\na, b = b, a\nprint a\nprint b"), vec!["2", "1"]);
    }

    #[test]
    fn compound_assignment() {
        let output = run("x = 10\nx += 5\nx -= 3\nx *= 2\nx %= 5\nprint x\nx /= 2\nprint x");
        assert_eq!(output, vec!["4", "2.0"]);
    }

    #[test]
    fn unknown_variable_reads_as_nil() {
        assert_eq!(run("print missing"), vec!["nil"]);
    }

    #[test]
    fn if_else_and_while() {
        let output = run("i = 0\nwhile i < 3 {\n  if i == 1 { print \"one\" } else { print i }\n  i += 1\n}");
        assert_eq!(output, vec!["0", "one", "2"]);
    }

    #[test]
    fn display_value_is_last_bare_expression() {
        assert_eq!(display("x = 2; x * 21"), Some(Value::Int(42)));
        assert_eq!(display("x = 2"), None);
        assert_eq!(display("x = 2; x; y = 3"), None);
        assert_eq!(display("nil"), None);
        assert_eq!(display("print 1"), None);
    }

    #[rstest]
    #[case("exit 3", Value::Int(3), 3)]
    #[case("exit(7)", Value::Int(7), 7)]
    #[case("exit", Value::Nil, 0)]
    #[case("exit \"done\"", Value::from("done"), 0)]
    #[case("exit 2.0", Value::Float(2.0), 0)]
    fn exit_terminates(#[case] source: &str, #[case] payload: Value, #[case] code: i32) {
        let mut store = VariableStore::with_sink(None, Box::new(std::io::sink()));
        let signal = run_in(source, &mut store).expect("evaluate should succeed");
        assert_eq!(signal.exit_code(), code);
        assert_eq!(signal, RunSignal::Terminate(payload));
    }

    #[test]
    fn exit_unwinds_loops_and_stops_execution() {
        let mut store = VariableStore::with_sink(None, Box::new(std::io::sink()));
        let signal = run_in("i = 0\nwhile true {\n  i += 1\n  if i == 4 { exit i }\n}\ni = 100", &mut store)
            .expect("evaluate should succeed");
        assert_eq!(signal, RunSignal::Terminate(Value::Int(4)));
        assert_eq!(store.read("i"), Value::Int(4));
    }

    #[test]
    fn assignments_go_through_the_watched_store() {
        let buffer = OutputBuffer::default();
        let mut store = VariableStore::with_sink(Some("b".to_string()), Box::new(buffer.clone()));
        run_in("a = b = 1\na, b = b + 1, a\nb += 10", &mut store).expect("evaluate should succeed");
        let notes = buffer.contents();
        assert_eq!(notes.matches("[WATCH] Identifier 'b' modified.").count(), 3);
        let values: Vec<&str> = notes
            .lines()
            .filter_map(|l| l.trim().strip_prefix("New Value: "))
            .collect();
        assert_eq!(values, vec!["1", "1", "11"]);
    }

    #[rstest]
    #[case("x = 1 / 0", "division by zero")]
    #[case("x = 5 % 0", "division by zero")]
    #[case("x = 1 + \"a\"", "unsupported operand types for +: int and string")]
    #[case("x += 1", "unsupported operand types for +: nil and int")]
    #[case("x = -\"a\"", "operand of '-' must be a number")]
    #[case("x = 1 < \"a\"", "cannot compare int with string")]
    #[case("x = 9223372036854775807 + 1", "integer overflow")]
    fn runtime_errors(#[case] source: &str, #[case] message: &str) {
        let err = run_err(source);
        assert!(err.to_string().contains(message), "got: {err}");
    }

    #[test]
    fn error_keeps_earlier_writes() {
        let mut store = VariableStore::with_sink(None, Box::new(std::io::sink()));
        let result = run_in("x = 1\ny = x / 0\nz = 3", &mut store);
        assert!(result.is_err());
        assert_eq!(store.read("x"), Value::Int(1));
        assert!(!store.contains("z"));
    }
}
