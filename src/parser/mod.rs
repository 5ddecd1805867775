//! Text parser for SSA listings
//!
//! A listing holds one or more functions. Each function starts with a `func` header
//! (or `extern func` for a body-less declaration) followed by numbered blocks:
//!
//! ```text
//! func max(a int, b int) int
//! 0:
//!     t0 bool = a > b
//!     if t0 goto 1 else 2
//! 1:
//!     jump 3
//! 2:
//!     jump 3
//! 3:
//!     t1 int = phi [1: 1:int, 2: 2:int]
//!     return t1
//! ```
//!
//! Constants are written `literal:type`. Comments start with `//`, or with `#` at the start
//! of a line or after whitespace.

use std::fmt;
use std::path::Path;

use crate::ir::{
    BinOpKind, BlockId, Function, InstrKind, Instruction, Param, Program, Type, UnOpKind, Value,
};

/// Parse error with location information
#[derive(Debug, Clone)]
pub struct ParseError {
    pub line_number: usize,
    pub column: Option<usize>,
    pub message: String,
    pub line_content: String,
}

impl ParseError {
    pub fn new(
        line_number: usize,
        message: impl Into<String>,
        line_content: impl Into<String>,
    ) -> Self {
        Self {
            line_number,
            column: None,
            message: message.into(),
            line_content: line_content.into(),
        }
    }

    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = self.column {
            write!(
                f,
                "line {}, column {}: {}\n  | {}\n  | {}^",
                self.line_number,
                col,
                self.message,
                self.line_content,
                " ".repeat(col.saturating_sub(1))
            )
        } else {
            write!(
                f,
                "line {}: {}\n  | {}",
                self.line_number, self.message, self.line_content
            )
        }
    }
}

impl std::error::Error for ParseError {}

/// A parsed `func` / `extern func` header
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionHeader {
    pub name: String,
    pub params: Vec<Param>,
    pub results: Vec<Type>,
    pub external: bool,
}

/// Result of parsing a single line
#[derive(Debug)]
pub enum LineResult {
    Header(FunctionHeader),
    Label(BlockId),
    Instruction(Instruction),
    /// Line was empty or a comment
    Skip,
}

/// Strip comments from a line (`//` anywhere, `#` at line start or after whitespace)
fn strip_comments(line: &str) -> &str {
    let mut end = line.len();

    if let Some(pos) = line.find("//") {
        end = end.min(pos);
    }
    let bytes = line.as_bytes();
    for (pos, &b) in bytes.iter().enumerate() {
        if b == b'#' && (pos == 0 || bytes[pos - 1].is_ascii_whitespace()) {
            end = end.min(pos);
            break;
        }
    }

    &line[..end]
}

/// Split on commas that are not nested inside brackets or parentheses
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = s[start..].trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last);
    }
    parts
}

/// Find the parenthesis matching the one at `open`
fn matching_paren(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (i, c) in s[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn is_value_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$' || c == '.')
}

/// Parse a block reference
pub fn parse_block_id(s: &str) -> Result<BlockId, String> {
    s.trim()
        .parse::<usize>()
        .map(BlockId)
        .map_err(|_| format!("invalid block index: {}", s.trim()))
}

/// Parse an operand: a value name or a `literal:type` constant
pub fn parse_value(s: &str) -> Result<Value, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty operand".to_string());
    }

    if let Some((literal, ty)) = s.split_once(':') {
        let literal = literal.trim();
        if literal.is_empty() {
            return Err(format!("constant without a literal: {}", s));
        }
        return Ok(Value::constant(literal, ty.parse::<Type>()?));
    }

    if is_value_name(s) {
        Ok(Value::var(s))
    } else {
        Err(format!("invalid operand: {}", s))
    }
}

fn parse_values(s: &str) -> Result<Vec<Value>, String> {
    split_top_level(s).into_iter().map(parse_value).collect()
}

/// Parse a `func name(params) results` header (without the `func` keyword)
fn parse_header(rest: &str, external: bool) -> Result<FunctionHeader, String> {
    let open = rest
        .find('(')
        .ok_or_else(|| "function header is missing a parameter list".to_string())?;
    let name = rest[..open].trim();
    if !is_value_name(name) {
        return Err(format!("invalid function name: {}", name));
    }
    let close = matching_paren(rest, open)
        .ok_or_else(|| "unterminated parameter list".to_string())?;

    let mut params = Vec::new();
    for param in split_top_level(&rest[open + 1..close]) {
        let (pname, pty) = param
            .split_once(char::is_whitespace)
            .ok_or_else(|| format!("parameter needs a name and a type: {}", param))?;
        params.push(Param::new(pname.trim(), pty.parse::<Type>()?));
    }

    let results_str = rest[close + 1..].trim();
    let results = if results_str.is_empty() {
        vec![]
    } else if let Some(inner) = results_str
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
    {
        split_top_level(inner)
            .into_iter()
            .map(|t| t.parse::<Type>())
            .collect::<Result<Vec<_>, _>>()?
    } else {
        vec![results_str.parse::<Type>()?]
    };

    Ok(FunctionHeader {
        name: name.to_string(),
        params,
        results,
        external,
    })
}

/// Parse `name(args)` into callee and arguments
fn parse_call(s: &str) -> Result<Option<(String, Vec<Value>)>, String> {
    let s = s.strip_prefix("call ").unwrap_or(s).trim();
    let Some(open) = s.find('(') else {
        return Ok(None);
    };
    let callee = s[..open].trim();
    if !is_value_name(callee) || !s.ends_with(')') {
        return Ok(None);
    }
    let close = matching_paren(s, open).ok_or_else(|| "unterminated call".to_string())?;
    if close != s.len() - 1 {
        return Ok(None);
    }
    Ok(Some((callee.to_string(), parse_values(&s[open + 1..close])?)))
}

/// Parse `[pred: value, ...]` phi edges
fn parse_phi_edges(s: &str) -> Result<Vec<(BlockId, Value)>, String> {
    let inner = s
        .trim()
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .ok_or_else(|| format!("phi edges must be bracketed: {}", s))?;
    let mut edges = Vec::new();
    for edge in split_top_level(inner) {
        let (block, value) = edge
            .split_once(':')
            .ok_or_else(|| format!("phi edge needs 'block: value': {}", edge))?;
        edges.push((parse_block_id(block)?, parse_value(value)?));
    }
    if edges.is_empty() {
        return Err("phi without edges".to_string());
    }
    Ok(edges)
}

/// Parse `&x.name [#N]`, `&x.N` or `&x[i]`
fn parse_address(dest: String, ty: Type, s: &str) -> Result<Instruction, String> {
    if let Some(open) = s.find('[').filter(|&open| !s[open..].starts_with("[#")) {
        let index = s[open + 1..]
            .strip_suffix(']')
            .ok_or_else(|| format!("unterminated index: {}", s))?;
        return Ok(Instruction::IndexAddr {
            dest,
            ty,
            x: parse_value(&s[..open])?,
            index: parse_value(index)?,
        });
    }

    let (path, explicit) = match s.find("[#") {
        Some(pos) => {
            let id = s[pos + 2..]
                .strip_suffix(']')
                .ok_or_else(|| format!("unterminated field index: {}", s))?;
            let id = id
                .trim()
                .parse::<usize>()
                .map_err(|_| format!("invalid field index: {}", id))?;
            (s[..pos].trim(), Some(id))
        }
        None => (s.trim(), None),
    };
    let (base, field) = path
        .rsplit_once('.')
        .ok_or_else(|| format!("expected '&x.field' or '&x[index]': &{}", s))?;

    let (field, name) = match (field.parse::<usize>(), explicit) {
        (Ok(id), None) => (id, None),
        (_, Some(id)) => (id, Some(field.to_string())),
        (Err(_), None) => return Err(format!("field '{}' needs an explicit [#index]", field)),
    };

    Ok(Instruction::FieldAddr {
        dest,
        ty,
        x: parse_value(base)?,
        field,
        name,
    })
}

/// Parse the right-hand side of `dest TYPE = expr`
fn parse_expression(dest: String, ty: Type, expr: &str) -> Result<Instruction, String> {
    let expr = expr.trim();
    let (head, rest) = match expr.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (expr, ""),
    };

    match head {
        "phi" => {
            return Ok(Instruction::Phi {
                dest,
                ty,
                edges: parse_phi_edges(rest)?,
            })
        }
        "new" | "local" => {
            let pointee = rest.parse::<Type>()?;
            let ty = if ty.pointee() == Some(&pointee) {
                ty
            } else {
                return Err(format!("allocation of {} must have type *{}", pointee, pointee));
            };
            return Ok(Instruction::Alloc {
                dest,
                ty,
                heap: head == "new",
            });
        }
        "convert" => {
            return Ok(Instruction::Convert {
                dest,
                ty,
                x: parse_value(rest)?,
            })
        }
        _ => {}
    }

    if let Some(kind) = InstrKind::from_keyword(head) {
        let operands = if rest.is_empty() {
            vec![]
        } else {
            parse_values(rest)?
        };
        return Ok(Instruction::Unmodeled {
            kind,
            dest: Some((dest, ty)),
            operands,
        });
    }

    if let Some(addr) = expr.strip_prefix('&') {
        return parse_address(dest, ty, addr);
    }

    if let Some((callee, args)) = parse_call(expr)? {
        return Ok(Instruction::Call {
            dest: Some(dest),
            ty,
            callee,
            args,
        });
    }

    let tokens: Vec<&str> = expr.split_whitespace().collect();
    match tokens.as_slice() {
        [x, op, y] => Ok(Instruction::BinOp {
            dest,
            ty,
            op: op.parse()?,
            x: parse_value(x)?,
            y: parse_value(y)?,
        }),
        [single] => {
            let (op, operand) = if let Some(x) = single.strip_prefix("<-") {
                (UnOpKind::Recv, x)
            } else if let Some(x) = single.strip_prefix('*') {
                (UnOpKind::Deref, x)
            } else if let Some(x) = single.strip_prefix('!') {
                (UnOpKind::Not, x)
            } else if let Some(x) = single.strip_prefix('^') {
                (UnOpKind::Complement, x)
            } else if let Some(x) = single.strip_prefix('-').filter(|x| !x.contains(':')) {
                (UnOpKind::Neg, x)
            } else {
                return Err(format!("expected an expression, found '{}'", single));
            };
            Ok(Instruction::UnOp {
                dest,
                ty,
                op,
                x: parse_value(operand)?,
            })
        }
        _ => Err(format!("cannot parse expression: {}", expr)),
    }
}

/// Parse an instruction that defines no value
fn parse_statement(line: &str) -> Result<Instruction, String> {
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match head {
        "jump" => Ok(Instruction::Jump {
            target: parse_block_id(rest)?,
        }),
        "if" => {
            let tokens: Vec<&str> = rest.split_whitespace().collect();
            match tokens.as_slice() {
                [cond, "goto", then_block, "else", else_block] => Ok(Instruction::If {
                    cond: parse_value(cond)?,
                    then_block: parse_block_id(then_block)?,
                    else_block: parse_block_id(else_block)?,
                }),
                _ => Err("expected 'if COND goto N else M'".to_string()),
            }
        }
        "return" => Ok(Instruction::Return {
            values: if rest.is_empty() {
                vec![]
            } else {
                parse_values(rest)?
            },
        }),
        "panic" => Ok(Instruction::Panic {
            value: parse_value(rest)?,
        }),
        _ => {
            if let Some(kind) = InstrKind::from_keyword(head) {
                return Ok(Instruction::Unmodeled {
                    kind,
                    dest: None,
                    operands: if rest.is_empty() {
                        vec![]
                    } else {
                        parse_values(rest)?
                    },
                });
            }
            if let Some((callee, args)) = parse_call(line)? {
                return Ok(Instruction::Call {
                    dest: None,
                    ty: Type::Opaque("()".to_string()),
                    callee,
                    args,
                });
            }
            Err(format!("unknown instruction: {}", head))
        }
    }
}

/// Parse a single line of a listing
pub fn parse_line(line: &str) -> Result<LineResult, String> {
    let line = strip_comments(line);
    let trimmed = line.trim();

    if trimmed.is_empty() {
        return Ok(LineResult::Skip);
    }

    if let Some(rest) = trimmed.strip_prefix("extern func ") {
        return Ok(LineResult::Header(parse_header(rest, true)?));
    }
    if let Some(rest) = trimmed.strip_prefix("func ") {
        return Ok(LineResult::Header(parse_header(rest, false)?));
    }

    if let Some(label) = trimmed.strip_suffix(':') {
        if label.chars().all(|c| c.is_ascii_digit()) {
            return Ok(LineResult::Label(parse_block_id(label)?));
        }
    }

    if let Some((lhs, rhs)) = trimmed.split_once(" = ") {
        let lhs = lhs.trim();
        if let Some(addr) = lhs.strip_prefix('*') {
            return Ok(LineResult::Instruction(Instruction::Store {
                addr: parse_value(addr)?,
                value: parse_value(rhs)?,
            }));
        }
        let (dest, ty) = lhs
            .split_once(char::is_whitespace)
            .ok_or_else(|| format!("definition needs a name and a type: {}", lhs))?;
        if !is_value_name(dest) {
            return Err(format!("invalid value name: {}", dest));
        }
        let ty = ty.parse::<Type>()?;
        return Ok(LineResult::Instruction(parse_expression(
            dest.to_string(),
            ty,
            rhs,
        )?));
    }

    Ok(LineResult::Instruction(parse_statement(trimmed)?))
}

/// Function being assembled from consecutive lines
struct PendingFunction {
    header: FunctionHeader,
    blocks: Vec<Vec<Instruction>>,
}

impl PendingFunction {
    fn finish(self) -> Function {
        if self.header.external {
            Function::external(self.header.name, self.header.params, self.header.results)
        } else {
            Function::new(
                self.header.name,
                self.header.params,
                self.header.results,
                self.blocks,
            )
        }
    }
}

/// Parse a listing file into a program
pub fn parse_program_file(path: &Path) -> Result<Program, ParseError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ParseError::new(
            0,
            format!("failed to read file: {}", e),
            path.display().to_string(),
        )
    })?;

    parse_program_string(&content, path.display().to_string())
}

/// Parse a listing string into a program
pub fn parse_program_string(content: &str, source_name: String) -> Result<Program, ParseError> {
    let mut program = Program::default();
    let mut pending: Option<PendingFunction> = None;

    for (line_num, line) in content.lines().enumerate() {
        let line_number = line_num + 1; // 1-indexed

        let parsed = parse_line(line).map_err(|msg| ParseError::new(line_number, msg, line))?;
        match parsed {
            LineResult::Skip => {}
            LineResult::Header(header) => {
                if program.function(&header.name).is_some()
                    || pending.as_ref().is_some_and(|p| p.header.name == header.name)
                {
                    return Err(ParseError::new(
                        line_number,
                        format!("duplicate function: {}", header.name),
                        line,
                    ));
                }
                if let Some(done) = pending.take() {
                    program.functions.push(done.finish());
                }
                pending = Some(PendingFunction {
                    header,
                    blocks: Vec::new(),
                });
            }
            LineResult::Label(id) => {
                let current = match pending.as_mut() {
                    Some(p) if !p.header.external => p,
                    _ => {
                        return Err(ParseError::new(
                            line_number,
                            "block label outside of a function body",
                            line,
                        ))
                    }
                };
                if id.0 != current.blocks.len() {
                    let column = line.find(|c: char| c.is_ascii_digit()).unwrap_or(0) + 1;
                    return Err(ParseError::new(
                        line_number,
                        format!(
                            "block {} out of order, expected {}",
                            id,
                            current.blocks.len()
                        ),
                        line,
                    )
                    .with_column(column));
                }
                current.blocks.push(Vec::new());
            }
            LineResult::Instruction(instr) => {
                let block = pending
                    .as_mut()
                    .filter(|p| !p.header.external)
                    .and_then(|p| p.blocks.last_mut())
                    .ok_or_else(|| {
                        ParseError::new(line_number, "instruction outside of a block", line)
                    })?;
                block.push(instr);
            }
        }
    }

    if let Some(done) = pending.take() {
        program.functions.push(done.finish());
    }

    if program.functions.is_empty() {
        return Err(ParseError::new(0, "no functions found in listing", source_name));
    }

    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instruction(line: &str) -> Instruction {
        match parse_line(line).unwrap() {
            LineResult::Instruction(instr) => instr,
            other => panic!("expected instruction, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("a").unwrap(), Value::var("a"));
        assert_eq!(
            parse_value("-3:int").unwrap(),
            Value::constant("-3", Type::int())
        );
        assert_eq!(
            parse_value("2.5:float64").unwrap(),
            Value::constant("2.5", Type::Float64)
        );
        assert!(parse_value("").is_err());
        assert!(parse_value(":int").is_err());
        assert!(parse_value("1x").is_err());
    }

    #[test]
    fn test_parse_header() {
        match parse_line("func max(a int, b int) int").unwrap() {
            LineResult::Header(h) => {
                assert_eq!(h.name, "max");
                assert_eq!(h.params.len(), 2);
                assert_eq!(h.params[1], Param::new("b", Type::int()));
                assert_eq!(h.results, vec![Type::int()]);
                assert!(!h.external);
            }
            _ => panic!("expected Header"),
        }

        match parse_line("extern func div(a float64, b float64) (float64, bool)").unwrap() {
            LineResult::Header(h) => {
                assert!(h.external);
                assert_eq!(h.results, vec![Type::Float64, Type::Bool]);
            }
            _ => panic!("expected Header"),
        }

        assert!(parse_line("func (a int)").is_err());
        assert!(parse_line("func f(a) int").is_err());
    }

    #[test]
    fn test_parse_line_binop() {
        match instruction("t0 bool = a > b") {
            Instruction::BinOp { dest, ty, op, x, y } => {
                assert_eq!(dest, "t0");
                assert_eq!(ty, Type::Bool);
                assert_eq!(op, BinOpKind::Gtr);
                assert_eq!(x, Value::var("a"));
                assert_eq!(y, Value::var("b"));
            }
            other => panic!("expected BinOp, got {}", other),
        }

        match instruction("t1 int = a &^ 1:int") {
            Instruction::BinOp { op, y, .. } => {
                assert_eq!(op, BinOpKind::AndNot);
                assert_eq!(y, Value::constant("1", Type::int()));
            }
            other => panic!("expected BinOp, got {}", other),
        }
    }

    #[test]
    fn test_parse_line_unop() {
        assert!(matches!(
            instruction("t1 int = *t0"),
            Instruction::UnOp {
                op: UnOpKind::Deref,
                ..
            }
        ));
        assert!(matches!(
            instruction("t1 int = -x"),
            Instruction::UnOp { op: UnOpKind::Neg, .. }
        ));
        assert!(matches!(
            instruction("t1 int = <-ch"),
            Instruction::UnOp {
                op: UnOpKind::Recv,
                ..
            }
        ));
        assert!(parse_line("t1 int = -1:int").is_err());
    }

    #[test]
    fn test_parse_line_memory() {
        match instruction("t0 *int = &p.y [#1]") {
            Instruction::FieldAddr { x, field, name, .. } => {
                assert_eq!(x, Value::var("p"));
                assert_eq!(field, 1);
                assert_eq!(name.as_deref(), Some("y"));
            }
            other => panic!("expected FieldAddr, got {}", other),
        }

        assert!(matches!(
            instruction("t0 *int = &p.0"),
            Instruction::FieldAddr { field: 0, name: None, .. }
        ));

        match instruction("t2 *int = &arr[i]") {
            Instruction::IndexAddr { x, index, .. } => {
                assert_eq!(x, Value::var("arr"));
                assert_eq!(index, Value::var("i"));
            }
            other => panic!("expected IndexAddr, got {}", other),
        }

        assert!(matches!(
            instruction("t3 *Point = new Point"),
            Instruction::Alloc { heap: true, .. }
        ));
        assert!(parse_line("t3 *int = local Point").is_err());

        assert!(matches!(instruction("*t0 = 5:int"), Instruction::Store { .. }));
    }

    #[test]
    fn test_parse_line_control() {
        assert_eq!(
            instruction("jump 3"),
            Instruction::Jump {
                target: BlockId(3)
            }
        );
        assert!(matches!(
            instruction("if t0 goto 1 else 2"),
            Instruction::If { .. }
        ));
        assert!(parse_line("if t0 then 1 else 2").is_err());
        assert_eq!(instruction("return"), Instruction::Return { values: vec![] });

        match instruction("t1 int = phi [1: 1:int, 2: y]") {
            Instruction::Phi { edges, .. } => {
                assert_eq!(edges.len(), 2);
                assert_eq!(edges[0].0, BlockId(1));
                assert_eq!(edges[1].1, Value::var("y"));
            }
            other => panic!("expected Phi, got {}", other),
        }
    }

    #[test]
    fn test_parse_line_calls_and_stubs() {
        match instruction("t0 float64 = sqrt(x)") {
            Instruction::Call { dest, callee, args, .. } => {
                assert_eq!(dest.as_deref(), Some("t0"));
                assert_eq!(callee, "sqrt");
                assert_eq!(args, vec![Value::var("x")]);
            }
            other => panic!("expected Call, got {}", other),
        }
        assert!(matches!(
            instruction("call log(x, 1:int)"),
            Instruction::Call { dest: None, .. }
        ));

        assert!(matches!(
            instruction("t0 []int = makeslice 3:int, 3:int"),
            Instruction::Unmodeled {
                kind: InstrKind::MakeSlice,
                dest: Some(_),
                ..
            }
        ));
        assert!(matches!(
            instruction("rundefers"),
            Instruction::Unmodeled {
                kind: InstrKind::RunDefers,
                dest: None,
                ..
            }
        ));
        assert!(parse_line("frobnicate x").is_err());
    }

    #[test]
    fn test_parse_line_skip() {
        assert!(matches!(parse_line("").unwrap(), LineResult::Skip));
        assert!(matches!(parse_line("   ").unwrap(), LineResult::Skip));
        assert!(matches!(parse_line("// comment").unwrap(), LineResult::Skip));
        assert!(matches!(parse_line("# comment").unwrap(), LineResult::Skip));
        assert!(matches!(parse_line("2:").unwrap(), LineResult::Label(BlockId(2))));
    }

    #[test]
    fn test_parse_line_with_comment() {
        assert!(matches!(
            instruction("t0 int = a + b   # sum"),
            Instruction::BinOp { op: BinOpKind::Add, .. }
        ));
        assert!(matches!(
            instruction("t0 *int = &p.y [#1] // field"),
            Instruction::FieldAddr { field: 1, .. }
        ));
    }

    #[test]
    fn test_parse_program_string() {
        let listing = r#"
            # pick the larger value
            func max(a int, b int) int
            0:
                t0 bool = a > b
                if t0 goto 1 else 2
            1:
                jump 3
            2:
                jump 3
            3:
                t1 int = phi [1: a, 2: b]
                return t1

            extern func sqrt(x float64) float64
            func nothing()
        "#;

        let program = parse_program_string(listing, "test".to_string()).unwrap();
        assert_eq!(program.functions.len(), 3);

        let max = program.function("max").unwrap();
        assert_eq!(max.block_count(), 4);
        assert_eq!(max.block(BlockId(3)).unwrap().preds, vec![BlockId(1), BlockId(2)]);

        assert!(program.function("sqrt").unwrap().is_external());
        assert_eq!(program.function("nothing").unwrap().blocks, Some(vec![]));
    }

    #[test]
    fn test_parse_program_errors() {
        let out_of_order = "func f()\n0:\n    jump 2\n2:\n    return\n";
        let err = parse_program_string(out_of_order, "test".to_string()).unwrap_err();
        assert_eq!(err.line_number, 4);
        assert!(err.message.contains("out of order"));

        let orphan = "t0 int = a + b\n";
        assert!(parse_program_string(orphan, "test".to_string()).is_err());

        let duplicate = "func f()\nfunc f()\n";
        assert!(parse_program_string(duplicate, "test".to_string()).is_err());

        let empty = "// just a comment\n";
        assert!(parse_program_string(empty, "test".to_string()).is_err());
    }

    #[test]
    fn test_display_reparses() {
        let listing = "func f(p *Point, i int) int\n0:\n    t0 *int = &p.x [#0]\n    t1 int = *t0\n    t2 int = t1 + i\n    return t2\n";
        let program = parse_program_string(listing, "test".to_string()).unwrap();
        let printed = program.functions[0].to_string();
        let reparsed = parse_program_string(&printed, "test".to_string()).unwrap();
        assert_eq!(program, reparsed);
    }
}
