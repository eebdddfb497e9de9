//! Textual IR parsing.
//!
//! Parses the format produced by the `Display` impls on [`Module`] and
//! friends, so printed modules round-trip. Lines starting with `;` are
//! comments.

use std::collections::HashSet;

use thiserror::Error;

use crate::block::{Block, BlockId};
use crate::instr::{BinOp, Instr, Local, Operand};
use crate::module::{Function, Linkage, Module, Signature, Ty};
use crate::terminator::Terminator;
use crate::word::Word;

/// Textual IR parse errors.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("line {line}: {msg}")]
    Syntax { line: usize, msg: String },
}

fn err<T>(line: usize, msg: impl Into<String>) -> Result<T, ParseError> {
    Err(ParseError::Syntax {
        line,
        msg: msg.into(),
    })
}

/// One parsed body line: either a straight-line instruction or a terminator.
enum ParsedLine<W: Word> {
    Instr(Instr<W>),
    Term(Terminator<W>),
}

/// Parse a textual module.
pub fn parse_module<W: Word>(src: &str) -> Result<Module<W>, ParseError> {
    let lines: Vec<(usize, &str)> = src
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with(';'))
        .collect();

    let Some(&(first_ln, first)) = lines.first() else {
        return err(1, "empty input");
    };
    let Some(name) = first.strip_prefix("module ") else {
        return err(first_ln, "expected `module NAME` header");
    };
    let mut module = Module::new(name.trim());

    let mut pos = 1;
    while pos < lines.len() {
        let (ln, line) = lines[pos];
        if let Some(rest) = line.strip_prefix("declare ") {
            let (fname, sig) = parse_sig_header(rest.trim(), ln)?;
            push_function(&mut module, Function::declaration(&fname, sig), ln)?;
            pos += 1;
        } else if let Some(rest) = line.strip_prefix("func ") {
            pos = parse_function(&mut module, &lines, pos, rest.trim(), ln)?;
        } else {
            return err(ln, format!("expected `func` or `declare`, got `{line}`"));
        }
    }
    Ok(module)
}

fn push_function<W: Word>(
    module: &mut Module<W>,
    func: Function<W>,
    line: usize,
) -> Result<(), ParseError> {
    if module.contains(&func.name) {
        return err(line, format!("duplicate symbol `@{}`", func.name));
    }
    module.push(func);
    Ok(())
}

/// Parse a `func` definition starting at `lines[pos]`; returns the
/// position just past the closing `}`.
fn parse_function<W: Word>(
    module: &mut Module<W>,
    lines: &[(usize, &str)],
    mut pos: usize,
    header: &str,
    header_ln: usize,
) -> Result<usize, ParseError> {
    let Some(header) = header.strip_suffix('{') else {
        return err(header_ln, "expected `{` at end of func header");
    };
    let mut header = header.trim();

    let mut no_inline = false;
    let mut linkage = Linkage::External;
    loop {
        if let Some(rest) = header.strip_prefix("noinline ") {
            no_inline = true;
            header = rest.trim_start();
        } else if let Some(rest) = header.strip_prefix("internal ") {
            linkage = Linkage::Internal;
            header = rest.trim_start();
        } else {
            break;
        }
    }

    let (fname, sig) = parse_sig_header(header, header_ln)?;
    let mut func: Function<W> = Function::new(&fname, sig);
    func.no_inline = no_inline;
    func.linkage = linkage;

    let mut max_local: u32 = func.local_count();
    let mut current: Option<Block<W>> = None;
    let mut sealed = false;
    let mut closed = false;

    pos += 1;
    while pos < lines.len() {
        let (ln, line) = lines[pos];
        pos += 1;
        if line == "}" {
            finish_block(&mut func, current.take(), sealed, ln)?;
            closed = true;
            break;
        }
        if let Some(label) = line.strip_suffix(':') {
            finish_block(&mut func, current.take(), sealed, ln)?;
            current = Some(Block::new(parse_block_id(label, ln)?));
            sealed = false;
            continue;
        }
        let Some(block) = current.as_mut() else {
            return err(ln, "instruction before first block label");
        };
        if sealed {
            return err(ln, format!("instruction after terminator in {}", block.id));
        }
        match parse_line(line, ln, &mut max_local)? {
            ParsedLine::Instr(instr) => block.push(instr),
            ParsedLine::Term(term) => {
                block.terminator = term;
                sealed = true;
            }
        }
    }
    if !closed {
        return err(header_ln, format!("unterminated body of `@{fname}`"));
    }

    func.reserve_locals(max_local + 1);
    check_blocks(&func, header_ln)?;
    push_function(module, func, header_ln)?;
    Ok(pos)
}

fn finish_block<W: Word>(
    func: &mut Function<W>,
    block: Option<Block<W>>,
    sealed: bool,
    line: usize,
) -> Result<(), ParseError> {
    let Some(block) = block else { return Ok(()) };
    if !sealed {
        return err(line, format!("block {} has no terminator", block.id));
    }
    func.push_block(block);
    Ok(())
}

fn check_blocks<W: Word>(func: &Function<W>, line: usize) -> Result<(), ParseError> {
    let mut ids = HashSet::new();
    for block in &func.blocks {
        if !ids.insert(block.id) {
            return err(line, format!("duplicate block {} in @{}", block.id, func.name));
        }
    }
    for block in &func.blocks {
        for succ in block.terminator.successors() {
            if !ids.contains(&succ) {
                return err(
                    line,
                    format!("{} targets undefined block {succ} in @{}", block.id, func.name),
                );
            }
        }
    }
    Ok(())
}

/// Parse `@name(ty, ...) [-> ty]`.
fn parse_sig_header(s: &str, line: usize) -> Result<(String, Signature), ParseError> {
    let Some(s) = s.strip_prefix('@') else {
        return err(line, "expected `@` before function name");
    };
    let Some(open) = s.find('(') else {
        return err(line, "expected `(` in signature");
    };
    let Some(close) = s.find(')') else {
        return err(line, "expected `)` in signature");
    };
    let name = s[..open].trim();
    if name.is_empty() {
        return err(line, "empty function name");
    }
    let params_src = s[open + 1..close].trim();
    let mut params = Vec::new();
    if !params_src.is_empty() {
        for p in params_src.split(',') {
            params.push(parse_ty(p.trim(), line)?);
        }
    }
    let rest = s[close + 1..].trim();
    let ret = if rest.is_empty() {
        Ty::Unit
    } else if let Some(ty) = rest.strip_prefix("->") {
        parse_ty(ty.trim(), line)?
    } else {
        return err(line, format!("unexpected `{rest}` after signature"));
    };
    Ok((name.to_string(), Signature::new(params, ret)))
}

fn parse_ty(s: &str, line: usize) -> Result<Ty, ParseError> {
    match s {
        "word" => Ok(Ty::Word),
        "ptr" => Ok(Ty::Ptr),
        "unit" => Ok(Ty::Unit),
        "opaque" => Ok(Ty::Other),
        other => err(line, format!("unknown type `{other}`")),
    }
}

fn parse_block_id(s: &str, line: usize) -> Result<BlockId, ParseError> {
    let Some(n) = s.strip_prefix("bb") else {
        return err(line, format!("expected block label `bbN`, got `{s}`"));
    };
    n.parse::<u32>()
        .map(BlockId)
        .map_err(|_| ParseError::Syntax {
            line,
            msg: format!("invalid block label `{s}`"),
        })
}

fn parse_local(s: &str, line: usize, max_local: &mut u32) -> Result<Local, ParseError> {
    let Some(n) = s.strip_prefix('%') else {
        return err(line, format!("expected local `%N`, got `{s}`"));
    };
    let id = n.parse::<u32>().map_err(|_| ParseError::Syntax {
        line,
        msg: format!("invalid local `{s}`"),
    })?;
    *max_local = (*max_local).max(id);
    Ok(Local(id))
}

fn parse_operand<W: Word>(
    s: &str,
    line: usize,
    max_local: &mut u32,
) -> Result<Operand<W>, ParseError> {
    if s.starts_with('%') {
        return Ok(Operand::Local(parse_local(s, line, max_local)?));
    }
    let val = s.strip_prefix("0x").map_or_else(
        || s.parse::<u64>(),
        |hex| u64::from_str_radix(hex, 16),
    );
    match val {
        Ok(v) => Ok(Operand::imm(v)),
        Err(_) => err(line, format!("invalid operand `{s}`")),
    }
}

fn parse_operands<W: Word>(
    s: &str,
    line: usize,
    max_local: &mut u32,
) -> Result<Vec<Operand<W>>, ParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Vec::new());
    }
    s.split(',')
        .map(|p| parse_operand(p.trim(), line, max_local))
        .collect()
}

/// Parse `@name(args...)`; returns callee, args, and the remainder after `)`.
fn parse_call_like<'a, W: Word>(
    s: &'a str,
    line: usize,
    max_local: &mut u32,
) -> Result<(String, Vec<Operand<W>>, &'a str), ParseError> {
    let Some(s) = s.strip_prefix('@') else {
        return err(line, "expected `@` before callee");
    };
    let Some(open) = s.find('(') else {
        return err(line, "expected `(` in call");
    };
    let Some(close) = s.find(')') else {
        return err(line, "expected `)` in call");
    };
    let callee = s[..open].trim().to_string();
    let args = parse_operands(&s[open + 1..close], line, max_local)?;
    Ok((callee, args, s[close + 1..].trim()))
}

fn parse_quoted(s: &str, line: usize) -> Result<String, ParseError> {
    let s = s.trim();
    let stripped = s.strip_prefix('"').and_then(|t| t.strip_suffix('"'));
    stripped.map(str::to_string).ok_or_else(|| ParseError::Syntax {
        line,
        msg: format!("expected quoted string, got `{s}`"),
    })
}

fn parse_invoke<W: Word>(
    rest: &str,
    dst: Option<Local>,
    line: usize,
    max_local: &mut u32,
) -> Result<Terminator<W>, ParseError> {
    let (callee, args, tail) = parse_call_like(rest, line, max_local)?;
    let Some(tail) = tail.strip_prefix("to ") else {
        return err(line, "expected `to bbN` after invoke");
    };
    let Some((normal, unwind)) = tail.split_once(" unwind ") else {
        return err(line, "expected `unwind bbN` after invoke target");
    };
    Ok(Terminator::Invoke {
        callee,
        args,
        dst,
        normal: parse_block_id(normal.trim(), line)?,
        unwind: parse_block_id(unwind.trim(), line)?,
    })
}

fn parse_line<W: Word>(
    line_src: &str,
    line: usize,
    max_local: &mut u32,
) -> Result<ParsedLine<W>, ParseError> {
    if line_src == "unreachable" {
        return Ok(ParsedLine::Term(Terminator::Unreachable));
    }
    if line_src == "ret" {
        return Ok(ParsedLine::Term(Terminator::ret()));
    }
    if let Some(rest) = line_src.strip_prefix("ret ") {
        let value = parse_operand(rest.trim(), line, max_local)?;
        return Ok(ParsedLine::Term(Terminator::ret_value(value)));
    }
    if let Some(rest) = line_src.strip_prefix("jmp ") {
        return Ok(ParsedLine::Term(Terminator::jump(parse_block_id(
            rest.trim(),
            line,
        )?)));
    }
    if let Some(rest) = line_src.strip_prefix("br ") {
        let parts: Vec<&str> = rest.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return err(line, "expected `br COND, bbN, bbM`");
        }
        return Ok(ParsedLine::Term(Terminator::branch(
            parse_operand(parts[0], line, max_local)?,
            parse_block_id(parts[1], line)?,
            parse_block_id(parts[2], line)?,
        )));
    }
    if let Some(rest) = line_src.strip_prefix("ctxstore ") {
        let src = parse_operand(rest.trim(), line, max_local)?;
        return Ok(ParsedLine::Instr(Instr::CtxStore { src }));
    }
    if let Some(rest) = line_src.strip_prefix("call ") {
        let (callee, args, tail) = parse_call_like(rest.trim(), line, max_local)?;
        if !tail.is_empty() {
            return err(line, format!("unexpected `{tail}` after call"));
        }
        return Ok(ParsedLine::Instr(Instr::Call {
            callee,
            args,
            dst: None,
        }));
    }
    if let Some(rest) = line_src.strip_prefix("invoke ") {
        return Ok(ParsedLine::Term(parse_invoke(
            rest.trim(),
            None,
            line,
            max_local,
        )?));
    }
    if let Some(rest) = line_src.strip_prefix("opaque ") {
        return Ok(ParsedLine::Instr(Instr::Opaque {
            text: parse_quoted(rest, line)?,
        }));
    }

    // `%N = ...` forms
    if let Some((lhs, rhs)) = line_src.split_once('=') {
        let dst = parse_local(lhs.trim(), line, max_local)?;
        let rhs = rhs.trim();
        if rhs == "ctxload" {
            return Ok(ParsedLine::Instr(Instr::CtxLoad { dst }));
        }
        if rhs == "random" {
            return Ok(ParsedLine::Instr(Instr::Random { dst }));
        }
        if let Some(rest) = rhs.strip_prefix("asm ") {
            return Ok(ParsedLine::Instr(Instr::Asm {
                template: parse_quoted(rest, line)?,
                dst,
            }));
        }
        for (kw, op) in [("mul ", BinOp::Mul), ("add ", BinOp::Add)] {
            if let Some(rest) = rhs.strip_prefix(kw) {
                let Some((lhs_s, rhs_s)) = rest.split_once(',') else {
                    return err(line, format!("expected two operands in `{}`", kw.trim()));
                };
                return Ok(ParsedLine::Instr(Instr::Bin {
                    op,
                    dst,
                    lhs: parse_operand(lhs_s.trim(), line, max_local)?,
                    rhs: parse_operand(rhs_s.trim(), line, max_local)?,
                }));
            }
        }
        if let Some(rest) = rhs.strip_prefix("call ") {
            let (callee, args, tail) = parse_call_like(rest.trim(), line, max_local)?;
            if !tail.is_empty() {
                return err(line, format!("unexpected `{tail}` after call"));
            }
            return Ok(ParsedLine::Instr(Instr::Call {
                callee,
                args,
                dst: Some(dst),
            }));
        }
        if let Some(rest) = rhs.strip_prefix("invoke ") {
            return Ok(ParsedLine::Term(parse_invoke(
                rest.trim(),
                Some(dst),
                line,
                max_local,
            )?));
        }
    }
    err(line, format!("unrecognized instruction `{line_src}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word::{W32, W64};

    const DEMO: &str = r#"
module demo

func @B(word) -> word {
bb0:
  opaque "prologue"
  %1 = call @A(%0, 7)
  br %1, bb1, bb2
bb1:
  ret %1
bb2:
  jmp bb1
}

declare @A(word, word) -> word
"#;

    #[test]
    fn test_parse_demo() {
        let module: Module<W64> = parse_module(DEMO).unwrap();
        assert_eq!(module.name, "demo");
        assert_eq!(module.functions.len(), 2);
        let b = module.function("B").unwrap();
        assert_eq!(b.blocks.len(), 3);
        assert_eq!(b.blocks[0].len(), 2);
        assert!(module.function("A").unwrap().is_declaration());
        // locals reserved past the highest reference
        assert!(b.local_count() >= 2);
    }

    #[test]
    fn test_round_trip() {
        let module: Module<W64> = parse_module(DEMO).unwrap();
        let printed = module.to_string();
        let reparsed: Module<W64> = parse_module(&printed).unwrap();
        assert_eq!(printed, reparsed.to_string());
    }

    #[test]
    fn test_parse_w32_truncates_consts() {
        let src = "module m\nfunc @f() {\nbb0:\n  ctxstore 0x1_0000_0001\n  ret\n}\n";
        // underscores are not accepted; use plain hex
        let src = src.replace("0x1_0000_0001", "0x100000001");
        let module: Module<W32> = parse_module(&src).unwrap();
        let f = module.function("f").unwrap();
        assert_eq!(
            f.blocks[0].instrs[0],
            Instr::CtxStore {
                src: Operand::Const(1)
            }
        );
    }

    #[test]
    fn test_missing_terminator_rejected() {
        let src = "module m\nfunc @f() {\nbb0:\n  opaque \"x\"\n}\n";
        assert!(parse_module::<W64>(src).is_err());
    }

    #[test]
    fn test_undefined_target_rejected() {
        let src = "module m\nfunc @f() {\nbb0:\n  jmp bb9\n}\n";
        assert!(parse_module::<W64>(src).is_err());
    }

    #[test]
    fn test_invoke_round_trip() {
        let src = "module m\nfunc @f() {\nbb0:\n  invoke @g(1) to bb1 unwind bb2\nbb1:\n  ret\nbb2:\n  unreachable\n}\n";
        let module: Module<W64> = parse_module(src).unwrap();
        let printed = module.to_string();
        let reparsed: Module<W64> = parse_module(&printed).unwrap();
        assert_eq!(module, reparsed);
    }
}
