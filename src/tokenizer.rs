/*!
  The tokenizer turns one raw source line into exactly one `Instruction`.

  Scanning is hand written and proceeds left to right. An identifier run
  immediately followed by `:` is a label definition, and the rest of the line
  is ignored. Otherwise the identifier is the opcode, and operand tokens
  follow until the end of the line or a `;` comment: identifier runs, integer
  literals (a leading `-` is part of the literal), and `'…'` string literals.
  Operands are separated by any characters that cannot start a token, so
  commas and spaces both work and neither is required.

  The scanned line is then assembled into a typed instruction, which is where
  unknown mnemonics, operand-count mismatches, and operands of the wrong form
  surface. Tokenizing has no state: the same line always yields the same
  result.
*/

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::chariter::CharIter;
use crate::instruction::{Condition, Instruction, MsgPart, Name, Opcode, Source};
use crate::token::Token;

/// A fatal failure to parse one line. The loader wraps these with the
/// offending line number.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ParseError {
  /// A character that cannot begin a label, an opcode, or a comment.
  UnexpectedCharacter { character: char, column: usize },
  /// A `'…'` literal with no closing quote.
  UnterminatedString { column: usize },
  /// A `-` with no digits after it.
  DanglingSign { column: usize },
  /// An integer literal that does not fit in 64 signed bits.
  NumberOutOfRange { literal: String, column: usize },
  UnknownOpcode(String),
  WrongArity { opcode: &'static str, expected: usize, found: usize },
  /// An operand of a form the operation cannot take.
  BadOperand { opcode: &'static str, operand: Token },
}

impl Display for ParseError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      ParseError::UnexpectedCharacter { character, column } => {
        write!(f, "unexpected character `{}` at column {}", character, column)
      }

      ParseError::UnterminatedString { column } => {
        write!(f, "the string opened at column {} is never closed", column)
      }

      ParseError::DanglingSign { column } => {
        write!(f, "the `-` at column {} is not followed by digits", column)
      }

      ParseError::NumberOutOfRange { literal, column } => {
        write!(f, "`{}` at column {} does not fit in a 64 bit integer", literal, column)
      }

      ParseError::UnknownOpcode(name) => {
        write!(f, "`{}` is not an operation", name)
      }

      ParseError::WrongArity { opcode, expected, found } => {
        write!(f, "{} requires {} arguments but was given {}", opcode, expected, found)
      }

      ParseError::BadOperand { opcode, operand } => {
        write!(f, "{} cannot take `{}` as an operand", opcode, operand)
      }

    }
  }
}

/// The shape of one scanned line, before the opcode is resolved.
pub(crate) enum ScannedLine<'d> {
  Empty,
  Label(Name),
  Operation { name: &'d str, operands: Vec<Token> },
}

fn is_name_start(c: char) -> bool {
  c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
  c.is_ascii_alphanumeric() || c == '_'
}

fn scan_name<'d>(chars: &mut CharIter<'d>) -> &'d str {
  match chars.get_prefix_match(is_name_char) {
    Some(name) => name,
    None       => unreachable!("scan_name called without a leading name character"),
  }
}

/// Scans the raw shape of a line: nothing, a label definition, or an
/// operation word with its operand tokens.
pub(crate) fn scan_line(line: &str) -> Result<ScannedLine<'_>, ParseError> {
  let mut chars = CharIter::new(line);
  chars.trim_left();

  match chars.peek() {
    None | Some(';')            => return Ok(ScannedLine::Empty),
    Some(c) if is_name_start(c) => {}
    Some(character)             => {
      return Err(ParseError::UnexpectedCharacter { character, column: chars.column() });
    }
  }

  let name = scan_name(&mut chars);
  if chars.peek() == Some(':') {
    // A label definition. The rest of the line is ignored.
    return Ok(ScannedLine::Label(Name::from(name)));
  }

  let operands = scan_operands(&mut chars)?;
  Ok(ScannedLine::Operation { name, operands })
}

/// Scans operand tokens until the end of the line or a comment. Characters
/// that cannot start a token are separators.
fn scan_operands(chars: &mut CharIter<'_>) -> Result<Vec<Token>, ParseError> {
  let mut operands = Vec::new();

  loop {
    match chars.peek() {

      None | Some(';') => break,

      Some(c) if is_name_start(c) => {
        operands.push(Token::Name(Name::from(scan_name(chars))));
      }

      Some(c) if c == '-' || c.is_ascii_digit() => {
        operands.push(scan_number(chars)?);
      }

      Some('\'') => {
        operands.push(scan_string(chars)?);
      }

      Some(_) => {
        // A separator.
        chars.next();
      }

    }
  }

  Ok(operands)
}

fn scan_number(chars: &mut CharIter<'_>) -> Result<Token, ParseError> {
  let column = chars.column();
  let mut literal = String::new();

  if chars.peek() == Some('-') {
    literal.push('-');
    chars.next();
  }

  match chars.get_prefix_match(|c| c.is_ascii_digit()) {
    Some(digits) => literal.push_str(digits),
    None         => return Err(ParseError::DanglingSign { column }),
  }

  match literal.parse::<i64>() {
    Ok(value) => Ok(Token::Int(value)),
    Err(_)    => Err(ParseError::NumberOutOfRange { literal, column }),
  }
}

fn scan_string(chars: &mut CharIter<'_>) -> Result<Token, ParseError> {
  let column = chars.column();
  // Eat the opening quote.
  chars.next();

  let mut content = String::new();
  loop {
    match chars.next() {
      Some('\'') => return Ok(Token::Str(content)),
      Some(c)    => content.push(c),
      None       => return Err(ParseError::UnterminatedString { column }),
    }
  }
}

/// Tokenizes one raw source line into exactly one instruction.
pub fn tokenize(line: &str) -> Result<Instruction, ParseError> {
  match scan_line(line)? {
    ScannedLine::Empty                       => Ok(Instruction::Empty),
    ScannedLine::Label(name)                 => Ok(Instruction::Label(name)),
    ScannedLine::Operation { name, operands } => assemble(name, operands),
  }
}

/// Builds the typed instruction for one scanned operation, enforcing operand
/// count and form.
fn assemble(name: &str, operands: Vec<Token>) -> Result<Instruction, ParseError> {
  let opcode = match Opcode::from_str(name) {
    Ok(opcode) => opcode,
    Err(_)     => return Err(ParseError::UnknownOpcode(name.to_string())),
  };
  let mnemonic: &'static str = opcode.into();

  match opcode {

    Opcode::Mov => {
      let (dst, src) = register_and_source(mnemonic, operands)?;
      Ok(Instruction::Mov { dst, src })
    }

    Opcode::Inc => {
      Ok(Instruction::Inc { reg: one_name(mnemonic, operands)? })
    }

    Opcode::Dec => {
      Ok(Instruction::Dec { reg: one_name(mnemonic, operands)? })
    }

    Opcode::Add => {
      let (dst, src) = register_and_source(mnemonic, operands)?;
      Ok(Instruction::Add { dst, src })
    }

    Opcode::Sub => {
      let (dst, src) = register_and_source(mnemonic, operands)?;
      Ok(Instruction::Sub { dst, src })
    }

    Opcode::Mul => {
      let (dst, src) = register_and_source(mnemonic, operands)?;
      Ok(Instruction::Mul { dst, src })
    }

    Opcode::Div => {
      let (dst, src) = register_and_source(mnemonic, operands)?;
      Ok(Instruction::Div { dst, src })
    }

    Opcode::Jmp => {
      Ok(Instruction::Jmp { target: one_name(mnemonic, operands)? })
    }

    Opcode::Cmp => {
      let (lhs, rhs) = two_operands(mnemonic, operands)?;
      Ok(Instruction::Cmp {
        lhs: source_token(mnemonic, lhs)?,
        rhs: source_token(mnemonic, rhs)?,
      })
    }

    | Opcode::Jne
    | Opcode::Je
    | Opcode::Jge
    | Opcode::Jg
    | Opcode::Jle
    | Opcode::Jl => {
      Ok(Instruction::JmpIf {
        condition: condition_of(opcode),
        target: one_name(mnemonic, operands)?,
      })
    }

    Opcode::Call => {
      Ok(Instruction::Call { target: one_name(mnemonic, operands)? })
    }

    Opcode::Ret => {
      no_operands(mnemonic, operands)?;
      Ok(Instruction::Ret)
    }

    Opcode::Msg => {
      Ok(Instruction::Msg { parts: msg_parts(mnemonic, operands)? })
    }

    Opcode::End => {
      no_operands(mnemonic, operands)?;
      Ok(Instruction::End)
    }

  }
}

fn condition_of(opcode: Opcode) -> Condition {
  match opcode {
    Opcode::Jne => Condition::NotEqual,
    Opcode::Je  => Condition::Equal,
    Opcode::Jge => Condition::GreaterOrEqual,
    Opcode::Jg  => Condition::Greater,
    Opcode::Jle => Condition::LessOrEqual,
    Opcode::Jl  => Condition::Less,
    _           => unreachable!("condition_of called with a non-jump opcode: {}", opcode),
  }
}

// region Operand helpers
//
// Shared with the reduced instruction set, which has a mnemonic of its own,
// so these carry the mnemonic text rather than an `Opcode`.

pub(crate) fn one_operand(
  opcode: &'static str,
  mut operands: Vec<Token>,
) -> Result<Token, ParseError> {
  match operands.len() {
    1     => Ok(operands.remove(0)),
    found => Err(ParseError::WrongArity { opcode, expected: 1, found }),
  }
}

pub(crate) fn two_operands(
  opcode: &'static str,
  mut operands: Vec<Token>,
) -> Result<(Token, Token), ParseError> {
  match operands.len() {
    2 => {
      let second = operands.remove(1);
      let first = operands.remove(0);
      Ok((first, second))
    }
    found => Err(ParseError::WrongArity { opcode, expected: 2, found }),
  }
}

pub(crate) fn no_operands(
  opcode: &'static str,
  operands: Vec<Token>,
) -> Result<(), ParseError> {
  match operands.is_empty() {
    true  => Ok(()),
    false => Err(ParseError::WrongArity { opcode, expected: 0, found: operands.len() }),
  }
}

pub(crate) fn name_token(opcode: &'static str, token: Token) -> Result<Name, ParseError> {
  match token {
    Token::Name(name) => Ok(name),
    token             => Err(ParseError::BadOperand { opcode, operand: token }),
  }
}

pub(crate) fn source_token(opcode: &'static str, token: Token) -> Result<Source, ParseError> {
  match token {
    Token::Name(name)       => Ok(Source::Register(name)),
    Token::Int(value)       => Ok(Source::Literal(value)),
    token @ Token::Str(_)   => Err(ParseError::BadOperand { opcode, operand: token }),
  }
}

fn one_name(opcode: &'static str, operands: Vec<Token>) -> Result<Name, ParseError> {
  name_token(opcode, one_operand(opcode, operands)?)
}

fn register_and_source(
  opcode: &'static str,
  operands: Vec<Token>,
) -> Result<(Name, Source), ParseError> {
  let (dst, src) = two_operands(opcode, operands)?;
  Ok((name_token(opcode, dst)?, source_token(opcode, src)?))
}

fn msg_parts(opcode: &'static str, operands: Vec<Token>) -> Result<Vec<MsgPart>, ParseError> {
  operands
    .into_iter()
    .map(|token| {
      match token {
        Token::Str(text)      => Ok(MsgPart::Text(text)),
        Token::Name(name)     => Ok(MsgPart::Register(name)),
        token @ Token::Int(_) => Err(ParseError::BadOperand { opcode, operand: token }),
      }
    })
    .collect()
}

// endregion


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blank_and_comment_lines() {
    assert_eq!(tokenize(""), Ok(Instruction::Empty));
    assert_eq!(tokenize("   \t  "), Ok(Instruction::Empty));
    assert_eq!(tokenize("; a comment"), Ok(Instruction::Empty));
    assert_eq!(tokenize("   ; indented comment"), Ok(Instruction::Empty));
  }

  #[test]
  fn label_definition() {
    assert_eq!(tokenize("foo:"), Ok(Instruction::Label(Name::from("foo"))));
    assert_eq!(tokenize("  _start:  "), Ok(Instruction::Label(Name::from("_start"))));
    // Everything after the colon is ignored.
    assert_eq!(
      tokenize("loop: mov a, 5"),
      Ok(Instruction::Label(Name::from("loop")))
    );
  }

  #[test]
  fn mov_with_and_without_comma() {
    let expected = Instruction::Mov {
      dst: Name::from("a"),
      src: Source::Literal(5),
    };
    assert_eq!(tokenize("mov a, 5"), Ok(expected.clone()));
    assert_eq!(tokenize("mov a 5"), Ok(expected.clone()));
    assert_eq!(tokenize("mov  a,5  ; comment"), Ok(expected));
  }

  #[test]
  fn negative_literal() {
    assert_eq!(
      tokenize("mul a, -1"),
      Ok(Instruction::Mul {
        dst: Name::from("a"),
        src: Source::Literal(-1),
      })
    );
    assert_eq!(
      tokenize("cmp -3, b"),
      Ok(Instruction::Cmp {
        lhs: Source::Literal(-3),
        rhs: Source::Register(Name::from("b")),
      })
    );
  }

  #[test]
  fn register_source() {
    assert_eq!(
      tokenize("add total, step"),
      Ok(Instruction::Add {
        dst: Name::from("total"),
        src: Source::Register(Name::from("step")),
      })
    );
  }

  #[test]
  fn jumps_and_calls() {
    assert_eq!(
      tokenize("jmp loop"),
      Ok(Instruction::Jmp { target: Name::from("loop") })
    );
    assert_eq!(
      tokenize("jl neg"),
      Ok(Instruction::JmpIf {
        condition: Condition::Less,
        target: Name::from("neg"),
      })
    );
    assert_eq!(
      tokenize("call proc_fact"),
      Ok(Instruction::Call { target: Name::from("proc_fact") })
    );
    assert_eq!(tokenize("ret"), Ok(Instruction::Ret));
    assert_eq!(tokenize("end"), Ok(Instruction::End));
  }

  #[test]
  fn msg_operands() {
    assert_eq!(
      tokenize("msg  'a; b, c', x ; trailing comment"),
      Ok(Instruction::Msg {
        parts: vec![
          MsgPart::Text("a; b, c".to_string()),
          MsgPart::Register(Name::from("x")),
        ],
      })
    );
  }

  #[test]
  fn adjacent_strings_need_no_separator() {
    assert_eq!(
      tokenize("msg 'a''b'"),
      Ok(Instruction::Msg {
        parts: vec![
          MsgPart::Text("a".to_string()),
          MsgPart::Text("b".to_string()),
        ],
      })
    );
  }

  #[test]
  fn unterminated_string() {
    assert_eq!(
      tokenize("msg 'oops"),
      Err(ParseError::UnterminatedString { column: 5 })
    );
  }

  #[test]
  fn dangling_sign() {
    assert_eq!(
      tokenize("mov a, -"),
      Err(ParseError::DanglingSign { column: 8 })
    );
  }

  #[test]
  fn number_out_of_range() {
    assert_eq!(
      tokenize("mov a, 99999999999999999999"),
      Err(ParseError::NumberOutOfRange {
        literal: "99999999999999999999".to_string(),
        column: 8,
      })
    );
  }

  #[test]
  fn unknown_opcode() {
    assert_eq!(
      tokenize("bogus a, 5"),
      Err(ParseError::UnknownOpcode("bogus".to_string()))
    );
  }

  #[test]
  fn junk_where_an_opcode_should_be() {
    assert_eq!(
      tokenize("@foo"),
      Err(ParseError::UnexpectedCharacter { character: '@', column: 1 })
    );
  }

  #[test]
  fn wrong_arity() {
    assert_eq!(
      tokenize("inc"),
      Err(ParseError::WrongArity { opcode: "inc", expected: 1, found: 0 })
    );
    assert_eq!(
      tokenize("mov a"),
      Err(ParseError::WrongArity { opcode: "mov", expected: 2, found: 1 })
    );
    assert_eq!(
      tokenize("ret now"),
      Err(ParseError::WrongArity { opcode: "ret", expected: 0, found: 1 })
    );
  }

  #[test]
  fn bad_operand_forms() {
    assert_eq!(
      tokenize("inc 5"),
      Err(ParseError::BadOperand { opcode: "inc", operand: Token::Int(5) })
    );
    assert_eq!(
      tokenize("mov 5, a"),
      Err(ParseError::BadOperand { opcode: "mov", operand: Token::Int(5) })
    );
    assert_eq!(
      tokenize("msg 7"),
      Err(ParseError::BadOperand { opcode: "msg", operand: Token::Int(7) })
    );
    assert_eq!(
      tokenize("mov a, 'five'"),
      Err(ParseError::BadOperand {
        opcode: "mov",
        operand: Token::Str("five".to_string()),
      })
    );
  }

  #[test]
  fn tokenizing_is_idempotent() {
    let line = "msg   a, '! = ', c ; output text";
    assert_eq!(tokenize(line), tokenize(line));
  }
}
