/*!
  The closed instruction set of the machine.

  Each source line parses to exactly one `Instruction`. Operands are typed at
  the variant level, so an instruction that reached the engine is known to
  carry the right number and kind of arguments; the engine's dispatch is an
  exhaustive match with no argument-count checks left to run time.
*/

use std::fmt::{Display, Formatter};

use string_cache::DefaultAtom;
use strum_macros::{Display as StrumDisplay, IntoStaticStr};

/// A register or label name. Interned, so instructions and the engine's maps
/// clone and compare names cheaply.
pub type Name = DefaultAtom;

/**
  The operation mnemonics of the source language, one variant per word that
  may open an instruction line. Label definitions and blank lines have no
  mnemonic; they are structural forms of `Instruction` instead.
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString,
  Clone,        Copy,          Eq,         PartialEq, Debug, Hash
)]
#[strum(serialize_all = "lowercase")]
pub enum Opcode {
  Mov,
  Inc,
  Dec,
  Add,
  Sub,
  Mul,
  Div,
  Jmp,
  Cmp,
  Jne,
  Je,
  Jge,
  Jg,
  Jle,
  Jl,
  Call,
  Ret,
  Msg,
  End,
}

/// The six flag predicates of the conditional jumps. The flag holds
/// `x - y` from the most recent `cmp`.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum Condition {
  NotEqual,
  Equal,
  GreaterOrEqual,
  Greater,
  LessOrEqual,
  Less,
}

impl Condition {

  /// Whether a comparison flag satisfies this condition.
  pub fn holds(&self, flag: i64) -> bool {
    match self {
      Condition::NotEqual       => flag != 0,
      Condition::Equal          => flag == 0,
      Condition::GreaterOrEqual => flag >= 0,
      Condition::Greater        => flag > 0,
      Condition::LessOrEqual    => flag <= 0,
      Condition::Less           => flag < 0,
    }
  }

  /// The jump mnemonic that tests this condition.
  pub fn opcode(&self) -> Opcode {
    match self {
      Condition::NotEqual       => Opcode::Jne,
      Condition::Equal          => Opcode::Je,
      Condition::GreaterOrEqual => Opcode::Jge,
      Condition::Greater        => Opcode::Jg,
      Condition::LessOrEqual    => Opcode::Jle,
      Condition::Less           => Opcode::Jl,
    }
  }
}

/// A value operand: an integer literal, or the name of a register to read at
/// execution time.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Source {
  Literal(i64),
  Register(Name),
}

impl Display for Source {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      Source::Literal(value) => {
        write!(f, "{}", value)
      }

      Source::Register(name) => {
        write!(f, "{}", name)
      }

    }
  }
}

/// One `msg` operand: literal text, or a register whose value is rendered in
/// decimal.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum MsgPart {
  Text(String),
  Register(Name),
}

impl Display for MsgPart {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      MsgPart::Text(text) => {
        write!(f, "'{}'", text)
      }

      MsgPart::Register(name) => {
        write!(f, "{}", name)
      }

    }
  }
}

/**
  One parsed source line. The six conditional jumps share the `JmpIf` variant,
  distinguished by their `Condition`; every other operation has a variant of
  its own. Label-definition lines and blank or comment-only lines also occupy
  a slot in the program, so that instruction indices coincide with source
  lines; at execution time both are inert.
*/
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Instruction {
  Mov   { dst: Name, src: Source },
  Inc   { reg: Name },
  Dec   { reg: Name },
  Add   { dst: Name, src: Source },
  Sub   { dst: Name, src: Source },
  Mul   { dst: Name, src: Source },
  Div   { dst: Name, src: Source },
  Jmp   { target: Name },
  Cmp   { lhs: Source, rhs: Source },
  JmpIf { condition: Condition, target: Name },
  Call  { target: Name },
  Ret,
  Msg   { parts: Vec<MsgPart> },
  End,
  /// A label-definition line. Targets are resolved at load time; the line
  /// itself only advances the instruction pointer.
  Label(Name),
  /// A blank or comment-only line.
  Empty,
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      Instruction::Mov { dst, src } => {
        write!(f, "mov {}, {}", dst, src)
      }

      Instruction::Inc { reg } => {
        write!(f, "inc {}", reg)
      }

      Instruction::Dec { reg } => {
        write!(f, "dec {}", reg)
      }

      Instruction::Add { dst, src } => {
        write!(f, "add {}, {}", dst, src)
      }

      Instruction::Sub { dst, src } => {
        write!(f, "sub {}, {}", dst, src)
      }

      Instruction::Mul { dst, src } => {
        write!(f, "mul {}, {}", dst, src)
      }

      Instruction::Div { dst, src } => {
        write!(f, "div {}, {}", dst, src)
      }

      Instruction::Jmp { target } => {
        write!(f, "jmp {}", target)
      }

      Instruction::Cmp { lhs, rhs } => {
        write!(f, "cmp {}, {}", lhs, rhs)
      }

      Instruction::JmpIf { condition, target } => {
        write!(f, "{} {}", condition.opcode(), target)
      }

      Instruction::Call { target } => {
        write!(f, "call {}", target)
      }

      Instruction::Ret => {
        write!(f, "ret")
      }

      Instruction::Msg { parts } => {
        write!(
          f,
          "msg {}",
          parts
            .iter()
            .map(|part| format!("{}", part))
            .collect::<Vec<String>>()
            .join(", ")
        )
      }

      Instruction::End => {
        write!(f, "end")
      }

      Instruction::Label(name) => {
        write!(f, "{}:", name)
      }

      Instruction::Empty => Ok(()),

    }
  }
}
