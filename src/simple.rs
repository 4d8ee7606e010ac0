/*!
  The reduced instruction set: `mov`, `inc`, `dec`, and one relative
  conditional jump, `jnz`. No labels, no strings, no call stack, no output;
  a run finishes when control walks past the last instruction and returns
  the register store.

  Programs arrive as a list of instruction lines, one instruction per
  element, and `jnz` offsets count instructions relative to the jump itself.
  Lines go through the full language's lexical scanner, so operands may be
  separated by commas or by spaces alone, and `;` comments are allowed.
*/

use std::collections::HashMap;

use crate::instruction::{Name, Source};
use crate::machine::{resolve, InterpretError, RuntimeError};
use crate::program::LoadError;
use crate::tokenizer::{
  name_token,
  one_operand,
  scan_line,
  source_token,
  two_operands,
  ParseError,
  ScannedLine,
};

/// The reduced set, one variant per operation.
#[derive(Clone, Eq, PartialEq, Debug)]
enum Instruction {
  Mov { dst: Name, src: Source },
  Inc { reg: Name },
  Dec { reg: Name },
  /// Jump `offset` instructions relative to itself when `check` is nonzero.
  Jnz { check: Source, offset: Source },
}

fn parse_line(line: &str) -> Result<Option<Instruction>, ParseError> {
  let (name, operands) = match scan_line(line)? {
    ScannedLine::Empty => return Ok(None),
    // This language has no labels; a trailing `:` does not make an
    // identifier an instruction.
    ScannedLine::Label(label) => return Err(ParseError::UnknownOpcode(label.to_string())),
    ScannedLine::Operation { name, operands } => (name, operands),
  };

  match name {

    "mov" => {
      let (dst, src) = two_operands("mov", operands)?;
      Ok(Some(Instruction::Mov {
        dst: name_token("mov", dst)?,
        src: source_token("mov", src)?,
      }))
    }

    "inc" => {
      Ok(Some(Instruction::Inc {
        reg: name_token("inc", one_operand("inc", operands)?)?,
      }))
    }

    "dec" => {
      Ok(Some(Instruction::Dec {
        reg: name_token("dec", one_operand("dec", operands)?)?,
      }))
    }

    "jnz" => {
      let (check, offset) = two_operands("jnz", operands)?;
      Ok(Some(Instruction::Jnz {
        check: source_token("jnz", check)?,
        offset: source_token("jnz", offset)?,
      }))
    }

    _ => Err(ParseError::UnknownOpcode(name.to_string())),

  }
}

/// Runs a reduced-set program and returns the register store when control
/// walks past the last instruction. Blank and comment-only lines still
/// occupy an instruction slot, keeping `jnz` offsets aligned with line
/// positions.
pub fn run(lines: &[&str]) -> Result<HashMap<Name, i64>, InterpretError> {
  let mut instructions = Vec::with_capacity(lines.len());
  for (index, line) in lines.iter().enumerate() {
    let instruction = parse_line(line)
      .map_err(|error| LoadError::Parse { line: index + 1, error })?;
    instructions.push(instruction);
  }

  let mut registers: HashMap<Name, i64> = HashMap::new();
  let mut pc: usize = 0;

  while pc < instructions.len() {
    match &instructions[pc] {

      None => {
        pc += 1;
      }

      Some(Instruction::Mov { dst, src }) => {
        let value = resolve(&registers, src)?;
        registers.insert(dst.clone(), value);
        pc += 1;
      }

      Some(Instruction::Inc { reg }) => {
        adjust(&mut registers, reg, 1)?;
        pc += 1;
      }

      Some(Instruction::Dec { reg }) => {
        adjust(&mut registers, reg, -1)?;
        pc += 1;
      }

      Some(Instruction::Jnz { check, offset }) => {
        match resolve(&registers, check)? != 0 {

          true => {
            let target = pc as i64 + resolve(&registers, offset)?;
            if target < 0 {
              return Err(RuntimeError::JumpOutOfBounds(target).into());
            }
            // A target past the end simply finishes the run.
            pc = target as usize;
          }

          false => {
            pc += 1;
          }

        }
      }

    }
  }

  Ok(registers)
}

fn adjust(
  registers: &mut HashMap<Name, i64>,
  reg: &Name,
  delta: i64,
) -> Result<(), RuntimeError> {
  match registers.get(reg) {

    Some(value) => {
      let updated = value + delta;
      registers.insert(reg.clone(), updated);
      Ok(())
    }

    None => Err(RuntimeError::UnknownRegister(reg.clone())),

  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn countdown_loop() {
    let registers = run(&[
      "mov a 5",
      "inc a",
      "dec a",
      "dec a",
      "jnz a -1",
      "inc a",
    ])
    .unwrap();

    assert_eq!(registers.get(&Name::from("a")), Some(&1));
    assert_eq!(registers.len(), 1);
  }

  #[test]
  fn forward_jump_skips_instructions() {
    let registers = run(&[
      "mov a 1",
      "jnz a 2",
      "mov a 99",
      "mov b 2",
    ])
    .unwrap();

    assert_eq!(registers.get(&Name::from("a")), Some(&1));
    assert_eq!(registers.get(&Name::from("b")), Some(&2));
  }

  #[test]
  fn zero_check_falls_through() {
    let registers = run(&[
      "mov a 0",
      "jnz a 2",
      "mov b 7",
    ])
    .unwrap();

    assert_eq!(registers.get(&Name::from("b")), Some(&7));
  }

  #[test]
  fn constant_check_jumps_unconditionally() {
    let registers = run(&[
      "mov a 1",
      "jnz 1 2",
      "mov a 99",
    ])
    .unwrap();

    assert_eq!(registers.get(&Name::from("a")), Some(&1));
  }

  #[test]
  fn commas_are_accepted_too() {
    let registers = run(&["mov a, -3", "inc a"]).unwrap();
    assert_eq!(registers.get(&Name::from("a")), Some(&-2));
  }

  #[test]
  fn jump_before_the_first_instruction_faults() {
    let result = run(&["mov a 1", "jnz a -5"]);
    assert_eq!(
      result,
      Err(InterpretError::Run(RuntimeError::JumpOutOfBounds(-4)))
    );
  }

  #[test]
  fn full_language_opcodes_are_rejected() {
    let result = run(&["mov a 1", "jmp loop"]);
    match result {
      Err(InterpretError::Load(LoadError::Parse { line, error })) => {
        assert_eq!(line, 2);
        assert_eq!(error, ParseError::UnknownOpcode("jmp".to_string()));
      }
      other => panic!("expected a load error, got {:?}", other),
    }
  }

  #[test]
  fn labels_are_rejected() {
    let result = run(&["loop:"]);
    match result {
      Err(InterpretError::Load(LoadError::Parse { line, error })) => {
        assert_eq!(line, 1);
        assert_eq!(error, ParseError::UnknownOpcode("loop".to_string()));
      }
      other => panic!("expected a load error, got {:?}", other),
    }
  }
}
