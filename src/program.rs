/*!
  The program loader: splits source text into lines, tokenizes every line,
  and records label targets over the parsed sequence. A label resolves to the
  index of the instruction *after* its defining line, so jumping to a label
  that closes the program simply runs off the end.
*/

use std::fmt::{Display, Formatter};

use crate::instruction::{Instruction, Name};
use crate::symboltable::SymbolTable;
use crate::tokenizer::{tokenize, ParseError};

/// A failure to load source text. Lines are numbered from 1.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum LoadError {
  Parse { line: usize, error: ParseError },
  /// Strict loading only; `Program::load` lets the last definition win.
  DuplicateLabel { line: usize, label: Name },
}

impl Display for LoadError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      LoadError::Parse { line, error } => {
        write!(f, "Error on line {}: {}", line, error)
      }

      LoadError::DuplicateLabel { line, label } => {
        write!(f, "Error on line {}: label `{}` is already defined", line, label)
      }

    }
  }
}

/**
  A loaded program: the instruction sequence in source order, one instruction
  per line with blank and label lines included as inert placeholders, and the
  label table resolved over it. Immutable once loaded.
*/
pub struct Program {
  instructions: Vec<Instruction>,
  labels: SymbolTable,
}

impl Program {

  /// Loads source text. A duplicate label overwrites silently; the last
  /// definition in source order wins.
  pub fn load(source: &str) -> Result<Program, LoadError> {
    Program::load_with(source, false)
  }

  /// Loads source text, failing on duplicate label definitions.
  pub fn load_strict(source: &str) -> Result<Program, LoadError> {
    Program::load_with(source, true)
  }

  fn load_with(source: &str, strict: bool) -> Result<Program, LoadError> {
    let mut instructions = Vec::new();
    let mut labels = SymbolTable::new();

    for (index, line) in source.lines().enumerate() {
      let instruction = match tokenize(line) {
        Ok(instruction) => instruction,
        Err(error)      => return Err(LoadError::Parse { line: index + 1, error }),
      };

      if let Instruction::Label(name) = &instruction {
        // The target is the instruction after the defining line.
        match strict {

          true => {
            if labels.define_no_overwrite(name.clone(), index + 1).is_err() {
              return Err(LoadError::DuplicateLabel {
                line: index + 1,
                label: name.clone(),
              });
            }
          }

          false => labels.define(name.clone(), index + 1),

        }
      }

      instructions.push(instruction);
    }

    Ok(Program { instructions, labels })
  }

  pub fn len(&self) -> usize {
    self.instructions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.instructions.is_empty()
  }

  /// The instruction at `index`. Callers keep `index` within bounds.
  pub fn instruction(&self, index: usize) -> &Instruction {
    &self.instructions[index]
  }

  pub fn labels(&self) -> &SymbolTable {
    &self.labels
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn labels_resolve_past_their_line() {
    let program = Program::load("mov a, 1\nloop:\ndec a\njmp loop\n").unwrap();

    assert_eq!(program.len(), 4);
    assert_eq!(program.labels().target_of(&Name::from("loop")), Some(2));
    assert_eq!(program.instruction(1), &Instruction::Label(Name::from("loop")));
  }

  #[test]
  fn every_line_occupies_a_slot() {
    let program = Program::load("\n; comment\nmov a, 1\n\nend\n").unwrap();

    assert_eq!(program.len(), 5);
    assert_eq!(program.instruction(0), &Instruction::Empty);
    assert_eq!(program.instruction(1), &Instruction::Empty);
    assert_eq!(program.instruction(3), &Instruction::Empty);
  }

  #[test]
  fn duplicate_label_last_wins() {
    let program = Program::load("x:\nmov a, 1\nx:\nmov a, 2\n").unwrap();
    assert_eq!(program.labels().target_of(&Name::from("x")), Some(3));
  }

  #[test]
  fn strict_load_rejects_duplicate_label() {
    let result = Program::load_strict("x:\nmov a, 1\nx:\n");
    assert_eq!(
      result.err(),
      Some(LoadError::DuplicateLabel { line: 3, label: Name::from("x") })
    );
  }

  #[test]
  fn parse_errors_carry_the_line_number() {
    let result = Program::load("mov a, 1\nmov b, 2\nmsg 'oops\n");
    match result {
      Err(LoadError::Parse { line, .. }) => assert_eq!(line, 3),
      other                              => panic!("expected a parse error, got {:?}", other.err()),
    }
  }

  #[test]
  fn empty_source_loads_empty_program() {
    let program = Program::load("").unwrap();
    assert!(program.is_empty());
    assert!(program.labels().is_empty());
  }
}
