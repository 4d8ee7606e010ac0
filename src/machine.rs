/*!
  The execution engine. A `Machine` owns everything one run mutates: the
  instruction pointer, the register store, the call stack, the comparison
  flag, and the output buffer. Dispatch is an exhaustive match over the
  instruction set; an opcode either sets the instruction pointer itself
  (jumps, `call`, `ret`, `end`) or falls through to the implicit
  advance-by-one. Nothing is shared outside the machine, so independent runs
  never alias.

  A run finishes one of three ways: `end` executes and the buffered `msg`
  fragments are joined into `Outcome::Success`; the instruction pointer walks
  past the last instruction and the run is `Outcome::Failure`, discarding any
  buffered output; or an instruction faults and the run aborts with a
  `RuntimeError`. Errors are never caught or retried.
*/

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use prettytable::{format as TableFormat, Table};

use crate::instruction::{Instruction, MsgPart, Name, Source};
use crate::program::{LoadError, Program};

/// Final result of one run.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Outcome {
  /// `end` executed; holds the concatenated `msg` output.
  Success(String),
  /// Control ran past the last instruction without reaching `end`.
  Failure,
}

impl Display for Outcome {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      Outcome::Success(text) => {
        write!(f, "{}", text)
      }

      // The language's default output for a program that never reaches `end`.
      Outcome::Failure => {
        write!(f, "-1")
      }

    }
  }
}

/// A fatal engine error. Aborts the run immediately; there is no partial
/// output and no recovery.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum RuntimeError {
  /// A register read before any write to it.
  UnknownRegister(Name),
  /// A jump or call to a label the program never defines.
  UnknownLabel(Name),
  /// `ret` with no pending call.
  CallStackUnderflow,
  DivisionByZero,
  /// A conditional jump before any `cmp` set the flag.
  FlagNotSet,
  /// A relative jump to before the first instruction.
  JumpOutOfBounds(i64),
  /// A bounded run used up its step allowance.
  StepLimitExceeded,
}

impl Display for RuntimeError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      RuntimeError::UnknownRegister(name) => {
        write!(f, "register `{}` was read before it was written", name)
      }

      RuntimeError::UnknownLabel(name) => {
        write!(f, "no label named `{}` is defined", name)
      }

      RuntimeError::CallStackUnderflow => {
        write!(f, "`ret` executed with no pending call")
      }

      RuntimeError::DivisionByZero => {
        write!(f, "division by zero")
      }

      RuntimeError::FlagNotSet => {
        write!(f, "conditional jump before any `cmp`")
      }

      RuntimeError::JumpOutOfBounds(target) => {
        write!(f, "relative jump to instruction {}", target)
      }

      RuntimeError::StepLimitExceeded => {
        write!(f, "step limit exceeded")
      }

    }
  }
}

/// Top-level failure of `interpret`: the program either failed to load or
/// faulted while running.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum InterpretError {
  Load(LoadError),
  Run(RuntimeError),
}

impl From<LoadError> for InterpretError {
  fn from(error: LoadError) -> InterpretError {
    InterpretError::Load(error)
  }
}

impl From<RuntimeError> for InterpretError {
  fn from(error: RuntimeError) -> InterpretError {
    InterpretError::Run(error)
  }
}

impl Display for InterpretError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      InterpretError::Load(error) => write!(f, "{}", error),
      InterpretError::Run(error)  => write!(f, "{}", error),
    }
  }
}

/**
  Resolves a value operand against a register store: a literal is itself; a
  register name reads the store. Reading a register that was never written is
  an error rather than an implicit zero.
*/
pub(crate) fn resolve(
  registers: &HashMap<Name, i64>,
  source: &Source,
) -> Result<i64, RuntimeError> {
  match source {

    Source::Literal(value) => Ok(*value),

    Source::Register(name) => {
      match registers.get(name) {
        Some(value) => Ok(*value),
        None        => Err(RuntimeError::UnknownRegister(name.clone())),
      }
    }

  }
}

/// Integer division that rounds toward negative infinity.
fn floor_div(lhs: i64, rhs: i64) -> i64 {
  let quotient = lhs / rhs;
  match lhs % rhs != 0 && (lhs < 0) != (rhs < 0) {
    true  => quotient - 1,
    false => quotient,
  }
}

pub struct Machine {
  program: Program,

  // Per-run state //
  pc         : usize,               // Instruction pointer, an index into the program
  registers  : HashMap<Name, i64>,  // Created implicitly on first `mov`
  call_stack : Vec<usize>,          // Return addresses pushed by `call`
  flag       : Option<i64>,         // `x - y` of the most recent `cmp`
  output     : Vec<String>,         // Fragments appended by `msg`
  finished   : bool,                // Whether `end` has executed
}

impl Machine {

  pub fn new(program: Program) -> Machine {
    Machine {
      program,
      pc         : 0,
      registers  : HashMap::new(),
      call_stack : Vec::new(),
      flag       : None,
      output     : Vec::new(),
      finished   : false,
    }
  }

  /// Runs to completion or a fatal error. The language has no built-in loop
  /// bound; callers interpreting untrusted programs should prefer
  /// `run_bounded`.
  pub fn run(&mut self) -> Result<Outcome, RuntimeError> {
    while self.pc < self.program.len() {
      self.step()?;
    }
    Ok(self.outcome())
  }

  /// Runs at most `max_steps` instructions, then fails with
  /// `StepLimitExceeded`.
  pub fn run_bounded(&mut self, max_steps: usize) -> Result<Outcome, RuntimeError> {
    let mut steps = 0;
    while self.pc < self.program.len() {
      if steps == max_steps {
        return Err(RuntimeError::StepLimitExceeded);
      }
      self.step()?;
      steps += 1;
    }
    Ok(self.outcome())
  }

  fn outcome(&self) -> Outcome {
    match self.finished {
      true  => Outcome::Success(self.output.concat()),
      false => Outcome::Failure,
    }
  }

  /// The value a register holds, if it has been written.
  pub fn register(&self, name: &str) -> Option<i64> {
    self.registers.get(&Name::from(name)).copied()
  }

  /// Executes the instruction under the instruction pointer.
  fn step(&mut self) -> Result<(), RuntimeError> {
    let instruction = self.program.instruction(self.pc).clone();

    #[cfg(feature = "trace_execution")]
    {
      if let Some(label) = self.program.labels().label_at(self.pc) {
        println!("{}:", label);
      }
      println!("[{:>4}] {}", self.pc, instruction);
      println!("{}", self);
    }

    match instruction {

      Instruction::Mov { dst, src } => {
        let value = self.resolve(&src)?;
        self.registers.insert(dst, value);
        self.pc += 1;
      }

      Instruction::Inc { reg } => {
        let value = self.read(&reg)?;
        self.registers.insert(reg, value + 1);
        self.pc += 1;
      }

      Instruction::Dec { reg } => {
        let value = self.read(&reg)?;
        self.registers.insert(reg, value - 1);
        self.pc += 1;
      }

      Instruction::Add { dst, src } => {
        self.combine(dst, src, |lhs, rhs| lhs + rhs)?;
      }

      Instruction::Sub { dst, src } => {
        self.combine(dst, src, |lhs, rhs| lhs - rhs)?;
      }

      Instruction::Mul { dst, src } => {
        self.combine(dst, src, |lhs, rhs| lhs * rhs)?;
      }

      Instruction::Div { dst, src } => {
        let divisor = self.resolve(&src)?;
        if divisor == 0 {
          return Err(RuntimeError::DivisionByZero);
        }
        let value = self.read(&dst)?;
        self.registers.insert(dst, floor_div(value, divisor));
        self.pc += 1;
      }

      Instruction::Jmp { target } => {
        self.pc = self.target_of(&target)?;
      }

      Instruction::Cmp { lhs, rhs } => {
        self.flag = Some(self.resolve(&lhs)? - self.resolve(&rhs)?);
        self.pc += 1;
      }

      Instruction::JmpIf { condition, target } => {
        let flag = match self.flag {
          Some(flag) => flag,
          None       => return Err(RuntimeError::FlagNotSet),
        };
        match condition.holds(flag) {
          true  => self.pc = self.target_of(&target)?,
          false => self.pc += 1,
        }
      }

      Instruction::Call { target } => {
        self.call_stack.push(self.pc + 1);
        self.pc = self.target_of(&target)?;
      }

      Instruction::Ret => {
        self.pc = match self.call_stack.pop() {
          Some(address) => address,
          None          => return Err(RuntimeError::CallStackUnderflow),
        };
      }

      Instruction::Msg { parts } => {
        let mut text = String::new();
        for part in &parts {
          match part {
            MsgPart::Text(literal)  => text.push_str(literal),
            MsgPart::Register(name) => text.push_str(&self.read(name)?.to_string()),
          }
        }
        self.output.push(text);
        self.pc += 1;
      }

      Instruction::End => {
        // Park the pointer past the end; the run loop exits on its next check.
        self.finished = true;
        self.pc = self.program.len();
      }

      | Instruction::Label(_)
      | Instruction::Empty => {
        self.pc += 1;
      }

    }

    Ok(())
  }

  fn resolve(&self, source: &Source) -> Result<i64, RuntimeError> {
    resolve(&self.registers, source)
  }

  fn read(&self, name: &Name) -> Result<i64, RuntimeError> {
    match self.registers.get(name) {
      Some(value) => Ok(*value),
      None        => Err(RuntimeError::UnknownRegister(name.clone())),
    }
  }

  fn combine(&mut self, dst: Name, src: Source, op: fn(i64, i64) -> i64)
    -> Result<(), RuntimeError> {
    let rhs = self.resolve(&src)?;
    let lhs = self.read(&dst)?;
    self.registers.insert(dst, op(lhs, rhs));
    self.pc += 1;
    Ok(())
  }

  fn target_of(&self, label: &Name) -> Result<usize, RuntimeError> {
    match self.program.labels().target_of(label) {
      Some(target) => Ok(target),
      None         => Err(RuntimeError::UnknownLabel(label.clone())),
    }
  }

  // region Display methods

  fn register_table(&self) -> Table {
    let mut table = Table::new();
    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Register", ubl->"Value"]);

    let mut rows: Vec<(&str, i64)> =
      self.registers
          .iter()
          .map(|(name, value)| (&**name, *value))
          .collect();
    rows.sort();

    for (name, value) in rows {
      table.add_row(row![r->format!("{} =", name), value]);
    }
    table
  }

  fn call_stack_table(&self) -> Table {
    let mut table = Table::new();
    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Depth", ubl->"Return"]);

    for (depth, address) in self.call_stack.iter().enumerate().rev() {
      table.add_row(row![r->format!("{}", depth), address]);
    }
    table
  }

  // endregion

}

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

impl Display for Machine {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let mut combined_table = table!([self.register_table(), self.call_stack_table()]);

    combined_table.set_titles(row![ub->"Registers", ub->"Call Stack"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    let flag = match self.flag {
      Some(value) => value.to_string(),
      None        => "unset".to_string(),
    };

    write!(f, "pc: {}\tflag: {}\n{}", self.pc, flag, combined_table)
  }
}

/// Loads and runs a program in one call.
pub fn interpret(source: &str) -> Result<Outcome, InterpretError> {
  let program = Program::load(source)?;
  let mut machine = Machine::new(program);
  Ok(machine.run()?)
}
