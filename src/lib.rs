//! An interpreter for a small register-machine assembly language: integer
//! registers, arithmetic, comparison-driven conditional jumps, subroutine
//! call/return, and a text-producing `msg` instruction.
//!
//! A program is a sequence of text lines. Running one either produces the
//! concatenation of everything its `msg` instructions wrote (when it
//! terminates explicitly with `end`) or a failure sentinel (when control
//! walks past the last instruction).

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;
extern crate strum;
#[macro_use] extern crate strum_macros;

pub mod chariter;
pub mod token;
pub mod instruction;
pub mod tokenizer;
pub mod symboltable;
pub mod program;
pub mod machine;
pub mod simple;
