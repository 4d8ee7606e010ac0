/*!
  The label table maps a label name to the index of the instruction
  immediately following its defining line. The mapping is bidirectional: the
  forward direction serves `jmp`/`call` resolution, while the reverse
  direction lets diagnostics name the label that owns a code index.
*/

use bimap::BiMap;

use crate::instruction::Name;

pub struct SymbolTable {
  table: BiMap<Name, usize>,
}

impl SymbolTable {

  pub fn new() -> SymbolTable {
    SymbolTable {
      table: BiMap::new()
    }
  }

  /// Records a label. A later definition of the same name overwrites an
  /// earlier one.
  pub fn define(&mut self, label: Name, target: usize) {
    self.table.insert(label, target);
  }

  /// Records a label, refusing to redefine an existing name.
  pub fn define_no_overwrite(&mut self, label: Name, target: usize)
    -> Result<(), (Name, usize)> {
    self.table.insert_no_overwrite(label, target)
  }

  /// The instruction index the label resolves to.
  pub fn target_of(&self, label: &Name) -> Option<usize> {
    self.table.get_by_left(label).copied()
  }

  /// The label defined at the given instruction index, if any.
  pub fn label_at(&self, target: usize) -> Option<&Name> {
    self.table.get_by_right(&target)
  }

  pub fn len(&self) -> usize {
    self.table.len()
  }

  pub fn is_empty(&self) -> bool {
    self.table.is_empty()
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn define_and_resolve() {
    let mut table = SymbolTable::new();
    table.define(Name::from("loop"), 3);
    table.define(Name::from("done"), 9);

    assert_eq!(table.target_of(&Name::from("loop")), Some(3));
    assert_eq!(table.target_of(&Name::from("done")), Some(9));
    assert_eq!(table.target_of(&Name::from("missing")), None);
    assert_eq!(table.len(), 2);
  }

  #[test]
  fn last_definition_wins() {
    let mut table = SymbolTable::new();
    table.define(Name::from("loop"), 3);
    table.define(Name::from("loop"), 7);

    assert_eq!(table.target_of(&Name::from("loop")), Some(7));
    assert_eq!(table.len(), 1);
  }

  #[test]
  fn no_overwrite_refuses_redefinition() {
    let mut table = SymbolTable::new();
    assert!(table.define_no_overwrite(Name::from("loop"), 3).is_ok());
    assert!(table.define_no_overwrite(Name::from("loop"), 7).is_err());
    assert_eq!(table.target_of(&Name::from("loop")), Some(3));
  }

  #[test]
  fn reverse_lookup() {
    let mut table = SymbolTable::new();
    table.define(Name::from("proc_fact"), 6);

    assert_eq!(table.label_at(6), Some(&Name::from("proc_fact")));
    assert_eq!(table.label_at(5), None);
  }
}
