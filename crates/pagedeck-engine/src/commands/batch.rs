#![forbid(unsafe_code)]

//! Composite command: several commands as one atomic history entry.

use pagedeck_model::DocumentModel;

use crate::command::{Command, CommandError};

/// An ordered list of commands that execute and undo as a single history
/// entry.
///
/// Undo runs the children in **reverse** order — stack-unwind semantics,
/// required whenever children have order-dependent preconditions (add a
/// source, then add its pages).
#[derive(Debug, Clone, PartialEq)]
pub struct BatchCommand {
    commands: Vec<Command>,
}

impl BatchCommand {
    /// Wrap `commands` as one atomic entry.
    ///
    /// # Errors
    ///
    /// [`CommandError::EmptyBatch`] if `commands` is empty.
    pub fn new(commands: Vec<Command>) -> Result<Self, CommandError> {
        if commands.is_empty() {
            return Err(CommandError::EmptyBatch);
        }
        Ok(Self { commands })
    }

    /// Reassemble a batch from already-decoded children (reload path).
    /// Unlike [`BatchCommand::new`], an empty child list is accepted here:
    /// a batch whose children all failed to decode still occupies its
    /// history slot rather than poisoning the entries around it.
    #[must_use]
    pub(crate) fn from_restored(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    /// The children, in execution order.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of child commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True when the batch holds no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub(crate) fn execute(&mut self, doc: &mut DocumentModel) {
        for command in &mut self.commands {
            command.execute(doc);
        }
    }

    pub(crate) fn undo(&mut self, doc: &mut DocumentModel) {
        for command in self.commands.iter_mut().rev() {
            command.undo(doc);
        }
    }
}
