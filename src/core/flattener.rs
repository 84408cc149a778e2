//! Depth-first flattening of action trees into step rows

use std::collections::HashMap;

use crate::core::substitution::substitute;
use crate::error::{ExportError, ExportResult};
use crate::types::{Action, ReplacementSet, SharedStep, StepRow, TestStep};

/// Resolves shared-step references to their definitions
pub trait SharedStepLookup {
    fn find_shared_step(&self, id: u64) -> Option<&SharedStep>;
}

impl SharedStepLookup for HashMap<u64, SharedStep> {
    fn find_shared_step(&self, id: u64) -> Option<&SharedStep> {
        self.get(&id)
    }
}

/// Position state threaded through one flattening pass.
///
/// `cursor` is the next sheet row and keeps running across passes and test
/// cases; `counter` is the next step number and restarts for every pass.
#[derive(Debug, Clone)]
pub struct Traversal {
    pub cursor: u32,
    pub counter: u32,
    expanding: Vec<u64>,
}

impl Traversal {
    pub fn new(cursor: u32) -> Self {
        Self {
            cursor,
            counter: 1,
            expanding: Vec::new(),
        }
    }

    /// Restart step numbering for a new pass, keeping the row cursor.
    pub fn next_pass(&mut self) {
        self.counter = 1;
        self.expanding.clear();
    }
}

/// Walks action trees, resolving groups and shared steps transparently
pub struct Flattener<'a, L: SharedStepLookup + ?Sized> {
    lookup: &'a L,
}

impl<'a, L: SharedStepLookup + ?Sized> Flattener<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self { lookup }
    }

    /// Append one row per step leaf of `actions`, in pre-order.
    pub fn flatten(
        &self,
        actions: &[Action],
        replacements: &ReplacementSet,
        traversal: &mut Traversal,
        rows: &mut Vec<StepRow>,
    ) -> ExportResult<()> {
        for action in actions {
            match action {
                Action::Step(step) => {
                    rows.push(Self::render_step(step, replacements, traversal));
                    traversal.counter += 1;
                    traversal.cursor += 1;
                }
                Action::Group(children) => {
                    self.flatten(children, replacements, traversal, rows)?;
                }
                Action::SharedReference(id) => {
                    self.flatten_shared(*id, replacements, traversal, rows)?;
                }
            }
        }
        Ok(())
    }

    fn flatten_shared(
        &self,
        id: u64,
        replacements: &ReplacementSet,
        traversal: &mut Traversal,
        rows: &mut Vec<StepRow>,
    ) -> ExportResult<()> {
        if traversal.expanding.contains(&id) {
            let chain = traversal
                .expanding
                .iter()
                .chain(std::iter::once(&id))
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(ExportError::SharedStepCycle(chain));
        }

        let shared = self
            .lookup
            .find_shared_step(id)
            .ok_or(ExportError::SharedStepNotFound(id))?;

        traversal.expanding.push(id);
        self.flatten(&shared.actions, replacements, traversal, rows)?;
        traversal.expanding.pop();
        Ok(())
    }

    fn render_step(step: &TestStep, replacements: &ReplacementSet, traversal: &Traversal) -> StepRow {
        let attachments = if step.attachments.is_empty() {
            None
        } else {
            Some(substitute(&step.attachments.join(","), replacements))
        };

        StepRow {
            row: traversal.cursor,
            step_number: Some(traversal.counter),
            label: substitute(&format!("test step {}", traversal.counter), replacements),
            action: substitute(&step.title, replacements),
            attachments,
            expected: substitute(&step.expected, replacements),
        }
    }
}
