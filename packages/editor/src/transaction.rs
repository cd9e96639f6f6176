//! # Transactions
//!
//! In-memory checkpoints of the whole document. Each `begin` pushes the
//! serialized document, so nested transactions restore the state of
//! their own depth:
//!
//! ```text
//! begin (depth 0)  ── checkpoint A
//!   begin (depth 1) ── checkpoint B
//!   rollback        → restores B, depth 0 still open
//! rollback          → restores A
//! ```

use crate::project::Project;
use crate::EditorError;
use tracing::debug;

#[derive(Debug, Clone)]
struct Checkpoint {
    description: String,
    content: String,
    version: u64,
}

/// Stack of open transactions
#[derive(Debug, Default)]
pub struct TransactionStack {
    checkpoints: Vec<Checkpoint>,
}

impl TransactionStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open transactions
    pub fn depth(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_active(&self) -> bool {
        !self.checkpoints.is_empty()
    }

    /// Capture the project state. Returns the depth of the new transaction.
    pub fn begin(&mut self, project: &Project, description: &str) -> usize {
        let depth = self.checkpoints.len();
        self.checkpoints.push(Checkpoint {
            description: description.to_string(),
            content: project.to_xml_string(),
            version: project.version,
        });
        debug!(depth, description, "began transaction");
        depth
    }

    /// Close the innermost transaction, keeping its changes
    pub fn commit(&mut self) -> Result<(), EditorError> {
        let checkpoint = self.checkpoints.pop().ok_or(EditorError::NoActiveTransaction)?;
        debug!(depth = self.checkpoints.len(), description = %checkpoint.description, "committed transaction");
        Ok(())
    }

    /// Close the innermost transaction, restoring its checkpoint
    pub fn rollback(&mut self, project: &mut Project) -> Result<(), EditorError> {
        let depth = self
            .checkpoints
            .len()
            .checked_sub(1)
            .ok_or(EditorError::NoActiveTransaction)?;
        self.rollback_to(project, depth)
    }

    /// Close every transaction from `depth` inward, keeping the changes
    pub fn commit_to(&mut self, depth: usize) -> Result<(), EditorError> {
        if depth >= self.checkpoints.len() {
            return Err(EditorError::NoActiveTransaction);
        }
        self.checkpoints.truncate(depth);
        debug!(depth, "committed transactions");
        Ok(())
    }

    /// Close every transaction from `depth` inward, restoring the
    /// checkpoint taken when `depth` began
    pub fn rollback_to(&mut self, project: &mut Project, depth: usize) -> Result<(), EditorError> {
        if depth >= self.checkpoints.len() {
            return Err(EditorError::NoActiveTransaction);
        }
        let checkpoint = self.checkpoints.swap_remove(depth);
        self.checkpoints.truncate(depth);

        project.replace_content(&checkpoint.content)?;
        project.version = checkpoint.version;
        debug!(depth, description = %checkpoint.description, "rolled back transaction");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutations::Mutation;
    use crate::test_support::sample_project;

    fn ripple(project: &mut Project, clip_ref: &str) {
        project
            .apply(&Mutation::RippleDelete {
                clip_ref: clip_ref.into(),
            })
            .unwrap();
    }

    #[test]
    fn test_commit_and_rollback_require_open_transaction() {
        let mut project = sample_project();
        let mut stack = TransactionStack::new();
        assert!(matches!(stack.commit(), Err(EditorError::NoActiveTransaction)));
        assert!(matches!(stack.rollback(&mut project), Err(EditorError::NoActiveTransaction)));
    }

    #[test]
    fn test_rollback_restores_checkpoint() {
        let mut project = sample_project();
        let original = project.to_xml_string();
        let mut stack = TransactionStack::new();

        stack.begin(&project, "edit");
        ripple(&mut project, "clip_a");
        stack.rollback(&mut project).unwrap();

        assert_eq!(project.to_xml_string(), original);
        assert_eq!(project.version, 0);
        assert!(project.index().track_of("clip_a").is_some());
        assert!(!stack.is_active());
    }

    #[test]
    fn test_nested_rollback_restores_its_own_depth() {
        let mut project = sample_project();
        let mut stack = TransactionStack::new();

        let outer = stack.begin(&project, "outer");
        ripple(&mut project, "clip_a");
        let after_outer_edit = project.to_xml_string();

        stack.begin(&project, "inner");
        ripple(&mut project, "clip_b");
        stack.rollback(&mut project).unwrap();

        assert_eq!(project.to_xml_string(), after_outer_edit);
        assert_eq!(stack.depth(), 1);

        stack.rollback_to(&mut project, outer).unwrap();
        assert!(project.index().track_of("clip_a").is_some());
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_commit_to_closes_inner_transactions() {
        let project = sample_project();
        let mut stack = TransactionStack::new();
        let outer = stack.begin(&project, "outer");
        stack.begin(&project, "inner");
        stack.commit_to(outer).unwrap();
        assert!(!stack.is_active());
        assert!(stack.commit_to(0).is_err());
    }
}
