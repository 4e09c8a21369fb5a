//! second pass: resolution
use super::Reducer;
use crate::error::Error;
use crate::value::Value;

/// Top level entries resolved before everything else, in this order
const NAMESPACES: [&str; 3] = ["locals", "variable", "data"];

/// One step from the document root to a value
#[derive(Debug, Clone)]
pub(super) enum Step {
    Key(String),
    Index(usize),
}

impl Reducer<'_> {
    /// Replace every unevaluated node in the document by its value
    pub(crate) fn resolve_document(&mut self) -> Result<(), Error> {
        let keys: Vec<String> = NAMESPACES
            .iter()
            .filter(|key| self.document.contains_key(**key))
            .map(|key| key.to_string())
            .chain(
                self.document
                    .keys()
                    .filter(|key| !NAMESPACES.contains(&key.as_str()))
                    .cloned(),
            )
            .collect();

        for key in keys {
            tracing::debug!(%key, "resolving");
            self.resolve_path(&mut vec![Step::Key(key)])?;
        }
        Ok(())
    }

    /// Reduce everything below `path` in place
    pub(super) fn resolve_path(&mut self, path: &mut Vec<Step>) -> Result<(), Error> {
        let steps: Vec<Step> = match self.slot(path) {
            Some(Value::Map(map)) => map.keys().cloned().map(Step::Key).collect(),
            Some(Value::List(list)) => (0..list.len()).map(Step::Index).collect(),
            Some(Value::Node(_)) => return self.force_slot(path),
            _ => return Ok(()),
        };

        for step in steps {
            path.push(step);
            self.resolve_path(path)?;
            path.pop();
        }
        Ok(())
    }

    /// Reduce the value at `path` if it is still unevaluated, and store the result there
    ///
    /// Every later read of the slot sees the stored value, so each attribute is evaluated once.
    pub(super) fn force_slot(&mut self, path: &[Step]) -> Result<(), Error> {
        let node = match self.slot(path) {
            Some(Value::Node(node)) => node.as_ref().clone(),
            _ => return Ok(()),
        };

        let value = self.reduce_node(&node)?;
        tracing::trace!(?path, %value, "resolved");
        if let Some(slot) = self.slot_mut(path) {
            *slot = value;
        }
        Ok(())
    }

    pub(super) fn slot(&self, path: &[Step]) -> Option<&Value> {
        let (Step::Key(root), rest) = path.split_first()? else {
            return None;
        };
        rest.iter()
            .try_fold(self.document.get(root)?, |value, step| match (value, step) {
                (Value::Map(map), Step::Key(key)) => map.get(key),
                (Value::List(list), Step::Index(index)) => list.get(*index),
                _ => None,
            })
    }

    fn slot_mut(&mut self, path: &[Step]) -> Option<&mut Value> {
        let (Step::Key(root), rest) = path.split_first()? else {
            return None;
        };
        rest.iter()
            .try_fold(self.document.get_mut(root)?, |value, step| match (value, step) {
                (Value::Map(map), Step::Key(key)) => map.get_mut(key),
                (Value::List(list), Step::Index(index)) => list.get_mut(*index),
                _ => None,
            })
    }
}
