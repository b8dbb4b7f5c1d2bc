//! Path store
//!
//! Ids are indices into a slot vector. Erasing a path empties its slot;
//! slots are never reused, so a stale id always fails with `UnknownPath`.

use log::debug;

use super::Path;
use crate::error::PlannerError;
use crate::PathId;

#[derive(Debug, Clone, Default)]
pub struct PathStore {
    slots: Vec<Option<Path>>,
}

impl PathStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: Path) -> PathId {
        self.slots.push(Some(path));
        self.slots.len() - 1
    }

    pub fn get(&self, id: PathId) -> Result<&Path, PlannerError> {
        self.slots
            .get(id)
            .and_then(Option::as_ref)
            .ok_or(PlannerError::UnknownPath(id))
    }

    pub fn get_mut(&mut self, id: PathId) -> Result<&mut Path, PlannerError> {
        self.slots
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(PlannerError::UnknownPath(id))
    }

    pub fn contains(&self, id: PathId) -> bool {
        self.get(id).is_ok()
    }

    pub fn erase(&mut self, id: PathId) -> Result<Path, PlannerError> {
        let path = self
            .slots
            .get_mut(id)
            .and_then(Option::take)
            .ok_or(PlannerError::UnknownPath(id))?;
        debug!("[PathStore] erased path {}", id);
        Ok(path)
    }

    /// Append path `b` to path `a`; `b` is consumed
    pub fn concatenate(&mut self, a: PathId, b: PathId) -> Result<(), PlannerError> {
        if a == b {
            return Err(PlannerError::InvalidArgument(format!(
                "cannot concatenate path {} with itself",
                a
            )));
        }
        let second = self.get(b)?.clone();
        let first = self.get_mut(a)?;
        if !first.concat(&second) {
            return Err(PlannerError::DiscontinuousPaths { first: a, second: b });
        }
        self.slots[b] = None;
        debug!("[PathStore] concatenated path {} into {}", b, a);
        Ok(())
    }

    /// Live ids in increasing order
    pub fn path_ids(&self) -> Vec<PathId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::WeighedDistance;
    use approx::assert_relative_eq;
    use cspace_core::model::{ConfigurationModel, KinematicTree};
    use nalgebra::DVector;
    use std::sync::Arc;

    fn segment(model: &Arc<dyn ConfigurationModel>, from: [f64; 2], to: [f64; 2]) -> Path {
        let distance = WeighedDistance::new(model.clone());
        Path::straight(
            model.clone(),
            &distance,
            DVector::from_column_slice(&from),
            DVector::from_column_slice(&to),
        )
        .unwrap()
    }

    fn model() -> Arc<dyn ConfigurationModel> {
        Arc::new(KinematicTree::free_point(&[(-5.0, 5.0), (-5.0, 5.0)], 0.1).unwrap())
    }

    #[test]
    fn test_ids_are_never_reused() {
        let model = model();
        let mut store = PathStore::new();
        let a = store.add(segment(&model, [0.0, 0.0], [1.0, 0.0]));
        let b = store.add(segment(&model, [1.0, 0.0], [2.0, 0.0]));
        store.erase(a).unwrap();
        let c = store.add(segment(&model, [2.0, 0.0], [3.0, 0.0]));
        assert_ne!(c, a);
        assert!(matches!(store.get(a), Err(PlannerError::UnknownPath(_))));
        assert!(store.get(b).is_ok());
        assert_eq!(store.path_ids(), vec![b, c]);
        assert_eq!(store.len(), 2);
        assert!(store.erase(a).is_err());
    }

    #[test]
    fn test_concatenate_consumes_second() {
        let model = model();
        let mut store = PathStore::new();
        let a = store.add(segment(&model, [0.0, 0.0], [1.0, 0.0]));
        let b = store.add(segment(&model, [1.0, 0.0], [1.0, 2.0]));
        let (la, lb) = (store.get(a).unwrap().length(), store.get(b).unwrap().length());

        store.concatenate(a, b).unwrap();
        assert_relative_eq!(store.get(a).unwrap().length(), la + lb, epsilon = 1e-12);
        assert!(matches!(store.get(b), Err(PlannerError::UnknownPath(id)) if id == b));
        assert!(store.concatenate(a, b).is_err());
    }

    #[test]
    fn test_concatenate_discontinuous_leaves_store_unchanged() {
        let model = model();
        let mut store = PathStore::new();
        let a = store.add(segment(&model, [0.0, 0.0], [1.0, 0.0]));
        let b = store.add(segment(&model, [3.0, 0.0], [4.0, 0.0]));
        assert!(matches!(
            store.concatenate(a, b),
            Err(PlannerError::DiscontinuousPaths { .. })
        ));
        assert_relative_eq!(store.get(a).unwrap().length(), 1.0);
        assert!(store.get(b).is_ok());
    }
}
