// Copyright (c) 2024 Mike Tsao

use super::{Curve, SerializedCurve};
use crate::{
    error::{AutomatonError, Result},
    traits::Serializable,
    types::CurveUid,
};

/// Owns the curves of an automaton. A curve's [CurveUid] is its slot, and
/// removing a curve leaves its slot empty so that every other uid stays
/// valid. Slots are never reused.
#[derive(Debug, Default)]
pub struct Curves {
    slots: Vec<Option<Curve>>,
}
impl Curves {
    /// Adds a curve in a new slot.
    pub fn insert(&mut self, curve: Curve) -> CurveUid {
        self.slots.push(Some(curve));
        CurveUid(self.slots.len() - 1)
    }

    /// Puts a curve in an empty slot at the end, as when loading saved data
    /// that has holes.
    pub(crate) fn push_slot(&mut self, curve: Option<Curve>) {
        self.slots.push(curve);
    }

    /// Takes a curve out, leaving its slot empty.
    pub fn remove(&mut self, uid: CurveUid) -> Result<Curve> {
        self.slots
            .get_mut(uid.0)
            .and_then(Option::take)
            .ok_or(AutomatonError::CurveNotFound(uid))
    }

    /// The curve in this slot, if there is one.
    pub fn get(&self, uid: CurveUid) -> Option<&Curve> {
        self.slots.get(uid.0).and_then(Option::as_ref)
    }

    /// The curve in this slot, if there is one.
    pub fn get_mut(&mut self, uid: CurveUid) -> Option<&mut Curve> {
        self.slots.get_mut(uid.0).and_then(Option::as_mut)
    }

    /// The curve in this slot.
    pub fn curve(&self, uid: CurveUid) -> Result<&Curve> {
        self.get(uid).ok_or(AutomatonError::CurveNotFound(uid))
    }

    /// The curve in this slot.
    pub fn curve_mut(&mut self, uid: CurveUid) -> Result<&mut Curve> {
        self.get_mut(uid).ok_or(AutomatonError::CurveNotFound(uid))
    }

    /// Every live curve with its uid, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (CurveUid, &Curve)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|c| (CurveUid(i), c)))
    }

    /// Every live curve with its uid, in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (CurveUid, &mut Curve)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, c)| c.as_mut().map(|c| (CurveUid(i), c)))
    }

    /// The number of live curves.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|c| c.is_some()).count()
    }

    /// Whether there are no live curves.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of slots, empty ones included.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Snapshots every slot. Empty slots become `None`.
    pub fn serialize(&self) -> Vec<Option<SerializedCurve>> {
        self.slots
            .iter()
            .map(|c| c.as_ref().map(Curve::serialize))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::AutomatonContext;

    fn curve() -> Curve {
        Curve::new_with(AutomatonContext::default(), 1.0, 10.0).unwrap()
    }

    #[test]
    fn removal_leaves_a_hole() {
        let mut curves = Curves::default();
        let a = curves.insert(curve());
        let b = curves.insert(curve());
        let c = curves.insert(curve());
        assert_eq!((a, b, c), (CurveUid(0), CurveUid(1), CurveUid(2)));

        curves.remove(b).unwrap();
        assert!(curves.get(b).is_none());
        assert!(curves.get(c).is_some(), "later uids still resolve");
        assert_eq!(curves.len(), 2);
        assert_eq!(curves.slot_count(), 3);
        assert!(matches!(
            curves.remove(b),
            Err(AutomatonError::CurveNotFound(_))
        ));

        let d = curves.insert(curve());
        assert_eq!(d, CurveUid(3), "slots aren't reused");
        assert_eq!(
            curves.iter().map(|(uid, _)| uid).collect::<Vec<_>>(),
            vec![a, c, d]
        );

        let serialized = curves.serialize();
        assert_eq!(serialized.len(), 4);
        assert!(serialized[1].is_none());
        assert_eq!(
            serde_json::to_value(&serialized).unwrap()[1],
            serde_json::Value::Null
        );
    }

    #[test]
    fn out_of_range_is_not_found() {
        let mut curves = Curves::default();
        assert!(curves.get(CurveUid(5)).is_none());
        assert!(curves.curve_mut(CurveUid(5)).is_err());
        assert!(curves.is_empty());
    }
}
