//! The state diff engine.
//!
//! [`StateDiff::compute`] walks two snapshot trees in lock-step and emits
//! one edit per path whose value differs; [`StateDiff::apply`] replays the
//! edits against a copy of the prior snapshot. The contract both peers
//! rely on: for any two snapshots `s1`, `s2`,
//! `compute(s1, s2).apply(s1) == s2`, byte-for-byte after serialization,
//! and `compute(s, s)` is empty.
//!
//! Arrays whose elements all carry a string `"id"` field (players, cards)
//! are matched by that id rather than by position, so removing a card
//! from the middle of a hand never shifts the meaning of the remaining
//! edits. Arrays of plain values fall back to positional matching, with
//! trailing removals emitted highest-index-first so index paths stay
//! valid while edits apply in order. If the surviving ids of an id-keyed
//! array come back in a different relative order (a pure reorder), the
//! whole array is replaced with one edit; exactness wins over minimality
//! in that cold case.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{GameState, StateError};

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// One step of a path into a snapshot tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "seg", rename_all = "snake_case")]
pub enum Seg {
    /// An object field.
    Field { name: String },
    /// A positional array element.
    Index { index: usize },
    /// An array element matched by its stable `"id"` field.
    Id { id: String },
}

/// A path from the snapshot root to one edited value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(pub Vec<Seg>);

impl Path {
    /// The snapshot root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns this path extended by one segment.
    fn child(&self, seg: Seg) -> Self {
        let mut segs = self.0.clone();
        segs.push(seg);
        Self(segs)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "$");
        }
        write!(f, "$")?;
        for seg in &self.0 {
            match seg {
                Seg::Field { name } => write!(f, ".{name}")?,
                Seg::Index { index } => write!(f, "[{index}]")?,
                Seg::Id { id } => write!(f, "{{{id}}}")?,
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Edits
// ---------------------------------------------------------------------------

/// What happened at a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DiffKind {
    /// The value exists in the new snapshot but not the old one.
    /// For id-keyed array elements, `index` is the element's position in
    /// the new array; elsewhere it is absent.
    Added {
        value: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    /// The value exists in the old snapshot but not the new one.
    Removed,
    /// The value exists in both snapshots and differs.
    Changed { value: Value },
}

/// One edit: a path and the operation at it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffOp {
    pub path: Path,
    #[serde(flatten)]
    pub kind: DiffKind,
}

/// An ordered list of edits transforming one snapshot into another.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateDiff(pub Vec<DiffOp>);

impl StateDiff {
    /// Computes the edits that turn `prior` into `next`.
    pub fn compute(prior: &Value, next: &Value) -> Self {
        let mut ops = Vec::new();
        diff_value(&Path::root(), prior, next, &mut ops);
        Self(ops)
    }

    /// Applies the edits, in emission order, to a copy of `prior`.
    pub fn apply(&self, prior: &Value) -> Result<Value, StateError> {
        let mut next = prior.clone();
        for op in &self.0 {
            apply_op(&mut next, op)?;
        }
        Ok(next)
    }

    /// Computes the diff between two typed snapshots.
    pub fn between(
        prior: &GameState,
        next: &GameState,
    ) -> Result<Self, StateError> {
        Ok(Self::compute(&prior.to_value()?, &next.to_value()?))
    }

    /// Applies the diff to a typed snapshot, yielding the new snapshot.
    pub fn apply_to(&self, prior: &GameState) -> Result<GameState, StateError> {
        GameState::from_value(self.apply(&prior.to_value()?)?)
    }

    /// Returns `true` if the diff contains no edits.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of edits in the diff.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

// ---------------------------------------------------------------------------
// Compute
// ---------------------------------------------------------------------------

fn diff_value(path: &Path, prior: &Value, next: &Value, ops: &mut Vec<DiffOp>) {
    match (prior, next) {
        (Value::Object(a), Value::Object(b)) => {
            for (key, va) in a {
                let child = path.child(Seg::Field { name: key.clone() });
                match b.get(key) {
                    Some(vb) => diff_value(&child, va, vb, ops),
                    None => ops.push(DiffOp {
                        path: child,
                        kind: DiffKind::Removed,
                    }),
                }
            }
            for (key, vb) in b {
                if !a.contains_key(key) {
                    ops.push(DiffOp {
                        path: path.child(Seg::Field { name: key.clone() }),
                        kind: DiffKind::Added {
                            value: vb.clone(),
                            index: None,
                        },
                    });
                }
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            if id_keyed(a) && id_keyed(b) {
                diff_array_by_id(path, a, b, next, ops);
            } else {
                diff_array_by_index(path, a, b, ops);
            }
        }
        (a, b) if a == b => {}
        (_, b) => ops.push(DiffOp {
            path: path.clone(),
            kind: DiffKind::Changed { value: b.clone() },
        }),
    }
}

/// Returns the stable id of an array element, if it has one.
fn elem_id(elem: &Value) -> Option<&str> {
    elem.as_object()?.get("id")?.as_str()
}

/// An array is id-keyed when every element carries a string `"id"` field.
/// Vacuously true for an empty array, so emptied or newly filled hands
/// still diff by id against their non-empty counterpart.
fn id_keyed(arr: &[Value]) -> bool {
    arr.iter().all(|e| elem_id(e).is_some())
}

fn diff_array_by_id(
    path: &Path,
    a: &[Value],
    b: &[Value],
    whole_next: &Value,
    ops: &mut Vec<DiffOp>,
) {
    // `id_keyed` has been checked by the caller, so the default never fires.
    let a_ids: Vec<&str> =
        a.iter().map(|e| elem_id(e).unwrap_or_default()).collect();
    let b_ids: Vec<&str> =
        b.iter().map(|e| elem_id(e).unwrap_or_default()).collect();
    let a_pos: HashMap<&str, usize> =
        a_ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let b_pos: HashMap<&str, usize> =
        b_ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

    // Duplicate ids make by-id matching ambiguous; replace wholesale.
    if a_pos.len() != a.len() || b_pos.len() != b.len() {
        ops.push(DiffOp {
            path: path.clone(),
            kind: DiffKind::Changed {
                value: whole_next.clone(),
            },
        });
        return;
    }

    // A pure reorder of surviving elements cannot be expressed as
    // id-keyed add/remove edits; replace the array in one edit.
    let survivors_a: Vec<&str> = a_ids
        .iter()
        .copied()
        .filter(|id| b_pos.contains_key(id))
        .collect();
    let survivors_b: Vec<&str> = b_ids
        .iter()
        .copied()
        .filter(|id| a_pos.contains_key(id))
        .collect();
    if survivors_a != survivors_b {
        ops.push(DiffOp {
            path: path.clone(),
            kind: DiffKind::Changed {
                value: whole_next.clone(),
            },
        });
        return;
    }

    // Removals first, in old-array order.
    for id in &a_ids {
        if !b_pos.contains_key(id) {
            ops.push(DiffOp {
                path: path.child(Seg::Id { id: id.to_string() }),
                kind: DiffKind::Removed,
            });
        }
    }

    // Survivors recurse under their id segment.
    for id in &survivors_a {
        let va = &a[a_pos[id]];
        let vb = &b[b_pos[id]];
        diff_value(&path.child(Seg::Id { id: id.to_string() }), va, vb, ops);
    }

    // Additions last, ascending by their position in the new array. With
    // removals already applied and survivors keeping relative order, every
    // element before position `i` is present by the time this edit runs,
    // so inserting at `i` lands the element exactly where `next` has it.
    for (i, (elem, id)) in b.iter().zip(&b_ids).enumerate() {
        if !a_pos.contains_key(id) {
            ops.push(DiffOp {
                path: path.child(Seg::Id { id: id.to_string() }),
                kind: DiffKind::Added {
                    value: elem.clone(),
                    index: Some(i),
                },
            });
        }
    }
}

fn diff_array_by_index(
    path: &Path,
    a: &[Value],
    b: &[Value],
    ops: &mut Vec<DiffOp>,
) {
    let common = a.len().min(b.len());
    for i in 0..common {
        diff_value(&path.child(Seg::Index { index: i }), &a[i], &b[i], ops);
    }
    if b.len() > a.len() {
        for (i, elem) in b.iter().enumerate().skip(a.len()) {
            ops.push(DiffOp {
                path: path.child(Seg::Index { index: i }),
                kind: DiffKind::Added {
                    value: elem.clone(),
                    index: None,
                },
            });
        }
    } else {
        // Highest index first: earlier removals must not shift the
        // indices of later ones.
        for i in (b.len()..a.len()).rev() {
            ops.push(DiffOp {
                path: path.child(Seg::Index { index: i }),
                kind: DiffKind::Removed,
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Apply
// ---------------------------------------------------------------------------

fn apply_op(root: &mut Value, op: &DiffOp) -> Result<(), StateError> {
    let Some((last, prefix)) = op.path.0.split_last() else {
        // Root edit: only a wholesale replacement makes sense.
        return match &op.kind {
            DiffKind::Changed { value } => {
                *root = value.clone();
                Ok(())
            }
            _ => Err(StateError::InvalidEdit {
                path: op.path.to_string(),
                reason: "only `changed` can target the root".into(),
            }),
        };
    };

    let parent = navigate(root, prefix, &op.path)?;
    match last {
        Seg::Field { name } => apply_in_object(parent, name, op),
        Seg::Index { index } => apply_in_array_at(parent, *index, op),
        Seg::Id { id } => apply_in_array_by_id(parent, id, op),
    }
}

/// Walks `segs` down from `root`, returning the value they lead to.
fn navigate<'a>(
    root: &'a mut Value,
    segs: &[Seg],
    full: &Path,
) -> Result<&'a mut Value, StateError> {
    let mut cur = root;
    for seg in segs {
        cur = match seg {
            Seg::Field { name } => cur
                .as_object_mut()
                .and_then(|obj| obj.get_mut(name))
                .ok_or_else(|| StateError::PathNotFound(full.to_string()))?,
            Seg::Index { index } => cur
                .as_array_mut()
                .and_then(|arr| arr.get_mut(*index))
                .ok_or_else(|| StateError::PathNotFound(full.to_string()))?,
            Seg::Id { id } => {
                let arr = cur
                    .as_array_mut()
                    .ok_or_else(|| StateError::PathNotFound(full.to_string()))?;
                let pos = arr
                    .iter()
                    .position(|e| elem_id(e) == Some(id))
                    .ok_or_else(|| StateError::PathNotFound(full.to_string()))?;
                &mut arr[pos]
            }
        };
    }
    Ok(cur)
}

fn apply_in_object(
    parent: &mut Value,
    name: &str,
    op: &DiffOp,
) -> Result<(), StateError> {
    let obj = parent
        .as_object_mut()
        .ok_or_else(|| StateError::InvalidEdit {
            path: op.path.to_string(),
            reason: "parent is not an object".into(),
        })?;
    match &op.kind {
        DiffKind::Added { value, .. } | DiffKind::Changed { value } => {
            obj.insert(name.to_string(), value.clone());
            Ok(())
        }
        DiffKind::Removed => {
            obj.remove(name)
                .map(|_| ())
                .ok_or_else(|| StateError::PathNotFound(op.path.to_string()))
        }
    }
}

fn apply_in_array_at(
    parent: &mut Value,
    index: usize,
    op: &DiffOp,
) -> Result<(), StateError> {
    let arr = parent
        .as_array_mut()
        .ok_or_else(|| StateError::InvalidEdit {
            path: op.path.to_string(),
            reason: "parent is not an array".into(),
        })?;
    match &op.kind {
        DiffKind::Added { value, .. } => {
            if index > arr.len() {
                return Err(StateError::InvalidEdit {
                    path: op.path.to_string(),
                    reason: format!(
                        "insert index {index} out of range for length {}",
                        arr.len()
                    ),
                });
            }
            arr.insert(index, value.clone());
            Ok(())
        }
        DiffKind::Changed { value } => {
            let slot = arr
                .get_mut(index)
                .ok_or_else(|| StateError::PathNotFound(op.path.to_string()))?;
            *slot = value.clone();
            Ok(())
        }
        DiffKind::Removed => {
            if index >= arr.len() {
                return Err(StateError::PathNotFound(op.path.to_string()));
            }
            arr.remove(index);
            Ok(())
        }
    }
}

fn apply_in_array_by_id(
    parent: &mut Value,
    id: &str,
    op: &DiffOp,
) -> Result<(), StateError> {
    let arr = parent
        .as_array_mut()
        .ok_or_else(|| StateError::InvalidEdit {
            path: op.path.to_string(),
            reason: "parent is not an array".into(),
        })?;
    match &op.kind {
        DiffKind::Added { value, index } => {
            let at = index.ok_or_else(|| StateError::InvalidEdit {
                path: op.path.to_string(),
                reason: "id-keyed insert is missing its position".into(),
            })?;
            if at > arr.len() {
                return Err(StateError::InvalidEdit {
                    path: op.path.to_string(),
                    reason: format!(
                        "insert index {at} out of range for length {}",
                        arr.len()
                    ),
                });
            }
            arr.insert(at, value.clone());
            Ok(())
        }
        DiffKind::Changed { value } => {
            let pos = arr
                .iter()
                .position(|e| elem_id(e) == Some(id))
                .ok_or_else(|| StateError::PathNotFound(op.path.to_string()))?;
            arr[pos] = value.clone();
            Ok(())
        }
        DiffKind::Removed => {
            let pos = arr
                .iter()
                .position(|e| elem_id(e) == Some(id))
                .ok_or_else(|| StateError::PathNotFound(op.path.to_string()))?;
            arr.remove(pos);
            Ok(())
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
