//! Read-only facts about query trees shared by the rewrite rules.

use std::collections::BTreeSet;

use ontic_core::{DataAtom, DbMetadata, ForeignKeyConstraint, Term, Variable};
use ontic_iq::{ArgumentPosition, IntermediateQuery, NodeId, QueryNode};

/// The atom of an extensional leaf.
pub(crate) fn extensional(query: &IntermediateQuery, id: NodeId) -> Option<&DataAtom> {
    match query.get_node(id)? {
        QueryNode::ExtensionalData(n) => Some(n.atom()),
        _ => None,
    }
}

/// The LEFT and RIGHT children of a left join when both are extensional.
pub(crate) fn extensional_pair(
    query: &IntermediateQuery,
    id: NodeId,
) -> Option<((NodeId, &DataAtom), (NodeId, &DataAtom))> {
    let left = query.get_child_at(id, ArgumentPosition::Left)?;
    let right = query.get_child_at(id, ArgumentPosition::Right)?;
    Some((
        (left, extensional(query, left)?),
        (right, extensional(query, right)?),
    ))
}

/// Variables that cannot be NULL in the output of `id`.
pub(crate) fn non_null_variables(
    query: &IntermediateQuery,
    id: NodeId,
    metadata: &DbMetadata,
) -> BTreeSet<Variable> {
    let children = query.get_children(id);
    match query.get_node(id) {
        Some(QueryNode::ExtensionalData(n)) => metadata.non_null_variables(n.atom()),
        Some(QueryNode::Construction(c)) => {
            let below = children
                .first()
                .map(|child| non_null_variables(query, *child, metadata))
                .unwrap_or_default();
            c.projection()
                .iter()
                .filter(|v| c.definition(v).is_non_null(&below))
                .cloned()
                .collect()
        }
        Some(QueryNode::Filter(_) | QueryNode::InnerJoin(_)) => children
            .iter()
            .flat_map(|child| non_null_variables(query, *child, metadata))
            .collect(),
        // Right-side variables are NULL when no match exists.
        Some(QueryNode::LeftJoin(_)) => query
            .get_child_at(id, ArgumentPosition::Left)
            .map(|left| non_null_variables(query, left, metadata))
            .unwrap_or_default(),
        Some(QueryNode::Union(_)) => {
            let mut sets = children
                .iter()
                .map(|child| non_null_variables(query, *child, metadata));
            let first = sets.next().unwrap_or_default();
            sets.fold(first, |acc, set| acc.intersection(&set).cloned().collect())
        }
        Some(QueryNode::IntensionalData(_)) | None => BTreeSet::new(),
    }
}

/// Whether none of `variables` is mentioned by a node other than `excluded`.
pub(crate) fn unused_elsewhere(
    query: &IntermediateQuery,
    excluded: NodeId,
    variables: &BTreeSet<Variable>,
) -> bool {
    query
        .nodes_top_down()
        .iter()
        .filter(|n| **n != excluded)
        .filter_map(|n| query.get_node(*n))
        .all(|node| node.local_variables().is_disjoint(variables))
}

/// How the arguments of a removable atom relate to the atom that stays.
#[derive(Debug, Default)]
pub(crate) struct ArgumentShape {
    /// Columns holding a variable of the kept atom.
    pub(crate) shared_columns: BTreeSet<usize>,
    /// Variables occurring only in the removable atom.
    pub(crate) local: BTreeSet<Variable>,
}

impl ArgumentShape {
    /// Classify the arguments of `atom`. Returns `None` when the atom carries
    /// a constant or repeats a local variable, since either one filters rows.
    pub(crate) fn of(atom: &DataAtom, kept: &BTreeSet<Variable>) -> Option<Self> {
        let mut shape = Self::default();
        for (index, term) in atom.arguments().iter().enumerate() {
            let Term::Variable(v) = term else {
                return None;
            };
            if kept.contains(v) {
                shape.shared_columns.insert(index + 1);
            } else if !shape.local.insert(v.clone()) {
                return None;
            }
        }
        Some(shape)
    }
}

/// Whether every column pair of `fk` holds the same term in `source` and
/// `target`, and the columns of `target` that hold shared terms are exactly
/// the referenced ones.
pub(crate) fn foreign_key_matches(
    fk: &ForeignKeyConstraint,
    source: &DataAtom,
    target: &DataAtom,
    target_shared: &BTreeSet<usize>,
) -> bool {
    let referenced: BTreeSet<usize> = fk.target_columns().iter().copied().collect();
    referenced == *target_shared
        && fk.column_pairs().all(|(s, t)| {
            matches!((source.column(s), target.column(t)), (Some(a), Some(b)) if a == b)
        })
}
