//! Two-level aggregation and treemap node arrays
//!
//! Leaf shares are relative to the total across all leaves; parent shares are
//! relative to the total across all parents. Child shares are not nested
//! inside their parent's share.

use crate::aggregate::{
    apply_shares_against, grand_totals, label_of, AggregateRow, Dimension, Group, GroupingColumns,
};
use crate::measures::{Measure, MeasureColumns, Totals};
use arkemy_dataset::Table;
use indexmap::IndexMap;
use serde::Serialize;

/// Root node id of a treemap
pub const TREEMAP_ROOT: &str = "total";

/// One parent with its children
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyGroup {
    /// Synthetic parent row summing the children
    pub parent: AggregateRow,
    /// Leaf rows in first-appearance order
    pub children: Vec<AggregateRow>,
}

/// Result of a two-level aggregation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Hierarchy {
    /// Parent groups in first-appearance order
    pub groups: Vec<HierarchyGroup>,
}

/// Chart-ready node arrays; index `i` of every array describes one node
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Treemap {
    /// Unique node ids
    pub ids: Vec<String>,
    /// Display labels
    pub labels: Vec<String>,
    /// Parent node id; empty for the root
    pub parents: Vec<String>,
    /// Node values; parents carry the sum of their children
    pub values: Vec<f64>,
}

impl Hierarchy {
    /// Whether there is nothing to show
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// All parent rows
    pub fn parents(&self) -> impl Iterator<Item = &AggregateRow> {
        self.groups.iter().map(|g| &g.parent)
    }

    /// All leaf rows
    pub fn leaves(&self) -> impl Iterator<Item = &AggregateRow> {
        self.groups.iter().flat_map(|g| g.children.iter())
    }

    /// Node arrays for a treemap of `measure`, rooted at [`TREEMAP_ROOT`]
    #[must_use]
    pub fn treemap(&self, measure: Measure) -> Treemap {
        let mut map = Treemap::default();
        let total: f64 = self.parents().map(|p| p.value(measure)).sum();
        map.push(TREEMAP_ROOT, "Total", "", total);

        for group in &self.groups {
            let parent_id = node_id(&group.parent);
            map.push(&parent_id, &group.parent.label, TREEMAP_ROOT, group.parent.value(measure));
            for child in &group.children {
                let child_id = format!("{parent_id}-{}", node_id(child));
                map.push(&child_id, &child.label, &parent_id, child.value(measure));
            }
        }
        map
    }
}

fn node_id(row: &AggregateRow) -> String {
    row.key.clone().unwrap_or_else(|| row.label.clone())
}

impl Treemap {
    fn push(&mut self, id: &str, label: &str, parent: &str, value: f64) {
        self.ids.push(id.to_string());
        self.labels.push(label.to_string());
        self.parents.push(parent.to_string());
        self.values.push(value);
    }

    /// Number of nodes, root included
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the treemap has no nodes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Aggregate by `parent`, then by `child` inside each parent
///
/// Degenerate input on either dimension yields an empty hierarchy.
#[must_use]
pub fn aggregate_hierarchy(
    parent: &Dimension,
    child: &Dimension,
    table: &Table,
    measures: &MeasureColumns,
) -> Hierarchy {
    let (Some(pcols), Some(ccols)) = (
        GroupingColumns::resolve(parent, table, measures),
        GroupingColumns::resolve(child, table, measures),
    ) else {
        return Hierarchy::default();
    };

    type Leaves = IndexMap<Option<String>, Group>;
    let mut tree: IndexMap<Option<String>, (Group, Leaves)> = IndexMap::new();
    for row in table.rows() {
        let (parent_group, leaves) = tree
            .entry(parent.key(row, pcols.key))
            .or_insert_with(|| (Group::new(parent.distinct_count()), IndexMap::new()));
        parent_group.add_row(row, &pcols.measures, pcols.distinct);
        if parent_group.label.is_none() {
            parent_group.label = pcols.label.and_then(|i| row[i].to_key());
        }
        let leaf = leaves
            .entry(child.key(row, ccols.key))
            .or_insert_with(|| Group::new(child.distinct_count()));
        leaf.add_row(row, &ccols.measures, ccols.distinct);
        if leaf.label.is_none() {
            leaf.label = ccols.label.and_then(|i| row[i].to_key());
        }
    }

    let mut groups: Vec<HierarchyGroup> = tree
        .into_iter()
        .map(|(pkey, (mut parent_group, leaves))| {
            // Parent measures are the sum of its children
            parent_group.totals = Totals::default();
            let children = leaves
                .iter()
                .map(|(ckey, leaf)| {
                    parent_group.totals.add(&leaf.totals);
                    AggregateRow::from_group(ckey.clone(), label_of(child, ckey.as_ref(), leaf), leaf)
                })
                .collect();
            let label = label_of(parent, pkey.as_ref(), &parent_group);
            HierarchyGroup {
                parent: AggregateRow::from_group(pkey, label, &parent_group),
                children,
            }
        })
        .collect();

    let leaf_rows: Vec<AggregateRow> = groups.iter().flat_map(|g| g.children.clone()).collect();
    let leaf_grand = grand_totals(&leaf_rows);
    for group in &mut groups {
        apply_shares_against(&mut group.children, &leaf_grand);
    }
    let parent_rows: Vec<AggregateRow> = groups.iter().map(|g| g.parent.clone()).collect();
    let parent_grand = grand_totals(&parent_rows);
    for group in &mut groups {
        apply_shares_against(std::slice::from_mut(&mut group.parent), &parent_grand);
    }

    tracing::debug!(%parent, %child, groups = groups.len(), "aggregated hierarchy");
    Hierarchy { groups }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arkemy_schema::Value;

    fn sample() -> Table {
        Table::new(["customer_group", "customer_number", "customer_name", "project_number", "hours_used", "fee_record"])
            .with_rows(vec![
                vec!["Public".into(), "C1".into(), "City".into(), "P1".into(), 10.0.into(), 1000.0.into()],
                vec!["Public".into(), "C2".into(), "State".into(), "P2".into(), 30.0.into(), 3000.0.into()],
                vec!["Private".into(), "C3".into(), "Acme".into(), "P3".into(), 60.0.into(), 6000.0.into()],
                vec!["Public".into(), "C1".into(), "City".into(), "P4".into(), 0.0.into(), Value::Null],
            ])
    }

    #[test]
    fn children_share_global_total() {
        let h = aggregate_hierarchy(
            &Dimension::CustomerGroup,
            &Dimension::Customer,
            &sample(),
            &MeasureColumns::actual(),
        );
        assert_eq!(h.groups.len(), 2);
        let public = &h.groups[0];
        assert!((public.parent.shares.hours - 40.0).abs() < 1e-9);
        // C1 is 10% of all hours, not 25% of its parent
        assert!((public.children[0].shares.hours - 10.0).abs() < 1e-9);
        assert_eq!(public.children[0].label, "City");
        assert_eq!(public.children[0].distinct_count, 2);
    }

    #[test]
    fn parent_sums_children() {
        let h = aggregate_hierarchy(
            &Dimension::CustomerGroup,
            &Dimension::Customer,
            &sample(),
            &MeasureColumns::actual(),
        );
        let parents: f64 = h.parents().map(|p| p.totals.fee).sum();
        let leaves: f64 = h.leaves().map(|l| l.totals.fee).sum();
        assert!((parents - leaves).abs() < 1e-9);
    }

    #[test]
    fn treemap_has_root_and_parent_links() {
        let h = aggregate_hierarchy(
            &Dimension::CustomerGroup,
            &Dimension::Customer,
            &sample(),
            &MeasureColumns::actual(),
        );
        let map = h.treemap(Measure::Hours);
        assert_eq!(map.len(), 1 + 2 + 3);
        assert_eq!(map.ids[0], TREEMAP_ROOT);
        assert_eq!(map.parents[0], "");
        assert!((map.values[0] - 100.0).abs() < 1e-9);
        assert_eq!(map.ids[2], "Public-C1");
        assert_eq!(map.parents[2], "Public");
    }

    #[test]
    fn degenerate_child_is_empty() {
        let h = aggregate_hierarchy(
            &Dimension::CustomerGroup,
            &Dimension::Phase,
            &sample(),
            &MeasureColumns::actual(),
        );
        assert!(h.is_empty());
    }
}
