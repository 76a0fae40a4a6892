use std::collections::BTreeMap;

use super::TableId;

/// Immutable view of the filtered table set at one poll instant.
///
/// `tables` keeps the exact order the dialect listed them in; task
/// partitioning depends on that order staying stable across polls that
/// observe no change. `duplicates` maps an unqualified name to every
/// identifier sharing it and only holds names with more than one member.
///
/// A snapshot is never mutated after publication. The monitor either reuses
/// the previous one (no change) or replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSet {
    tables: Vec<TableId>,
    duplicates: BTreeMap<String, Vec<TableId>>,
}

impl TableSet {
    /// Builds a snapshot from an already-filtered, ordered table list,
    /// computing the duplicate-name map as it goes.
    pub fn new(tables: Vec<TableId>) -> Self {
        let mut groups: BTreeMap<String, Vec<TableId>> = BTreeMap::new();
        for table in &tables {
            groups.entry(table.name().to_string()).or_default().push(table.clone());
        }
        groups.retain(|_, group| group.len() > 1);
        Self {
            tables,
            duplicates: groups,
        }
    }

    pub fn tables(&self) -> &[TableId] {
        &self.tables
    }

    pub fn duplicates(&self) -> &BTreeMap<String, Vec<TableId>> {
        &self.duplicates
    }

    pub fn has_duplicates(&self) -> bool {
        !self.duplicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
