//! Deterministic grouping of discovered tables across parallel ingest tasks.


use crate::catalog::TableId;

/// Splits `tables` into `min(max_groups, tables.len())` contiguous slices
/// whose sizes differ by at most one; the first `len % groups` slices carry
/// the extra element.
///
/// Contiguous assignment is a compatibility contract, not an implementation
/// detail: re-partitioning an unchanged ordered list with the same group
/// count must reproduce identical groups so downstream offset and partition
/// tracking does not churn across restarts.
pub fn group_partitions(tables: &[TableId], max_groups: usize) -> Vec<Vec<TableId>> {
    let groups = tables.len().min(max_groups);
    if groups == 0 {
        return Vec::new();
    }
    let base = tables.len() / groups;
    let extra = tables.len() % groups;
    let mut out = Vec::with_capacity(groups);
    let mut start = 0;
    for i in 0..groups {
        let size = base + usize::from(i < extra);
        out.push(tables[start..start + size].to_vec());
        start += size;
    }
    out
}

/// Per-task table assignments. In free-form query mode exactly one
/// assignment is produced regardless of `max_tasks`, and its empty table
/// list is the sentinel for "run the query", not "no tables".
pub fn task_tables(query_mode: bool, tables: &[TableId], max_tasks: usize) -> Vec<Vec<TableId>> {
    if query_mode {
        return vec![Vec::new()];
    }
    group_partitions(tables, max_tasks)
}
