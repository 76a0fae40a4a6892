//! Allow-list / deny-list filtering of discovered tables.


use std::collections::BTreeSet;

use crate::catalog::TableId;
use crate::config::MonitorConfig;

/// Which configuration setting produced the active filter; used to tell the
/// operator what to narrow when duplicate unqualified names survive
/// filtering. Carried explicitly so error messages never reach for global
/// config constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSetting {
    Allow,
    Deny,
    Either,
}

impl FilterSetting {
    pub fn config_text(&self) -> &'static str {
        match self {
            FilterSetting::Allow => "'table_allowlist'",
            FilterSetting::Deny => "'table_denylist'",
            FilterSetting::Either => "'table_allowlist' or 'table_denylist'",
        }
    }
}

/// User-facing table filter. Exactly one mode is active at a time;
/// [`MonitorConfig::validate`] rejects configs that populate both lists
/// before a monitor is ever constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSpec {
    Allow(BTreeSet<String>),
    Deny(BTreeSet<String>),
    PassThrough,
}

impl FilterSpec {
    /// Derives the filter from an already-validated config. Free-form query
    /// mode forces an empty allow-list: the single query task covers
    /// everything, so every discovered table is filtered out.
    pub fn from_config(config: &MonitorConfig) -> Self {
        if config.query_mode() {
            return FilterSpec::Allow(BTreeSet::new());
        }
        if !config.table_allowlist.is_empty() {
            FilterSpec::Allow(config.table_allowlist.iter().cloned().collect())
        } else if !config.table_denylist.is_empty() {
            FilterSpec::Deny(config.table_denylist.iter().cloned().collect())
        } else {
            FilterSpec::PassThrough
        }
    }

    /// Applies the filter, preserving the input order.
    pub fn apply(&self, tables: Vec<TableId>) -> Vec<TableId> {
        match self {
            FilterSpec::Allow(set) => tables.into_iter().filter(|t| Self::matches(set, t)).collect(),
            FilterSpec::Deny(set) => tables.into_iter().filter(|t| !Self::matches(set, t)).collect(),
            FilterSpec::PassThrough => tables,
        }
    }

    /// A table matches a filter entry by its unquoted fully-qualified name,
    /// its quoted fully-qualified name, or its bare name.
    fn matches(set: &BTreeSet<String>, table: &TableId) -> bool {
        set.contains(&table.fqn_unquoted()) || set.contains(&table.fqn_quoted()) || set.contains(table.name())
    }

    pub fn setting(&self) -> FilterSetting {
        match self {
            FilterSpec::Allow(_) => FilterSetting::Allow,
            FilterSpec::Deny(_) => FilterSetting::Deny,
            FilterSpec::PassThrough => FilterSetting::Either,
        }
    }
}
