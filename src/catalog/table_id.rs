use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// One addressable table in the external store.
///
/// Identity (equality, ordering, hashing) is the full
/// (catalog, schema, name) triple. Filter matching additionally accepts the
/// quoted and unquoted fully-qualified renderings and the bare name, see
/// [`crate::filter::FilterSpec`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableId {
    catalog: Option<String>,
    schema: Option<String>,
    name: String,
}

impl TableId {
    pub fn new(catalog: Option<String>, schema: Option<String>, name: impl Into<String>) -> Self {
        Self {
            catalog,
            schema,
            name: name.into(),
        }
    }

    pub fn unqualified(name: impl Into<String>) -> Self {
        Self::new(None, None, name)
    }

    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(None, Some(schema.into()), name)
    }

    pub fn catalog(&self) -> Option<&str> {
        self.catalog.as_deref()
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// The unqualified table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dot-joined fully-qualified name with raw, unquoted parts:
    /// `catalog.schema.name`.
    pub fn fqn_unquoted(&self) -> String {
        self.parts().collect::<Vec<_>>().join(".")
    }

    /// Dot-joined fully-qualified name with each part ANSI-quoted:
    /// `"catalog"."schema"."name"`, embedded quotes doubled.
    pub fn fqn_quoted(&self) -> String {
        self.parts().map(quote_part).collect::<Vec<_>>().join(".")
    }

    fn parts(&self) -> impl Iterator<Item = &str> + '_ {
        self.catalog
            .as_deref()
            .into_iter()
            .chain(self.schema.as_deref())
            .chain(Some(self.name.as_str()))
    }
}

fn quote_part(part: &str) -> String {
    format!("\"{}\"", part.replace('"', "\"\""))
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fqn_unquoted())
    }
}
