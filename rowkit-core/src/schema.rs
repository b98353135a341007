use crate::{Value, util::default_table_name};

/// Identity column flavour of a row contract.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    #[default]
    None,
    Integer,
    /// Integer generated by the database, read back after an upsert.
    AutoInteger,
    String,
    Uuid,
}

impl IdentityKind {
    pub fn is_some(&self) -> bool {
        *self != IdentityKind::None
    }
}

#[derive(Debug, Clone)]
pub struct ColumnDef {
    /// Contract property, lowerCamel.
    pub property: &'static str,
    /// Unquoted column name.
    pub column: &'static str,
    /// Typed null, it defines the variant stored for this column.
    pub value: Value,
    pub identity: bool,
}

/// Schema descriptor of a row contract, built once per contract.
#[derive(Debug, Clone)]
pub struct RowSchema {
    pub name: &'static str,
    pub table: String,
    pub alias: String,
    pub identity: IdentityKind,
    /// Sorted by column name.
    pub columns: Box<[ColumnDef]>,
}

impl RowSchema {
    pub const IDENTITY: &'static str = "id";

    /// Build the schema of contract `name`, the table and alias default to the snake
    /// case name without the `Row` suffix.
    pub fn new(
        name: &'static str,
        identity: IdentityKind,
        columns: impl IntoIterator<Item = ColumnDef>,
    ) -> Self {
        let mut columns: Vec<_> = columns.into_iter().collect();
        columns.sort_by(|a, b| a.column.cmp(b.column));
        let table = default_table_name(name);
        Self {
            name,
            alias: table.clone(),
            table,
            identity,
            columns: columns.into(),
        }
    }

    /// Override the table, an alias still matching the old table follows it.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        let table = table.into();
        if self.alias == self.table {
            self.alias = table.clone();
        }
        self.table = table;
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn has_identity(&self) -> bool {
        self.identity.is_some()
    }

    pub fn identity_def(&self) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.identity)
    }

    /// Non identity columns, sorted.
    pub fn data_columns(&self) -> impl Iterator<Item = &ColumnDef> + Clone {
        self.columns.iter().filter(|c| !c.identity)
    }

    pub fn column(&self, column: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.column == column)
    }

    pub fn property(&self, property: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.property == property)
    }

    /// Number of projected columns: data columns plus the identity slot, that is
    /// always present either as the identity or as a null placeholder.
    pub fn width(&self) -> usize {
        self.data_columns().count() + 1
    }
}
