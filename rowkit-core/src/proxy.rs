use crate::{AsValue, ColumnCodec, Error, Result, RowSchema, Value, coerce_value, util::quote_identifier};
use std::{
    collections::BTreeMap,
    fmt::{self, Debug},
    ops::{Deref, DerefMut},
};

/// A row contract: a struct whose `Option` fields are the columns of a table.
///
/// Usually derived with `#[derive(Row)]`, the implementation maps contract
/// properties (lowerCamel) to the fields of the struct.
pub trait RowContract: Default + Clone + Send + Sync + 'static {
    fn schema() -> &'static RowSchema;
    /// Current value of `property`, a typed null when unset or unknown.
    fn read(&self, property: &str) -> Value;
    /// Store `value` into `property`, a null value clears it.
    fn write(&mut self, property: &str, value: Value) -> Result<()>;
}

/// Live row: the current state of a row contract plus the baseline it was loaded with.
///
/// A column is dirty when its current value differs from the baseline, unset and
/// null are the same thing. Derefs to the row so fields can be mutated directly.
#[derive(Clone)]
pub struct RowProxy<R: RowContract> {
    row: R,
    baseline: R,
    identifier_quote: String,
    table: Option<String>,
}

impl<R: RowContract> Default for RowProxy<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RowContract> RowProxy<R> {
    pub const DEFAULT_QUOTE: &'static str = "`";

    pub fn new() -> Self {
        Self {
            row: R::default(),
            baseline: R::default(),
            identifier_quote: Self::DEFAULT_QUOTE.into(),
            table: None,
        }
    }

    /// Wrap `row` as a newly defined row: every set column is dirty.
    pub fn from_row(row: R) -> Self {
        Self {
            row,
            ..Self::new()
        }
    }

    pub fn schema(&self) -> &'static RowSchema {
        R::schema()
    }

    pub fn codec(&self) -> ColumnCodec<'_> {
        ColumnCodec::new(R::schema(), &self.identifier_quote)
    }

    pub fn identifier_quote(&self) -> &str {
        &self.identifier_quote
    }

    pub fn set_identifier_quote(&mut self, quote: impl Into<String>) {
        self.identifier_quote = quote.into();
    }

    /// Table expression used by writes: the override verbatim, or the quoted schema table.
    pub fn table_name(&self) -> String {
        match &self.table {
            Some(table) => table.clone(),
            None => quote_identifier(&self.identifier_quote, &R::schema().table),
        }
    }

    pub fn set_table_name(&mut self, table: Option<String>) {
        self.table = table;
    }

    pub fn with_table_name(mut self, table: Option<String>) -> Self {
        self.table = table;
        self
    }

    pub fn to_column_name(&self, property: &str) -> String {
        self.codec().to_column_name(property)
    }

    pub fn to_property_name(&self, column: &str) -> String {
        self.codec().to_property_name(column)
    }

    /// Quoted column names in schema order (sorted by column name).
    pub fn columns(&self, include_identity: bool) -> Vec<String> {
        let codec = self.codec();
        R::schema()
            .columns
            .iter()
            .filter(|c| include_identity || !c.identity)
            .map(|c| codec.quoted(c.column))
            .collect()
    }

    fn declared_property(&self, column: &str) -> Result<&'static str> {
        let property = self.to_property_name(column);
        R::schema()
            .property(&property)
            .map(|c| c.property)
            .ok_or_else(|| {
                Error::msg(format!(
                    "Column `{}` is not declared by {}",
                    column,
                    R::schema().name
                ))
            })
    }

    /// Value of `column` converted to `T`, numeric values are widened or narrowed.
    pub fn get<T: AsValue>(&self, column: &str) -> Result<T> {
        let property = self.declared_property(column)?;
        T::try_from_value(self.row.read(property))
    }

    /// Store `value` in `column`, converting it to the declared type. Null clears the column.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> Result<()> {
        let property = self.declared_property(column)?;
        let def = R::schema()
            .property(property)
            .ok_or_else(|| Error::msg(format!("Property `{property}` is not declared")))?;
        let value = coerce_value(&def.value, value.into())?;
        self.row.write(property, value)
    }

    /// Current value of `column`, typed null when unset.
    pub fn db_value(&self, column: &str) -> Result<Value> {
        let property = self.declared_property(column)?;
        Ok(self.row.read(property))
    }

    /// Set columns by quoted name.
    pub fn db_map(&self) -> BTreeMap<String, Value> {
        let codec = self.codec();
        R::schema()
            .columns
            .iter()
            .map(|c| (codec.quoted(c.column), self.row.read(c.property)))
            .filter(|(_, v)| !v.is_null())
            .collect()
    }

    /// Set properties by name.
    pub fn to_map(&self) -> BTreeMap<&'static str, Value> {
        Self::map_of(&self.row)
    }

    /// Properties as loaded.
    pub fn baseline(&self) -> BTreeMap<&'static str, Value> {
        Self::map_of(&self.baseline)
    }

    fn map_of(row: &R) -> BTreeMap<&'static str, Value> {
        R::schema()
            .columns
            .iter()
            .map(|c| (c.property, row.read(c.property)))
            .filter(|(_, v)| !v.is_null())
            .collect()
    }

    /// Replace both current state and baseline with `values`, keyed by column name
    /// (quoted or not). Missing columns are null. On failure the row is left untouched.
    pub fn load<K: AsRef<str>>(&mut self, values: impl IntoIterator<Item = (K, Value)>) -> Result<()> {
        let mut loaded = Self {
            row: R::default(),
            baseline: R::default(),
            identifier_quote: self.identifier_quote.clone(),
            table: self.table.clone(),
        };
        for (column, value) in values {
            loaded.set(column.as_ref(), value)?;
        }
        loaded.mark_clean();
        *self = loaded;
        Ok(())
    }

    pub fn is_column_dirty(&self, column: &str) -> Result<bool> {
        let property = self.declared_property(column)?;
        Ok(self.is_property_dirty(property))
    }

    fn is_property_dirty(&self, property: &str) -> bool {
        !self
            .row
            .read(property)
            .same_value(&self.baseline.read(property))
    }

    /// True when any column, the identity included, differs from the baseline.
    pub fn is_dirty(&self) -> bool {
        R::schema()
            .columns
            .iter()
            .any(|c| self.is_property_dirty(c.property))
    }

    /// Quoted dirty columns, sorted.
    pub fn dirty_columns(&self, include_identity: bool) -> Vec<String> {
        let codec = self.codec();
        R::schema()
            .columns
            .iter()
            .filter(|c| (include_identity || !c.identity) && self.is_property_dirty(c.property))
            .map(|c| codec.quoted(c.column))
            .collect()
    }

    /// Restore the state the row had when it was loaded.
    pub fn reset(&mut self) {
        self.row = self.baseline.clone();
    }

    /// Accept the current state as the new baseline, usually after a write.
    pub fn mark_clean(&mut self) {
        self.baseline = self.row.clone();
    }

    pub fn identity_column(&self) -> Option<String> {
        R::schema()
            .identity_def()
            .map(|c| self.codec().quoted(c.column))
    }

    /// Identity value, `None` for identity-less contracts or when unset.
    pub fn identity_value(&self) -> Option<Value> {
        let def = R::schema().identity_def()?;
        let value = self.row.read(def.property);
        (!value.is_null()).then_some(value)
    }

    pub fn apply(&mut self, f: impl FnOnce(&mut R)) -> &mut Self {
        f(&mut self.row);
        self
    }

    pub fn row(&self) -> &R {
        &self.row
    }

    pub fn into_inner(self) -> R {
        self.row
    }

    /// Build a loaded row from one projected entity: data columns in schema order
    /// followed by the identity slot.
    pub fn materialize(values: &[Value], quote: &str) -> Result<Self> {
        let schema = R::schema();
        if values.len() < schema.width() {
            return Err(Error::msg(format!(
                "Expected {} values to materialize {}, found {}",
                schema.width(),
                schema.name,
                values.len()
            )));
        }
        let mut proxy = Self::new();
        proxy.set_identifier_quote(quote);
        let data = schema.data_columns().map(Some);
        let identity = [schema.identity_def()];
        for (def, value) in data.chain(identity).zip(values) {
            let Some(def) = def else {
                continue;
            };
            let value = coerce_value(&def.value, value.clone())?;
            proxy.row.write(def.property, value)?;
        }
        proxy.mark_clean();
        Ok(proxy)
    }
}

impl<R: RowContract> Deref for RowProxy<R> {
    type Target = R;
    fn deref(&self) -> &Self::Target {
        &self.row
    }
}

impl<R: RowContract> DerefMut for RowProxy<R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.row
    }
}

impl<R: RowContract> Debug for RowProxy<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", R::schema().name)?;
        f.debug_map().entries(self.to_map()).finish()
    }
}
