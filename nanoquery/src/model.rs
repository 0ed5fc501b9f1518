//! Column metadata of model types: which columns they map to, and how.

use core::fmt::{self, Display, Formatter};
use rusqlite::types::Value;
use crate::{
    column::PropertyPath,
    value::Kind,
    error::{Error, Result},
};


/// Implemented by UDTs that map to an SQL table.
///
/// This is usually derived. The derive macro also generates a companion
/// `<Name>Fields<R>` struct holding one typed [`Field`](crate::Field)
/// accessor per mapped property, which is what the statement builders
/// accept as column selectors:
///
/// ```
/// # use nanoquery::{Model, Select};
/// #[derive(Model)]
/// struct Invoice {
///     #[nanoquery(pk, auto_increment)]
///     id: Option<i64>,
///     numero: u32,
/// }
///
/// # fn main() -> nanoquery::Result<()> {
/// let f = Invoice::fields();
/// let mut query = Select::<Invoice>::new();
/// query.filter(|w| w.equal(f.numero, 13))?;
///
/// assert_eq!(query.compile().sql, "SELECT inv.* FROM Invoice AS inv WHERE inv.numero = ?");
/// # Ok(())
/// # }
/// ```
pub trait Model {
    /// The accessor struct, rooted at model type `R`.
    ///
    /// The root type differs from `Self` when the model is reached through
    /// a reference property of another model: e.g. in `order.customer.city`,
    /// the fields of `City` are rooted at `Order`.
    type Fields<R>;

    /// The value-level description of the model.
    fn description() -> ModelDesc;

    /// Creates the accessor struct with every property path prefixed by `path`.
    fn fields_at<R>(path: PropertyPath) -> Self::Fields<R>;

    /// Creates the accessor struct of this model as a root.
    fn fields() -> Self::Fields<Self>
    where
        Self: Sized
    {
        Self::fields_at(PropertyPath::root())
    }
}

/// Implemented by models whose instances can be reflected into a row of values.
///
/// This is usually derived together with [`Model`].
pub trait Record: Model {
    /// The storable values of every stored column, in the order of
    /// [`ModelDesc::stored_columns()`].
    fn values(&self) -> Result<Vec<Value>>;

    /// The current value of the primary key.
    fn key(&self) -> Result<Value>;

    /// Writes a database-generated primary key back into the record.
    fn set_key(&mut self, key: i64) -> Result<()>;
}

/// Describes the mapping of a model type onto an SQL table.
#[derive(Clone, Debug)]
pub struct ModelDesc {
    /// The name of the Rust type. Used for deriving the default alias.
    pub type_name: String,
    /// The name of the table.
    pub table: String,
    /// An explicitly requested alias proposal, if any.
    pub alias: Option<String>,
    /// The mapped columns, in declaration order.
    pub columns: Vec<ColumnDesc>,
}

impl ModelDesc {
    /// Creates a model whose table is named after the type, with no columns.
    pub fn new(type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();

        ModelDesc {
            table: type_name.clone(),
            type_name,
            alias: None,
            columns: Vec::new(),
        }
    }

    /// Renames the underlying table.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Overrides the default alias proposal.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Adds a column to the model description.
    pub fn column(mut self, column: ColumnDesc) -> Self {
        self.columns.push(column);
        self
    }

    /// The alias proposed for this model when it is added to a query:
    /// the explicit alias if there is one, otherwise the first three
    /// characters of the type name, lowercased.
    pub fn default_alias(&self) -> String {
        match &self.alias {
            Some(alias) => alias.to_lowercase(),
            None => self.type_name.chars().take(3).collect::<String>().to_lowercase(),
        }
    }

    /// Looks up the column of a (top-level) property.
    pub fn property(&self, property: &str) -> Option<&ColumnDesc> {
        self.columns.iter().find(|col| col.property == property)
    }

    /// The primary key column, if any.
    pub fn primary_key(&self) -> Option<&ColumnDesc> {
        self.columns.iter().find(|col| col.primary_key.is_some())
    }

    /// Like [`ModelDesc::primary_key()`], but an error if there is none.
    pub fn require_primary_key(&self) -> Result<&ColumnDesc> {
        self.primary_key().ok_or_else(|| Error::MissingPrimaryKey {
            model: self.type_name.clone(),
        })
    }

    /// The columns actually stored in the table, i.e. every column except
    /// reference properties, which are only navigated through.
    pub fn stored_columns(&self) -> impl Iterator<Item = &ColumnDesc> + '_ {
        self.columns.iter().filter(|col| col.reference.is_none())
    }

    /// The names of the stored columns, in declaration order.
    pub fn column_names(&self) -> Vec<String> {
        self.stored_columns().map(|col| col.name.clone()).collect()
    }

    /// Resolves a property path to its mapped column name.
    ///
    /// Paths through reference properties are resolved against the
    /// referenced model, and the mapped names of every step are joined
    /// with `_`, e.g. `customer.city.id` becomes `customer_city_id`.
    pub fn resolve(&self, path: &PropertyPath) -> Result<String> {
        let unknown = || Error::UnknownProperty {
            model: self.type_name.clone(),
            path: path.to_string(),
        };

        let mut segments = path.segments().iter();
        let first = segments.next().ok_or_else(unknown)?;
        let mut column = self.property(first).ok_or_else(unknown)?.clone();
        let mut name = column.name.clone();

        for segment in segments {
            let reference = column.reference.ok_or_else(unknown)?;
            let referenced = reference();
            column = referenced.property(segment).ok_or_else(unknown)?.clone();
            name.push('_');
            name.push_str(&column.name);
        }

        Ok(name)
    }
}

/// Describes the mapping of a single property onto a column.
#[derive(Clone, Debug)]
pub struct ColumnDesc {
    /// The name of the Rust property.
    pub property: String,
    /// The name of the column.
    pub name: String,
    /// The kind of values stored in the column.
    pub kind: Kind,
    /// Set if this column is the primary key.
    pub primary_key: Option<PrimaryKeyKind>,
    /// Set if the property refers to another model, whose properties can
    /// then be navigated through this one.
    pub reference: Option<fn() -> ModelDesc>,
}

impl ColumnDesc {
    /// Creates a column of kind `Object`, not part of the primary key.
    pub fn new(property: impl Into<String>, name: impl Into<String>) -> Self {
        ColumnDesc {
            property: property.into(),
            name: name.into(),
            kind: Kind::Object,
            primary_key: None,
            reference: None,
        }
    }

    /// Sets the kind of this column.
    pub fn kind(mut self, kind: Kind) -> Self {
        self.kind = kind;
        self
    }

    /// Marks this column as the primary key.
    pub fn primary_key(mut self, kind: PrimaryKeyKind) -> Self {
        self.primary_key = Some(kind);
        self
    }

    /// Marks this property as a reference to the model described by `desc`.
    pub fn references(mut self, desc: fn() -> ModelDesc) -> Self {
        self.reference = Some(desc);
        self
    }
}

/// How the value of a primary key comes into existence.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Debug)]
pub enum PrimaryKeyKind {
    /// The database generates the key upon insertion.
    #[default]
    AutoIncrement,
    /// The caller assigns the key (e.g. a GUID) before insertion.
    Assigned,
}

/// A primitive (atomic) column type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TyPrim {
    /// A 64-bit signed integer type.
    Integer,
    /// A 64-bit IEEE-754 floating-point value.
    Real,
    /// A string encoded as UTF-8 bytes.
    Text,
    /// An arbitrary sequence of bytes.
    Blob,
    /// Any of the above, preferring numbers.
    Numeric,
}

impl Display for TyPrim {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(match *self {
            TyPrim::Integer => "INTEGER",
            TyPrim::Real    => "REAL",
            TyPrim::Text    => "TEXT",
            TyPrim::Blob    => "BLOB",
            TyPrim::Numeric => "NUMERIC",
        })
    }
}
