//! Resolving column selectors into qualified SQL identifiers.

use core::fmt::{self, Debug, Display, Formatter};
use core::marker::PhantomData;
use crate::{
    fragment::Fragment,
    model::ModelDesc,
    error::Result,
};


/// A dotted path of Rust property names, leading from a root model,
/// possibly through reference properties, to a mapped property.
#[derive(Clone, Default, PartialEq, Eq, Hash, Debug)]
pub struct PropertyPath(Vec<&'static str>);

impl PropertyPath {
    /// The empty path, denoting the root model itself.
    pub const fn root() -> Self {
        PropertyPath(Vec::new())
    }

    /// Returns this path extended by one more property.
    pub fn child(&self, property: &'static str) -> Self {
        let mut segments = self.0.clone();
        segments.push(property);
        PropertyPath(segments)
    }

    /// The individual property names.
    pub fn segments(&self) -> &[&'static str] {
        &self.0
    }
}

impl Display for PropertyPath {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0.join("."))
    }
}

/// A typed accessor of a property of model `M`.
///
/// These are obtained from the accessor struct of the model, e.g.
/// `Order::fields().customer.city.id` is a `Field<Order>` denoting the
/// `id` of the `city` of the `customer` of an `Order`.
pub struct Field<M> {
    path: PropertyPath,
    marker: PhantomData<fn() -> M>,
}

impl<M> Field<M> {
    /// Creates an accessor for the property at `path`.
    pub fn new(path: PropertyPath) -> Self {
        Field {
            path,
            marker: PhantomData,
        }
    }

    /// The property path denoted by this accessor.
    pub fn path(&self) -> &PropertyPath {
        &self.path
    }
}

impl<M> Clone for Field<M> {
    fn clone(&self) -> Self {
        Field::new(self.path.clone())
    }
}

impl<M> PartialEq for Field<M> {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl<M> Debug for Field<M> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.debug_tuple("Field").field(&format_args!("{}", self.path)).finish()
    }
}

/// Anything that can identify a column, before it is resolved.
#[derive(Clone, PartialEq, Debug)]
pub enum Selector {
    /// A typed property accessor, resolved via the model's column metadata.
    Field(PropertyPath),
    /// A raw string. Plain identifiers are qualified with the table alias;
    /// any other string is an opaque SQL fragment used verbatim.
    Raw(String),
    /// An already-compiled fragment, used verbatim with its parameters.
    Fragment(Fragment),
}

impl Selector {
    /// Resolves this selector to the SQL text of a column reference,
    /// qualified with `alias` where appropriate.
    pub fn resolve(&self, desc: &ModelDesc, alias: &str) -> Result<Fragment> {
        match self {
            Selector::Field(path) => {
                let column = desc.resolve(path)?;
                Ok(Fragment::new(format!("{alias}.{column}")))
            }
            Selector::Raw(raw) if is_plain_identifier(raw) => {
                Ok(Fragment::new(format!("{alias}.{raw}")))
            }
            Selector::Raw(raw) => Ok(Fragment::new(raw.as_str())),
            Selector::Fragment(fragment) => Ok(fragment.clone()),
        }
    }

    /// Resolves this selector to a bare column name, without any alias.
    /// Needed for `INSERT` column lists and `UPDATE ... SET` targets.
    pub fn resolve_unqualified(&self, desc: &ModelDesc) -> Result<Fragment> {
        match self {
            Selector::Field(path) => desc.resolve(path).map(Fragment::new),
            Selector::Raw(raw) => Ok(Fragment::new(raw.as_str())),
            Selector::Fragment(fragment) => Ok(fragment.clone()),
        }
    }

    /// The identifier of the column, used as the default alias of a
    /// projection. Wildcards and opaque fragments have none.
    pub fn identifier(&self, desc: &ModelDesc) -> Result<Option<String>> {
        match self {
            Selector::Field(path) => desc.resolve(path).map(Some),
            Selector::Raw(raw) if raw != "*" && is_plain_identifier(raw) => {
                Ok(Some(raw.clone()))
            }
            Selector::Raw(_) | Selector::Fragment(_) => Ok(None),
        }
    }
}

/// Returns `true` if `name` consists only of ASCII alphanumerics,
/// underscores and asterisks, i.e. it is a column name (or wildcard)
/// that needs to be qualified, rather than an arbitrary SQL expression.
pub fn is_plain_identifier(name: &str) -> bool {
    name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'*')
}

/// Conversion into a column [`Selector`] of model `M`.
pub trait IntoColumn<M> {
    /// Performs the conversion.
    fn into_column(self) -> Selector;
}

impl<M> IntoColumn<M> for Field<M> {
    fn into_column(self) -> Selector {
        Selector::Field(self.path)
    }
}

impl<M> IntoColumn<M> for &str {
    fn into_column(self) -> Selector {
        Selector::Raw(self.to_owned())
    }
}

impl<M> IntoColumn<M> for String {
    fn into_column(self) -> Selector {
        Selector::Raw(self)
    }
}

impl<M> IntoColumn<M> for Fragment {
    fn into_column(self) -> Selector {
        Selector::Fragment(self)
    }
}

impl<M> IntoColumn<M> for Selector {
    fn into_column(self) -> Selector {
        self
    }
}
