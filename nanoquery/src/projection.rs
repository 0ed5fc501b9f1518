//! Compiling the items of a `SELECT` list.

use core::fmt::{self, Debug, Display, Formatter};
use core::marker::PhantomData;
use std::mem;
use rusqlite::types::Value;
use crate::{
    column::{IntoColumn, Selector},
    fragment::Fragment,
    model::{Model, TyPrim},
    value::Scalar,
    error::Result,
};


/// An SQL function (or pseudo-function) that can be wrapped around a projection.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Function {
    Sum,
    Count,
    Avg,
    Min,
    Max,
    Total,
    Distinct,
    Upper,
    Lower,
    Length,
    Abs,
    Round,
    Coalesce,
    IfNull,
    /// `CAST(x AS type)`
    Cast(TyPrim),
    /// Plain parentheses around the operand.
    Group,
}

impl Function {
    /// The SQL name of the function; empty for [`Function::Group`].
    pub const fn name(self) -> &'static str {
        match self {
            Function::Sum      => "SUM",
            Function::Count    => "COUNT",
            Function::Avg      => "AVG",
            Function::Min      => "MIN",
            Function::Max      => "MAX",
            Function::Total    => "TOTAL",
            Function::Distinct => "DISTINCT",
            Function::Upper    => "UPPER",
            Function::Lower    => "LOWER",
            Function::Length   => "LENGTH",
            Function::Abs      => "ABS",
            Function::Round    => "ROUND",
            Function::Coalesce => "COALESCE",
            Function::IfNull   => "IFNULL",
            Function::Cast(_)  => "CAST",
            Function::Group    => "",
        }
    }
}

impl Display for Function {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

/// A function applied to a projection, along with any extra arguments
/// following the projected operand. The arguments are bound as parameters.
#[derive(Clone, PartialEq, Debug)]
pub struct Wrapper {
    /// The function to apply.
    pub function: Function,
    /// Extra arguments, after the operand.
    pub args: Vec<Value>,
}

impl Wrapper {
    /// A wrapper with no extra arguments.
    pub fn new(function: Function) -> Self {
        Wrapper {
            function,
            args: Vec::new(),
        }
    }

    /// Adds an extra argument.
    pub fn arg<T: Scalar>(mut self, value: T) -> Result<Self> {
        self.args.push(value.to_storable()?);
        Ok(self)
    }

    /// Wraps this function around `inner`. Parameters of the extra
    /// arguments follow those of `inner`, just like their placeholders.
    pub fn apply(&self, inner: &Fragment) -> Fragment {
        let mut out = Fragment::new(self.function.name());

        match self.function {
            Function::Cast(ty) => {
                out.push_sql("(");
                out.append(inner);
                out.push_sql(&format!(" AS {ty})"));
            }
            _ => {
                out.push_sql("(");
                out.append(inner);

                for arg in &self.args {
                    out.push_sql(", ");
                    out.append(&Fragment::placeholder(arg.clone()));
                }

                out.push_sql(")");
            }
        }

        out
    }
}

impl From<Function> for Wrapper {
    fn from(function: Function) -> Self {
        Wrapper::new(function)
    }
}

/// Builder of the projection (`SELECT` list) of a query over model `M`.
///
/// Every call adds one item. Calls that wrap a function around a column
/// can be stacked: [`Projection::wrap()`] queues a function without a
/// column, and the next call that does supply a column wraps all queued
/// functions around its own, the earliest queued one outermost. So
///
/// ```ignore
/// p.wrap(Function::Sum).wrap(Function::Count).distinct_as(f.x, "n")?;
/// ```
///
/// compiles to `SUM(COUNT(DISTINCT(abc.x))) AS n`.
pub struct Projection<M> {
    alias: String,
    items: Vec<Fragment>,
    pending: Vec<Wrapper>,
    member: bool,
    marker: PhantomData<fn() -> M>,
}

macro_rules! impl_function_shorthands {
    ($($function:ident => $name:ident, $name_as:ident;)*) => {$(
        #[doc = concat!("`", stringify!($function), "(column)`, aliased after the column.")]
        pub fn $name<C: IntoColumn<M>>(&mut self, column: C) -> Result<&mut Self> {
            self.apply([Wrapper::new(Function::$function)], column, None)
        }

        #[doc = concat!("`", stringify!($function), "(column) AS alias`")]
        pub fn $name_as<C: IntoColumn<M>>(&mut self, column: C, alias: &str) -> Result<&mut Self> {
            self.apply([Wrapper::new(Function::$function)], column, Some(alias))
        }
    )*}
}

impl<M: Model> Projection<M> {
    /// Creates an empty projection whose columns are qualified with `alias`.
    pub fn new(alias: impl Into<String>) -> Self {
        Projection {
            alias: alias.into(),
            items: Vec::new(),
            pending: Vec::new(),
            member: false,
            marker: PhantomData,
        }
    }

    /// Creates a projection whose items are the operands of a single
    /// expression: they are not aliased, and they are separated by spaces.
    pub fn expression(alias: impl Into<String>) -> Self {
        Projection {
            member: true,
            ..Projection::new(alias)
        }
    }

    /// The alias used for qualifying columns.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Returns `true` if no item has been added yet.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Queues a function to be wrapped around the next column.
    pub fn wrap(&mut self, wrapper: impl Into<Wrapper>) -> &mut Self {
        self.pending.push(wrapper.into());
        self
    }

    /// The general form of an item: wraps any queued functions, then
    /// `wrappers`, around `column`, outermost first.
    ///
    /// Unless `alias` is given, the item is aliased after the column's
    /// own identifier; wildcards and opaque SQL fragments are not aliased.
    pub fn apply<W, C>(&mut self, wrappers: W, column: C, alias: Option<&str>) -> Result<&mut Self>
    where
        W: IntoIterator<Item = Wrapper>,
        C: IntoColumn<M>,
    {
        let selector = column.into_column();
        let desc = M::description();
        let fragment = selector.resolve(&desc, &self.alias)?;
        let alias = match alias {
            Some(alias) => Some(alias.to_owned()),
            None => selector.identifier(&desc)?,
        };

        self.push(wrappers, fragment, alias);

        Ok(self)
    }

    /// A column.
    pub fn column<C: IntoColumn<M>>(&mut self, column: C) -> Result<&mut Self> {
        self.apply([], column, None)
    }

    /// `column AS alias`
    pub fn column_as<C: IntoColumn<M>>(&mut self, column: C, alias: &str) -> Result<&mut Self> {
        self.apply([], column, Some(alias))
    }

    impl_function_shorthands!{
        Sum      => sum,      sum_as;
        Count    => count,    count_as;
        Avg      => avg,      avg_as;
        Min      => min,      min_as;
        Max      => max,      max_as;
        Total    => total,    total_as;
        Distinct => distinct, distinct_as;
        Upper    => upper,    upper_as;
        Lower    => lower,    lower_as;
        Length   => length,   length_as;
        Abs      => abs,      abs_as;
    }

    /// `CAST(column AS ty)`
    pub fn cast<C: IntoColumn<M>>(&mut self, column: C, ty: TyPrim) -> Result<&mut Self> {
        self.apply([Wrapper::new(Function::Cast(ty))], column, None)
    }

    /// `CAST(column AS ty) AS alias`
    pub fn cast_as<C>(&mut self, column: C, ty: TyPrim, alias: &str) -> Result<&mut Self>
    where
        C: IntoColumn<M>,
    {
        self.apply([Wrapper::new(Function::Cast(ty))], column, Some(alias))
    }

    /// `ROUND(column, digits)`
    pub fn round<C: IntoColumn<M>>(&mut self, column: C, digits: u32) -> Result<&mut Self> {
        let wrapper = Wrapper::new(Function::Round).arg(digits)?;
        self.apply([wrapper], column, None)
    }

    /// `ROUND(column, digits) AS alias`
    pub fn round_as<C>(&mut self, column: C, digits: u32, alias: &str) -> Result<&mut Self>
    where
        C: IntoColumn<M>,
    {
        let wrapper = Wrapper::new(Function::Round).arg(digits)?;
        self.apply([wrapper], column, Some(alias))
    }

    /// `COALESCE(column, fallback)`
    pub fn coalesce<C, T>(&mut self, column: C, fallback: T) -> Result<&mut Self>
    where
        C: IntoColumn<M>,
        T: Scalar,
    {
        let wrapper = Wrapper::new(Function::Coalesce).arg(fallback)?;
        self.apply([wrapper], column, None)
    }

    /// `COALESCE(column, fallback) AS alias`
    pub fn coalesce_as<C, T>(&mut self, column: C, fallback: T, alias: &str) -> Result<&mut Self>
    where
        C: IntoColumn<M>,
        T: Scalar,
    {
        let wrapper = Wrapper::new(Function::Coalesce).arg(fallback)?;
        self.apply([wrapper], column, Some(alias))
    }

    /// Combines several operands into one parenthesized item, e.g.
    ///
    /// ```ignore
    /// p.group("g", |g| g.sum(f.ref_id)?.raw("*").raw(2))?;
    /// ```
    ///
    /// compiles to `(SUM(abc.ref_id) * 2) AS g`.
    pub fn group<F>(&mut self, alias: &str, build: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut Projection<M>) -> Result<&mut Projection<M>>,
    {
        let mut group = Projection::expression(self.alias.clone());
        build(&mut group)?;

        let operand = group.compile();
        self.push([Wrapper::new(Function::Group)], operand, Some(alias.to_owned()));

        Ok(self)
    }

    /// Verbatim SQL text, e.g. an operator or a numeric literal in an expression.
    pub fn raw<T: Display>(&mut self, sql: T) -> &mut Self {
        self.push([], Fragment::new(sql.to_string()), None);
        self
    }

    /// A literal value, bound as a parameter.
    pub fn value<T: Scalar>(&mut self, value: T) -> Result<&mut Self> {
        self.push([], Fragment::placeholder(value.to_storable()?), None);
        Ok(self)
    }

    /// `? AS alias`, with the value bound as a parameter.
    pub fn value_as<T: Scalar>(&mut self, value: T, alias: &str) -> Result<&mut Self> {
        self.push([], Fragment::placeholder(value.to_storable()?), Some(alias.to_owned()));
        Ok(self)
    }

    /// The compiled projection: items separated by commas, or, for an
    /// expression, by spaces. Compiling does not modify the builder.
    pub fn compile(&self) -> Fragment {
        let sep = if self.member { " " } else { ", " };
        Fragment::join(&self.items, sep)
    }

    /// Takes the compiled items, e.g. for moving them into a parent query.
    pub(crate) fn take_items(&mut self) -> Vec<Fragment> {
        mem::take(&mut self.items)
    }

    /// Appends items compiled elsewhere.
    pub(crate) fn extend_items(&mut self, items: Vec<Fragment>) {
        self.items.extend(items);
    }

    fn push<W>(&mut self, wrappers: W, column: Fragment, alias: Option<String>)
    where
        W: IntoIterator<Item = Wrapper>,
    {
        let mut all_wrappers = mem::take(&mut self.pending);
        all_wrappers.extend(wrappers);

        let mut item = all_wrappers
            .iter()
            .rev()
            .fold(column, |inner, wrapper| wrapper.apply(&inner));

        if let Some(alias) = alias.filter(|_| !self.member) {
            item.push_sql(&format!(" AS {alias}"));
        }

        self.items.push(item);
    }
}

impl<M> Debug for Projection<M> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Projection")
            .field("alias", &self.alias)
            .field("items", &self.items)
            .field("pending", &self.pending)
            .field("member", &self.member)
            .finish()
    }
}

impl<M: Model> From<Projection<M>> for Selector {
    /// Uses a compiled expression as a column, e.g. on the left-hand side
    /// of a `HAVING` test.
    fn from(projection: Projection<M>) -> Self {
        Selector::Fragment(projection.compile())
    }
}
