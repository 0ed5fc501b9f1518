//! Compiling `WHERE`, `HAVING` and `ON` conditions.

use core::fmt::{self, Debug, Display, Formatter};
use core::marker::PhantomData;
use std::mem;
use rusqlite::types::Value;
use crate::{
    column::{Field, IntoColumn, Selector},
    fragment::Fragment,
    model::{Model, ModelDesc},
    value::Scalar,
    error::{Error, Result},
};


/// One building block of a test. A single test is described by a short
/// sequence of these, e.g. `[Not, Equal]`, where every element but the
/// last one is a prefix modifier.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Condition {
    Not,
    IsNull,
    Equal,
    Great,
    Less,
    GreatOrEqual,
    LessOrEqual,
    Between,
    In,
    Like,
}

impl Display for Condition {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(match *self {
            Condition::Not          => "NOT",
            Condition::IsNull       => "IS NULL",
            Condition::Equal        => "=",
            Condition::Great        => ">",
            Condition::Less         => "<",
            Condition::GreatOrEqual => ">=",
            Condition::LessOrEqual  => "<=",
            Condition::Between      => "BETWEEN",
            Condition::In           => "IN",
            Condition::Like         => "LIKE",
        })
    }
}

/// Renders a sequence of conditions, separated by spaces.
fn display_conditions(conditions: &[Condition]) -> String {
    conditions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// The logical connective placed before the next test.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Debug)]
pub enum Combinator {
    /// Conjunction. This is the default.
    #[default]
    And,
    /// Disjunction.
    Or,
}

impl Display for Combinator {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(match *self {
            Combinator::And => "AND",
            Combinator::Or  => "OR",
        })
    }
}

/// Marker operand for testing a column against `NULL`.
///
/// `equal(column, IsNull)` compiles to `column IS NULL`, and with a
/// preceding `not()`, to `column IS NOT NULL`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Debug)]
pub struct IsNull;

/// A single operand of a test, before it is resolved.
#[derive(Clone, PartialEq, Debug)]
pub enum Operand {
    /// A column, or a verbatim SQL fragment.
    Column(Selector),
    /// A literal value, bound as a parameter.
    Value(Value),
    /// A list of literal values, each bound as a parameter.
    Values(Vec<Value>),
    /// The `IS NULL` marker.
    IsNull,
}

impl Operand {
    /// Resolves the operand to SQL text and parameters.
    fn resolve(&self, desc: &ModelDesc, alias: &str) -> Result<Fragment> {
        match self {
            Operand::Column(selector) => selector.resolve(desc, alias),
            Operand::Value(value) => Ok(Fragment::placeholder(value.clone())),
            Operand::Values(values) => Ok(Fragment::placeholders(values.clone())),
            Operand::IsNull => Ok(Fragment::new("NULL")),
        }
    }
}

/// Conversion into an [`Operand`] of a test on model `M`.
///
/// Scalars become bound parameters (so a string is a literal here, not a
/// column); fields of `M` and compiled fragments are used as columns.
pub trait IntoOperand<M> {
    /// Performs the conversion.
    fn into_operand(self) -> Result<Operand>;
}

impl<M, T: Scalar> IntoOperand<M> for T {
    fn into_operand(self) -> Result<Operand> {
        self.to_storable().map(Operand::Value)
    }
}

impl<M> IntoOperand<M> for Field<M> {
    fn into_operand(self) -> Result<Operand> {
        Ok(Operand::Column(IntoColumn::<M>::into_column(self)))
    }
}

impl<M> IntoOperand<M> for Fragment {
    fn into_operand(self) -> Result<Operand> {
        Ok(Operand::Column(Selector::Fragment(self)))
    }
}

impl<M> IntoOperand<M> for Selector {
    fn into_operand(self) -> Result<Operand> {
        Ok(Operand::Column(self))
    }
}

impl<M> IntoOperand<M> for IsNull {
    fn into_operand(self) -> Result<Operand> {
        Ok(Operand::IsNull)
    }
}

impl<M> IntoOperand<M> for Operand {
    fn into_operand(self) -> Result<Operand> {
        Ok(self)
    }
}

/// State that is set up by one call and consumed by the next test.
#[derive(Clone, Default, Debug)]
struct PendingState {
    conditions: Vec<Condition>,
    combinator: Combinator,
}

/// Builder of a boolean SQL expression over the columns of model `M`.
///
/// Tests are added one call at a time, and are combined with `AND`
/// unless [`Where::or()`] is called in between. [`Where::not()`] negates
/// the next test; for ordering comparisons the negation is folded into
/// the operator, e.g. `NOT >` is emitted as `<=`.
pub struct Where<M> {
    alias: String,
    pending: PendingState,
    fragment: Fragment,
    marker: PhantomData<fn() -> M>,
}

impl<M: Model> Where<M> {
    /// Creates an empty condition whose columns are qualified with `alias`.
    pub fn new(alias: impl Into<String>) -> Self {
        Where {
            alias: alias.into(),
            pending: PendingState::default(),
            fragment: Fragment::default(),
            marker: PhantomData,
        }
    }

    /// The alias used for qualifying columns.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Returns `true` if no test has been added yet.
    pub fn is_empty(&self) -> bool {
        self.fragment.is_empty()
    }

    /// Negates the next test. Calling it twice cancels out.
    pub fn not(&mut self) -> &mut Self {
        if self.pending.conditions.last() == Some(&Condition::Not) {
            self.pending.conditions.pop();
        } else {
            self.pending.conditions.push(Condition::Not);
        }
        self
    }

    /// Joins the next test with `AND`. This is the default.
    pub fn and(&mut self) -> &mut Self {
        self.pending.combinator = Combinator::And;
        self
    }

    /// Joins the next test with `OR`.
    pub fn or(&mut self) -> &mut Self {
        self.pending.combinator = Combinator::Or;
        self
    }

    /// `lhs = rhs`, or `lhs IS NULL` if `rhs` is [`IsNull`].
    pub fn equal<L, R>(&mut self, lhs: L, rhs: R) -> Result<&mut Self>
    where
        L: IntoColumn<M>,
        R: IntoOperand<M>,
    {
        self.binary(Condition::Equal, lhs, rhs)
    }

    /// `lhs > rhs`
    pub fn great<L, R>(&mut self, lhs: L, rhs: R) -> Result<&mut Self>
    where
        L: IntoColumn<M>,
        R: IntoOperand<M>,
    {
        self.binary(Condition::Great, lhs, rhs)
    }

    /// `lhs < rhs`
    pub fn less<L, R>(&mut self, lhs: L, rhs: R) -> Result<&mut Self>
    where
        L: IntoColumn<M>,
        R: IntoOperand<M>,
    {
        self.binary(Condition::Less, lhs, rhs)
    }

    /// `lhs >= rhs`
    pub fn great_or_equal<L, R>(&mut self, lhs: L, rhs: R) -> Result<&mut Self>
    where
        L: IntoColumn<M>,
        R: IntoOperand<M>,
    {
        self.binary(Condition::GreatOrEqual, lhs, rhs)
    }

    /// `lhs <= rhs`
    pub fn less_or_equal<L, R>(&mut self, lhs: L, rhs: R) -> Result<&mut Self>
    where
        L: IntoColumn<M>,
        R: IntoOperand<M>,
    {
        self.binary(Condition::LessOrEqual, lhs, rhs)
    }

    /// `lhs LIKE pattern`
    pub fn like<L, R>(&mut self, lhs: L, pattern: R) -> Result<&mut Self>
    where
        L: IntoColumn<M>,
        R: IntoOperand<M>,
    {
        self.binary(Condition::Like, lhs, pattern)
    }

    /// `lhs BETWEEN low AND high`
    pub fn between<L, A, B>(&mut self, lhs: L, low: A, high: B) -> Result<&mut Self>
    where
        L: IntoColumn<M>,
        A: IntoOperand<M>,
        B: IntoOperand<M>,
    {
        let operands = vec![
            Operand::Column(lhs.into_column()),
            low.into_operand()?,
            high.into_operand()?,
        ];
        self.test(&[Condition::Between], operands)
    }

    /// `lhs IN (?, ?, ...)`, binding every value as a parameter.
    pub fn is_in<L, I>(&mut self, lhs: L, values: I) -> Result<&mut Self>
    where
        L: IntoColumn<M>,
        I: IntoIterator,
        I::Item: Scalar,
    {
        let values = values
            .into_iter()
            .map(|value| value.to_storable())
            .collect::<Result<Vec<_>>>()?;

        let operands = vec![
            Operand::Column(lhs.into_column()),
            Operand::Values(values),
        ];
        self.test(&[Condition::In], operands)
    }

    /// `lhs IN (subquery)`
    pub fn in_query<L>(&mut self, lhs: L, subquery: Fragment) -> Result<&mut Self>
    where
        L: IntoColumn<M>,
    {
        let operands = vec![
            Operand::Column(lhs.into_column()),
            Operand::Column(Selector::Fragment(subquery)),
        ];
        self.test(&[Condition::In], operands)
    }

    /// `lhs IS NULL`
    pub fn is_null<L>(&mut self, lhs: L) -> Result<&mut Self>
    where
        L: IntoColumn<M>,
    {
        self.test(&[Condition::IsNull], vec![Operand::Column(lhs.into_column())])
    }

    /// `lhs LIKE '%text%'`
    pub fn contains<L>(&mut self, lhs: L, text: &str) -> Result<&mut Self>
    where
        L: IntoColumn<M>,
    {
        self.like(lhs, format!("%{text}%"))
    }

    /// `lhs LIKE 'text%'`
    pub fn starts_with<L>(&mut self, lhs: L, text: &str) -> Result<&mut Self>
    where
        L: IntoColumn<M>,
    {
        self.like(lhs, format!("{text}%"))
    }

    /// `lhs LIKE '%text'`
    pub fn ends_with<L>(&mut self, lhs: L, text: &str) -> Result<&mut Self>
    where
        L: IntoColumn<M>,
    {
        self.like(lhs, format!("%{text}"))
    }

    /// `(a LIKE '%text%' OR b LIKE '%text%' OR ...)`, i.e. matches rows
    /// where any of the columns contains `text`.
    pub fn multi_column_like<I>(&mut self, columns: I, text: &str) -> Result<&mut Self>
    where
        I: IntoIterator,
        I::Item: IntoColumn<M>,
    {
        let pattern = format!("%{text}%");

        self.scope(|scope| {
            for column in columns {
                scope.or().like(column, pattern.as_str())?;
            }
            Ok(scope)
        })
    }

    /// Builds a nested condition and adds it as a single, parenthesized test.
    /// This is how `a AND (b OR c)` is expressed.
    ///
    /// A nested condition with no tests in it is ignored, and so are the
    /// pending `not()` and `or()` modifiers that preceded it.
    pub fn scope<F>(&mut self, build: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut Where<M>) -> Result<&mut Where<M>>,
    {
        let mut nested = Where::new(self.alias.clone());
        build(&mut nested)?;

        let fragment = nested.compile();

        if fragment.is_empty() {
            self.pending = PendingState::default();
            return Ok(self);
        }

        self.test(&[], vec![Operand::Column(Selector::Fragment(fragment))])
    }

    /// Adds an arbitrary, pre-compiled boolean expression as a parenthesized test.
    pub fn expr(&mut self, fragment: Fragment) -> Result<&mut Self> {
        self.test(&[], vec![Operand::Column(Selector::Fragment(fragment))])
    }

    /// The general form of a test: renders `conditions`, prefixed by any
    /// pending modifiers, over the given operands.
    ///
    /// Fails if the number of operands does not fit the conditions; e.g.
    /// `BETWEEN` requires exactly three.
    pub fn test(&mut self, conditions: &[Condition], operands: Vec<Operand>) -> Result<&mut Self> {
        let mut all_conditions = self.pending.conditions.clone();
        all_conditions.extend_from_slice(conditions);

        // the pending state is only consumed by a test that renders
        let desc = M::description();
        let fragment = create_where(&desc, &self.alias, all_conditions, operands)?;
        let combinator = mem::take(&mut self.pending).combinator;

        self.push(combinator, &fragment);

        Ok(self)
    }

    /// Folds a condition compiled elsewhere (e.g. in a join scope) into
    /// this one, joined with `AND`, without touching the pending state.
    pub(crate) fn absorb(&mut self, fragment: &Fragment) {
        if !fragment.is_empty() {
            self.push(Combinator::And, &fragment.nested());
        }
    }

    /// The compiled expression. Compiling does not modify the builder.
    pub fn compile(&self) -> Fragment {
        self.fragment.clone()
    }

    fn binary<L, R>(&mut self, condition: Condition, lhs: L, rhs: R) -> Result<&mut Self>
    where
        L: IntoColumn<M>,
        R: IntoOperand<M>,
    {
        let operands = vec![
            Operand::Column(lhs.into_column()),
            rhs.into_operand()?,
        ];
        self.test(&[condition], operands)
    }

    fn push(&mut self, combinator: Combinator, fragment: &Fragment) {
        if !self.fragment.is_empty() {
            self.fragment.push_sql(&format!(" {combinator} "));
        }
        self.fragment.append(fragment);
    }
}

impl<M> Debug for Where<M> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Where")
            .field("alias", &self.alias)
            .field("pending", &self.pending)
            .field("fragment", &self.fragment)
            .finish()
    }
}

/// Renders a single test.
fn create_where(
    desc: &ModelDesc,
    alias: &str,
    mut conditions: Vec<Condition>,
    mut operands: Vec<Operand>,
) -> Result<Fragment> {
    if operands.len() == 2 && matches!(operands[1], Operand::IsNull) {
        let rewritten = match conditions.as_slice() {
            [Condition::Equal] => Some(vec![Condition::IsNull]),
            [Condition::Not, Condition::Equal] => Some(vec![Condition::Not, Condition::IsNull]),
            _ => None,
        };

        if let Some(rewritten) = rewritten {
            conditions = rewritten;
            operands.pop();
        }
    }

    check_operand_count(&conditions, operands.len())?;

    let resolved = operands
        .iter()
        .map(|operand| operand.resolve(desc, alias))
        .collect::<Result<Vec<_>>>()?;

    Ok(render(&conditions, &resolved))
}

fn check_operand_count(conditions: &[Condition], actual: usize) -> Result<()> {
    let expected = match conditions {
        [] => 1,
        [Condition::Between] | [Condition::Not, Condition::Between] => 3,
        [Condition::In] | [Condition::Not, Condition::In] => 2,
        [Condition::IsNull] | [Condition::Not, Condition::IsNull] | [Condition::Not] => 1,
        _ => 2,
    };

    if actual == expected {
        Ok(())
    } else {
        Err(Error::OperandCount {
            conditions: display_conditions(conditions),
            expected,
            actual,
        })
    }
}

/// Renders resolved operands according to the conditions.
/// The operand count has already been checked by this point.
fn render(conditions: &[Condition], operands: &[Fragment]) -> Fragment {
    use Condition::*;

    let mut out = Fragment::default();
    let a = &operands[0];

    match conditions {
        [] => {
            out.append_nested(a);
        }
        [Between] | [Not, Between] => {
            out.append(a);
            out.push_sql(&format!(" {} ", display_conditions(conditions)));
            out.append(&operands[1]);
            out.push_sql(" AND ");
            out.append(&operands[2]);
        }
        [In] | [Not, In] => {
            out.append(a);
            out.push_sql(&format!(" {} ", display_conditions(conditions)));
            out.append_nested(&operands[1]);
        }
        [Not, IsNull] => {
            out.append(a);
            out.push_sql(" IS NOT NULL");
        }
        [Not, Equal] => {
            out.append(a);
            out.push_sql(" <> ");
            out.append(&operands[1]);
        }
        [Not, Great] => return render(&[LessOrEqual], operands),
        [Not, GreatOrEqual] => return render(&[Less], operands),
        [Not, Less] => return render(&[GreatOrEqual], operands),
        [Not, LessOrEqual] => return render(&[Great], operands),
        [Not] => {
            out.push_sql("NOT ");
            out.append_nested(a);
        }
        _ => {
            out.append(a);
            out.push_sql(&format!(" {}", display_conditions(conditions)));

            if let Some(b) = operands.get(1) {
                out.push_sql(" ");
                out.append(b);
            }
        }
    }

    out
}
