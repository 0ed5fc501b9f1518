//! Compiled SQL text together with its positional parameters.

use core::fmt::{self, Display, Formatter};
use rusqlite::types::Value;


/// A piece of compiled SQL and the values bound to its placeholders.
///
/// This is the unit every compiler in this crate produces, from a single
/// column reference all the way up to a complete statement. The `N`-th
/// `?` placeholder in `sql` corresponds to the `N`-th entry of `params`;
/// all the combinators below preserve this invariant by always moving
/// text and parameters together.
#[derive(Clone, Default, PartialEq, Debug)]
pub struct Fragment {
    /// The SQL source text, with `?` placeholders.
    pub sql: String,
    /// The parameters, in the left-to-right order of their placeholders.
    pub params: Vec<Value>,
}

impl Fragment {
    /// Creates a fragment consisting of verbatim SQL and no parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Fragment {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Creates a fragment with the given SQL and parameters.
    pub fn with_params(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Fragment {
            sql: sql.into(),
            params,
        }
    }

    /// A single `?` placeholder bound to `value`.
    pub fn placeholder(value: Value) -> Self {
        Fragment {
            sql: String::from("?"),
            params: vec![value],
        }
    }

    /// A comma-separated list of placeholders, one for each value.
    pub fn placeholders(values: Vec<Value>) -> Self {
        let sql = vec!["?"; values.len()].join(", ");

        Fragment { sql, params: values }
    }

    /// Returns `true` if there is no SQL text in this fragment.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Appends raw SQL text, without any parameters.
    pub fn push_sql(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Appends the text of `other`, followed by its parameters.
    pub fn append(&mut self, other: &Fragment) -> &mut Self {
        self.sql.push_str(&other.sql);
        self.params.extend(other.params.iter().cloned());
        self
    }

    /// Appends `other` wrapped in parentheses.
    pub fn append_nested(&mut self, other: &Fragment) -> &mut Self {
        self.sql.push('(');
        self.append(other);
        self.sql.push(')');
        self
    }

    /// Returns this fragment wrapped in parentheses, e.g. so that a
    /// compiled `SELECT` can be used as an operand of a condition.
    pub fn nested(&self) -> Fragment {
        let mut nested = Fragment::default();
        nested.append_nested(self);
        nested
    }

    /// Concatenates the fragments, separating their text with `sep`.
    pub fn join<'a, I>(fragments: I, sep: &str) -> Fragment
    where
        I: IntoIterator<Item = &'a Fragment>,
    {
        let mut joined = Fragment::default();
        let mut first = true;

        for fragment in fragments {
            if !first {
                joined.push_sql(sep);
            }
            joined.append(fragment);
            first = false;
        }

        joined
    }
}

impl Display for Fragment {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.sql)
    }
}

impl From<&str> for Fragment {
    fn from(sql: &str) -> Self {
        Fragment::new(sql)
    }
}

impl From<String> for Fragment {
    fn from(sql: String) -> Self {
        Fragment::new(sql)
    }
}
