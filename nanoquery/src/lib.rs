#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]
#![forbid(unsafe_code)]
#![deny(missing_docs, missing_debug_implementations, missing_copy_implementations)]

pub mod fragment;
pub mod value;
pub mod model;
pub mod column;
pub mod alias;
pub mod condition;
pub mod projection;
pub mod query;
pub mod batch;
pub mod key;
pub mod conn;
pub mod error;

pub extern crate rusqlite;

pub use rusqlite::{Connection, types::Value};
pub use fragment::Fragment;
pub use value::{Kind, Scalar, ScalarType, FromKey};
pub use model::{Model, Record, ModelDesc, ColumnDesc, PrimaryKeyKind, TyPrim};
pub use column::{PropertyPath, Field, Selector, IntoColumn};
pub use alias::{AliasRegistry, ScopeId, AliasCounter, GlobalCounter, LocalCounter};
pub use condition::{Condition, Combinator, Operand, IntoOperand, IsNull, Where};
pub use projection::{Function, Wrapper, Projection};
pub use query::{Select, Join, JoinKind, Order};
pub use batch::{Insert, Update, Delete, DEFAULT_MAX_PARAMS};
pub use key::{InsertOutcome, Outcome, resolve_keys};
pub use conn::{ConnectionExt, TransactionExt};
pub use error::{Error, Result};

#[cfg(feature = "chrono")]
pub use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

#[cfg(feature = "uuid")]
pub use uuid::Uuid;

#[cfg(feature = "json")]
pub use serde_json::Value as JsonValue;

#[cfg(feature = "derive")]
pub use nanoquery_macros::{Model, Record};
