#![forbid(unsafe_code)]

use proc_macro::TokenStream;

mod model;
mod record;
mod util;


/// See the documentation of the `Model` trait for details.
///
/// Container attributes, all under `#[nanoquery(...)]`:
/// - `rename = "Name"` (or `table`): the name of the table.
/// - `rename_all = "lower_snake_case"`: case conversion applied to every column name.
/// - `alias = "abc"`: the alias proposed for the table in queries.
///
/// Field attributes:
/// - `rename = "name"`: the name of the column.
/// - `pk` (or `primary_key`): the field holds a caller-assigned primary key.
/// - `auto_increment`: the field holds a primary key generated by the database.
/// - `reference = OtherModel`: the field is a navigable reference to another model.
/// - `ignore`: the field is not mapped.
#[proc_macro_derive(Model, attributes(nanoquery))]
pub fn derive_model(ts: TokenStream) -> TokenStream {
    util::expand(ts, model::expand)
}

/// See the documentation of the `Record` trait for details.
///
/// Understands the same attributes as `#[derive(Model)]`, and every mapped,
/// non-reference field must implement `Scalar`. An `auto_increment` key
/// must also implement `FromKey`.
#[proc_macro_derive(Record, attributes(nanoquery))]
pub fn derive_record(ts: TokenStream) -> TokenStream {
    util::expand(ts, record::expand)
}
