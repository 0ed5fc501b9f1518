use pretty_assertions::assert_eq;
use nanoquery::{Model, Projection, Function, Wrapper, TyPrim, Value, Result};


#[derive(Clone, PartialEq, Debug, Model)]
#[nanoquery(rename = "Model", alias = "abc")]
struct Invoice {
    #[nanoquery(auto_increment)]
    id: Option<i64>,
    numero: u32,
    #[nanoquery(rename = "refId")]
    ref_id: i64,
    amount: f64,
    note: Option<String>,
}

fn projection() -> Projection<Invoice> {
    Projection::new("abc")
}

#[test]
fn columns_are_aliased_after_themselves() -> Result<()> {
    let f = Invoice::fields();
    let mut p = projection();

    p.column(f.numero)?.column_as(f.ref_id, "reference")?;

    assert_eq!(p.compile().sql, "abc.numero AS numero, abc.refId AS reference");

    Ok(())
}

#[test]
fn wildcards_and_opaque_fragments_are_not_aliased() -> Result<()> {
    let mut p = projection();

    p.column("*")?.column("COUNT(*)")?.column("amount")?;

    assert_eq!(p.compile().sql, "abc.*, COUNT(*), abc.amount AS amount");

    Ok(())
}

#[test]
fn aggregates_and_scalar_functions() -> Result<()> {
    let f = Invoice::fields();
    let mut p = projection();

    p.sum(f.amount.clone())?
        .count_as(f.id, "n")?
        .avg_as(f.amount.clone(), "mean")?
        .max(f.numero)?
        .upper(f.note)?
        .total_as(f.amount, "grand")?;

    assert_eq!(
        p.compile().sql,
        "SUM(abc.amount) AS amount, COUNT(abc.id) AS n, AVG(abc.amount) AS mean, \
         MAX(abc.numero) AS numero, UPPER(abc.note) AS note, TOTAL(abc.amount) AS grand",
    );

    Ok(())
}

#[test]
fn pending_wrappers_nest_outer_to_inner() -> Result<()> {
    let f = Invoice::fields();
    let mut p = projection();

    p.wrap(Function::Sum)
        .wrap(Function::Count)
        .distinct_as(f.numero, "alias")?;

    assert_eq!(p.compile().sql, "SUM(COUNT(DISTINCT(abc.numero))) AS alias");

    Ok(())
}

#[test]
fn pending_wrappers_are_drained_by_the_next_column_only() -> Result<()> {
    let f = Invoice::fields();
    let mut p = projection();

    p.wrap(Function::Max).column(f.amount)?.column(f.numero)?;

    assert_eq!(p.compile().sql, "MAX(abc.amount) AS amount, abc.numero AS numero");

    Ok(())
}

#[test]
fn grouped_projection_combines_operands() -> Result<()> {
    let f = Invoice::fields();
    let mut p = projection();

    p.group("g", |g| Ok(g.sum(f.ref_id)?.raw("*").raw(2)))?;

    assert_eq!(p.compile().sql, "(SUM(abc.refId) * 2) AS g");

    Ok(())
}

#[test]
fn arguments_and_values_are_bound_in_textual_order() -> Result<()> {
    let f = Invoice::fields();
    let mut p = projection();

    p.value_as(7, "seven")?
        .round(f.amount.clone(), 2)?
        .coalesce_as(f.note, "none", "note")?
        .cast_as(f.amount, TyPrim::Integer, "whole")?;

    let frag = p.compile();

    assert_eq!(
        frag.sql,
        "? AS seven, ROUND(abc.amount, ?) AS amount, COALESCE(abc.note, ?) AS note, \
         CAST(abc.amount AS INTEGER) AS whole",
    );
    assert_eq!(
        frag.params,
        [Value::Integer(7), Value::Integer(2), Value::Text("none".into())],
    );

    Ok(())
}

#[test]
fn explicit_wrappers_with_arguments() -> Result<()> {
    let f = Invoice::fields();
    let mut p = projection();
    let if_null = Wrapper::new(Function::IfNull).arg(0)?;

    p.wrap(Function::Abs).apply([if_null], f.amount, Some("magnitude"))?;

    let frag = p.compile();

    assert_eq!(frag.sql, "ABS(IFNULL(abc.amount, ?)) AS magnitude");
    assert_eq!(frag.params, [Value::Integer(0)]);

    Ok(())
}

#[test]
fn expressions_are_not_aliased() -> Result<()> {
    let f = Invoice::fields();
    let mut e = Projection::<Invoice>::expression("abc");

    e.sum(f.amount)?.raw("/").count(f.id)?;

    assert_eq!(e.compile().sql, "SUM(abc.amount) / COUNT(abc.id)");

    Ok(())
}
