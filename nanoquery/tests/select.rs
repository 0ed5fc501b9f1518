use pretty_assertions::assert_eq;
use nanoquery::{Model, Select, Projection, Selector, Order, Value, Result};


#[derive(Clone, PartialEq, Debug, Model)]
#[nanoquery(rename = "Model", alias = "abc")]
struct Invoice {
    #[nanoquery(auto_increment)]
    id: Option<i64>,
    numero: u32,
    #[nanoquery(rename = "refId")]
    ref_id: i64,
    amount: f64,
}

#[derive(Clone, PartialEq, Debug, Model)]
struct Fruit {
    #[nanoquery(pk)]
    name: String,
}

#[test]
fn default_projection_is_the_wildcard() -> Result<()> {
    let f = Invoice::fields();
    let mut query = Select::<Invoice>::new();

    query.filter(|w| w.equal(f.numero, 13))?;

    let stmt = query.compile();

    assert_eq!(stmt.sql, "SELECT abc.* FROM Model AS abc WHERE abc.numero = ?");
    assert_eq!(stmt.params, [Value::Integer(13)]);

    Ok(())
}

#[test]
fn default_alias_is_derived_from_the_type_name() {
    assert_eq!(Select::<Fruit>::new().compile().sql, "SELECT fru.* FROM Fruit AS fru");
    assert_eq!(Select::<Fruit>::aliased("F").compile().sql, "SELECT f.* FROM Fruit AS f");
}

#[test]
fn clauses_are_emitted_in_sql_order() -> Result<()> {
    let f = Invoice::fields();
    let mut query = Select::<Invoice>::new();
    let total = query.expr(|e| e.sum(f.amount.clone()))?;

    query.limit(10).offset(20);
    query.order_by(f.numero.clone(), Order::Desc)?;
    query.having(|h| h.great(total, 100))?;
    query.group_by(f.ref_id.clone())?;
    query.filter(|w| w.less(f.numero, 50))?;
    query.project(|p| p.column(f.ref_id)?.sum_as(f.amount, "total"))?;

    let stmt = query.compile();

    assert_eq!(
        stmt.sql,
        "SELECT abc.refId AS refId, SUM(abc.amount) AS total FROM Model AS abc \
         WHERE abc.numero < ? GROUP BY abc.refId HAVING SUM(abc.amount) > ? \
         ORDER BY abc.numero DESC LIMIT ? OFFSET ?",
    );
    assert_eq!(
        stmt.params,
        [Value::Integer(50), Value::Integer(100), Value::Integer(10), Value::Integer(20)],
    );

    Ok(())
}

#[test]
fn offset_without_limit() {
    let mut query = Select::<Invoice>::new();
    query.offset(5);

    let stmt = query.compile();

    assert_eq!(stmt.sql, "SELECT abc.* FROM Model AS abc LIMIT ? OFFSET ?");
    assert_eq!(stmt.params, [Value::Integer(-1), Value::Integer(5)]);
}

#[test]
fn unions_follow_the_main_query() -> Result<()> {
    let mut first = Select::<Invoice>::new();
    let mut second = Select::<Invoice>::new();
    let mut third = Select::<Invoice>::new();

    first.filter(|w| w.equal(Invoice::fields().numero, 1))?.limit(3);
    second.filter(|w| w.equal(Invoice::fields().numero, 2))?;
    third.filter(|w| w.equal(Invoice::fields().numero, 3))?;

    first.union(&second).union_all(third);

    let stmt = first.compile();

    assert_eq!(
        stmt.sql,
        "SELECT abc.* FROM Model AS abc WHERE abc.numero = ? LIMIT ? \
         UNION SELECT abc.* FROM Model AS abc WHERE abc.numero = ? \
         UNION ALL SELECT abc.* FROM Model AS abc WHERE abc.numero = ?",
    );
    assert_eq!(
        stmt.params,
        [Value::Integer(1), Value::Integer(3), Value::Integer(2), Value::Integer(3)],
    );

    Ok(())
}

#[test]
fn subquery_params_precede_outer_params() -> Result<()> {
    let mut inner = Select::<Invoice>::new();
    inner.filter(|w| w.great(Invoice::fields().amount, 1.5))?;

    let mut outer = Select::<Invoice>::aliased("sub");
    outer
        .from_query(&inner)
        .project(|p| p.count_as(Invoice::fields().id, "n"))?
        .filter(|w| w.less(Invoice::fields().numero, 10))?;

    let stmt = outer.compile();

    assert_eq!(
        stmt.sql,
        "SELECT COUNT(sub.id) AS n FROM (SELECT abc.* FROM Model AS abc WHERE abc.amount > ?) AS sub \
         WHERE sub.numero < ?",
    );
    assert_eq!(stmt.params, [Value::Real(1.5), Value::Integer(10)]);

    Ok(())
}

#[test]
fn subqueries_as_operands() -> Result<()> {
    let mut inner = Select::<Invoice>::aliased("i");
    inner
        .project(|p| p.column(Invoice::fields().ref_id))?
        .filter(|w| w.great(Invoice::fields().amount, 5))?;

    let mut outer = Select::<Invoice>::new();
    outer.filter(|w| w.in_query(Invoice::fields().id, inner.compile()))?;

    assert_eq!(
        outer.compile().sql,
        "SELECT abc.* FROM Model AS abc WHERE abc.id IN \
         (SELECT i.refId AS refId FROM Model AS i WHERE i.amount > ?)",
    );

    Ok(())
}

#[test]
fn compiling_is_repeatable() -> Result<()> {
    let mut query = Select::<Invoice>::new();
    query.filter(|w| w.equal(Invoice::fields().numero, 1))?.limit(1);

    assert_eq!(query.compile(), query.compile());

    Ok(())
}

#[test]
fn projections_can_be_used_as_columns() -> Result<()> {
    let f = Invoice::fields();
    let mut total = Projection::<Invoice>::expression("abc");
    total.sum(f.amount.clone())?;

    let mut query = Select::<Invoice>::new();
    query
        .group_by(f.ref_id)?
        .having(|h| h.great(Selector::from(total), 100))?;

    let stmt = query.compile();

    assert_eq!(
        stmt.sql,
        "SELECT abc.* FROM Model AS abc GROUP BY abc.refId HAVING SUM(abc.amount) > ?",
    );
    assert_eq!(stmt.params, [Value::Integer(100)]);

    Ok(())
}
