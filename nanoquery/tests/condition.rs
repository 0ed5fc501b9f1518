use pretty_assertions::assert_eq;
use nanoquery::{Model, Where, Condition, Operand, IsNull, Field, PropertyPath, Selector, Fragment};
use nanoquery::{Value, Result, Error};


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

#[derive(Clone, PartialEq, Debug, Model)]
struct Country {
    #[nanoquery(pk)]
    code: String,
}

#[derive(Clone, PartialEq, Debug, Model)]
struct City {
    #[nanoquery(auto_increment)]
    id: Option<i64>,
    #[nanoquery(reference = Country)]
    country: Country,
}

#[derive(Clone, PartialEq, Debug, Model)]
#[nanoquery(alias = "buy")]
struct Purchase {
    #[nanoquery(auto_increment)]
    id: Option<i64>,
    #[nanoquery(reference = City)]
    city: City,
}

fn filter() -> Where<Invoice> {
    Where::new("abc")
}

#[test]
fn equal_binds_a_parameter() -> Result<()> {
    let f = Invoice::fields();
    let mut w = filter();
    w.equal(f.numero, 13)?;

    assert_eq!(w.compile(), Fragment::with_params("abc.numero = ?", vec![Value::Integer(13)]));

    Ok(())
}

#[test]
fn tests_are_joined_with_and_unless_or_is_requested() -> Result<()> {
    let f = Invoice::fields();
    let mut w = filter();

    w.equal(f.numero.clone(), 1)?
        .or()
        .equal(f.numero, 2)?
        .great(f.amount, 3.5)?;

    let frag = w.compile();

    assert_eq!(frag.sql, "abc.numero = ? OR abc.numero = ? AND abc.amount > ?");
    assert_eq!(frag.params, [Value::Integer(1), Value::Integer(2), Value::Real(3.5)]);

    Ok(())
}

#[test]
fn not_inverts_ordering_comparisons() -> Result<()> {
    let cases: [(fn(&mut Where<Invoice>) -> Result<&mut Where<Invoice>>, &str); 6] = [
        (|w| w.not().great(Invoice::fields().numero, 1), "abc.numero <= ?"),
        (|w| w.not().great_or_equal(Invoice::fields().numero, 1), "abc.numero < ?"),
        (|w| w.not().less(Invoice::fields().numero, 1), "abc.numero >= ?"),
        (|w| w.not().less_or_equal(Invoice::fields().numero, 1), "abc.numero > ?"),
        (|w| w.not().equal(Invoice::fields().numero, 1), "abc.numero <> ?"),
        (|w| w.not().like(Invoice::fields().note, "a%"), "abc.note NOT LIKE ?"),
    ];

    for (build, expected) in cases {
        let mut w = filter();
        build(&mut w)?;
        assert_eq!(w.compile().sql, expected);
    }

    Ok(())
}

#[test]
fn double_negation_cancels_out() -> Result<()> {
    let f = Invoice::fields();
    let mut negated_twice = filter();
    let mut plain = filter();

    negated_twice.not().not().great(f.amount.clone(), 10)?;
    plain.great(f.amount, 10)?;

    assert_eq!(negated_twice.compile(), plain.compile());

    Ok(())
}

#[test]
fn negation_applies_to_the_next_test_only() -> Result<()> {
    let f = Invoice::fields();
    let mut w = filter();

    w.not().equal(f.numero.clone(), 1)?.equal(f.numero, 2)?;

    assert_eq!(w.compile().sql, "abc.numero <> ? AND abc.numero = ?");

    Ok(())
}

#[test]
fn equality_with_null_marker_is_rewritten() -> Result<()> {
    let f = Invoice::fields();
    let mut w = filter();

    w.equal(f.note.clone(), IsNull)?
        .not()
        .equal(f.note.clone(), IsNull)?
        .is_null(f.note.clone())?
        .not()
        .is_null(f.note)?;

    let frag = w.compile();

    assert_eq!(
        frag.sql,
        "abc.note IS NULL AND abc.note IS NOT NULL AND abc.note IS NULL AND abc.note IS NOT NULL",
    );
    assert!(frag.params.is_empty());

    Ok(())
}

#[test]
fn between_and_in() -> Result<()> {
    let f = Invoice::fields();
    let mut w = filter();

    w.between(f.amount.clone(), 1.0, 2.0)?
        .not()
        .between(f.amount, 5, 6)?
        .is_in(f.numero.clone(), [3, 4, 5])?
        .not()
        .is_in(f.numero, [6])?;

    let frag = w.compile();

    assert_eq!(
        frag.sql,
        "abc.amount BETWEEN ? AND ? AND abc.amount NOT BETWEEN ? AND ? \
         AND abc.numero IN (?, ?, ?) AND abc.numero NOT IN (?)",
    );
    assert_eq!(frag.params.len(), 8);
    assert_eq!(frag.params[0], Value::Real(1.0));
    assert_eq!(frag.params[7], Value::Integer(6));

    Ok(())
}

#[test]
fn in_subquery_is_parenthesized() -> Result<()> {
    let f = Invoice::fields();
    let subquery = Fragment::with_params(
        "SELECT x.numero FROM Model AS x WHERE x.amount > ?",
        vec![Value::Integer(100)],
    );
    let mut w = filter();

    w.equal(f.ref_id, 9)?.in_query(f.numero, subquery)?;

    let frag = w.compile();

    assert_eq!(
        frag.sql,
        "abc.refId = ? AND abc.numero IN (SELECT x.numero FROM Model AS x WHERE x.amount > ?)",
    );
    assert_eq!(frag.params, [Value::Integer(9), Value::Integer(100)]);

    Ok(())
}

#[test]
fn wrong_operand_count_is_an_error() {
    let mut w = filter();
    let result = w.test(
        &[Condition::Between],
        vec![Operand::Column(Selector::Raw("amount".into())), Operand::Value(Value::Integer(1))],
    );

    assert!(matches!(
        result,
        Err(Error::OperandCount { expected: 3, actual: 2, .. })
    ));
}

#[test]
fn failed_test_keeps_pending_modifiers() -> Result<()> {
    let f = Invoice::fields();
    let mut w = filter();

    w.equal(f.numero.clone(), 1)?.or().not();

    let result = w.test(&[Condition::Between], vec![Operand::Value(Value::Integer(1))]);
    assert!(matches!(result, Err(Error::OperandCount { .. })));

    w.equal(f.numero, 2)?;

    let frag = w.compile();

    assert_eq!(frag.sql, "abc.numero = ? OR abc.numero <> ?");
    assert_eq!(frag.params, [Value::Integer(1), Value::Integer(2)]);

    Ok(())
}

#[test]
fn scopes_are_parenthesized() -> Result<()> {
    let f = Invoice::fields();
    let mut w = filter();

    w.equal(f.numero, 1)?
        .scope(|s| s.equal(f.ref_id.clone(), 2)?.or().equal(f.ref_id.clone(), 3))?
        .not()
        .scope(|s| s.great(f.amount.clone(), 4)?.or().is_null(f.note.clone()))?;

    let frag = w.compile();

    assert_eq!(
        frag.sql,
        "abc.numero = ? AND (abc.refId = ? OR abc.refId = ?) AND NOT (abc.amount > ? OR abc.note IS NULL)",
    );
    assert_eq!(
        frag.params,
        [Value::Integer(1), Value::Integer(2), Value::Integer(3), Value::Integer(4)],
    );

    Ok(())
}

#[test]
fn empty_scope_is_ignored() -> Result<()> {
    let f = Invoice::fields();
    let mut w = filter();

    w.scope(|s| Ok(s))?.equal(f.numero, 1)?;

    assert_eq!(w.compile().sql, "abc.numero = ?");

    Ok(())
}

#[test]
fn empty_scope_consumes_pending_modifiers() -> Result<()> {
    let f = Invoice::fields();
    let mut w = filter();

    w.equal(f.numero.clone(), 1)?;
    w.not().scope(|s| Ok(s))?;
    w.equal(f.numero.clone(), 2)?;

    assert_eq!(w.compile().sql, "abc.numero = ? AND abc.numero = ?");

    let mut w = filter();

    w.equal(f.numero.clone(), 1)?;
    w.or().multi_column_like(Vec::<&str>::new(), "x")?;
    w.equal(f.numero, 2)?;

    assert_eq!(w.compile().sql, "abc.numero = ? AND abc.numero = ?");

    Ok(())
}

#[test]
fn raw_strings_are_columns_on_the_left_and_literals_on_the_right() -> Result<()> {
    let mut w = filter();

    w.equal("numero", "numero")?
        .equal("strftime('%Y', abc.created)", "2024")?;

    let frag = w.compile();

    assert_eq!(frag.sql, "abc.numero = ? AND strftime('%Y', abc.created) = ?");
    assert_eq!(frag.params, [Value::Text("numero".into()), Value::Text("2024".into())]);

    Ok(())
}

#[test]
fn columns_can_be_compared_to_columns() -> Result<()> {
    let f = Invoice::fields();
    let mut w = filter();

    w.less(f.numero, f.ref_id)?;

    assert_eq!(w.compile(), Fragment::new("abc.numero < abc.refId"));

    Ok(())
}

#[test]
fn text_search_helpers() -> Result<()> {
    let f = Invoice::fields();
    let mut w = filter();

    w.contains(f.note.clone(), "ab")?
        .starts_with(f.note.clone(), "cd")?
        .ends_with(f.note.clone(), "ef")?
        .multi_column_like([f.note, Invoice::fields().numero], "gh")?;

    let frag = w.compile();

    assert_eq!(
        frag.sql,
        "abc.note LIKE ? AND abc.note LIKE ? AND abc.note LIKE ? AND (abc.note LIKE ? OR abc.numero LIKE ?)",
    );
    assert_eq!(
        frag.params,
        ["%ab%", "cd%", "%ef", "%gh%", "%gh%"].map(|s| Value::Text(s.into())),
    );

    Ok(())
}

#[test]
fn expressions_are_added_as_parenthesized_tests() -> Result<()> {
    let f = Invoice::fields();
    let mut w = filter();

    w.equal(f.numero, 1)?
        .or()
        .expr(Fragment::with_params("abc.amount * 2 > ?", vec![Value::Integer(10)]))?;

    assert_eq!(w.compile().sql, "abc.numero = ? OR (abc.amount * 2 > ?)");

    Ok(())
}

#[test]
fn nested_property_paths_are_joined_with_underscores() -> Result<()> {
    let f = Purchase::fields();
    let mut w = Where::<Purchase>::new("buy");

    w.equal(f.city.country.code, "HU")?.equal(f.city.id, 1)?;

    assert_eq!(w.compile().sql, "buy.city_country_code = ? AND buy.city_id = ?");

    Ok(())
}

#[test]
fn unknown_properties_are_rejected() {
    let bogus = Field::<Invoice>::new(PropertyPath::root().child("bogus"));
    let through_scalar = Field::<Invoice>::new(PropertyPath::root().child("numero").child("x"));

    assert!(matches!(
        filter().equal(bogus, 1),
        Err(Error::UnknownProperty { .. })
    ));
    assert!(matches!(
        filter().equal(through_scalar, 1),
        Err(Error::UnknownProperty { .. })
    ));
}
