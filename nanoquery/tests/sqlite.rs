use pretty_assertions::assert_eq;
use nanoquery::{Model, Record, Select, Update, Delete, Order, Fragment};
use nanoquery::{Connection, ConnectionExt, TransactionExt, Value, Result, Error};


#[derive(Clone, PartialEq, Debug, Model, Record)]
struct Customer {
    #[nanoquery(auto_increment)]
    id: Option<i64>,
    name: String,
    city_id: i64,
}

#[derive(Clone, PartialEq, Debug, Model, Record)]
struct City {
    #[nanoquery(auto_increment)]
    id: Option<i64>,
    name: String,
}

fn connection() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;

    conn.execute_batch(
        "
        CREATE TABLE City(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL
        );
        CREATE TABLE Customer(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            city_id INTEGER NOT NULL REFERENCES City(id)
        );
        "
    )?;

    Ok(conn)
}

fn populate(conn: &mut Connection) -> Result<Vec<Customer>> {
    let mut cities: Vec<_> = ["Oslo", "Paris", "Rome"]
        .into_iter()
        .map(|name| City { id: None, name: name.into() })
        .collect();

    conn.insert_records(&mut cities)?;

    let mut customers: Vec<_> = (0..1000_i64)
        .map(|i| Customer {
            id: None,
            name: format!("customer #{i}"),
            city_id: i % 3 + 1,
        })
        .collect();

    conn.insert_records(&mut customers)?;

    Ok(customers)
}

fn count_customers(conn: &Connection) -> Result<Vec<Vec<Value>>> {
    let mut query = Select::<Customer>::new();
    query.project(|p| p.count_as(Customer::fields().id, "n"))?;

    conn.query_fragment(&query.compile())
}

#[test]
fn chunked_inserts_receive_contiguous_keys() -> Result<()> {
    let mut conn = connection()?;
    let customers = populate(&mut conn)?;

    let ids: Vec<_> = customers.iter().map(|c| c.id).collect();
    let expected: Vec<_> = (1..=1000).map(Some).collect();
    assert_eq!(ids, expected);

    let mut query = Select::<Customer>::new();
    query
        .project(|p| p.column(Customer::fields().name))?
        .filter(|w| w.equal(Customer::fields().id, 734))?;

    assert_eq!(
        conn.query_fragment(&query.compile())?,
        [[Value::Text("customer #733".into())]],
    );

    Ok(())
}

#[test]
fn inserting_within_a_transaction() -> Result<()> {
    let mut conn = connection()?;
    let mut cities = vec![City { id: None, name: "Vienna".into() }];

    let txn = conn.transaction()?;
    txn.insert_records(&mut cities)?;
    txn.insert_records(&mut Vec::<City>::new())?;
    txn.commit()?;

    assert_eq!(cities[0].id, Some(1));

    Ok(())
}

#[test]
fn joined_and_grouped_query() -> Result<()> {
    let mut conn = connection()?;
    populate(&mut conn)?;

    let mut query = Select::<Customer>::new();

    query.project(|p| p.count_as(Customer::fields().id, "n"))?;
    query.inner_join::<City, _>(|j| {
        let cf = City::fields();
        let city_id = j.parent(Customer::fields().city_id)?;

        j.on(|w| w.equal(cf.id, city_id))?
            .project(|p| p.column_as(cf.name.clone(), "city"))?
            .group_by(cf.name.clone())?
            .order_by(cf.name, Order::Desc)
    })?;

    let rows = conn.query_fragment(&query.compile())?;

    assert_eq!(
        rows,
        [
            [Value::Integer(333), Value::Text("Rome".into())],
            [Value::Integer(333), Value::Text("Paris".into())],
            [Value::Integer(334), Value::Text("Oslo".into())],
        ],
    );

    Ok(())
}

#[test]
fn updates_and_deletes() -> Result<()> {
    let mut conn = connection()?;
    let mut customers = populate(&mut conn)?;

    let mut update = Update::<Customer>::new();
    update
        .set(Customer::fields().city_id, 1)?
        .filter(|w| w.equal(Customer::fields().city_id, 2))?;

    assert_eq!(conn.execute_fragment(&update.compile()?)?.rows_affected, 333);

    customers[0].name = "renamed".into();
    conn.execute_fragment(&Update::record(&customers[0])?.compile()?)?;

    let mut query = Select::<Customer>::new();
    query
        .project(|p| p.column(Customer::fields().name))?
        .filter(|w| w.equal(Customer::fields().id, 1))?;

    assert_eq!(conn.query_fragment(&query.compile())?, [[Value::Text("renamed".into())]]);

    let mut delete = Delete::<Customer>::new();
    delete.filter(|w| w.equal(Customer::fields().city_id, 1))?;

    assert_eq!(conn.execute_fragment(&delete.compile())?.rows_affected, 667);
    assert_eq!(count_customers(&conn)?, [[Value::Integer(333)]]);

    let outcome = conn.execute_fragment(&Delete::<Customer>::keys([3, 6, 9])?.compile())?;

    assert_eq!(outcome.rows_affected, 3);
    assert_eq!(count_customers(&conn)?, [[Value::Integer(330)]]);

    Ok(())
}

#[test]
fn parameter_count_is_checked_before_binding() -> Result<()> {
    let conn = connection()?;

    assert!(matches!(
        conn.query_fragment(&Fragment::new("SELECT ?")),
        Err(Error::ParamCountMismatch { expected: 1, actual: 0 })
    ));

    let rows = conn.query_fragment(&Fragment::with_params("SELECT ?", vec![Value::Integer(42)]))?;
    assert_eq!(rows, [[Value::Integer(42)]]);

    Ok(())
}
