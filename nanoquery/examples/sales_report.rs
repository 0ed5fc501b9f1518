//! Builds a small shop database in memory, then prints the best-selling
//! products of each category using a joined, grouped and ordered query.

use nanoquery::{Model, Record, Select, Update, Order, Result};
use nanoquery::{Connection, ConnectionExt, Value};


#[derive(Clone, Debug, Model, Record)]
struct Category {
    #[nanoquery(auto_increment)]
    id: Option<i64>,
    name: String,
}

#[derive(Clone, Debug, Model, Record)]
struct Product {
    #[nanoquery(auto_increment)]
    id: Option<i64>,
    category_id: i64,
    name: String,
    price: f64,
}

#[derive(Clone, Debug, Model, Record)]
#[nanoquery(rename = "sale", alias = "s")]
struct Sale {
    #[nanoquery(auto_increment)]
    id: Option<i64>,
    product_id: i64,
    quantity: u32,
}

fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE Category(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );
        CREATE TABLE Product(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            category_id INTEGER NOT NULL REFERENCES Category(id),
            name TEXT NOT NULL,
            price REAL NOT NULL
        );
        CREATE TABLE sale(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_id INTEGER NOT NULL REFERENCES Product(id),
            quantity INTEGER NOT NULL
        );
        "
    )?;

    Ok(())
}

fn populate(conn: &mut Connection) -> Result<()> {
    let mut categories = vec![
        Category { id: None, name: "fruit".into() },
        Category { id: None, name: "bakery".into() },
    ];
    conn.insert_records(&mut categories)?;

    let fruit = categories[0].id.unwrap_or_default();
    let bakery = categories[1].id.unwrap_or_default();

    let mut products = vec![
        Product { id: None, category_id: fruit, name: "apple".into(), price: 0.5 },
        Product { id: None, category_id: fruit, name: "pear".into(), price: 0.75 },
        Product { id: None, category_id: bakery, name: "bagel".into(), price: 1.25 },
        Product { id: None, category_id: bakery, name: "croissant".into(), price: 1.5 },
    ];
    conn.insert_records(&mut products)?;

    let mut sales: Vec<_> = (0..2000_u32)
        .map(|i| {
            let product = &products[(i as usize * 7) % products.len()];

            Sale {
                id: None,
                product_id: product.id.unwrap_or_default(),
                quantity: i % 5 + 1,
            }
        })
        .collect();
    conn.insert_records(&mut sales)?;

    println!("inserted {} sales, last key: {:?}", sales.len(), sales.last().and_then(|s| s.id));

    Ok(())
}

fn main() -> Result<()> {
    let mut conn = Connection::open_in_memory()?;

    create_schema(&conn)?;
    populate(&mut conn)?;

    // croissants get more expensive
    let mut raise = Update::<Product>::new();
    raise
        .set(Product::fields().price, 1.75)?
        .filter(|w| w.equal(Product::fields().name, "croissant"))?;
    conn.execute_fragment(&raise.compile()?)?;

    let mut report = Select::<Sale>::new();
    let units = report.expr(|e| e.sum(Sale::fields().quantity))?;

    report.project(|proj| proj.column_as(units.clone(), "units"))?;
    report.inner_join::<Product, _>(|p| {
        let pf = Product::fields();
        let product_id = p.parent(Sale::fields().product_id)?;

        p.on(|w| w.equal(pf.id, product_id))?
            .inner_join::<Category, _>(|c| {
                let cf = Category::fields();
                let category_id = c.parent(Product::fields().category_id)?;

                c.on(|w| w.equal(cf.id, category_id))?
                    .project(|proj| proj.column_as(cf.name.clone(), "category"))?
                    .group_by(cf.name)
            })?
            .project(|proj| proj.column_as(pf.name.clone(), "product"))?
            .group_by(pf.name)?
            .having(|h| h.great(units.clone(), 100))?
            .order_by(units, Order::Desc)
    })?;

    let stmt = report.compile();
    println!("{}", stmt.sql);

    for row in conn.query_fragment(&stmt)? {
        let cells: Vec<String> = row
            .iter()
            .map(|value| match value {
                Value::Text(text) => text.clone(),
                Value::Integer(int) => int.to_string(),
                Value::Real(real) => format!("{real:.2}"),
                other => format!("{other:?}"),
            })
            .collect();

        println!("{}", cells.join("\t"));
    }

    Ok(())
}
