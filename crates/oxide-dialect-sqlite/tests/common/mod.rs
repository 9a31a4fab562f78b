#![allow(dead_code)]

use oxide_dialect::schema::{Column, Index, ReferenceAction, Table};
use oxide_dialect::types::ColumnType;
use oxide_dialect_sqlite::SqliteIntrospector;
use sqlx::sqlite::SqlitePoolOptions;

/// An introspector over a fresh in-memory database.
pub async fn memory_db() -> SqliteIntrospector {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");
    SqliteIntrospector::new(pool).expect("catalog patterns compile")
}

/// `users` with an identity key, a unique e-mail and defaults.
pub fn users() -> Table {
    let mut t = Table::new("users");
    t.add(Column::new("id", ColumnType::integer()).auto_increment())
        .unwrap();
    t.column("name", ColumnType::varchar(50)).unwrap();
    t.column("email", ColumnType::varchar(120).nullable())
        .unwrap();
    t.add(Column::new("active", ColumnType::boolean()).default_value(true))
        .unwrap();
    t.add(Column::new("visits", ColumnType::integer()).default_value(0))
        .unwrap();
    t.set_primary_key(&["id"], None).unwrap();
    t.add_index(Index::unique(&["email"])).unwrap();
    t
}

/// `posts` referencing `users`.
pub fn posts() -> Table {
    let mut t = Table::new("posts");
    t.add(Column::new("id", ColumnType::integer()).auto_increment())
        .unwrap();
    t.add(
        Column::new("author", ColumnType::integer())
            .references("users", "id")
            .on_delete(ReferenceAction::Cascade),
    )
    .unwrap();
    t.column("title", ColumnType::varchar(200)).unwrap();
    t.set_primary_key(&["id"], None).unwrap();
    t
}

/// `tester` with a plain and a partial index.
pub fn tester() -> Table {
    let mut t = Table::new("tester");
    t.add(Column::new("id", ColumnType::integer()).auto_increment())
        .unwrap();
    t.column("name", ColumnType::varchar(50)).unwrap();
    let flag = t.column("flag", ColumnType::boolean()).unwrap();
    t.column("amount", ColumnType::integer().nullable())
        .unwrap();
    t.set_primary_key(&["id"], None).unwrap();
    t.add_index(Index::new(&["name"])).unwrap();
    t.add_index(Index::new(&["amount"]).filter(flag.eq(true)))
        .unwrap();
    t
}
