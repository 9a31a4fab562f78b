#![allow(dead_code)]

use oxide_dialect::dialect::{
    H2Dialect, H2Mode, MySqlDialect, OracleDialect, PostgresDialect, SqlServerDialect,
    SqliteDialect,
};
use oxide_dialect::schema::{Column, Index, ReferenceAction, Table};
use oxide_dialect::types::ColumnType;
use oxide_dialect::Dialect;

/// Every built-in dialect.
pub fn all_dialects() -> Vec<Box<dyn Dialect>> {
    vec![
        Box::new(PostgresDialect::new()),
        Box::new(MySqlDialect::new()),
        Box::new(MySqlDialect::mariadb()),
        Box::new(H2Dialect::new(H2Mode::Regular)),
        Box::new(OracleDialect::new()),
        Box::new(SqliteDialect::new()),
        Box::new(SqlServerDialect::new()),
    ]
}

/// `users`: auto-increment key, a unique e-mail and two defaulted columns.
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

/// `posts`: references `users` and cascades deletes.
pub fn posts() -> Table {
    let mut t = Table::new("posts");
    t.add(Column::new("id", ColumnType::big_int()).auto_increment())
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

/// `tester`: one plain index and one partial index.
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
