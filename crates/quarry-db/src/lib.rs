//! Fluent SQL statement builder and executor for SQLite.
//!
//! Statements are assembled through chained calls and compiled to a
//! parameterized SQL string plus an ordered binding list, then run
//! against a shared [`rusqlite`] connection:
//!
//! ```
//! use quarry_db::Database;
//!
//! let db = Database::open_in_memory().unwrap();
//! db.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, status TEXT)")
//!     .unwrap();
//!
//! let id = db
//!     .table("users")
//!     .insert([("name", "ada"), ("status", "active")])
//!     .unwrap();
//!
//! let rows = db
//!     .table("users")
//!     .select(["id", "name"])
//!     .filter("status", "=", "active")
//!     .limit(10)
//!     .get()
//!     .unwrap();
//! assert_eq!(rows[0].get("id").unwrap().as_integer(), Some(id));
//! ```

pub mod connection;
pub mod error;
pub mod helpers;
pub mod row;
pub mod statement;
pub mod value;

pub use connection::Database;
pub use error::{DbError, DbResult};
pub use helpers::*;
pub use row::Row;
pub use statement::{MorphIter, Statement};
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.execute_batch(
            "CREATE TABLE users (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                score INTEGER NOT NULL DEFAULT 0,
                tags TEXT,
                deleted_at TEXT
            );
            CREATE TABLE orders (
                id INTEGER PRIMARY KEY,
                users_id INTEGER NOT NULL,
                total INTEGER NOT NULL
            );",
        )
        .unwrap();
        db
    }

    #[test]
    fn test_insert_round_trip() {
        let db = setup_db();

        let tags = vec!["admin".to_string(), "staff".to_string()];
        let id = db
            .table("users")
            .insert([
                ("name", Value::from("ada")),
                ("score", Value::from(42)),
                ("tags", Value::from(to_json(&tags))),
            ])
            .unwrap();
        assert!(id > 0);

        let row = db
            .table("users")
            .eq("id", id)
            .first()
            .unwrap()
            .unwrap();
        assert_eq!(row.get("name").unwrap().as_text(), Some("ada"));
        assert_eq!(row.get("score").unwrap().as_integer(), Some(42));
        assert_eq!(row.get("status").unwrap().as_text(), Some("active"));
        assert_eq!(from_optional_json::<Vec<String>>(row.get("tags")), Some(tags));
        assert!(row.get("deleted_at").unwrap().is_null());
    }

    #[test]
    fn test_get_preserves_column_order() {
        let db = setup_db();
        db.table("users").insert([("name", "ada")]).unwrap();

        let rows = db
            .table("users")
            .select(["name", "id", "score"])
            .get()
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].columns(), ["name", "id", "score"]);
    }

    #[test]
    fn test_first_on_empty_result() {
        let db = setup_db();
        assert!(db.table("users").first().unwrap().is_none());
    }

    #[test]
    fn test_update_binds_set_before_where() {
        let db = setup_db();
        db.table("users")
            .insert([("name", Value::from("ada")), ("score", Value::from(1))])
            .unwrap();
        db.table("users")
            .insert([("name", Value::from("grace")), ("score", Value::from(2))])
            .unwrap();

        let affected = db
            .table("users")
            .filter("score", ">", 1)
            .update([("status", "flagged")])
            .unwrap();
        assert_eq!(affected, 1);

        let row = db.table("users").eq("name", "grace").first().unwrap().unwrap();
        assert_eq!(row.get("status").unwrap().as_text(), Some("flagged"));
    }

    #[test]
    fn test_delete() {
        let db = setup_db();
        for name in ["ada", "grace", "linus"] {
            db.table("users").insert([("name", name)]).unwrap();
        }

        let affected = db
            .table("users")
            .filter_in("name", vec!["ada", "grace"])
            .delete()
            .unwrap();
        assert_eq!(affected, 2);
        assert_eq!(db.table("users").count().unwrap(), 1);
    }

    #[test]
    fn test_count_with_conditions() {
        let db = setup_db();
        for (name, score) in [("ada", 5), ("grace", 15), ("linus", 25)] {
            db.table("users")
                .insert([("name", Value::from(name)), ("score", Value::from(score))])
                .unwrap();
        }
        let count = db.table("users").filter("score", ">", 10).count().unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_mutations_without_source() {
        let db = setup_db();
        assert!(matches!(
            db.statement().insert([("name", "ada")]),
            Err(DbError::TableNotSet)
        ));
        assert!(matches!(
            db.statement().update([("name", "ada")]),
            Err(DbError::TableNotSet)
        ));
        assert!(matches!(db.statement().delete(), Err(DbError::TableNotSet)));
    }

    #[test]
    fn test_empty_data_is_rejected() {
        let db = setup_db();
        let empty: [(&str, Value); 0] = [];
        assert!(matches!(
            db.table("users").insert(empty.clone()),
            Err(DbError::EmptyValues("insert"))
        ));
        assert!(matches!(
            db.table("users").update(empty),
            Err(DbError::EmptyValues("update"))
        ));
    }

    #[test]
    fn test_inferred_join_executes() {
        let db = setup_db();
        let user_id = db.table("users").insert([("name", "ada")]).unwrap();
        db.table("orders")
            .insert([("users_id", user_id), ("total", 99)])
            .unwrap();

        let rows = db
            .table("users u")
            .select(["u.name", "orders.total"])
            .join("orders")
            .get()
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("total").unwrap().as_integer(), Some(99));
    }

    #[test]
    fn test_grouped_query_executes() {
        let db = setup_db();
        for (name, status, score) in [
            ("ada", "active", 10),
            ("grace", "active", 20),
            ("linus", "idle", 5),
        ] {
            db.table("users")
                .insert([
                    ("name", Value::from(name)),
                    ("status", Value::from(status)),
                    ("score", Value::from(score)),
                ])
                .unwrap();
        }

        let rows = db
            .table("users")
            .select(["status", "COUNT(id) AS n"])
            .filter("score", ">", 0)
            .group_by(["status"])
            .having("COUNT(id)", ">", 1)
            .get()
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("status").unwrap().as_text(), Some("active"));
        assert_eq!(rows[0].get("n").unwrap().as_integer(), Some(2));
    }

    #[test]
    fn test_union_executes_with_bindings() {
        let db = setup_db();
        for (name, status) in [("ada", "active"), ("grace", "idle")] {
            db.table("users")
                .insert([("name", Value::from(name)), ("status", Value::from(status))])
                .unwrap();
        }

        let rows = db
            .table("users")
            .select(["name"])
            .filter("status", "=", "active")
            .union_all(|q| q.from("users").select(["name"]).filter("status", "=", "idle"))
            .get()
            .unwrap();
        let names: Vec<_> = rows.iter().filter_map(|r| r.get("name")).collect();
        assert_eq!(
            names,
            vec![&Value::Text("ada".into()), &Value::Text("grace".into())]
        );
    }

    #[test]
    fn test_morph_transforms_rows() {
        let db = setup_db();
        for name in ["ada", "grace"] {
            db.table("users").insert([("name", name)]).unwrap();
        }

        let names: Vec<String> = db
            .table("users")
            .select(["name"])
            .order_by("name", false)
            .morph(|row| {
                row.get("name")
                    .and_then(|v| v.as_text())
                    .unwrap_or_default()
                    .to_uppercase()
            })
            .collect::<DbResult<_>>()
            .unwrap();
        assert_eq!(names, vec!["ADA".to_string(), "GRACE".to_string()]);
    }

    #[test]
    fn test_morph_spread_passes_values_positionally() {
        let db = setup_db();
        db.table("users")
            .insert([("name", Value::from("ada")), ("score", Value::from(7))])
            .unwrap();

        let pairs: Vec<(String, i64)> = db
            .table("users")
            .select(["name", "score"])
            .morph_spread(|values| {
                (
                    values[0].as_text().unwrap_or_default().to_string(),
                    values[1].as_integer().unwrap_or_default(),
                )
            })
            .collect::<DbResult<_>>()
            .unwrap();
        assert_eq!(pairs, vec![("ada".to_string(), 7)]);
    }

    #[test]
    fn test_morph_refills_batches() {
        let db = setup_db();
        for i in 0..205 {
            db.table("users")
                .insert([("name", format!("user-{}", i))])
                .unwrap();
        }

        let total = db
            .table("users")
            .select(["id"])
            .morph(|row| row.len())
            .collect::<DbResult<Vec<_>>>()
            .unwrap()
            .len();
        assert_eq!(total, 205);
    }

    #[test]
    fn test_open_file_backed() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db")).unwrap();
        db.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)")
            .unwrap();

        let id = db.table("t").insert([("v", "x")]).unwrap();
        assert!(id > 0);
        assert_eq!(db.table("t").count().unwrap(), 1);
    }

    #[test]
    fn test_morph_surfaces_compile_errors_lazily() {
        let db = setup_db();
        let mut iter = db.statement().morph(|row| row.len());
        assert!(matches!(iter.next(), Some(Err(DbError::TableNotSet))));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_subquery_source_executes() {
        let db = setup_db();
        for (name, score) in [("ada", 10), ("grace", 20)] {
            db.table("users")
                .insert([("name", Value::from(name)), ("score", Value::from(score))])
                .unwrap();
        }

        let rows = db
            .statement()
            .from_subquery("t", |q| q.from("users").filter("score", ">", 5))
            .filter("name", "=", "grace")
            .get()
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("score").unwrap().as_integer(), Some(20));
    }
}
