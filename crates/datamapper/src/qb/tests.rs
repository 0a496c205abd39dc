//! Golden tests for the qb module.

use crate::qb::{Expr, Select, select};
use crate::value::Value;

#[test]
fn test_select_standard() {
    let s = select("mytable");
    assert_eq!(s.to_string(), "SELECT * FROM \"mytable\"");

    let s = s.order("id desc");
    assert_eq!(s.to_string(), "SELECT * FROM \"mytable\" ORDER BY id desc");

    let s = s.limit(10);
    assert_eq!(
        s.to_string(),
        "SELECT * FROM \"mytable\" ORDER BY id desc LIMIT 10"
    );

    let s = s.offset(10);
    assert_eq!(
        s.to_string(),
        "SELECT * FROM \"mytable\" ORDER BY id desc LIMIT 10 OFFSET 10"
    );

    let s = s.set_cols(["id", "email"]);
    assert_eq!(
        s.to_string(),
        "SELECT \"id\", \"email\" FROM \"mytable\" ORDER BY id desc LIMIT 10 OFFSET 10"
    );

    let s = s.set_cols(vec!["id".to_string(), "email".to_string()]);
    assert_eq!(
        s.to_string(),
        "SELECT \"id\", \"email\" FROM \"mytable\" ORDER BY id desc LIMIT 10 OFFSET 10"
    );

    let s = s.set_cols([Expr::new("count(1)")]);
    assert_eq!(
        s.to_string(),
        "SELECT count(1) FROM \"mytable\" ORDER BY id desc LIMIT 10 OFFSET 10"
    );

    let s = s.limit("a").offset("b");
    assert_eq!(
        s.to_string(),
        "SELECT count(1) FROM \"mytable\" ORDER BY id desc"
    );

    let s = s.limit(10).offset(10).limit(1e30).offset(-1e30);
    assert_eq!(
        s.to_string(),
        "SELECT count(1) FROM \"mytable\" ORDER BY id desc"
    );
}

#[test]
fn test_where_accumulates_params() {
    let s = select("mytable").and_where_one("name = ?", "yangyi");
    let stmt = s.compile().unwrap();
    assert_eq!(stmt.sql, "SELECT * FROM \"mytable\" WHERE (name = ?)");
    assert_eq!(stmt.params, vec![Value::from("yangyi")]);

    let s = s.and_where_one("email = ? and active = 1", "yangyi.cn.gz@gmail.com");
    let stmt = s.compile().unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM \"mytable\" WHERE (name = ?) AND (email = ? and active = 1)"
    );
    assert_eq!(
        stmt.params,
        vec![Value::from("yangyi"), Value::from("yangyi.cn.gz@gmail.com")]
    );

    let other = select("other_table")
        .set_cols(["user_id"])
        .and_where_one("other = ?", "other");
    let s = s.and_in("id", other);
    let (sql, params) = s.compile().unwrap().into_parts();
    assert_eq!(
        sql,
        "SELECT * FROM \"mytable\" WHERE (name = ?) AND (email = ? and active = 1) AND (\"id\" IN (SELECT \"user_id\" FROM \"other_table\" WHERE (other = ?)))"
    );
    assert_eq!(
        params,
        vec![
            Value::from("yangyi"),
            Value::from("yangyi.cn.gz@gmail.com"),
            Value::from("other"),
        ]
    );
}

#[test]
fn test_subquery_params_keep_position() {
    let sub = select("orders")
        .set_cols(["user_id"])
        .and_where_one("total > ?", 100);
    let stmt = select("users")
        .and_where_one("a = ?", 1)
        .and_in("id", sub)
        .and_where_one("b = ?", 2)
        .compile()
        .unwrap();
    assert_eq!(
        stmt.params,
        vec![Value::Int(1), Value::Int(100), Value::Int(2)]
    );
}

#[test]
fn test_where_spread_and_sequence_forms_match() {
    let spread = select("mytable")
        .and_where("email = ? and passwd = ?", ["yangyi.cn.gz@gmail.com", "abc"])
        .compile()
        .unwrap();
    let sequence = select("mytable")
        .and_where(
            "email = ? and passwd = ?",
            vec![Value::from("yangyi.cn.gz@gmail.com"), Value::from("abc")],
        )
        .compile()
        .unwrap();

    assert_eq!(
        spread.sql,
        "SELECT * FROM \"mytable\" WHERE (email = ? and passwd = ?)"
    );
    assert_eq!(spread, sequence);
}

#[test]
fn test_where_in_literal_list() {
    let stmt = select("mytable").and_in("id", vec![1, 2, 3]).compile().unwrap();
    assert_eq!(stmt.sql, "SELECT * FROM \"mytable\" WHERE (\"id\" IN (1,2,3))");
    assert!(stmt.params.is_empty());
}

#[test]
fn test_where_param_mismatch_fails_compile() {
    let err = select("mytable")
        .and_where("a = ? and b = ?", [1])
        .compile()
        .unwrap_err();
    assert!(err.is_logic());
}

fn guarded() -> Select {
    select("mytable").and_where_raw("id = 1")
}

#[test]
fn test_update_without_where() {
    let err = select("mytable").update([("name", "yangyi")]).unwrap_err();
    assert!(err.is_logic());
    assert!(err.to_string().contains("update without where"));
}

#[test]
fn test_update_with_limit_offset_group() {
    assert!(guarded().limit(10).update([("name", "yangyi")]).unwrap_err().is_logic());
    assert!(guarded().offset(10).update([("name", "yangyi")]).unwrap_err().is_logic());
    assert!(guarded().group("email").update([("name", "yangyi")]).unwrap_err().is_logic());
}

#[test]
fn test_delete_without_where() {
    let err = select("mytable").delete().unwrap_err();
    assert!(err.is_logic());
    assert!(err.to_string().contains("delete without where"));
}

#[test]
fn test_delete_with_limit_offset_group() {
    assert!(guarded().limit(10).delete().unwrap_err().is_logic());
    assert!(guarded().offset(10).delete().unwrap_err().is_logic());
    assert!(guarded().group("email").delete().unwrap_err().is_logic());
}

#[test]
fn test_guarded_update_ok() {
    let stmt = guarded().update([("name", "yangyi")]).unwrap();
    assert_eq!(
        stmt.sql,
        "UPDATE \"mytable\" SET \"name\" = ? WHERE (id = 1)"
    );
    assert_eq!(stmt.params, vec![Value::from("yangyi")]);
}
