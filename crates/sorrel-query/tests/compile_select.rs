//! SELECT compilation over the query-expression AST.

mod common;

use common::{fake_binding, LiteralResolver};
use sorrel_ast::{
    AggregateFunc, CommonTableExpr, CompareOp, ComputedField, Condition, Correlation, Expr,
    JoinOn, Logic, OrderField, Position, Projection, QueryExpr, QueryTerminal, SubQuerySpec,
};
use sorrel_runtime::{Env, SqlValue};

fn ident(name: &str) -> Expr {
    Expr::Identifier {
        name: name.to_string(),
        pos: Position::default(),
    }
}

fn text(value: &str) -> Expr {
    Expr::Str {
        value: value.to_string(),
        pos: Position::default(),
    }
}

fn int(value: i64) -> Expr {
    Expr::Integer {
        value,
        pos: Position::default(),
    }
}

fn compare(column: &str, op: CompareOp, value: Expr) -> Condition {
    Condition::Compare {
        column: column.to_string(),
        op,
        value: Some(Box::new(value)),
        logic: Logic::And,
    }
}

fn query(table: &str) -> QueryExpr {
    QueryExpr::new(ident(table))
}

fn compile(binding: &sorrel_runtime::TableBinding, query: &QueryExpr) -> sorrel_query::CompiledQuery {
    sorrel_query::compile_select(binding, query, &mut LiteralResolver, &Env::new()).unwrap()
}

#[test]
fn test_published_posts_scenario() {
    let (_db, binding) = fake_binding("posts");
    let mut q = query("Posts");
    q.conditions
        .push(compare("status", CompareOp::Eq, text("published")));
    q.order_by.push(OrderField::desc("created_at"));
    q.limit = Some(Box::new(int(10)));

    let compiled = compile(&binding, &q);
    assert_eq!(
        compiled.sql,
        "SELECT * FROM posts WHERE status = $1 ORDER BY created_at DESC LIMIT 10"
    );
    assert_eq!(compiled.params, vec![SqlValue::Text("published".to_string())]);
}

#[test]
fn test_parameters_never_appear_in_sql_text() {
    let (_db, binding) = fake_binding("posts");
    let hostile = "x'; DROP TABLE posts; --";
    let mut q = query("Posts");
    q.conditions.push(compare("title", CompareOp::Eq, text(hostile)));

    let compiled = compile(&binding, &q);
    assert!(!compiled.sql.contains("DROP"));
    assert_eq!(compiled.params, vec![SqlValue::Text(hostile.to_string())]);
    // One placeholder per bound parameter.
    assert_eq!(compiled.sql.matches('$').count(), compiled.params.len());
}

#[test]
fn test_cte_reference_lowers_to_membership() {
    let (_db, binding) = fake_binding("posts");
    let mut q = query("Posts");
    q.ctes.push(CommonTableExpr {
        name: "busy_authors".to_string(),
        query: SubQuerySpec {
            table: "users".to_string(),
            columns: vec!["id".to_string()],
            conditions: vec![compare("post_count", CompareOp::Gt, int(10))],
            order_by: vec![],
            limit: None,
            correlate: None,
        },
    });
    q.conditions
        .push(compare("author_id", CompareOp::Eq, ident("busy_authors")));

    let compiled = compile(&binding, &q);
    assert_eq!(
        compiled.sql,
        "WITH busy_authors AS (SELECT id FROM users WHERE post_count > $1) \
         SELECT * FROM posts WHERE author_id IN (SELECT id FROM busy_authors)"
    );
    assert_eq!(compiled.params, vec![SqlValue::Int(10)]);
}

#[test]
fn test_cte_negative_reference_lowers_to_not_in() {
    let (_db, binding) = fake_binding("posts");
    let mut q = query("Posts");
    q.ctes.push(CommonTableExpr {
        name: "banned".to_string(),
        query: SubQuerySpec {
            table: "users".to_string(),
            columns: vec![],
            conditions: vec![],
            order_by: vec![],
            limit: None,
            correlate: None,
        },
    });
    q.conditions
        .push(compare("author_id", CompareOp::NotEq, ident("banned")));

    let compiled = compile(&binding, &q);
    assert!(compiled
        .sql
        .contains("author_id NOT IN (SELECT * FROM banned)"));
}

#[test]
fn test_correlated_subquery_projects_and_rewrites_conditions() {
    let (_db, binding) = fake_binding("posts");
    let mut q = query("Posts");
    q.computed.push(ComputedField::SubQuery {
        alias: "comment_count".to_string(),
        func: Some(AggregateFunc::Count),
        sub: SubQuerySpec {
            table: "comments".to_string(),
            columns: vec![],
            conditions: vec![],
            order_by: vec![],
            limit: None,
            correlate: Some(Correlation {
                inner_column: "post_id".to_string(),
                outer_column: "id".to_string(),
            }),
        },
    });
    q.conditions
        .push(compare("comment_count", CompareOp::Gt, int(5)));

    let compiled = compile(&binding, &q);
    assert_eq!(
        compiled.sql,
        "SELECT *, (SELECT COUNT(*) FROM comments WHERE post_id = posts.id) AS comment_count \
         FROM posts \
         WHERE (SELECT COUNT(*) FROM comments WHERE post_id = posts.id) > $1"
    );
    assert_eq!(compiled.params, vec![SqlValue::Int(5)]);
}

#[test]
fn test_join_subquery_multiplies_projection() {
    let (_db, binding) = fake_binding("posts");
    let mut q = query("Posts");
    q.computed.push(ComputedField::Join {
        alias: "author".to_string(),
        table: "users".to_string(),
        on: vec![JoinOn {
            outer_column: "author_id".to_string(),
            inner_column: "id".to_string(),
        }],
        columns: vec![],
    });

    let compiled = compile(&binding, &q);
    assert_eq!(
        compiled.sql,
        "SELECT posts.*, author.* FROM posts JOIN users author ON author.id = posts.author_id"
    );
}

#[test]
fn test_aggregate_condition_splits_into_having() {
    let (_db, binding) = fake_binding("posts");
    let mut q = query("Posts");
    q.computed.push(ComputedField::Aggregate {
        alias: "total_views".to_string(),
        func: AggregateFunc::Sum,
        column: "views".to_string(),
    });
    q.group_by.push("author_id".to_string());
    q.conditions
        .push(compare("status", CompareOp::Eq, text("published")));
    q.conditions
        .push(compare("total_views", CompareOp::Gt, int(100)));

    let compiled = compile(&binding, &q);
    assert_eq!(
        compiled.sql,
        "SELECT *, SUM(views) AS total_views FROM posts \
         WHERE status = $1 GROUP BY author_id HAVING total_views > $2"
    );
    assert_eq!(
        compiled.params,
        vec![SqlValue::Text("published".to_string()), SqlValue::Int(100)]
    );
}

#[test]
fn test_or_logic_parenthesises() {
    let (_db, binding) = fake_binding("posts");
    let mut q = query("Posts");
    q.conditions
        .push(compare("status", CompareOp::Eq, text("draft")));
    q.conditions.push(Condition::Compare {
        column: "status".to_string(),
        op: CompareOp::Eq,
        value: Some(Box::new(text("review"))),
        logic: Logic::Or,
    });

    let compiled = compile(&binding, &q);
    assert_eq!(
        compiled.sql,
        "SELECT * FROM posts WHERE (status = $1) OR (status = $2)"
    );
}

#[test]
fn test_condition_group() {
    let (_db, binding) = fake_binding("posts");
    let mut q = query("Posts");
    q.conditions
        .push(compare("published", CompareOp::Eq, Expr::Boolean {
            value: true,
            pos: Position::default(),
        }));
    q.conditions.push(Condition::Group {
        conditions: vec![
            compare("views", CompareOp::Gt, int(100)),
            Condition::Compare {
                column: "featured".to_string(),
                op: CompareOp::Eq,
                value: Some(Box::new(Expr::Boolean {
                    value: true,
                    pos: Position::default(),
                })),
                logic: Logic::Or,
            },
        ],
        logic: Logic::And,
    });

    let compiled = compile(&binding, &q);
    assert_eq!(
        compiled.sql,
        "SELECT * FROM posts WHERE published = $1 AND ((views > $2) OR (featured = $3))"
    );
    assert_eq!(compiled.params.len(), 3);
}

#[test]
fn test_soft_delete_prepended_to_where() {
    let (_db, binding) = fake_binding("posts");
    let binding = binding.with_soft_delete("deleted_at");
    let mut q = query("Posts");
    q.conditions
        .push(compare("status", CompareOp::Eq, text("published")));

    let compiled = compile(&binding, &q);
    assert_eq!(
        compiled.sql,
        "SELECT * FROM posts WHERE deleted_at IS NULL AND status = $1"
    );
}

#[test]
fn test_one_terminal_appends_limit() {
    let (_db, binding) = fake_binding("posts");
    let mut q = query("Posts");
    q.terminal = QueryTerminal::One;
    let compiled = compile(&binding, &q);
    assert_eq!(compiled.sql, "SELECT * FROM posts LIMIT 1");

    // count probes on its own terms.
    let mut q = query("Posts");
    q.terminal = QueryTerminal::Count;
    let compiled = compile(&binding, &q);
    assert_eq!(compiled.sql, "SELECT COUNT(*) FROM posts");
}

#[test]
fn test_exists_probe() {
    let (_db, binding) = fake_binding("posts");
    let mut q = query("Posts");
    q.terminal = QueryTerminal::Exists;
    let compiled = compile(&binding, &q);
    assert_eq!(compiled.sql, "SELECT 1 FROM posts");
}

#[test]
fn test_in_condition_expands_placeholders() {
    let (_db, binding) = fake_binding("posts");
    let mut q = query("Posts");
    q.conditions.push(compare(
        "status",
        CompareOp::In,
        Expr::Array {
            elements: vec![text("draft"), text("review")],
            pos: Position::default(),
        },
    ));

    let compiled = compile(&binding, &q);
    assert_eq!(compiled.sql, "SELECT * FROM posts WHERE status IN ($1, $2)");
    assert_eq!(compiled.params.len(), 2);
}

#[test]
fn test_projection_columns_and_offset() {
    let (_db, binding) = fake_binding("posts");
    let mut q = query("Posts");
    q.projection = Projection::Columns(vec!["id".to_string(), "title".to_string()]);
    q.limit = Some(Box::new(int(10)));
    q.offset = Some(Box::new(int(20)));

    let compiled = compile(&binding, &q);
    assert_eq!(compiled.sql, "SELECT id, title FROM posts LIMIT 10 OFFSET 20");
}

#[test]
fn test_unsafe_order_column_rejected() {
    let (_db, binding) = fake_binding("posts");
    let mut q = query("Posts");
    q.order_by.push(OrderField::asc("name; DROP TABLE x"));
    let err = sorrel_query::compile_select(&binding, &q, &mut LiteralResolver, &Env::new())
        .unwrap_err();
    assert_eq!(err.code, "VAL-0002");
}

#[test]
fn test_reserved_group_by_column_rejected() {
    let (_db, binding) = fake_binding("posts");
    let mut q = query("Posts");
    q.group_by.push("select".to_string());
    let err = sorrel_query::compile_select(&binding, &q, &mut LiteralResolver, &Env::new())
        .unwrap_err();
    assert_eq!(err.code, "VAL-0002");
}

#[test]
fn test_to_sql_terminal_compiles_identically() {
    let (_db, binding) = fake_binding("posts");
    let mut executable = query("Posts");
    executable
        .conditions
        .push(compare("status", CompareOp::Eq, text("published")));

    let mut introspected = executable.clone();
    introspected.terminal = QueryTerminal::ToSql;

    let a = compile(&binding, &executable);
    let b = compile(&binding, &introspected);
    assert_eq!(a.sql, b.sql);
    assert_eq!(a.params, b.params);
}
