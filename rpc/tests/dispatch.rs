//! End-to-end request scenarios against a dispatcher.

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use sqlbook_core::Value as Cell;
use sqlbook_rpc::{Dispatcher, Response};
use sqlbook_session::{QuerySession, SessionConfig};
use sqlbook_source::{DataSource, MemorySource, SqliteSource};

fn call<S: DataSource>(dispatcher: &mut Dispatcher<S>, method: &str, params: Value) -> Response {
    let request = json!({"jsonrpc": "2.0", "method": method, "params": params, "id": 1});
    let bytes = dispatcher.handle(request.to_string().as_bytes());
    serde_json::from_slice(&bytes).unwrap()
}

fn ok<S: DataSource>(dispatcher: &mut Dispatcher<S>, method: &str, params: Value) -> Value {
    let response = call(dispatcher, method, params);
    assert!(response.error.is_none(), "{} failed: {:?}", method, response.error);
    response.result.unwrap()
}

fn fail<S: DataSource>(dispatcher: &mut Dispatcher<S>, method: &str, params: Value) -> (i64, String) {
    let response = call(dispatcher, method, params);
    let error = response.error.unwrap();
    (error.code, error.data.unwrap().kind)
}

fn sqlite() -> Dispatcher<SqliteSource> {
    let mut source = SqliteSource::open_in_memory().unwrap();
    source
        .execute("CREATE TABLE t (id INTEGER, label TEXT)")
        .unwrap();
    source
        .execute("INSERT INTO t VALUES (1, 'one'), (2, NULL), (3, 'three')")
        .unwrap();
    let config = SessionConfig::new(2).unwrap();
    Dispatcher::new(QuerySession::with_config(source, config))
}

#[test]
fn test_select_pages_through_sqlite() {
    // GIVEN
    let mut dispatcher = sqlite();

    // WHEN
    let executed = ok(&mut dispatcher, "execute", json!(["SELECT id, label FROM t ORDER BY id"]));
    let metadata = ok(&mut dispatcher, "metadata", json!(null));
    let first = ok(&mut dispatcher, "page", json!({"maxSize": 10}));
    let second = ok(&mut dispatcher, "page", json!([]));
    let third = ok(&mut dispatcher, "page", json!([]));

    // THEN
    assert_eq!(executed, json!(true));
    assert_eq!(
        metadata,
        json!([
            {"name": "id", "typeName": "INTEGER"},
            {"name": "label", "typeName": "TEXT"}
        ])
    );
    assert_eq!(
        first,
        json!([{"id": "1", "label": "one"}, {"id": "2", "label": null}])
    );
    assert_eq!(second, json!([{"id": "3", "label": "three"}]));
    assert_eq!(third, json!([]));
    assert_eq!(ok(&mut dispatcher, "finish", json!(null)), json!(true));
}

#[test]
fn test_update_reports_count_and_refuses_page() {
    // GIVEN
    let mut dispatcher = sqlite();

    // WHEN
    ok(&mut dispatcher, "execute", json!({"sql": "UPDATE t SET label = 'x'"}));
    let metadata = ok(&mut dispatcher, "metadata", json!(null));
    let count = ok(&mut dispatcher, "count", json!(null));
    let page = fail(&mut dispatcher, "page", json!([10]));

    // THEN
    assert_eq!(metadata, json!([]));
    assert_eq!(count, json!(3));
    assert_eq!(page, (-32000, "NoResultSet".to_string()));
}

#[test]
fn test_sequencing_faults() {
    let mut dispatcher = sqlite();

    assert_eq!(
        fail(&mut dispatcher, "metadata", json!(null)),
        (-32000, "NoActiveQuery".to_string())
    );
    ok(&mut dispatcher, "execute", json!(["SELECT id FROM t"]));
    assert_eq!(
        fail(&mut dispatcher, "execute", json!(["SELECT id FROM t"])),
        (-32000, "SessionBusy".to_string())
    );
    assert_eq!(
        fail(&mut dispatcher, "count", json!(null)),
        (-32000, "ResultSetHasNoCount".to_string())
    );
    assert_eq!(
        fail(&mut dispatcher, "page", json!([0])),
        (-32000, "InvalidPageSize".to_string())
    );
    assert_eq!(
        fail(&mut dispatcher, "quit", json!(null)),
        (-32000, "QueryStillOpen".to_string())
    );
    assert!(!dispatcher.is_finished());
}

#[test]
fn test_source_failure_carries_detail() {
    // GIVEN
    let mut dispatcher = sqlite();

    // WHEN
    let response = call(&mut dispatcher, "execute", json!(["SELECT * FROM missing"]));

    // THEN
    let error = response.error.unwrap();
    let data = error.data.unwrap();
    assert_eq!(error.code, -32603);
    assert_eq!(data.kind, "SourceError");
    assert!(error.message.contains("no such table: missing"));
    assert!(data.detail.is_some());

    // The session is still usable.
    ok(&mut dispatcher, "execute", json!(["SELECT 1"]));
}

#[test]
fn test_catalog_methods() {
    let mut dispatcher = sqlite();

    let tables = ok(&mut dispatcher, "tables", json!(null));
    let views = ok(&mut dispatcher, "views", json!(null));
    let columns = ok(&mut dispatcher, "columns", json!({"table": "t"}));

    assert_eq!(tables, json!([{"catalog": "main", "schema": "", "table": "t"}]));
    assert_eq!(views, json!([]));
    assert_eq!(
        columns,
        json!([
            {"catalog": "main", "schema": "", "table": "t", "column": "id", "datatype": "INTEGER"},
            {"catalog": "main", "schema": "", "table": "t", "column": "label", "datatype": "TEXT"}
        ])
    );
}

#[test]
fn test_quit_finishes_dispatcher() {
    // GIVEN
    let source = MemorySource::new();
    let probe = source.probe();
    let mut dispatcher = Dispatcher::new(QuerySession::new(source));

    // WHEN
    let result = ok(&mut dispatcher, "quit", json!(null));

    // THEN
    assert_eq!(result, json!(true));
    assert!(dispatcher.is_finished());
    assert!(probe.is_closed());
    assert_eq!(
        fail(&mut dispatcher, "tables", json!(null)),
        (-32000, "SessionTerminated".to_string())
    );
}

#[test]
fn test_protocol_faults() {
    let mut dispatcher = Dispatcher::new(QuerySession::new(MemorySource::new()));

    let garbage: Response = serde_json::from_slice(&dispatcher.handle(b"{not json")).unwrap();
    assert_eq!(garbage.error.unwrap().code, -32700);
    assert_eq!(garbage.id, Value::Null);

    let no_method: Response =
        serde_json::from_slice(&dispatcher.handle(br#"{"jsonrpc":"2.0","id":4}"#)).unwrap();
    assert_eq!(no_method.error.unwrap().code, -32600);
    assert_eq!(no_method.id, json!(4));

    let old_version: Response = serde_json::from_slice(
        &dispatcher.handle(br#"{"jsonrpc":"1.0","method":"quit","id":5}"#),
    )
    .unwrap();
    assert_eq!(old_version.error.unwrap().code, -32600);

    assert_eq!(
        fail(&mut dispatcher, "drop_everything", json!(null)),
        (-32601, "MethodNotFound".to_string())
    );
    assert_eq!(
        fail(&mut dispatcher, "execute", json!({"query": "SELECT 1"})),
        (-32602, "InvalidParams".to_string())
    );
}

#[test]
fn test_mid_page_failure_returns_session_to_idle() {
    // GIVEN
    let source = MemorySource::new().with_failing_result_set(
        "SELECT v",
        &[("v", "INTEGER")],
        vec![
            vec![Cell::Integer(1)],
            vec![Cell::Integer(2)],
            vec![Cell::Integer(3)],
        ],
        1,
    );
    let probe = source.probe();
    let mut dispatcher = Dispatcher::new(QuerySession::new(source));
    ok(&mut dispatcher, "execute", json!(["SELECT v"]));

    // WHEN
    let (code, kind) = fail(&mut dispatcher, "page", json!([5]));

    // THEN
    assert_eq!((code, kind.as_str()), (-32603, "SourceError"));
    assert_eq!(probe.open_cursors(), 0);
    assert_eq!(
        fail(&mut dispatcher, "finish", json!(null)),
        (-32000, "NoActiveQuery".to_string())
    );
}

#[test]
fn test_page_keys_follow_projection_order() {
    // GIVEN
    let mut source = SqliteSource::open_in_memory().unwrap();
    source.execute("CREATE TABLE z (zeta INTEGER, alpha TEXT)").unwrap();
    source.execute("INSERT INTO z VALUES (1, 'one')").unwrap();
    let mut dispatcher = Dispatcher::new(QuerySession::new(source));
    ok(&mut dispatcher, "execute", json!(["SELECT zeta, alpha FROM z"]));

    // WHEN
    let bytes = dispatcher.handle(br#"{"jsonrpc":"2.0","method":"page","id":7}"#);

    // THEN
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        r#"{"jsonrpc":"2.0","result":[{"zeta":"1","alpha":"one"}],"id":7}"#
    );
}

#[test]
fn test_repeated_column_names_keep_every_cell() {
    // GIVEN
    let mut dispatcher = sqlite();
    ok(&mut dispatcher, "execute", json!(["SELECT 1 AS a, 2 AS a"]));

    // WHEN
    let bytes = dispatcher.handle(br#"{"jsonrpc":"2.0","method":"page","params":[5],"id":8}"#);

    // THEN
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        r#"{"jsonrpc":"2.0","result":[{"a":"1","a_1":"2"}],"id":8}"#
    );
}

#[test]
fn test_quit_finishes_even_when_close_fails() {
    // GIVEN
    let source = MemorySource::new().with_failing_close("disk gone");
    let probe = source.probe();
    let mut dispatcher = Dispatcher::new(QuerySession::new(source));

    // WHEN
    let response = call(&mut dispatcher, "quit", json!(null));

    // THEN
    let error = response.error.unwrap();
    assert_eq!(error.code, -32603);
    assert!(error.message.contains("disk gone"));
    assert!(dispatcher.is_finished());
    assert!(probe.is_closed());
    assert_eq!(
        fail(&mut dispatcher, "quit", json!(null)),
        (-32000, "SessionTerminated".to_string())
    );
    assert!(dispatcher.is_finished());
}
