//! Integration tests for scalar and non-query execution.

mod common;

use common::{Failure, ScriptedConnector, executor, rows};
use serde_json::json;
use sproc_dal::models::{CommandKind, ParamValue, Params};

#[tokio::test]
async fn test_execute_scalar_int_reads_first_column() {
    let exec = executor(ScriptedConnector::new(vec![rows(
        json!([{ "Total": 42, "Ignored": 1 }, { "Total": 7, "Ignored": 2 }]),
    )]));

    let total = exec
        .execute_scalar_int("usp_CountUsers", Some(Params::new().with("Active", true)))
        .await
        .unwrap();
    assert_eq!(total, 42);
}

#[tokio::test]
async fn test_execute_scalar_int_null_is_zero() {
    let connector = ScriptedConnector::new(vec![rows(json!([{ "Total": null }]))]);
    let counts = connector.counts.clone();
    let exec = executor(connector);

    let total = exec.execute_scalar_int("usp_CountUsers", None).await.unwrap();
    assert_eq!(total, 0);
    assert_eq!(counts.releases(), 1);
}

#[tokio::test]
async fn test_execute_scalar_int_no_rows_is_zero() {
    let exec = executor(ScriptedConnector::new(vec![Vec::new()]));
    assert_eq!(exec.execute_scalar_int("usp_CountUsers", None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_execute_scalar_int_decimal_text() {
    let exec = executor(ScriptedConnector::new(vec![rows(json!([{ "SUM(qty)": "15" }]))]));
    assert_eq!(exec.execute_scalar_int("usp_SumQty", None).await.unwrap(), 15);
}

#[tokio::test]
async fn test_execute_scalar_int_garbage_is_decode_failure() {
    let exec = executor(ScriptedConnector::new(vec![rows(json!([{ "Total": "lots" }]))]));
    let err = exec.execute_scalar_int("usp_CountUsers", None).await.unwrap_err();
    assert!(err.is_decode());
}

#[tokio::test]
async fn test_execute_scalar_without_params_is_raw_statement() {
    let connector = ScriptedConnector::new(vec![rows(json!([{ "COUNT(*)": 12 }]))]);
    let counts = connector.counts.clone();
    let exec = executor(connector);

    let count: i32 = exec.execute_scalar("GetCount", None).await.unwrap();

    assert_eq!(count, 12);
    let command = counts.last_command();
    assert_eq!(command.kind, CommandKind::Text);
    assert_eq!(command.sql, "GetCount");
    assert!(command.args.is_empty());
}

#[tokio::test]
async fn test_execute_scalar_with_params_is_procedure_call() {
    let connector = ScriptedConnector::new(vec![rows(json!([{ "Name": "Ada" }]))]);
    let counts = connector.counts.clone();
    let exec = executor(connector);

    let name: String = exec
        .execute_scalar("usp_GetName", Some(Params::new().with("UserId", 7)))
        .await
        .unwrap();

    assert_eq!(name, "Ada");
    let command = counts.last_command();
    assert_eq!(command.kind, CommandKind::StoredProcedure);
    assert_eq!(command.sql, "CALL usp_GetName(?)");
}

#[tokio::test]
async fn test_execute_scalar_with_empty_bag_is_still_procedure_call() {
    let connector = ScriptedConnector::new(vec![rows(json!([{ "Total": 3 }]))]);
    let counts = connector.counts.clone();
    let exec = executor(connector);

    let total: i64 = exec
        .execute_scalar("usp_CountUsers", Some(Params::new()))
        .await
        .unwrap();

    assert_eq!(total, 3);
    assert_eq!(counts.last_command().sql, "CALL usp_CountUsers()");
}

#[tokio::test]
async fn test_execute_scalar_null_is_default() {
    let exec = executor(ScriptedConnector::new(vec![rows(json!([{ "Name": null }]))]));
    let name: String = exec
        .execute_scalar("usp_GetName", Some(Params::new().with("UserId", 1)))
        .await
        .unwrap();
    assert!(name.is_empty());
}

#[tokio::test]
async fn test_execute_non_query_returns_affected_rows() {
    let connector = ScriptedConnector::new(Vec::new()).affecting(3);
    let counts = connector.counts.clone();
    let exec = executor(connector);

    let params = Params::new().with("UserId", 7).with("Email", "new@example.com");
    let affected = exec
        .execute_non_query("usp_UpdateEmail", Some(params))
        .await
        .unwrap();

    assert_eq!(affected, 3);
    assert_eq!(counts.opens(), 1);
    assert_eq!(counts.closes(), 1);
    assert_eq!(counts.advances(), 0);
    assert_eq!(counts.last_command().sql, "CALL usp_UpdateEmail(?, ?)");
}

#[tokio::test]
async fn test_execute_non_query_failure_still_releases() {
    let connector = ScriptedConnector::new(Vec::new()).failing(Failure::Call);
    let counts = connector.counts.clone();
    let exec = executor(connector);

    let err = exec
        .execute_non_query("usp_InsertOrder", Some(Params::new().with("UserId", 0)))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("usp_InsertOrder"));
    assert_eq!(counts.opens(), 1);
    assert_eq!(counts.releases(), 1);
}

#[tokio::test]
async fn test_execute_non_query_binds_by_name() {
    let connector = ScriptedConnector::new(Vec::new())
        .affecting(1)
        .declaring(&["p_user_id", "p_email"]);
    let counts = connector.counts.clone();
    let exec = executor(connector);

    let params = Params::new()
        .with("p_email", "new@example.com")
        .with("p_user_id", 7);
    exec.execute_non_query("usp_UpdateEmail", Some(params))
        .await
        .unwrap();

    let command = counts.last_command();
    assert_eq!(command.names, vec!["p_user_id", "p_email"]);
    assert_eq!(command.args[0], ParamValue::Int(7));
    assert_eq!(counts.releases(), 1);
}

#[tokio::test]
async fn test_raw_statement_scalar_skips_parameter_lookup() {
    let connector = ScriptedConnector::new(vec![rows(json!([{ "n": 1 }]))]).declaring(&["p_id"]);
    let counts = connector.counts.clone();
    let exec = executor(connector);

    let _: i64 = exec.execute_scalar("SELECT 1 AS n", None).await.unwrap();

    assert_eq!(counts.lookups(), 0);
}
