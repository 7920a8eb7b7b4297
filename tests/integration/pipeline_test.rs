//! End-to-end query pipeline tests.
//!
//! Config, parameters and clause groups are composed into SQL and run on the
//! mock engine, then rendered.

use std::time::Duration;

use athq::app::{self, PreparedQuery};
use athq::cli::{Cli, OutputFormat};
use athq::config::RawConfig;
use athq::engine::{ExecutionStatus, MockQueryEngine, QueryState, ResultSet};
use athq::error::AthqError;
use athq::query::{compose_and_run, PollConfig, QueryExecutor, QueryTarget};
use athq::session::SessionIdentity;
use clap::Parser;
use pretty_assertions::assert_eq;

const CONFIG: &str = r#"{
    "queries": [
        {"name": "default", "value": "SELECT * FROM {table} WHERE 1=1 {and} {or} LIMIT {limit}"},
        {"name": "errors",
         "value": "SELECT ts, message FROM {table} WHERE level = 'ERROR' {and}",
         "clauses": [{"name": "and", "value": "AND account = '{aws_account_id}'"}]}
    ],
    "parameters": [
        {"name": "table", "value": "app_logs"},
        {"name": "limit", "value": "100"}
    ],
    "config": [
        {"profile": "analytics", "region": "eu-west-1", "values": [
            {"database": "analytics_eu"},
            {"output_location": "s3://athena-{aws_account_id}-eu-west-1/"}
        ]},
        {"name": "database", "value": "default_db"},
        {"colors": ["green"]}
    ]
}"#;

fn identity() -> SessionIdentity {
    SessionIdentity {
        account_id: "123456789012".to_string(),
        profile: "analytics".to_string(),
        region: "eu-west-1".to_string(),
    }
}

fn cli(args: &[&str]) -> Cli {
    let mut full = vec!["athq"];
    full.extend_from_slice(args);
    Cli::parse_from(full)
}

fn prepare(args: &[&str]) -> PreparedQuery {
    let raw = RawConfig::from_json_str(CONFIG).unwrap();
    app::prepare(&raw, Some(&identity()), &cli(args)).unwrap()
}

fn fast_poll() -> PollConfig {
    PollConfig::default().with_intervals(Duration::from_millis(1), Duration::from_millis(4))
}

fn sample_results() -> ResultSet {
    ResultSet::new(
        vec!["ts".to_string(), "message".to_string()],
        vec![
            vec![Some("2024-01-01T00:00:00Z".to_string()), Some("boom".to_string())],
            vec![Some("2024-01-01T00:00:05Z".to_string()), None],
        ],
    )
}

#[test]
fn test_and_or_groups_compose() {
    let prepared = prepare(&[
        "--and",
        "status=open,closed",
        "--and",
        "name~foo",
        "--or",
        "level^debug,trace",
    ]);

    assert_eq!(
        prepared.sql(),
        "SELECT * FROM app_logs WHERE 1=1 AND status IN ('open', 'closed') \
         AND name LIKE '%foo%' OR level NOT IN ('debug', 'trace') LIMIT 100"
    );
}

#[test]
fn test_unsupplied_groups_are_stripped() {
    let prepared = prepare(&["-p", "limit=5"]);
    assert_eq!(prepared.sql(), "SELECT * FROM app_logs WHERE 1=1   LIMIT 5");
}

#[test]
fn test_query_clauses_use_identity_and_merge() {
    let prepared = prepare(&["errors", "--and", "service=api"]);
    assert_eq!(
        prepared.sql(),
        "SELECT ts, message FROM app_logs WHERE level = 'ERROR' \
         AND account = '123456789012' AND service = 'api'"
    );

    let prepared = prepare(&["errors", "--and", "service=api", "--override"]);
    assert_eq!(
        prepared.sql(),
        "SELECT ts, message FROM app_logs WHERE level = 'ERROR' AND service = 'api'"
    );
}

#[test]
fn test_malformed_condition_is_rejected() {
    let raw = RawConfig::from_json_str(CONFIG).unwrap();
    let err = app::prepare(&raw, Some(&identity()), &cli(&["--and", "status"])).unwrap_err();
    assert!(matches!(err, AthqError::MalformedParameter(_)));
    assert_eq!(err.category(), "Parameter Error");
}

#[tokio::test]
async fn test_full_run_renders_csv() {
    let prepared = prepare(&["errors"]);
    let target = app::resolve_target(&cli(&[]), &prepared, &identity()).unwrap();
    assert_eq!(
        target,
        QueryTarget {
            database: "analytics_eu".to_string(),
            output_location: "s3://athena-123456789012-eu-west-1/".to_string(),
        }
    );

    let engine = MockQueryEngine::with_states([
        QueryState::Queued,
        QueryState::Running,
        QueryState::Succeeded,
    ])
    .with_results(sample_results());

    let execution = app::execute(&engine, &prepared, &target, fast_poll())
        .await
        .unwrap();
    assert_eq!(execution.state, QueryState::Succeeded);
    assert_eq!(engine.status_calls(), 3);

    let submitted = engine.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].sql, prepared.sql());
    assert_eq!(submitted[0].database, "analytics_eu");

    let mut out = Vec::new();
    app::render(&mut out, "errors", &execution, OutputFormat::Csv, &[]).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "ts,message\n2024-01-01T00:00:00Z,boom\n2024-01-01T00:00:05Z,\n"
    );
}

#[test]
fn test_profile_parameter_selects_sql_and_target_together() {
    let args = cli(&["errors", "-p", "profile=adhoc,region=us-east-1"]);
    let raw = RawConfig::from_json_str(
        &CONFIG.replace(
            r#"{"name": "database", "value": "default_db"},"#,
            r#"{"name": "database", "value": "default_db"},
               {"profile": "adhoc", "values": [{"database": "adhoc_db"}, {"output_location": "s3://adhoc/"}]},"#,
        ),
    )
    .unwrap();
    let prepared = app::prepare(&raw, Some(&identity()), &args).unwrap();

    let target = app::resolve_target(&args, &prepared, &identity()).unwrap();
    assert_eq!(target.database, "adhoc_db");
    assert_eq!(target.output_location, "s3://adhoc/");
}

#[tokio::test]
async fn test_failed_query_surfaces_reason() {
    let prepared = prepare(&[]);
    let target = app::resolve_target(&cli(&[]), &prepared, &identity()).unwrap();
    let engine = MockQueryEngine::with_statuses([
        ExecutionStatus::new(QueryState::Running),
        ExecutionStatus::new(QueryState::Failed)
            .with_reason("TABLE_NOT_FOUND: Table app_logs does not exist"),
    ]);

    let err = app::execute(&engine, &prepared, &target, fast_poll())
        .await
        .unwrap_err();

    match err {
        AthqError::QueryFailed { id, reason } => {
            assert_eq!(id, "mock-execution-1");
            assert!(reason.contains("TABLE_NOT_FOUND"));
        }
        other => panic!("Expected QueryFailed, got {other:?}"),
    }
    assert_eq!(engine.result_calls(), 0);
}

#[tokio::test]
async fn test_compose_and_run_returns_sql() {
    let prepared = prepare(&["--and", "id=7"]);
    let engine = MockQueryEngine::new().with_results(sample_results());
    let executor = QueryExecutor::new(&engine).with_poll_config(fast_poll());
    let target = QueryTarget {
        database: "db".to_string(),
        output_location: "s3://out/".to_string(),
    };

    let (sql, execution) = compose_and_run(
        &executor,
        &target,
        &prepared.definition,
        &prepared.params,
        &prepared.composer,
    )
    .await
    .unwrap();

    assert_eq!(
        sql,
        "SELECT * FROM app_logs WHERE 1=1 AND id = '7'  LIMIT 100"
    );
    assert_eq!(execution.results.unwrap().row_count(), 2);
}

#[tokio::test]
async fn test_timeout_is_distinct_from_failure() {
    let prepared = prepare(&[]);
    let target = app::resolve_target(&cli(&[]), &prepared, &identity()).unwrap();
    let engine = MockQueryEngine::with_states([QueryState::Running]);
    let poll = fast_poll().with_timeout(Duration::from_millis(15));

    let err = app::execute(&engine, &prepared, &target, poll)
        .await
        .unwrap_err();

    assert!(matches!(err, AthqError::QueryTimeout { .. }));
    assert_eq!(err.category(), "Query Timeout");
}

#[tokio::test]
async fn test_list_catalog() {
    let engine = MockQueryEngine::new()
        .with_database("analytics_eu", &["events", "sessions"])
        .with_database("default", &[]);

    let mut out = Vec::new();
    app::list_catalog(&engine, &mut out).await.unwrap();

    assert_eq!(
        String::from_utf8(out).unwrap(),
        "analytics_eu\n  events\n  sessions\ndefault\n"
    );
}
