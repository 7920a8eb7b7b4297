//! Core orchestrator for athq.
//!
//! Loads the config, establishes a session, layers parameters, composes the
//! selected query and runs it through a [`QueryEngine`], then renders the
//! results.

use std::io::{self, Write};

use tracing::info;

use crate::builder::StatementComposer;
use crate::cli::{Cli, OutputFormat};
use crate::config::{Config, QueryDefinition, RawConfig};
use crate::engine::{AthenaClient, AthenaConfig, QueryEngine, QueryExecution};
use crate::error::{AthqError, Result};
use crate::params::ParameterStore;
use crate::query::{compose_sql, PollConfig, QueryExecutor, QueryTarget};
use crate::render::{write_csv, ResultTable};
use crate::session::{ProfileSessionProvider, SessionIdentity, SessionProvider};

/// Config key for the database queries run against.
pub const DATABASE_KEY: &str = "database";

/// Config key for the result output location.
pub const OUTPUT_LOCATION_KEY: &str = "output_location";

/// A query ready to run: resolved config, parameters and clause groups.
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    pub config: Config,
    pub definition: QueryDefinition,
    pub params: ParameterStore,
    pub composer: StatementComposer,
}

impl PreparedQuery {
    /// Returns the final SQL.
    pub fn sql(&self) -> String {
        compose_sql(&self.definition, &self.params, &self.composer)
    }
}

/// Builds the parameter store.
///
/// File defaults come first, then the session identity, then `-p` values,
/// so later sources override earlier ones.
pub fn build_parameters(
    raw: &RawConfig,
    identity: Option<&SessionIdentity>,
    cli_params: &[String],
) -> Result<ParameterStore> {
    let mut params = ParameterStore::new();
    params.add_from_mapping(raw.default_parameters()?);
    if let Some(identity) = identity {
        params.add_from_mapping(identity.as_params());
    }
    for group in cli_params {
        params.add_from_delimited(group)?;
    }
    Ok(params)
}

/// Seeds a composer with the query's own clauses, then applies `groups`.
pub fn build_composer(
    definition: &QueryDefinition,
    groups: &[(&str, &[String])],
    override_existing: bool,
) -> Result<StatementComposer> {
    let mut composer = StatementComposer::new();
    for clause in &definition.clauses {
        composer.merge_named(&clause.name, vec![clause.value.clone()]);
    }
    for &(operator, tokens) in groups {
        if !tokens.is_empty() {
            composer.compose_group(operator, tokens, override_existing)?;
        }
    }
    Ok(composer)
}

/// Resolves the config and composes the query selected on the command line.
pub fn prepare(
    raw: &RawConfig,
    identity: Option<&SessionIdentity>,
    cli: &Cli,
) -> Result<PreparedQuery> {
    let params = build_parameters(raw, identity, &cli.params)?;
    let config = raw.resolve(&params)?;

    let name = cli.query_name();
    let definition = config
        .lookup_query(Some(name))
        .cloned()
        .ok_or_else(|| AthqError::UnknownQuery(name.to_string()))?;
    let composer = build_composer(&definition, &cli.clause_groups(), cli.override_clauses)?;

    Ok(PreparedQuery {
        config,
        definition,
        params,
        composer,
    })
}

/// Picks database and output location from flags, else from config values.
///
/// Config values are looked up for the `profile` and `region` parameters,
/// which default to the session identity but may be set with `-p`, so the
/// target always matches the values substituted into the SQL.
pub fn resolve_target(
    cli: &Cli,
    prepared: &PreparedQuery,
    identity: &SessionIdentity,
) -> Result<QueryTarget> {
    let profile = prepared.params.get("profile").unwrap_or(&identity.profile);
    let region = prepared.params.get("region").unwrap_or(&identity.region);

    let lookup = |explicit: &Option<String>, key: &str| -> Result<String> {
        explicit
            .clone()
            .or_else(|| prepared.config.get_config_value(key, profile, region))
            .ok_or_else(|| {
                AthqError::config(format!(
                    "No {} configured for profile '{}' in {}; pass --{}",
                    key,
                    profile,
                    region,
                    key.replace('_', "-")
                ))
            })
    };

    Ok(QueryTarget {
        database: lookup(&cli.database, DATABASE_KEY)?,
        output_location: lookup(&cli.output_location, OUTPUT_LOCATION_KEY)?,
    })
}

/// Runs a prepared query to completion.
///
/// FAILED and CANCELLED executions are returned as errors.
pub async fn execute(
    engine: &dyn QueryEngine,
    prepared: &PreparedQuery,
    target: &QueryTarget,
    poll: PollConfig,
) -> Result<QueryExecution> {
    let executor = QueryExecutor::new(engine).with_poll_config(poll);
    let sql = prepared.sql();
    info!("Running {}: {}", prepared.definition.name, sql);

    let execution = executor.run(&sql, target).await?.into_outcome()?;
    let stats = execution.statistics;
    if let (Some(ms), Some(bytes)) = (stats.engine_execution_ms, stats.data_scanned_bytes) {
        info!("Query {} ran in {}ms, scanned {} bytes", execution.id, ms, bytes);
    }
    Ok(execution)
}

/// Writes the rows of a finished execution.
pub fn render(
    out: &mut impl Write,
    title: &str,
    execution: &QueryExecution,
    format: OutputFormat,
    colors: &[String],
) -> Result<()> {
    let Some(results) = &execution.results else {
        return Ok(());
    };
    match format {
        OutputFormat::Csv => write_csv(out, results),
        OutputFormat::Table => ResultTable::new(title, results)
            .with_colors(colors)
            .write_to(out),
    }
}

/// Writes every database followed by its indented tables.
pub async fn list_catalog(engine: &dyn QueryEngine, out: &mut impl Write) -> Result<()> {
    for database in engine.list_databases().await? {
        writeln!(out, "{}", database).map_err(write_error)?;
        for table in engine.list_tables(&database).await? {
            writeln!(out, "  {}", table).map_err(write_error)?;
        }
    }
    Ok(())
}

fn write_error(e: io::Error) -> AthqError {
    AthqError::internal(format!("Failed to write output: {}", e))
}

/// Runs one invocation of the command line.
pub async fn run(cli: Cli) -> Result<()> {
    let raw = RawConfig::load(&cli.config_path())?;
    let stdout = io::stdout();

    if cli.list_queries {
        let config = raw.resolve(&build_parameters(&raw, None, &cli.params)?)?;
        let mut out = stdout.lock();
        for name in config.query_names() {
            writeln!(out, "{}", name).map_err(write_error)?;
        }
        return Ok(());
    }

    if cli.dry_run {
        let prepared = prepare(&raw, None, &cli)?;
        writeln!(stdout.lock(), "{}", prepared.sql()).map_err(write_error)?;
        return Ok(());
    }

    let provider = ProfileSessionProvider::new(cli.profile.clone(), cli.region.clone());
    let session = provider.session().await?;
    let identity = session.identity.clone();
    let engine = AthenaClient::new(&session, AthenaConfig::default());

    if cli.list_databases {
        return list_catalog(&engine, &mut stdout.lock()).await;
    }

    let prepared = prepare(&raw, Some(&identity), &cli)?;
    let target = resolve_target(&cli, &prepared, &identity)?;
    let poll = PollConfig::default().with_timeout(cli.timeout());

    let execution = execute(&engine, &prepared, &target, poll).await?;
    render(
        &mut stdout.lock(),
        &prepared.definition.name,
        &execution,
        cli.output_format(),
        &prepared.config.colors(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NamedValue;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    const CONFIG: &str = r#"{
        "queries": [
            {"name": "default", "value": "SELECT * FROM {table} WHERE 1=1 {and} LIMIT {limit}"}
        ],
        "parameters": [
            {"name": "table", "value": "events"},
            {"name": "limit", "value": "10"}
        ],
        "config": [
            {"profile": "dev", "values": [{"database": "dev_db"}]},
            {"profile": "prod", "values": [{"database": "prod_db"}]},
            {"name": "output_location", "value": "s3://{aws_account_id}-results/"}
        ]
    }"#;

    fn identity() -> SessionIdentity {
        SessionIdentity {
            account_id: "123456789012".to_string(),
            profile: "dev".to_string(),
            region: "eu-west-1".to_string(),
        }
    }

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["athq"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn test_parameter_precedence() {
        let raw = RawConfig::from_json_str(CONFIG).unwrap();
        let params = build_parameters(
            &raw,
            Some(&identity()),
            &["limit=5,region=us-east-1".to_string()],
        )
        .unwrap();

        assert_eq!(params.get("table"), Some("events"));
        assert_eq!(params.get("limit"), Some("5"));
        assert_eq!(params.get("aws_account_id"), Some("123456789012"));
        assert_eq!(params.get("region"), Some("us-east-1"));
    }

    #[test]
    fn test_malformed_cli_parameter() {
        let raw = RawConfig::from_json_str(CONFIG).unwrap();
        let err = build_parameters(&raw, None, &["limit".to_string()]).unwrap_err();
        assert!(matches!(err, AthqError::MalformedParameter(_)));
    }

    #[test]
    fn test_query_clauses_then_cli_groups() {
        let definition = QueryDefinition {
            name: "q".to_string(),
            template: "{and}".to_string(),
            clauses: vec![NamedValue {
                name: "and".to_string(),
                value: "AND region = 'eu'".to_string(),
            }],
        };
        let tokens = vec!["status=open".to_string()];

        let composer = build_composer(&definition, &[("and", tokens.as_slice())], false).unwrap();
        assert_eq!(
            composer.group("and").unwrap().joined(),
            "AND region = 'eu' AND status = 'open'"
        );

        let composer = build_composer(&definition, &[("and", tokens.as_slice())], true).unwrap();
        assert_eq!(composer.group("and").unwrap().joined(), "AND status = 'open'");
    }

    #[test]
    fn test_prepare_dry_run_sql() {
        let raw = RawConfig::from_json_str(CONFIG).unwrap();
        let prepared = prepare(&raw, None, &cli(&["--and", "status=open,closed"])).unwrap();

        assert_eq!(
            prepared.sql(),
            "SELECT * FROM events WHERE 1=1 AND status IN ('open', 'closed') LIMIT 10"
        );
    }

    #[test]
    fn test_prepare_unknown_query() {
        let raw = RawConfig::from_json_str(CONFIG).unwrap();
        let err = prepare(&raw, None, &cli(&["missing"])).unwrap_err();
        assert!(matches!(err, AthqError::UnknownQuery(name) if name == "missing"));
    }

    #[test]
    fn test_resolve_target_from_config() {
        let raw = RawConfig::from_json_str(CONFIG).unwrap();
        let prepared = prepare(&raw, Some(&identity()), &cli(&[])).unwrap();

        let target = resolve_target(&cli(&[]), &prepared, &identity()).unwrap();
        assert_eq!(target.database, "dev_db");
        assert_eq!(target.output_location, "s3://123456789012-results/");

        let flags = cli(&["--database", "other", "--output-location", "s3://x/"]);
        let target = resolve_target(&flags, &prepared, &identity()).unwrap();
        assert_eq!(target.database, "other");
        assert_eq!(target.output_location, "s3://x/");
    }

    #[test]
    fn test_resolve_target_missing_database() {
        let raw = RawConfig::from_json_str(CONFIG).unwrap();
        let mut other = identity();
        other.profile = "staging".to_string();
        let prepared = prepare(&raw, Some(&other), &cli(&[])).unwrap();

        let err = resolve_target(&cli(&[]), &prepared, &other).unwrap_err();
        assert!(err.to_string().contains("'staging'"));
        assert!(err.to_string().contains("--database"));
    }

    #[test]
    fn test_resolve_target_follows_profile_parameter() {
        let raw = RawConfig::from_json_str(CONFIG).unwrap();
        let args = cli(&["-p", "profile=prod"]);
        let prepared = prepare(&raw, Some(&identity()), &args).unwrap();

        let target = resolve_target(&args, &prepared, &identity()).unwrap();
        assert_eq!(target.database, "prod_db");
    }
}
