mod config;
mod error;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use guard::{Arg, CallChain, Family, Interceptor, Operation, StaticResolver, Verdict};
use policy::{Origin, Policy, PolicyEngine};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "stackguard.toml";

/// Exit code for a denied `check`.
const EXIT_DENIED: u8 = 2;

#[derive(Parser)]
#[command(name = "stackguard")]
#[command(about = "Inspect and test call-chain access policies", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file holding the policy
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the policy and print a summary
    Validate,
    /// List the grants in the policy
    Grants {
        /// Show only grants that apply to this origin
        #[arg(short, long)]
        origin: Option<String>,
    },
    /// Check whether a call chain may perform an operation
    Check {
        /// Operation name (write, delete, open, connect, ...)
        operation: String,
        /// Path, or host:port for socket operations
        resource: String,
        /// Origins in the chain, innermost first (repeatable)
        #[arg(short = 'o', long = "origin", required = true)]
        origins: Vec<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// List guarded operations and the permissions they require
    Operations,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Operations => cmd_operations(),
        Commands::Validate => {
            let policy = load_policy(&cli.config)?;
            println!("{}: ok, {} grants", cli.config.display(), policy.len());
        }
        Commands::Grants { origin } => {
            let policy = load_policy(&cli.config)?;
            cmd_grants(&policy, origin.as_deref());
        }
        Commands::Check {
            operation,
            resource,
            origins,
            json,
        } => {
            let policy = load_policy(&cli.config)?;
            if !cmd_check(policy, &operation, &resource, &origins, json)? {
                return Ok(ExitCode::from(EXIT_DENIED));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn load_policy(path: &Path) -> Result<Policy> {
    let (config, base) = load_config(path)?;
    init_logging(&config.log.filter);
    let policy = config.into_policy(&base)?;
    debug!(grants = policy.len(), config = %path.display(), "policy loaded");
    Ok(policy)
}

/// Load the config and the directory its relative patterns resolve against.
fn load_config(path: &Path) -> Result<(Config, PathBuf)> {
    if !path.exists() {
        return Err(Error::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let config = Config::load(path)?;
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let base = guard::canonical::absolute(dir)?;
    Ok((config, base))
}

fn init_logging(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn cmd_operations() {
    println!("{:<20} {:<12} REQUIRES", "OPERATION", "FAMILY");
    for op in Operation::ALL {
        let required: Vec<&str> = op.required().iter().map(|p| p.as_str()).collect();
        println!(
            "{:<20} {:<12} {}",
            op.name(),
            op.family().to_string(),
            required.join(", ")
        );
    }
}

fn cmd_grants(policy: &Policy, origin: Option<&str>) {
    let origin = origin.map(Origin::new);
    let grants = policy
        .grants()
        .iter()
        .filter(|g| origin.as_ref().is_none_or(|o| g.origin.matches(o)));

    let mut shown = 0;
    for grant in grants {
        println!("{grant}");
        shown += 1;
    }
    if shown == 0 {
        println!("No grants.");
    }
}

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    operation: &'a str,
    resource: &'a str,
    chain: &'a [String],
    decision: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    denied: Option<Denial>,
}

#[derive(Debug, Serialize)]
struct Denial {
    kind: String,
    origin: String,
    permission: String,
    resource: String,
}

/// Returns whether the chain may perform the operation.
fn cmd_check(
    policy: Policy,
    operation: &str,
    resource: &str,
    origins: &[String],
    json: bool,
) -> Result<bool> {
    let chain = CallChain::new(origins.iter().map(Origin::new));
    let interceptor =
        Interceptor::with_resolver(PolicyEngine::with_policy(policy), StaticResolver::new(chain));

    let endpoint;
    let arg = match Operation::from_name(operation).map(Operation::family) {
        Some(Family::Socket) if !resource.starts_with('/') => {
            endpoint = parse_endpoint(resource)?;
            Arg::Host(&endpoint.0, endpoint.1)
        }
        Some(Family::Socket) => Arg::Path(Path::new(resource)),
        _ => Arg::Str(resource),
    };

    let (decision, denied) = match interceptor.intercept_named(operation, &[arg]) {
        Ok(verdict) => (verdict_name(verdict), None),
        Err(guard::Error::AccessDenied(v)) => (
            "deny",
            Some(Denial {
                kind: v.kind.to_string(),
                origin: v.origin.to_string(),
                permission: v.permission.to_string(),
                resource: v.resource.to_string(),
            }),
        ),
        Err(e) => return Err(e.into()),
    };

    let report = CheckReport {
        operation,
        resource,
        chain: origins,
        decision,
        denied,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(report.denied.is_none())
}

fn print_report(report: &CheckReport<'_>) {
    match &report.denied {
        Some(d) => println!(
            "deny: {} access to {} (origin {} lacks {})",
            d.kind, d.resource, d.origin, d.permission
        ),
        None => println!("{}: {} {}", report.decision, report.operation, report.resource),
    }
}

fn verdict_name(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Allowed => "allow",
        Verdict::Disabled => "disabled",
        Verdict::Unguarded => "unguarded",
        Verdict::Unresolvable => "unresolvable",
    }
}

/// Split `host:port` (or `[v6]:port`).
fn parse_endpoint(s: &str) -> Result<(String, u16)> {
    if let Ok(addr) = s.parse::<SocketAddr>() {
        return Ok((addr.ip().to_string(), addr.port()));
    }
    let (host, port) = s
        .rsplit_once(':')
        .ok_or_else(|| Error::InvalidArgument(format!("expected host:port, got '{s}'")))?;
    let port = port
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("bad port in '{s}'")))?;
    if host.is_empty() {
        return Err(Error::InvalidArgument(format!("empty host in '{s}'")));
    }
    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy::Permission;

    fn policy() -> Policy {
        Policy::new()
            .grant("a", "/tmp", Permission::Write)
            .unwrap()
            .grant("a", "localhost:9200", Permission::Connect)
            .unwrap()
    }

    #[test]
    fn test_parse_endpoint() {
        assert_eq!(parse_endpoint("localhost:80").unwrap(), ("localhost".into(), 80));
        assert_eq!(parse_endpoint("[::1]:443").unwrap(), ("::1".into(), 443));
        assert!(parse_endpoint("localhost").is_err());
        assert!(parse_endpoint(":80").is_err());
        assert!(parse_endpoint("host:http").is_err());
    }

    #[test]
    fn test_check_outcomes() {
        let chain = vec!["a".to_string()];
        assert!(cmd_check(policy(), "write", "/tmp/x", &chain, true).unwrap());
        assert!(!cmd_check(policy(), "delete", "/tmp/x", &chain, true).unwrap());
        assert!(cmd_check(policy(), "connect", "localhost:9200", &chain, false).unwrap());
        assert!(!cmd_check(policy(), "connect", "localhost:9300", &chain, false).unwrap());
        assert!(cmd_check(policy(), "readAllBytes", "/etc/passwd", &chain, false).unwrap());
    }

    #[test]
    fn test_chain_with_unauthorized_origin() {
        let chain = vec!["a".to_string(), "b".to_string()];
        assert!(!cmd_check(policy(), "write", "/tmp/x", &chain, false).unwrap());
    }

    #[test]
    fn test_bad_endpoint_argument() {
        let chain = vec!["a".to_string()];
        let err = cmd_check(policy(), "connect", "localhost", &chain, false).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_load_config_missing() {
        let err = load_config(Path::new("/nonexistent/stackguard.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn test_load_config_resolves_base() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("stackguard.toml");
        std::fs::write(
            &path,
            "[[grant]]\norigin = \"a\"\nresource = \"./data\"\npermissions = [\"write\"]\n",
        )
        .unwrap();
        let (config, base) = load_config(&path).unwrap();
        assert_eq!(base, dir.path());
        let policy = config.into_policy(&base).unwrap();
        let expected = format!("{}/data/**", dir.path().display());
        assert_eq!(policy.grants()[0].resource.to_string(), expected);
    }
}
