//! Resolve a symbol to an OID and fetch its value from an SNMP agent.
//!
//! Usage: mibget <resolve|get> (-s <SYMBOL> | -i <OID>) [options]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};

use mibget_std::mibget_core::builtins::DEFAULT_FRAGMENTS;
use mibget_std::mibget_core::model::{Oid, SymbolTable};
use mibget_std::mibget_core::pdu::Version;
use mibget_std::mibget_core::resolver::{Query, Resolver};
use mibget_std::logging::{self, LogTracer};
use mibget_std::params::DEFAULT_PORT;
use mibget_std::{fetch, Loader, LoaderConfig, Outcome, TransactionParams, UdpTransport};

#[derive(Parser)]
#[command(name = "mibget", version, about = "Resolve MIB symbols and GET their values")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the OID a symbol or numeric OID resolves to
    #[command(disable_help_flag = true)]
    Resolve(Options),
    /// Fetch the value bound to a symbol or numeric OID
    #[command(disable_help_flag = true)]
    Get(Options),
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Target {
    /// Numeric OID, e.g. 1.3.6.1.2.1.1.1
    #[arg(short = 'i', long = "oid")]
    oid: Option<String>,
    /// Symbol name, e.g. sysDescr
    #[arg(short = 's', long = "symbol")]
    symbol: Option<String>,
}

#[derive(Args)]
struct Options {
    #[command(flatten)]
    target: Target,

    /// Agent host name or address
    #[arg(short = 'h', long, default_value = "localhost")]
    host: String,

    /// Agent UDP port
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Community string
    #[arg(short = 'c', long, default_value = "public")]
    community: String,

    /// Protocol version (1 or 2c)
    #[arg(short = 'v', long = "snmp-version", default_value = "1")]
    snmp_version: Version,

    /// Directory searched (recursively) for fragment files
    #[arg(short = 'd', long = "mibs-dir", default_value = ".", value_name = "DIR")]
    mibs_dir: PathBuf,

    /// Fragments to load, in order; earlier fragments win name lookups
    #[arg(
        short = 'm',
        long = "mibs",
        num_args = 1..,
        default_values_t = DEFAULT_FRAGMENTS.iter().map(|s| (*s).to_owned()).collect::<Vec<_>>()
    )]
    mibs: Vec<String>,

    /// Per-attempt timeout in milliseconds
    #[arg(long = "timeout-ms", default_value_t = 1000)]
    timeout_ms: u64,

    /// Resends after the first attempt
    #[arg(long, default_value_t = 2)]
    retries: u32,

    /// Symbol-table cache file, rebuilt when the fragments change
    #[arg(long, value_name = "PATH")]
    cache: Option<PathBuf>,

    /// Print help (`-h` is the host)
    #[arg(long = "help", action = ArgAction::Help)]
    _help: Option<bool>,
}

impl Options {
    fn query(&self) -> Query {
        match (&self.target.symbol, &self.target.oid) {
            (Some(name), _) => Query::Name(name.clone()),
            (None, Some(oid)) => Query::Numeric(oid.clone()),
            // clap's group makes exactly one of the two present
            (None, None) => Query::Name(String::new()),
        }
    }

    fn params(&self) -> TransactionParams {
        TransactionParams::new(self.host.clone())
            .port(self.port)
            .community(self.community.as_bytes())
            .version(self.snmp_version)
            .timeout(Duration::from_millis(self.timeout_ms))
            .retries(self.retries)
    }

    fn load_table(&self) -> SymbolTable {
        let loader = Loader::new(LoaderConfig {
            dirs: vec![self.mibs_dir.clone()],
            fragments: self.mibs.clone(),
        });
        let report = match &self.cache {
            Some(path) => loader.load_with_cache(path),
            None => loader.load(),
        };
        tracing::debug!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            symbols = report.table.symbol_count(),
            from_cache = report.from_cache,
            "symbol table ready"
        );
        report.table
    }
}

/// `FRAGMENT::name` plus any arcs below the symbol, or the bare OID.
fn describe(table: &SymbolTable, oid: &Oid) -> String {
    match table.find_enclosing(oid) {
        Some(sym) => {
            let base = sym.oid().len();
            let suffix: String = oid.arcs()[base..].iter().map(|arc| format!(".{arc}")).collect();
            format!("{sym}{suffix}")
        }
        None => oid.to_dotted(),
    }
}

fn resolve(opts: &Options) -> ExitCode {
    let table = opts.load_table();
    let query = opts.query();
    match Resolver::new(&table).resolve_traced(&query, &mut LogTracer) {
        Ok(oid) => {
            println!("{} = {oid}", describe(&table, &oid));
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "resolution failed");
            ExitCode::FAILURE
        }
    }
}

async fn get(opts: &Options) -> ExitCode {
    let table = opts.load_table();
    let params = opts.params();

    let target = match params.resolve_target().await {
        Ok(target) => target,
        Err(e) => {
            tracing::error!(error = %e, "cannot reach agent");
            return ExitCode::FAILURE;
        }
    };
    let mut transport = match UdpTransport::for_target(target).await {
        Ok(transport) => transport,
        Err(e) => {
            tracing::error!(error = %e, "cannot open socket");
            return ExitCode::FAILURE;
        }
    };

    let fetched = match fetch(&table, &opts.query(), &params, &mut transport).await {
        Ok(fetched) => fetched,
        Err(e) => {
            tracing::error!(error = %e, "resolution failed");
            return ExitCode::FAILURE;
        }
    };

    match &fetched.outcome {
        Outcome::Success(vb) => {
            println!(
                "{} = {}: {}",
                describe(&table, &vb.oid),
                vb.value.type_name(),
                vb.value
            );
            ExitCode::SUCCESS
        }
        other => {
            tracing::error!(snmp.oid = %fetched.oid, "{other}");
            ExitCode::FAILURE
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    logging::init_subscriber();
    let cli = Cli::parse();

    match &cli.command {
        Command::Resolve(opts) => resolve(opts),
        Command::Get(opts) => get(opts).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn options(args: &[&str]) -> Options {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Resolve(opts) | Command::Get(opts) => opts,
        }
    }

    #[test]
    fn test_short_h_is_host() {
        let opts = options(&["mibget", "get", "-h", "10.0.0.1", "-s", "sysDescr"]);
        assert_eq!(opts.host, "10.0.0.1");
        assert!(matches!(opts.query(), Query::Name(ref name) if name == "sysDescr"));
    }

    #[test]
    fn test_defaults() {
        let opts = options(&["mibget", "resolve", "-i", "1.3.6.1.2.1.1.1"]);
        assert_eq!(opts.host, "localhost");
        assert_eq!(opts.port, 161);
        assert_eq!(opts.snmp_version, Version::V1);
        assert_eq!(opts.mibs, DEFAULT_FRAGMENTS);
        let params = opts.params();
        assert_eq!(params.timeout, Duration::from_millis(1000));
        assert_eq!(params.max_attempts(), 3);
    }

    #[test]
    fn test_long_help_still_works() {
        let err = Cli::try_parse_from(["mibget", "get", "--help"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_oid_and_symbol_conflict() {
        let err = Cli::try_parse_from(["mibget", "get", "-i", "1.3", "-s", "sysDescr"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);

        let err = Cli::try_parse_from(["mibget", "get"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }
}
