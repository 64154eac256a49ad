//! Loading fragments from disk into a [`SymbolTable`].
//!
//! A fragment file lists one symbol per line:
//!
//! ```text
//! # SNMPv2-MIB excerpt
//! system      1.3.6.1.2.1.1
//! sysDescr    1.3.6.1.2.1.1.1     scalar
//! sysORTable  1.3.6.1.2.1.1.9     table
//! ```
//!
//! Fields are whitespace separated; the kind defaults to `node`. `#` starts a
//! comment. Fragments are looked up by name in the configured directories
//! (recursively, first directory first) as `<NAME>` or `<NAME>.sym`; a name
//! with no file falls back to a built-in definition.
//!
//! A fragment that cannot be read or parsed is logged and skipped. The rest
//! still load in the configured order, so the table only ever contains
//! fragments that loaded completely.

use crate::cache::{self, CacheError};
use crate::logging::LogTracer;
use mibget_core::builtins::{self, DEFAULT_FRAGMENTS};
use mibget_core::model::{CapacityError, FragmentDef, Oid, OidError, SymbolKind, SymbolTable};
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File extension tried after the bare fragment name.
pub const FRAGMENT_EXTENSION: &str = "sym";

/// Subdirectory depth limit for the search.
const MAX_DEPTH: usize = 16;

/// Why one line of a fragment file was rejected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    /// A name with no OID after it.
    #[error("missing OID")]
    MissingOid,
    /// The OID field is not dotted decimal.
    #[error("bad OID: {0}")]
    BadOid(#[source] OidError),
    /// The kind field is not a known keyword.
    #[error("unknown kind '{0}'")]
    UnknownKind(String),
    /// More than three fields.
    #[error("unexpected trailing field '{0}'")]
    TrailingField(String),
}

/// A rejected line.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    /// 1-based line number.
    pub line: usize,
    /// What is wrong.
    #[source]
    pub kind: ParseErrorKind,
}

/// Failure to load one fragment.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// No file in the search path and no built-in.
    #[error("fragment {name} not found")]
    NotFound {
        /// Fragment name.
        name: String,
    },
    /// The file exists but could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The file has a malformed line.
    #[error("{origin}: {source}")]
    Parse {
        /// Where the text came from.
        origin: Origin,
        /// The first bad line.
        #[source]
        source: ParseError,
    },
    /// The table is full.
    #[error(transparent)]
    Capacity(#[from] CapacityError),
}

/// Where a fragment's text came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Origin {
    /// A file in the search path.
    File(PathBuf),
    /// A built-in definition.
    Builtin,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Builtin => f.write_str("<builtin>"),
        }
    }
}

/// A fragment's unparsed text.
#[derive(Clone, Debug)]
pub struct Source {
    /// Fragment name.
    pub name: String,
    /// Where the text came from.
    pub origin: Origin,
    /// File contents (or rendered built-in).
    pub text: String,
}

impl Source {
    /// Parse into a loadable fragment.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Parse`] for the first malformed line.
    pub fn parse(&self) -> Result<FragmentDef, LoadError> {
        parse_fragment(&self.name, &self.text).map_err(|source| LoadError::Parse {
            origin: self.origin.clone(),
            source,
        })
    }
}

/// Parse fragment text.
///
/// # Errors
///
/// Returns [`ParseError`] for the first malformed line.
pub fn parse_fragment(name: &str, text: &str) -> Result<FragmentDef, ParseError> {
    let mut def = FragmentDef::new(name);
    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        let content = raw.split_once('#').map_or(raw, |(before, _)| before);
        let mut fields = content.split_whitespace();
        let Some(symbol) = fields.next() else {
            continue;
        };
        let err = |kind| ParseError { line, kind };

        let oid_text = fields.next().ok_or_else(|| err(ParseErrorKind::MissingOid))?;
        let oid = Oid::parse(oid_text).map_err(|e| err(ParseErrorKind::BadOid(e)))?;
        let kind = match fields.next() {
            Some(word) => word
                .parse::<SymbolKind>()
                .map_err(|_| err(ParseErrorKind::UnknownKind(word.to_owned())))?,
            None => SymbolKind::Node,
        };
        if let Some(extra) = fields.next() {
            return Err(err(ParseErrorKind::TrailingField(extra.to_owned())));
        }
        def.push(symbol, oid, kind);
    }
    Ok(def)
}

/// Render a fragment in file syntax.
#[must_use]
pub fn render_fragment(def: &FragmentDef) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}", def.name);
    for sym in &def.symbols {
        let _ = writeln!(out, "{} {} {}", sym.name, sym.oid, sym.kind);
    }
    out
}

/// Where to look and what to load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Directories searched in order.
    pub dirs: Vec<PathBuf>,
    /// Fragment names in load order; earlier names win name lookups.
    pub fragments: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            dirs: vec![PathBuf::from(".")],
            fragments: DEFAULT_FRAGMENTS.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

/// The result of loading every configured fragment.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// The loaded table.
    pub table: SymbolTable,
    /// Fragments that loaded, in order.
    pub loaded: Vec<String>,
    /// Fragments that were skipped, with the reason.
    pub failed: Vec<(String, LoadError)>,
    /// Whether the table came from a cache file.
    pub from_cache: bool,
}

/// Finds, reads and loads fragments.
#[derive(Clone, Debug, Default)]
pub struct Loader {
    config: LoaderConfig,
}

impl Loader {
    /// Create a loader.
    #[must_use]
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Find the file for a fragment in the search path.
    #[must_use]
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        let with_ext = format!("{name}.{FRAGMENT_EXTENSION}");
        self.config
            .dirs
            .iter()
            .find_map(|dir| search_dir(dir, name, &with_ext, 0))
    }

    /// Read a fragment's text from disk, or render its built-in.
    ///
    /// # Errors
    ///
    /// [`LoadError::Io`] if the file cannot be read; [`LoadError::NotFound`]
    /// if there is neither a file nor a built-in.
    pub fn read_source(&self, name: &str) -> Result<Source, LoadError> {
        if let Some(path) = self.locate(name) {
            let text = fs::read_to_string(&path).map_err(|source| LoadError::Io {
                path: path.clone(),
                source,
            })?;
            return Ok(Source {
                name: name.to_owned(),
                origin: Origin::File(path),
                text,
            });
        }
        match builtins::lookup_builtin(name) {
            Some(builtin) => Ok(Source {
                name: name.to_owned(),
                origin: Origin::Builtin,
                text: render_fragment(&builtin.to_def()),
            }),
            None => Err(LoadError::NotFound {
                name: name.to_owned(),
            }),
        }
    }

    /// Load every configured fragment, skipping the ones that fail.
    #[must_use]
    pub fn load(&self) -> LoadReport {
        build(self.read_all())
    }

    /// Load through a cache file.
    ///
    /// The cache is used when its fingerprint matches the current sources;
    /// otherwise the table is rebuilt and the cache rewritten. A cache that
    /// cannot be written is logged and ignored.
    #[must_use]
    pub fn load_with_cache(&self, cache_path: &Path) -> LoadReport {
        let sources = self.read_all();
        let pairs: Vec<(&str, &[u8])> = sources
            .iter()
            .filter_map(|(name, source)| {
                let source = source.as_ref().ok()?;
                Some((name.as_str(), source.text.as_bytes()))
            })
            .collect();
        let fingerprint = cache::compute_fingerprint(&pairs);

        match cache::load_cache_verified(cache_path, &fingerprint) {
            Ok(table) => {
                tracing::debug!(path = %cache_path.display(), "using symbol cache");
                let loaded = table
                    .fragments()
                    .map(|f| table.get_str(f.name).to_owned())
                    .collect();
                let failed = sources
                    .into_iter()
                    .filter_map(|(name, source)| source.err().map(|e| (name, e)))
                    .collect();
                return LoadReport {
                    table,
                    loaded,
                    failed,
                    from_cache: true,
                };
            }
            Err(CacheError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::info!(path = %cache_path.display(), reason = %e, "rebuilding symbol cache");
            }
        }

        let report = build(sources);
        if let Err(e) = cache::save_cache(&report.table, cache_path, Some(fingerprint)) {
            tracing::warn!(path = %cache_path.display(), error = %e, "failed to write symbol cache");
        }
        report
    }

    fn read_all(&self) -> Vec<(String, Result<Source, LoadError>)> {
        self.config
            .fragments
            .iter()
            .map(|name| (name.clone(), self.read_source(name)))
            .collect()
    }
}

fn build(sources: Vec<(String, Result<Source, LoadError>)>) -> LoadReport {
    let mut report = LoadReport::default();
    let mut tracer = LogTracer;
    for (name, source) in sources {
        let result = source.and_then(|source| {
            let def = source.parse()?;
            report.table.load_traced(&def, &mut tracer)?;
            Ok(source.origin)
        });
        match result {
            Ok(origin) => {
                tracing::debug!(mib.fragment = %name, %origin, "fragment loaded");
                report.loaded.push(name);
            }
            Err(e) => {
                tracing::error!(mib.fragment = %name, error = %e, "skipping fragment");
                report.failed.push((name, e));
            }
        }
    }
    report
}

fn search_dir(dir: &Path, name: &str, with_ext: &str, depth: usize) -> Option<PathBuf> {
    if depth > MAX_DEPTH {
        return None;
    }
    let entries = fs::read_dir(dir).ok()?;
    let mut files = Vec::new();
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else {
            files.push(path);
        }
    }

    for candidate in [name, with_ext] {
        if let Some(path) = files
            .iter()
            .find(|p| p.file_name().is_some_and(|f| f == candidate))
        {
            return Some(path.clone());
        }
    }

    subdirs.sort();
    subdirs
        .iter()
        .find_map(|sub| search_dir(sub, name, with_ext, depth + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fragment() {
        let text = "\
# comment
system      1.3.6.1.2.1.1
sysDescr    1.3.6.1.2.1.1.1   scalar   # trailing comment

sysORTable  .1.3.6.1.2.1.1.9  table
";
        let def = parse_fragment("SNMPv2-MIB", text).unwrap();
        assert_eq!(def.name, "SNMPv2-MIB");
        assert_eq!(def.symbols.len(), 3);
        assert_eq!(def.symbols[0].kind, SymbolKind::Node);
        assert_eq!(def.symbols[1].kind, SymbolKind::Scalar);
        assert_eq!(def.symbols[2].oid.to_dotted(), "1.3.6.1.2.1.1.9");
    }

    #[test]
    fn test_parse_errors_carry_line() {
        let err = parse_fragment("X", "a 1.3\nb\n").unwrap_err();
        assert_eq!(
            err,
            ParseError {
                line: 2,
                kind: ParseErrorKind::MissingOid
            }
        );

        let err = parse_fragment("X", "a 1.3.x").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::BadOid(_)));

        let err = parse_fragment("X", "a 1.3 widget").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnknownKind("widget".into()));

        let err = parse_fragment("X", "a 1.3 node extra").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::TrailingField("extra".into()));
    }

    #[test]
    fn test_render_parses_back() {
        let def = builtins::lookup_builtin("SNMPv2-MIB").unwrap().to_def();
        let parsed = parse_fragment(&def.name, &render_fragment(&def)).unwrap();
        assert_eq!(parsed, def);
    }

    #[test]
    fn test_default_config() {
        let config = LoaderConfig::default();
        assert_eq!(config.dirs, [PathBuf::from(".")]);
        assert_eq!(
            config.fragments,
            ["SNMPv2-SMI", "SNMPv2-TC", "SNMPv2-MIB", "HOST-RESOURCES-MIB"]
        );
    }
}
