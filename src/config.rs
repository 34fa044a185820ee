//! Project configuration and per-project directive files
//!
//! A project is identified by name. Directive files live in the data
//! directory as `<project>.<directive>`; the only directive read today is
//! `clears_argument`, a whitespace-separated list of
//! `function-name parameter-index` pairs:
//!
//! ```text
//! /* functions that wipe a struct they are handed */
//! reset_state 0
//! clear_both 1
//! ```
//!
//! Directive files are tokenized with the C lexer, so comments are allowed.

use crate::parser::lexer::{LexError, Lexer, Token, TokenKind};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_DATA_DIR: &str = "smatch_data";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    /// `None` disables every project directive
    pub project: Option<String>,
    pub data_dir: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            project: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl ProjectConfig {
    pub fn new(project: Option<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            project,
            data_dir: data_dir.into(),
        }
    }

    /// `<data_dir>/<project>.<directive>`, when a project is set
    pub fn directive_path(&self, directive: &str) -> Option<PathBuf> {
        let project = self.project.as_deref()?;
        Some(self.data_dir.join(format!("{}.{}", project, directive)))
    }
}

/// `function` wipes the struct passed as argument `param`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearsArgument {
    pub function: String,
    pub param: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Lex(#[from] LexError),
}

/// Read the project's `clears_argument` directives
///
/// Missing or unreadable files give an empty list. Parsing stops at the
/// first malformed entry; entries before it are kept.
pub fn load_clears_argument(config: &ProjectConfig) -> Vec<ClearsArgument> {
    let Some(path) = config.directive_path("clears_argument") else {
        return Vec::new();
    };

    match read_tokens(&path) {
        Ok(tokens) => parse_clears_argument(&tokens),
        Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no clears_argument directives");
            Vec::new()
        }
        Err(err) => {
            warn!("ignoring clears_argument directives: {}", err);
            Vec::new()
        }
    }
}

/// Tokens of a directive file, up to its first lexical error
fn read_tokens(path: &Path) -> Result<Vec<Token>, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let (tokens, err) = Lexer::new(&text).tokenize_until_error();
    if let Some(err) = err {
        warn!(path = %path.display(), "{}", ConfigError::from(err));
    }
    Ok(tokens)
}

/// Pair up identifier and number tokens until end of input or the first
/// token of the wrong kind
pub fn parse_clears_argument(tokens: &[Token]) -> Vec<ClearsArgument> {
    let mut directives = Vec::new();
    let mut tokens = tokens.iter();

    loop {
        let function = match tokens.next().map(|t| (&t.kind, t.location)) {
            None | Some((TokenKind::Eof, _)) => break,
            Some((TokenKind::Ident(name), _)) => name.clone(),
            Some((other, location)) => {
                warn!(%location, "expected function name in clears_argument, found {}", other);
                break;
            }
        };

        let param = match tokens.next().map(|t| (&t.kind, t.location)) {
            Some((TokenKind::IntLiteral(n), location)) => match usize::try_from(*n) {
                Ok(param) => param,
                Err(_) => {
                    warn!(%location, "parameter index {} out of range for {}", n, function);
                    break;
                }
            },
            Some((other, location)) => {
                warn!(%location, "expected parameter index for {}, found {}", function, other);
                break;
            }
            None => break,
        };

        directives.push(ClearsArgument { function, param });
    }

    directives
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Vec<ClearsArgument> {
        parse_clears_argument(&Lexer::new(text).tokenize().unwrap())
    }

    fn clears(function: &str, param: usize) -> ClearsArgument {
        ClearsArgument {
            function: function.to_string(),
            param,
        }
    }

    #[test]
    fn test_pairs() {
        assert_eq!(
            parse("reset 0\n// comment\nwipe 2"),
            vec![clears("reset", 0), clears("wipe", 2)]
        );
        assert!(parse("").is_empty());
    }

    #[test]
    fn test_stops_at_first_malformed_token() {
        assert_eq!(parse("reset 0 wipe wipe 1 last 3"), vec![clears("reset", 0)]);
        assert_eq!(parse("reset 0 7 wipe 1"), vec![clears("reset", 0)]);
        assert_eq!(parse("reset 0 wipe -1"), vec![clears("reset", 0)]);
        assert_eq!(parse("reset"), vec![]);
    }

    #[test]
    fn test_directive_path() {
        let config = ProjectConfig::new(Some("kernel".to_string()), "/data");
        assert_eq!(
            config.directive_path("clears_argument"),
            Some(PathBuf::from("/data/kernel.clears_argument"))
        );
        assert_eq!(ProjectConfig::default().directive_path("clears_argument"), None);
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("demo.clears_argument"), "zap 1\n").unwrap();

        let config = ProjectConfig::new(Some("demo".to_string()), dir.path());
        assert_eq!(load_clears_argument(&config), vec![clears("zap", 1)]);

        let missing = ProjectConfig::new(Some("other".to_string()), dir.path());
        assert!(load_clears_argument(&missing).is_empty());
    }

    #[test]
    fn test_lex_error_keeps_earlier_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::new(Some("demo".to_string()), dir.path());
        let path = dir.path().join("demo.clears_argument");

        fs::write(&path, "wipe 1\nzap 0\n@\nlost 2\n").unwrap();
        assert_eq!(
            load_clears_argument(&config),
            vec![clears("wipe", 1), clears("zap", 0)]
        );

        fs::write(&path, "wipe 1 /* never closed").unwrap();
        assert_eq!(load_clears_argument(&config), vec![clears("wipe", 1)]);
    }
}
