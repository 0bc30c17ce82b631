//! Command-line arguments.
//!
//! ```text
//! tessera-engine [--json] [--frames N] [CONFIG]
//! ```

use std::path::PathBuf;

use crate::error::EngineError;

/// Environment variable naming the config file when none is given.
pub const CONFIG_ENV: &str = "TESSERA_CONFIG";

/// Config file looked up in the working directory as a last resort.
pub const DEFAULT_CONFIG: &str = "tessera-config.yaml";

/// Parsed arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    /// Explicit config path.
    pub config: Option<PathBuf>,
    /// Print each status as a JSON line on stdout.
    pub json: bool,
    /// Stop after this many frames (0 = unlimited).
    pub max_frames: u64,
}

impl Args {
    /// Parse arguments, excluding the program name.
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, EngineError> {
        let mut parsed = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--json" => parsed.json = true,
                "--frames" => {
                    let value = args.next().ok_or_else(|| usage("--frames needs a value"))?;
                    parsed.max_frames = value
                        .parse()
                        .map_err(|e| usage(format!("--frames {value:?}: {e}")))?;
                }
                flag if flag.starts_with("--") => return Err(usage(format!("unknown flag {flag}"))),
                path => {
                    if parsed.config.is_some() {
                        return Err(usage("only one config path may be given"));
                    }
                    parsed.config = Some(PathBuf::from(path));
                }
            }
        }
        Ok(parsed)
    }

    /// The config file to load: argv, then `TESSERA_CONFIG`, then
    /// `tessera-config.yaml` if it exists. `None` means built-in defaults.
    pub fn config_path(&self) -> Result<Option<PathBuf>, EngineError> {
        let explicit = self
            .config
            .clone()
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
        match explicit {
            Some(path) if path.exists() => Ok(Some(path)),
            Some(path) => Err(EngineError::MissingConfig { path }),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG);
                Ok(fallback.exists().then_some(fallback))
            }
        }
    }
}

fn usage(message: impl Into<String>) -> EngineError {
    EngineError::Usage {
        message: message.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, EngineError> {
        Args::parse(args.iter().map(|s| (*s).to_owned()))
    }

    #[test]
    fn parses_flags_and_path() {
        let args = parse(&["--json", "--frames", "120", "life.yaml"]).unwrap();
        assert_eq!(
            args,
            Args {
                config: Some(PathBuf::from("life.yaml")),
                json: true,
                max_frames: 120,
            }
        );
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(matches!(parse(&["--frames"]), Err(EngineError::Usage { .. })));
        assert!(matches!(parse(&["--frames", "many"]), Err(EngineError::Usage { .. })));
        assert!(matches!(parse(&["--verbose"]), Err(EngineError::Usage { .. })));
        assert!(matches!(parse(&["a.yaml", "b.yaml"]), Err(EngineError::Usage { .. })));
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let args = parse(&["/definitely/not/here.yaml"]).unwrap();
        assert!(matches!(args.config_path(), Err(EngineError::MissingConfig { .. })));
    }
}
