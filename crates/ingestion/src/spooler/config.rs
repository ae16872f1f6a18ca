//! Spooler options

use std::path::{Path, PathBuf};
use std::time::Duration;

use contracts::{StageContext, StageError};
use glob::Pattern;

pub const SPOOL_DIR: &str = "conf.spoolDir";
pub const PROCESS_SUBDIRECTORIES: &str = "conf.processSubdirectories";
pub const FILE_PATTERN: &str = "conf.filePattern";
pub const READ_ORDER: &str = "conf.useLastModified";
pub const INITIAL_FILE: &str = "conf.initialFileToProcess";
pub const POLLING_TIMEOUT: &str = "conf.poolingTimeoutSecs";

const DEFAULT_POLLING_TIMEOUT_SECS: f64 = 600.0;

/// File ordering policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOrder {
    /// Full path, byte-wise
    Lexicographical,
    /// Modification time ascending, path as tie-break
    Timestamp,
}

impl ReadOrder {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "LEXICOGRAPHICAL" => Some(Self::Lexicographical),
            "TIMESTAMP" => Some(Self::Timestamp),
            _ => None,
        }
    }
}

/// Validated spooler configuration
#[derive(Debug, Clone)]
pub struct SpoolDirConfig {
    pub spool_dir: PathBuf,
    pub process_subdirectories: bool,
    pub file_pattern: Pattern,
    pub read_order: ReadOrder,
    pub initial_file: Option<PathBuf>,
    pub polling_timeout: Duration,
}

impl SpoolDirConfig {
    pub fn from_context(ctx: &StageContext) -> Result<Self, StageError> {
        let stage = ctx.instance_name();

        let spool_dir = PathBuf::from(ctx.string(SPOOL_DIR)?);
        if !spool_dir.is_dir() {
            return Err(StageError::configuration(
                stage,
                SPOOL_DIR,
                format!("'{}' is not a directory", spool_dir.display()),
            ));
        }

        let raw_pattern = ctx
            .optional_string(FILE_PATTERN)?
            .unwrap_or_else(|| "*".to_string());
        let file_pattern = Pattern::new(&raw_pattern).map_err(|e| {
            let message = format!("invalid glob '{raw_pattern}': {e}");
            StageError::configuration(stage, FILE_PATTERN, message)
        })?;

        let read_order = match ctx.optional_string(READ_ORDER)? {
            None => ReadOrder::Lexicographical,
            Some(raw) => ReadOrder::parse(&raw).ok_or_else(|| {
                StageError::configuration(
                    stage,
                    READ_ORDER,
                    format!("expected LEXICOGRAPHICAL or TIMESTAMP, got '{raw}'"),
                )
            })?,
        };

        let timeout_secs = ctx.float_or(POLLING_TIMEOUT, DEFAULT_POLLING_TIMEOUT_SECS)?;
        if !timeout_secs.is_finite() || timeout_secs < 0.0 {
            return Err(StageError::configuration(
                stage,
                POLLING_TIMEOUT,
                format!("must be a non-negative number of seconds, got {timeout_secs}"),
            ));
        }

        let initial_file = ctx
            .optional_string(INITIAL_FILE)?
            .map(|name| spool_dir.join(name));

        Ok(Self {
            spool_dir,
            process_subdirectories: ctx.bool_or(PROCESS_SUBDIRECTORIES, false)?,
            file_pattern,
            read_order,
            initial_file,
            polling_timeout: Duration::from_secs_f64(timeout_secs),
        })
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.file_pattern.matches(file_name)
    }

    pub fn root(&self) -> &Path {
        &self.spool_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ConfigValue;
    use std::collections::BTreeMap;

    fn context(entries: &[(&str, ConfigValue)]) -> StageContext {
        let config: BTreeMap<_, _> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        StageContext::new("p1", "spooler_01", config)
    }

    #[test]
    fn test_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&[(SPOOL_DIR, dir.path().to_str().unwrap().into())]);
        let config = SpoolDirConfig::from_context(&ctx).unwrap();

        assert_eq!(config.read_order, ReadOrder::Lexicographical);
        assert!(!config.process_subdirectories);
        assert!(config.matches("anything.log"));
        assert_eq!(config.polling_timeout, Duration::from_secs(600));
        assert!(config.initial_file.is_none());
    }

    #[test]
    fn test_full_options() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&[
            (SPOOL_DIR, dir.path().to_str().unwrap().into()),
            (PROCESS_SUBDIRECTORIES, true.into()),
            (FILE_PATTERN, "*.txt".into()),
            (READ_ORDER, "TIMESTAMP".into()),
            (INITIAL_FILE, "b.txt".into()),
            (POLLING_TIMEOUT, "2".into()),
        ]);
        let config = SpoolDirConfig::from_context(&ctx).unwrap();

        assert_eq!(config.read_order, ReadOrder::Timestamp);
        assert!(config.process_subdirectories);
        assert!(config.matches("a.txt"));
        assert!(!config.matches("a.csv"));
        assert_eq!(config.initial_file, Some(dir.path().join("b.txt")));
        assert_eq!(config.polling_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_missing_spool_dir() {
        let err = SpoolDirConfig::from_context(&context(&[])).unwrap_err();
        assert!(matches!(err, StageError::Configuration { ref option, .. } if option == SPOOL_DIR));
    }

    #[test]
    fn test_spool_dir_must_exist() {
        let ctx = context(&[(SPOOL_DIR, "/definitely/not/here".into())]);
        assert!(SpoolDirConfig::from_context(&ctx).is_err());
    }

    #[test]
    fn test_bad_read_order_and_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let root: ConfigValue = dir.path().to_str().unwrap().into();

        let ctx = context(&[(SPOOL_DIR, root.clone()), (READ_ORDER, "RANDOM".into())]);
        assert!(SpoolDirConfig::from_context(&ctx).is_err());

        let ctx = context(&[(SPOOL_DIR, root.clone()), (FILE_PATTERN, "[".into())]);
        assert!(SpoolDirConfig::from_context(&ctx).is_err());

        let ctx = context(&[(SPOOL_DIR, root), (POLLING_TIMEOUT, ConfigValue::Integer(-1))]);
        assert!(SpoolDirConfig::from_context(&ctx).is_err());
    }
}
