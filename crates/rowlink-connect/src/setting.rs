//! Parsed, immutable task settings.
//!
//! [`TaskSetting`] is built exactly once per task instance from the raw
//! [`TaskConfig`](crate::config::TaskConfig), before counters or any other
//! lifecycle-scoped resource exist. A malformed configuration therefore
//! never leaks partially-initialized state.

use rowlink_core::Column;

use crate::config::TaskConfig;
use crate::error::ConnectorError;
use crate::filter;

/// Configuration key for the task name.
pub const NAME_KEY: &str = "name";
/// Configuration key for the row check rule.
pub const CHECK_RULE_KEY: &str = "check.rule";
/// Configuration key for the JSON-encoded column schema.
pub const COLUMNS_KEY: &str = "columns";
/// Configuration key for the filter error policy.
pub const FILTER_ON_ERROR_KEY: &str = "filter.on.error";
/// Configuration key toggling counter registration.
pub const METRICS_ENABLED_KEY: &str = "metrics.enabled";

/// How strictly rows are validated against the declared column schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckRule {
    /// Skip validation entirely.
    #[default]
    None,
    /// Validate, but only log mismatches; every row passes.
    Permissive,
    /// Validate and reject mismatching rows.
    Enforced,
}

impl std::fmt::Display for CheckRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "NONE",
            Self::Permissive => "PERMISSIVE",
            Self::Enforced => "ENFORCED",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for CheckRule {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "NONE" => Ok(Self::None),
            "PERMISSIVE" => Ok(Self::Permissive),
            "ENFORCED" | "ENFORCING" => Ok(Self::Enforced),
            other => Err(ConnectorError::ConfigurationError(format!(
                "invalid check rule '{other}': expected NONE, PERMISSIVE, or ENFORCED"
            ))),
        }
    }
}

/// What the pipeline does with a record it accepted but cannot convert to
/// wire form (as opposed to a clean schema mismatch, which rejects).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterErrorPolicy {
    /// Count the record as rejected and keep the batch moving.
    #[default]
    Reject,
    /// Abort the poll call with an error.
    Fail,
}

impl std::str::FromStr for FilterErrorPolicy {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" | "skip" => Ok(Self::Reject),
            "fail" => Ok(Self::Fail),
            other => Err(ConnectorError::ConfigurationError(format!(
                "invalid filter error policy '{other}': expected 'reject' or 'fail'"
            ))),
        }
    }
}

/// Immutable parsed task configuration.
///
/// Built once via [`TaskSetting::from_config`]; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct TaskSetting {
    name: String,
    check_rule: CheckRule,
    columns: Vec<Column>,
    filter_error_policy: FilterErrorPolicy,
    metrics_enabled: bool,
}

impl TaskSetting {
    /// Parses the raw host configuration into settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the name is missing or empty, the
    /// check rule or filter policy is unrecognized, or the column schema is
    /// not a valid JSON column array; a schema declaring a duplicate
    /// wire-form column name fails here too, before any resource exists.
    pub fn from_config(config: &TaskConfig) -> Result<Self, ConnectorError> {
        let name = config.require(NAME_KEY)?.trim();
        if name.is_empty() {
            return Err(ConnectorError::ConfigurationError(
                "task name must not be empty".into(),
            ));
        }

        let check_rule = match config.get(CHECK_RULE_KEY) {
            Some(raw) => raw.parse()?,
            None => CheckRule::default(),
        };

        let columns = match config.get(COLUMNS_KEY) {
            Some(raw) => serde_json::from_str::<Vec<Column>>(raw).map_err(|e| {
                ConnectorError::ConfigurationError(format!(
                    "invalid column schema in '{COLUMNS_KEY}': {e}"
                ))
            })?,
            None => Vec::new(),
        };
        // One schema scan here instead of one per polled row.
        filter::check_schema(&columns, false)?;

        let filter_error_policy = match config.get(FILTER_ON_ERROR_KEY) {
            Some(raw) => raw.parse()?,
            None => FilterErrorPolicy::default(),
        };

        let metrics_enabled: bool = config.get_parsed(METRICS_ENABLED_KEY)?.unwrap_or(true);

        Ok(Self {
            name: name.to_string(),
            check_rule,
            columns,
            filter_error_policy,
            metrics_enabled,
        })
    }

    /// Returns the task name. Counters are grouped under this name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the row check rule.
    #[must_use]
    pub fn check_rule(&self) -> CheckRule {
        self.check_rule
    }

    /// Returns the declared column schema (possibly empty).
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the conversion-error policy.
    #[must_use]
    pub fn filter_error_policy(&self) -> FilterErrorPolicy {
        self.filter_error_policy
    }

    /// Returns `true` when task counters should be registered.
    #[must_use]
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowlink_core::DataType;

    fn base_config() -> TaskConfig {
        let mut config = TaskConfig::new();
        config.set(NAME_KEY, "t1");
        config
    }

    #[test]
    fn test_minimal_config() {
        let setting = TaskSetting::from_config(&base_config()).unwrap();
        assert_eq!(setting.name(), "t1");
        assert_eq!(setting.check_rule(), CheckRule::None);
        assert!(setting.columns().is_empty());
        assert_eq!(setting.filter_error_policy(), FilterErrorPolicy::Reject);
        assert!(setting.metrics_enabled());
    }

    #[test]
    fn test_missing_name() {
        let config = TaskConfig::new();
        let err = TaskSetting::from_config(&config).unwrap_err();
        assert!(matches!(err, ConnectorError::MissingConfig(_)));
    }

    #[test]
    fn test_empty_name() {
        let mut config = TaskConfig::new();
        config.set(NAME_KEY, "   ");
        let err = TaskSetting::from_config(&config).unwrap_err();
        assert!(matches!(err, ConnectorError::ConfigurationError(_)));
    }

    #[test]
    fn test_check_rule_parsing() {
        let mut config = base_config();
        config.set(CHECK_RULE_KEY, "enforced");
        let setting = TaskSetting::from_config(&config).unwrap();
        assert_eq!(setting.check_rule(), CheckRule::Enforced);

        config.set(CHECK_RULE_KEY, "ENFORCING");
        let setting = TaskSetting::from_config(&config).unwrap();
        assert_eq!(setting.check_rule(), CheckRule::Enforced);

        config.set(CHECK_RULE_KEY, "strict");
        assert!(TaskSetting::from_config(&config).is_err());
    }

    #[test]
    fn test_columns_parsing() {
        let mut config = base_config();
        config.set(
            COLUMNS_KEY,
            r#"[{"name":"a","data_type":"INT","order":0},
                {"name":"b","new_name":"bee","data_type":"STRING","order":1}]"#,
        );
        let setting = TaskSetting::from_config(&config).unwrap();
        assert_eq!(setting.columns().len(), 2);
        assert_eq!(setting.columns()[0].data_type, DataType::Int);
        assert_eq!(setting.columns()[1].output_name(), "bee");
    }

    #[test]
    fn test_duplicate_schema_column_fails_at_parse() {
        let mut config = base_config();
        config.set(
            COLUMNS_KEY,
            r#"[{"name":"a","data_type":"INT","order":0},
                {"name":"b","new_name":"a","data_type":"LONG","order":1}]"#,
        );
        let err = TaskSetting::from_config(&config).unwrap_err();
        assert!(matches!(err, ConnectorError::FilterError(_)));
    }

    #[test]
    fn test_malformed_columns() {
        let mut config = base_config();
        config.set(COLUMNS_KEY, "not json");
        let err = TaskSetting::from_config(&config).unwrap_err();
        assert!(err.to_string().contains(COLUMNS_KEY));
    }

    #[test]
    fn test_filter_policy_and_metrics_toggle() {
        let mut config = base_config();
        config.set(FILTER_ON_ERROR_KEY, "fail");
        config.set(METRICS_ENABLED_KEY, "false");
        let setting = TaskSetting::from_config(&config).unwrap();
        assert_eq!(setting.filter_error_policy(), FilterErrorPolicy::Fail);
        assert!(!setting.metrics_enabled());
    }
}
