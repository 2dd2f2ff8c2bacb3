//! Desired-state file model
//!
//! Operators declare the administrative objects they want in a YAML file;
//! unspecified pool attributes fall back to the same defaults the
//! dashboard UI applies (16 PGs, size 3, replicated, autoscale on).

use crate::error::{Error, Result};
use crate::resources::crush_rule::CrushRule;
use crate::resources::pool::Pool;
use crate::resources::user::User;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

/// Declared state for one cluster
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DesiredState {
    #[serde(default)]
    pub crush_rules: Vec<CrushRule>,
    #[serde(default)]
    pub pools: Vec<Pool>,
    #[serde(default)]
    pub users: Vec<User>,
}

impl DesiredState {
    /// Load and validate a desired-state file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let state: DesiredState = serde_yaml::from_str(&raw)?;
        state.validate()?;
        Ok(state)
    }

    /// Reject duplicate identities and empty names; everything else is
    /// the remote API's call.
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for (kind, name) in self
            .crush_rules
            .iter()
            .map(|r| ("crush_rule", r.name.as_str()))
            .chain(self.pools.iter().map(|p| ("pool", p.name.as_str())))
            .chain(self.users.iter().map(|u| ("user", u.entity.as_str())))
        {
            if name.is_empty() {
                return Err(Error::Configuration(format!("{} with empty name", kind)));
            }
            if !seen.insert(format!("{}/{}", kind, name)) {
                return Err(Error::Configuration(format!(
                    "duplicate resource: {}/{}",
                    kind, name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    const STATE: &str = r#"
crush_rules:
  - name: ssd_rule
    root: default
    failure_domain: host
    device_class: ssd
pools:
  - name: data
    pg_num: 32
  - name: scratch
    crush_rule: ssd_rule
    quota_max_bytes: 1073741824
users:
  - entity: client.app
    pools: [data, scratch]
"#;

    #[test]
    fn test_parse_with_defaults() {
        let state: DesiredState = serde_yaml::from_str(STATE).unwrap();
        state.validate().unwrap();

        assert_eq!(state.crush_rules.len(), 1);
        assert_eq!(state.crush_rules[0].device_class.as_deref(), Some("ssd"));

        let data = &state.pools[0];
        assert_eq!(data.pg_num, 32);
        // Dashboard defaults fill the unspecified fields
        assert_eq!(data.size, 3);
        assert_eq!(data.pool_type, "replicated");
        assert_eq!(data.crush_rule, "replicated_rule");
        assert!(data.pg_autoscale);
        assert!(data.applications.contains("rbd"));

        let scratch = &state.pools[1];
        assert_eq!(scratch.pg_num, 16);
        assert_eq!(scratch.crush_rule, "ssd_rule");
        assert_eq!(scratch.quota_max_bytes, 1 << 30);

        let user = &state.users[0];
        assert_eq!(user.entity, "client.app");
        assert_eq!(user.pools.len(), 2);
        assert_eq!(user.key, None);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let raw = "pools:\n  - name: data\n  - name: data\n";
        let state: DesiredState = serde_yaml::from_str(raw).unwrap();
        assert_matches!(state.validate().unwrap_err(), Error::Configuration(_));
    }

    #[test]
    fn test_empty_name_rejected() {
        let raw = "pools:\n  - name: \"\"\n";
        let state: DesiredState = serde_yaml::from_str(raw).unwrap();
        assert_matches!(state.validate().unwrap_err(), Error::Configuration(_));
    }

    #[test]
    fn test_trailing_slash_name_is_not_empty() {
        let raw = "pools:\n  - name: \"odd/\"\n";
        let state: DesiredState = serde_yaml::from_str(raw).unwrap();
        state.validate().unwrap();
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(STATE.as_bytes()).unwrap();
        let state = DesiredState::from_file(file.path()).unwrap();
        assert_eq!(state.pools.len(), 2);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = DesiredState::from_file(Path::new("/nonexistent/state.yaml")).unwrap_err();
        assert_matches!(err, Error::Io(_));
    }
}
