//! Update pinning policy (`update:` in `.nf-core.yml`)
//!
//! ```yaml
//! update:
//!   https://github.com/nf-core/modules.git:
//!     nf-core:
//!       fastqc: 0f8e4a2d5c0f9a1f9e7d4e1b2c3d4e5f6a7b8c9d
//!       star/align: false
//!   https://github.com/acme/modules.git: false
//! ```
//!
//! A pin can sit at the remote, org or component level; the most specific
//! one wins.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_yaml::Value;

/// What the policy says about one component
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Pin {
    /// Follow the requested revision
    #[default]
    Unpinned,
    /// Always use this revision
    Revision(String),
    /// Never update
    Skip,
}

impl Pin {
    fn from_scalar(value: &Value) -> Option<Pin> {
        match value {
            Value::Bool(false) => Some(Pin::Skip),
            Value::Bool(true) | Value::Null => Some(Pin::Unpinned),
            Value::String(s) => Some(Pin::Revision(s.clone())),
            // An all-digit abbreviated hash parses as a number
            Value::Number(n) => Some(Pin::Revision(n.to_string())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct OrgRule {
    pin: Option<Pin>,
    components: BTreeMap<String, Pin>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RemoteRule {
    pin: Option<Pin>,
    orgs: BTreeMap<String, OrgRule>,
}

/// Parsed `update:` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Value")]
pub struct UpdatePolicy {
    remotes: BTreeMap<String, RemoteRule>,
}

fn key_string(key: &Value) -> Result<String, String> {
    match key {
        Value::String(s) => Ok(s.clone()),
        other => Err(format!("expected a string key, found {other:?}")),
    }
}

fn parse_org(value: &Value, org: &str) -> Result<OrgRule, String> {
    if let Some(pin) = Pin::from_scalar(value) {
        return Ok(OrgRule {
            pin: Some(pin),
            components: BTreeMap::new(),
        });
    }
    let Value::Mapping(map) = value else {
        return Err(format!("invalid value for org '{org}'"));
    };
    let mut rule = OrgRule::default();
    for (name, pin) in map {
        let name = key_string(name)?;
        let pin = Pin::from_scalar(pin)
            .ok_or_else(|| format!("invalid value for '{org}/{name}': expected a revision or a boolean"))?;
        rule.components.insert(name, pin);
    }
    Ok(rule)
}

impl TryFrom<Value> for UpdatePolicy {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let map = match value {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(map) => map,
            _ => return Err("'update' must be a mapping of remote URLs".to_string()),
        };

        let mut remotes = BTreeMap::new();
        for (url, rule) in &map {
            let url = key_string(url)?;
            let parsed = match Pin::from_scalar(rule) {
                Some(pin) => RemoteRule {
                    pin: Some(pin),
                    orgs: BTreeMap::new(),
                },
                None => {
                    let Value::Mapping(orgs) = rule else {
                        return Err(format!("invalid value for remote '{url}'"));
                    };
                    let mut parsed = RemoteRule::default();
                    for (org, org_rule) in orgs {
                        let org = key_string(org)?;
                        let org_rule = parse_org(org_rule, &org)?;
                        parsed.orgs.insert(org, org_rule);
                    }
                    parsed
                }
            };
            remotes.insert(url, parsed);
        }
        Ok(Self { remotes })
    }
}

impl UpdatePolicy {
    /// The pin that applies to one component
    pub fn pin(&self, url: &str, org: &str, name: &str) -> Pin {
        let Some(remote) = self.remotes.get(url) else {
            return Pin::Unpinned;
        };
        if let Some(org_rule) = remote.orgs.get(org) {
            if let Some(pin) = org_rule.components.get(name) {
                return pin.clone();
            }
            if let Some(pin) = &org_rule.pin {
                return pin.clone();
            }
        }
        remote.pin.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NF_CORE: &str = "https://github.com/nf-core/modules.git";

    fn parse(yaml: &str) -> Result<UpdatePolicy, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    #[test]
    fn test_component_level_pins() {
        let policy = parse(&format!(
            "{NF_CORE}:\n  nf-core:\n    fastqc: abc1234\n    star/align: false\n"
        ))
        .unwrap();
        assert_eq!(
            policy.pin(NF_CORE, "nf-core", "fastqc"),
            Pin::Revision("abc1234".to_string())
        );
        assert_eq!(policy.pin(NF_CORE, "nf-core", "star/align"), Pin::Skip);
        assert_eq!(policy.pin(NF_CORE, "nf-core", "multiqc"), Pin::Unpinned);
    }

    #[test]
    fn test_most_specific_wins() {
        let policy = parse(&format!(
            "{NF_CORE}:\n  nf-core: false\nhttps://example.com/x.git: 1234567\n"
        ))
        .unwrap();
        assert_eq!(policy.pin(NF_CORE, "nf-core", "fastqc"), Pin::Skip);
        assert_eq!(
            policy.pin("https://example.com/x.git", "x", "tool"),
            Pin::Revision("1234567".to_string())
        );
        assert_eq!(policy.pin("https://other.com/y.git", "y", "tool"), Pin::Unpinned);
    }

    #[test]
    fn test_true_means_unpinned() {
        let policy = parse(&format!("{NF_CORE}: true\n")).unwrap();
        assert_eq!(policy.pin(NF_CORE, "nf-core", "fastqc"), Pin::Unpinned);
    }

    #[test]
    fn test_invalid_shapes_rejected() {
        assert!(parse("- a\n- b\n").is_err());
        assert!(parse(&format!("{NF_CORE}:\n  nf-core:\n    fastqc: [1, 2]\n")).is_err());
    }
}
