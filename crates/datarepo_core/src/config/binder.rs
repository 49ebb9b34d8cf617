//! Configuration binder: declarative keys to constructor arguments.
//!
//! The sole mechanism turning a configuration mapping into factory
//! arguments during materialization, generic over component kind.

use crate::error::{RepoError, RepoResult};
use serde_json::Value;
use std::collections::BTreeMap;

/// One declared constructor parameter of a component factory.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub required: bool,
}

impl ParamSpec {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            required: true,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            required: false,
        }
    }
}

/// Arguments selected for one factory call, keyed by parameter name.
pub type BoundArgs = BTreeMap<String, Value>;

/// Selects the subset of `config` keyed by the declared parameter names.
///
/// Parameters listed in `ignored` are skipped entirely. A required parameter
/// with no matching key fails with a configuration error.
pub fn bind_args(
    params: &[ParamSpec],
    config: &BTreeMap<String, Value>,
    ignored: &[&str],
) -> RepoResult<BoundArgs> {
    let mut bound = BoundArgs::new();
    for param in params {
        if ignored.contains(&param.name) {
            continue;
        }
        match config.get(param.name) {
            Some(value) => {
                bound.insert(param.name.to_string(), value.clone());
            }
            None if param.required => {
                return Err(RepoError::Configuration(format!(
                    "missing required argument `{}` in configuration",
                    param.name
                )));
            }
            None => {}
        }
    }
    Ok(bound)
}

/// Reads one optional string argument out of bound arguments.
pub fn string_arg(args: &BoundArgs, name: &str) -> RepoResult<Option<String>> {
    match args.get(name) {
        None => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(other) => Err(RepoError::Configuration(format!(
            "argument `{name}` must be a string, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::{bind_args, string_arg, ParamSpec};
    use crate::error::RepoError;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn config(pairs: &[(&str, serde_json::Value)]) -> BTreeMap<String, serde_json::Value> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn selects_only_declared_parameters() {
        let params = [ParamSpec::required("root"), ParamSpec::optional("template")];
        let cfg = config(&[
            ("root", json!("/tmp/r")),
            ("template", json!("raw/%(visit)d.bin")),
            ("unrelated", json!(42)),
        ]);

        let bound = bind_args(&params, &cfg, &[]).expect("binding should succeed");
        assert_eq!(bound.len(), 2);
        assert!(!bound.contains_key("unrelated"));
    }

    #[test]
    fn missing_required_parameter_is_a_configuration_error() {
        let params = [ParamSpec::required("root")];
        let err = bind_args(&params, &config(&[]), &[]).expect_err("binding must fail");
        assert!(matches!(err, RepoError::Configuration(_)));
    }

    #[test]
    fn missing_optional_parameter_is_simply_absent() {
        let params = [ParamSpec::optional("root")];
        let bound = bind_args(&params, &config(&[]), &[]).expect("binding should succeed");
        assert!(bound.is_empty());
    }

    #[test]
    fn ignored_parameters_are_never_bound_even_when_required() {
        let params = [ParamSpec::required("receiver"), ParamSpec::optional("root")];
        let cfg = config(&[("root", json!("/tmp/r"))]);
        let bound = bind_args(&params, &cfg, &["receiver"]).expect("binding should succeed");
        assert_eq!(bound.len(), 1);
    }

    #[test]
    fn string_arg_rejects_non_string_values() {
        let cfg = config(&[("root", json!(3))]);
        let bound = bind_args(&[ParamSpec::optional("root")], &cfg, &[])
            .expect("binding should succeed");
        assert!(string_arg(&bound, "root").is_err());
        assert_eq!(string_arg(&bound, "absent").expect("absent is fine"), None);
    }
}
