//! The lookup framework around the backend
//!
//! A backend does not decide which data sources exist, how raw answers are interpreted or how
//! two mapping answers are combined. That is the job of the [Host]. [Hierarchy] is a host
//! driven by a static list of hierarchy levels with `%{variable}` interpolation from the scope.
use crate::value::{Object, Value};
use indexmap::map::Entry;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Deserialize;

/// Variables available to interpolation, e.g. facts about the node being configured
pub type Scope = indexmap::IndexMap<String, Value>;

static INTERPOLATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%\{(?:::)?([^}]*)\}").expect("interpolation pattern"));

pub trait Host {
    /// Data source locators to try, highest priority first
    fn datasources(&self, scope: &Scope, order_override: Option<&str>) -> Vec<String>;

    /// Interpret a raw answer within `scope`
    fn parse_answer(&self, raw: Value, scope: &Scope) -> Value;

    /// Fold a lower priority mapping answer into the accumulated one
    fn merge_answer(&self, new: Object, existing: Object) -> Object;
}

/// How mapping answers of different data sources are combined
///
/// In both cases keys of the higher priority source win.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MergeBehavior {
    /// Top level keys only
    #[default]
    Native,
    /// Nested mappings are merged recursively and arrays are unioned
    Deep,
}

#[derive(Debug, Clone, derive_new::new)]
pub struct Hierarchy {
    levels: Vec<String>,
    #[new(default)]
    merge_behavior: MergeBehavior,
}

impl Hierarchy {
    pub fn with_merge_behavior(mut self, merge_behavior: MergeBehavior) -> Self {
        self.merge_behavior = merge_behavior;
        self
    }
}

impl Host for Hierarchy {
    fn datasources(&self, scope: &Scope, order_override: Option<&str>) -> Vec<String> {
        order_override
            .into_iter()
            .chain(self.levels.iter().map(String::as_str))
            .map(|level| interpolate(level, scope))
            .filter(|source| {
                if source.is_empty() {
                    tracing::trace!("skipping hierarchy level that interpolated to nothing");
                }
                !source.is_empty()
            })
            .collect()
    }

    fn parse_answer(&self, raw: Value, scope: &Scope) -> Value {
        match raw {
            Value::String(string) => Value::String(interpolate(&string, scope)),
            Value::Array(array) => Value::Array(
                array
                    .into_iter()
                    .map(|element| self.parse_answer(element, scope))
                    .collect(),
            ),
            Value::Object(object) => Value::Object(
                object
                    .into_iter()
                    .map(|(key, value)| {
                        (interpolate(&key, scope), self.parse_answer(value, scope))
                    })
                    .collect(),
            ),
            other => other,
        }
    }

    fn merge_answer(&self, new: Object, existing: Object) -> Object {
        match self.merge_behavior {
            MergeBehavior::Native => native_merge(new, existing),
            MergeBehavior::Deep => deep_merge(new, existing),
        }
    }
}

/// Replace every `%{name}` (or `%{::name}`) with the scope variable `name`
///
/// Unknown variables are replaced with nothing.
pub fn interpolate(template: &str, scope: &Scope) -> String {
    INTERPOLATION
        .replace_all(template, |captures: &Captures| {
            let name = captures[1].trim();
            match scope.get(name) {
                Some(value) => value.to_interpolated(),
                None => {
                    tracing::debug!(%name, "interpolated variable not in scope");
                    String::new()
                }
            }
        })
        .into_owned()
}

fn native_merge(new: Object, mut existing: Object) -> Object {
    for (key, value) in new {
        existing.entry(key).or_insert(value);
    }
    existing
}

fn deep_merge(new: Object, mut existing: Object) -> Object {
    for (key, new_value) in new {
        match existing.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(new_value);
            }
            Entry::Occupied(mut entry) => match (entry.get_mut(), new_value) {
                (Value::Object(existing_object), Value::Object(new_object)) => {
                    *existing_object = deep_merge(new_object, std::mem::take(existing_object));
                }
                (Value::Array(existing_array), Value::Array(new_array)) => {
                    for element in new_array {
                        if !existing_array.contains(&element) {
                            existing_array.push(element);
                        }
                    }
                }
                _ => {}
            },
        }
    }
    existing
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scope() -> Scope {
        Scope::from([
            ("environment".to_string(), Value::from("production")),
            ("stack".to_string(), Value::from("Web")),
            ("count".to_string(), Value::Integer(3)),
        ])
    }

    fn object(entries: &[(&str, Value)]) -> Object {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn interpolation() {
        let scope = scope();
        assert_eq!(
            interpolate("cfstack/%{stack}-%{environment}/outputs", &scope),
            "cfstack/Web-production/outputs"
        );
        assert_eq!(interpolate("%{::count} nodes", &scope), "3 nodes");
        assert_eq!(interpolate("x%{unknown}y", &scope), "xy");
        assert_eq!(interpolate("no variables", &scope), "no variables");
    }

    #[test]
    fn datasources() {
        let hierarchy = Hierarchy::new(vec![
            "cfstack/%{stack}/outputs".to_string(),
            "%{missing}".to_string(),
            "common".to_string(),
        ]);

        assert_eq!(
            hierarchy.datasources(&scope(), Some("cfstack/Override/outputs")),
            vec![
                "cfstack/Override/outputs".to_string(),
                "cfstack/Web/outputs".to_string(),
                "common".to_string(),
            ]
        );
        assert_eq!(hierarchy.datasources(&scope(), None).len(), 2);
    }

    #[test]
    fn parse_answer_interpolates_recursively() {
        let hierarchy = Hierarchy::new(vec![]);
        let raw = Value::Object(object(&[
            ("%{environment}_url", Value::from("https://%{stack}.example.com")),
            ("list", Value::from(vec!["%{stack}", "static"])),
            ("number", Value::Integer(1)),
        ]));

        let expected = Value::Object(object(&[
            ("production_url", Value::from("https://Web.example.com")),
            ("list", Value::from(vec!["Web", "static"])),
            ("number", Value::Integer(1)),
        ]));

        assert_eq!(hierarchy.parse_answer(raw, &scope()), expected);
    }

    #[test]
    fn native_merge_keeps_existing_keys() {
        let hierarchy = Hierarchy::new(vec![]);
        let existing = object(&[
            ("a", Value::from("first")),
            ("nested", Value::Object(object(&[("x", Value::Integer(1))]))),
        ]);
        let new = object(&[
            ("a", Value::from("second")),
            ("b", Value::from("second")),
            ("nested", Value::Object(object(&[("y", Value::Integer(2))]))),
        ]);

        let merged = hierarchy.merge_answer(new, existing);

        assert_eq!(
            merged,
            object(&[
                ("a", Value::from("first")),
                ("nested", Value::Object(object(&[("x", Value::Integer(1))]))),
                ("b", Value::from("second")),
            ])
        );
        assert_eq!(
            merged.keys().collect::<Vec<_>>(),
            vec!["a", "nested", "b"]
        );
    }

    #[test]
    fn deep_merge_recurses() {
        let hierarchy = Hierarchy::new(vec![]).with_merge_behavior(MergeBehavior::Deep);
        let existing = object(&[
            ("a", Value::from("first")),
            ("nested", Value::Object(object(&[("x", Value::Integer(1))]))),
            ("list", Value::from(vec!["one", "two"])),
        ]);
        let new = object(&[
            ("a", Value::from("second")),
            (
                "nested",
                Value::Object(object(&[
                    ("x", Value::Integer(10)),
                    ("y", Value::Integer(2)),
                ])),
            ),
            ("list", Value::from(vec!["two", "three"])),
        ]);

        assert_eq!(
            hierarchy.merge_answer(new, existing),
            object(&[
                ("a", Value::from("first")),
                (
                    "nested",
                    Value::Object(object(&[
                        ("x", Value::Integer(1)),
                        ("y", Value::Integer(2)),
                    ])),
                ),
                ("list", Value::from(vec!["one", "two", "three"])),
            ])
        );
    }

    #[test]
    fn merge_is_associative() {
        let hierarchy = Hierarchy::new(vec![]).with_merge_behavior(MergeBehavior::Deep);
        let a = object(&[("k", Value::Object(object(&[("a", Value::Integer(1))])))]);
        let b = object(&[(
            "k",
            Value::Object(object(&[("a", Value::Integer(2)), ("b", Value::Integer(2))])),
        )]);
        let c = object(&[
            ("k", Value::Object(object(&[("c", Value::Integer(3))]))),
            ("z", Value::Null),
        ]);

        let left = hierarchy.merge_answer(c.clone(), hierarchy.merge_answer(b.clone(), a.clone()));
        let right = hierarchy.merge_answer(hierarchy.merge_answer(c, b), a);

        assert_eq!(left, right);
    }
}
