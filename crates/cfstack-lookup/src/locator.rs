//! Data source locators
//!
//! A hierarchy level is only answered by this backend when it is one of
//! - `cfstack/<stack>/outputs`
//! - `cfstack/<stack>/resources/<logical resource id>`
//!
//! Everything else belongs to some other backend and is skipped.
use crate::cache::CacheKey;
use once_cell::sync::Lazy;
use regex::Regex;

static STACK_OUTPUTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^cfstack/([^/]+)/outputs$").expect("outputs locator pattern"));

static STACK_RESOURCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^cfstack/([^/]+)/resources/([^/]+)").expect("resource locator pattern")
});

/// What a locator asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTarget {
    StackOutputs { stack: String },
    StackResourceMetadata { stack: String, resource: String },
}

impl QueryTarget {
    /// Parse a locator
    ///
    /// Returns `None` when the locator is not a CloudFormation hierarchy element.
    pub fn resolve(locator: &str) -> Option<QueryTarget> {
        if let Some(captures) = STACK_OUTPUTS.captures(locator) {
            return Some(QueryTarget::StackOutputs {
                stack: captures[1].to_string(),
            });
        }

        if let Some(captures) = STACK_RESOURCE.captures(locator) {
            return Some(QueryTarget::StackResourceMetadata {
                stack: captures[1].to_string(),
                resource: captures[2].to_string(),
            });
        }

        None
    }

    /// Key under which the raw remote data for this target is cached
    pub fn cache_key(&self) -> CacheKey {
        match self {
            QueryTarget::StackOutputs { stack } => CacheKey::outputs(stack),
            QueryTarget::StackResourceMetadata { stack, resource } => {
                CacheKey::resource(stack, resource)
            }
        }
    }
}

impl std::fmt::Display for QueryTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryTarget::StackOutputs { stack } => write!(f, "outputs of stack {stack}"),
            QueryTarget::StackResourceMetadata { stack, resource } => {
                write!(f, "metadata of stack {stack} resource {resource}")
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn stack_outputs() {
        assert_eq!(
            QueryTarget::resolve("cfstack/MyStack/outputs"),
            Some(QueryTarget::StackOutputs {
                stack: "MyStack".to_string()
            })
        );
    }

    #[test]
    fn stack_resource() {
        assert_eq!(
            QueryTarget::resolve("cfstack/MyStack/resources/WebServer"),
            Some(QueryTarget::StackResourceMetadata {
                stack: "MyStack".to_string(),
                resource: "WebServer".to_string(),
            })
        );
    }

    #[test]
    fn resource_locator_is_prefix_matched() {
        assert_eq!(
            QueryTarget::resolve("cfstack/MyStack/resources/WebServer/extra"),
            Some(QueryTarget::StackResourceMetadata {
                stack: "MyStack".to_string(),
                resource: "WebServer".to_string(),
            })
        );
    }

    #[test]
    fn not_applicable() {
        assert_eq!(QueryTarget::resolve("some/other/path"), None);
        assert_eq!(QueryTarget::resolve("cfstack/MyStack/outputs/more"), None);
        assert_eq!(QueryTarget::resolve("cfstack//outputs"), None);
        assert_eq!(QueryTarget::resolve("prefix/cfstack/MyStack/outputs"), None);
        assert_eq!(QueryTarget::resolve("cfstack/MyStack/resources/"), None);
    }

    #[test]
    fn cache_keys_differ_per_target() {
        let outputs = QueryTarget::resolve("cfstack/MyStack/outputs").unwrap();
        let resource = QueryTarget::resolve("cfstack/MyStack/resources/WebServer").unwrap();

        assert_ne!(outputs.cache_key(), resource.cache_key());
    }
}
