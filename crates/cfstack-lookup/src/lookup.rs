//! Resolving one key across all data sources
use crate::cache::CacheError;
use crate::coerce::coerce;
use crate::host::{Host, Scope};
use crate::locator::QueryTarget;
use crate::query::QueryClient;
use crate::remote::RemoteError;
use crate::value::{Object, Value};

/// Shape of the result the caller asks for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ResolutionType {
    /// First answer found, the remaining sources are not consulted
    #[default]
    Priority,
    /// Every answer in source order
    Array,
    /// All mapping answers merged by the host
    Hash,
}

impl std::fmt::Display for ResolutionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionType::Priority => f.write_str("priority"),
            ResolutionType::Array => f.write_str("array"),
            ResolutionType::Hash => f.write_str("hash"),
        }
    }
}

/// CloudFormation lookup backend
#[derive(Debug)]
pub struct Backend<H> {
    host: H,
    client: QueryClient,
    parse_metadata: bool,
}

impl<H: Host> Backend<H> {
    pub fn new(host: H, client: QueryClient) -> Self {
        Self {
            host,
            client,
            parse_metadata: false,
        }
    }

    /// Convert stringified metadata back to numbers, booleans and null
    pub fn with_parse_metadata(mut self, parse_metadata: bool) -> Self {
        if parse_metadata {
            tracing::debug!("will convert stringified metadata back to numbers or booleans");
        }
        self.parse_metadata = parse_metadata;
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn client(&self) -> &QueryClient {
        &self.client
    }

    /// Look up `key` and shape the answers according to `resolution_type`
    ///
    /// Returns `Ok(None)` when no data source had an answer. Any error aborts the whole lookup,
    /// answers collected up to that point are discarded.
    #[tracing::instrument(level = "debug", skip(self, scope))]
    pub fn lookup(
        &self,
        key: &str,
        scope: &Scope,
        order_override: Option<&str>,
        resolution_type: ResolutionType,
    ) -> Result<Option<Value>, LookupError> {
        let mut answers = self.answers(key, scope, order_override);

        match resolution_type {
            ResolutionType::Priority => answers.next().transpose(),
            ResolutionType::Array => {
                let mut result: Option<Vec<Value>> = None;
                for answer in answers {
                    let answer = answer?;
                    if !matches!(answer, Value::Array(_) | Value::String(_)) {
                        return Err(LookupError::TypeMismatch {
                            expected: "array",
                            found: answer.type_name(),
                        });
                    }
                    result.get_or_insert_with(Vec::new).push(answer);
                }
                Ok(result.map(Value::Array))
            }
            ResolutionType::Hash => {
                let mut result: Option<Object> = None;
                for answer in answers {
                    let answer = match answer? {
                        Value::Object(object) => object,
                        other => {
                            return Err(LookupError::TypeMismatch {
                                expected: "hash",
                                found: other.type_name(),
                            })
                        }
                    };
                    result = Some(match result {
                        None => answer,
                        Some(existing) => self.host.merge_answer(answer, existing),
                    });
                }
                Ok(result.map(Value::Object))
            }
        }
    }

    /// Answers of all applicable data sources, highest priority first
    ///
    /// Evaluated lazily: remote data for a source is only fetched once the iterator reaches it.
    pub fn answers<'a>(
        &'a self,
        key: &'a str,
        scope: &'a Scope,
        order_override: Option<&str>,
    ) -> impl Iterator<Item = Result<Value, LookupError>> + 'a {
        self.host
            .datasources(scope, order_override)
            .into_iter()
            .filter_map(|source| {
                let target = QueryTarget::resolve(&source);
                if target.is_none() {
                    tracing::debug!(%source, "not a CloudFormation hierarchy element");
                }
                target
            })
            .filter_map(move |target| self.answer(&target, key, scope).transpose())
    }

    fn answer(
        &self,
        target: &QueryTarget,
        key: &str,
        scope: &Scope,
    ) -> Result<Option<Value>, LookupError> {
        tracing::debug!(%key, %target, "looking up");

        let Some(raw) = self.client.query(target, key)? else {
            return Ok(None);
        };
        tracing::trace!(?raw, "raw answer");

        let raw = if self.parse_metadata { coerce(raw) } else { raw };
        Ok(Some(self.host.parse_answer(raw, scope)))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LookupError {
    #[error("Type mismatch: expected {expected} and got {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("Remote query failed")]
    Remote(#[from] RemoteError),
    #[error("Cache failed")]
    Cache(#[from] CacheError),
    #[error("Metadata of stack {stack} resource {resource} is not valid JSON")]
    MalformedMetadata {
        stack: String,
        resource: String,
        #[source]
        source: serde_json::Error,
    },
}
