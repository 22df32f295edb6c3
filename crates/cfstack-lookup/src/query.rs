//! Cached queries against the remote stack API
use crate::cache::{Cache, CacheKey};
use crate::locator::QueryTarget;
use crate::lookup::LookupError;
use crate::remote::{RemoteError, StackApi, StackOutput};
use crate::value::Value;

/// Reserved top level key of a metadata blob, only its children are visible to lookups
pub const METADATA_NAMESPACE: &str = "hiera";

/// Cached in place of a missing resource so the miss is remembered
const EMPTY_METADATA: &str = "{}";

pub struct QueryClient {
    api: Box<dyn StackApi>,
    cache: Cache,
}

impl QueryClient {
    pub fn new(api: impl StackApi + 'static, cache: Cache) -> Self {
        Self {
            api: Box::new(api),
            cache,
        }
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Answer `key` from whatever `target` points at
    pub fn query(&self, target: &QueryTarget, key: &str) -> Result<Option<Value>, LookupError> {
        match target {
            QueryTarget::StackOutputs { stack } => self.stack_output_query(stack, key),
            QueryTarget::StackResourceMetadata { stack, resource } => {
                self.stack_resource_query(stack, resource, key)
            }
        }
    }

    /// Outputs of `stack`, empty if the stack does not exist
    pub fn fetch_stack_outputs(&self, stack: &str) -> Result<Vec<StackOutput>, LookupError> {
        let key = CacheKey::outputs(stack);
        if let Some(outputs) = self.cache.get(&key)? {
            return Ok(outputs);
        }

        tracing::debug!(%stack, "outputs not cached, fetching");
        let outputs = match self.api.stack_outputs(stack) {
            Ok(outputs) => outputs,
            Err(RemoteError::NotFound(reason)) => {
                tracing::debug!(%stack, %reason, "stack outputs can't be retrieved");
                Vec::new()
            }
            Err(err) => return Err(err.into()),
        };

        self.cache.put(&key, &outputs)?;
        Ok(outputs)
    }

    /// Raw metadata blob of a stack resource, `{}` if the resource does not exist
    pub fn fetch_resource_metadata(
        &self,
        stack: &str,
        resource: &str,
    ) -> Result<String, LookupError> {
        let key = CacheKey::resource(stack, resource);
        if let Some(metadata) = self.cache.get(&key)? {
            return Ok(metadata);
        }

        tracing::debug!(%stack, %resource, "metadata not cached, fetching");
        let metadata = match self.api.resource_metadata(stack, resource) {
            Ok(Some(metadata)) => metadata,
            Ok(None) => EMPTY_METADATA.to_string(),
            Err(RemoteError::NotFound(reason)) => {
                tracing::debug!(%stack, %resource, %reason, "resource can't be retrieved");
                EMPTY_METADATA.to_string()
            }
            Err(err) => return Err(err.into()),
        };

        self.cache.put(&key, &metadata)?;
        Ok(metadata)
    }

    pub fn stack_output_query(&self, stack: &str, key: &str) -> Result<Option<Value>, LookupError> {
        let outputs = self.fetch_stack_outputs(stack)?;

        Ok(outputs
            .into_iter()
            .find(|output| output.key == key)
            .map(|output| Value::String(output.value)))
    }

    pub fn stack_resource_query(
        &self,
        stack: &str,
        resource: &str,
        key: &str,
    ) -> Result<Option<Value>, LookupError> {
        let metadata = self.fetch_resource_metadata(stack, resource)?;

        let mut data: serde_json::Value =
            serde_json::from_str(&metadata).map_err(|source| LookupError::MalformedMetadata {
                stack: stack.to_string(),
                resource: resource.to_string(),
                source,
            })?;

        Ok(data
            .get_mut(METADATA_NAMESPACE)
            .filter(|namespace| namespace.is_object())
            .and_then(|namespace| namespace.get_mut(key))
            .filter(|answer| !answer.is_null())
            .map(|answer| answer.take().into()))
    }
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClient")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
