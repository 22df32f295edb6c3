//! Shared fixtures for integration tests
#![allow(dead_code)]

use cfstack_lookup::cache::{Cache, Ttl};
use cfstack_lookup::host::{Hierarchy, Scope};
use cfstack_lookup::lookup::Backend;
use cfstack_lookup::query::QueryClient;
use cfstack_lookup::remote::{RemoteError, StackApi, StackOutput};
use cfstack_lookup::value::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("CFSTACK_LOG"))
        .with_test_writer()
        .try_init();
}

/// In-memory stand-in for CloudFormation that counts remote calls
#[derive(Default, Clone)]
pub struct FakeStacks {
    outputs: HashMap<String, Vec<StackOutput>>,
    metadata: HashMap<(String, String), String>,
    failing: Vec<String>,
    calls: Arc<AtomicUsize>,
}

impl FakeStacks {
    pub fn with_output(mut self, stack: &str, key: &str, value: &str) -> Self {
        self.outputs
            .entry(stack.to_string())
            .or_default()
            .push(StackOutput::new(None, key.to_string(), value.to_string()));
        self
    }

    pub fn with_metadata(mut self, stack: &str, resource: &str, metadata: &str) -> Self {
        self.metadata.insert(
            (stack.to_string(), resource.to_string()),
            metadata.to_string(),
        );
        self
    }

    /// Every request for `stack` fails like a throttled or unauthorized call
    pub fn failing(mut self, stack: &str) -> Self {
        self.failing.push(stack.to_string());
        self
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }

    fn check(&self, stack: &str) -> Result<(), RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|failing| failing == stack) {
            return Err(RemoteError::request("Rate exceeded"));
        }
        Ok(())
    }
}

impl StackApi for FakeStacks {
    fn stack_outputs(&self, stack: &str) -> Result<Vec<StackOutput>, RemoteError> {
        self.check(stack)?;
        self.outputs
            .get(stack)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(format!("Stack with id {stack} does not exist")))
    }

    fn resource_metadata(
        &self,
        stack: &str,
        resource: &str,
    ) -> Result<Option<String>, RemoteError> {
        self.check(stack)?;
        if !self.outputs.contains_key(stack)
            && !self.metadata.keys().any(|(known, _)| known == stack)
        {
            return Err(RemoteError::NotFound(format!(
                "Stack with id {stack} does not exist"
            )));
        }
        match self.metadata.get(&(stack.to_string(), resource.to_string())) {
            Some(metadata) => Ok(Some(metadata.clone())),
            None => Err(RemoteError::NotFound(format!(
                "Resource {resource} does not exist for stack {stack}"
            ))),
        }
    }
}

pub fn backend(api: FakeStacks, hierarchy: &[&str]) -> Backend<Hierarchy> {
    let hierarchy = Hierarchy::new(hierarchy.iter().map(|level| level.to_string()).collect());
    backend_with_hierarchy(api, hierarchy)
}

pub fn backend_with_hierarchy(api: FakeStacks, hierarchy: Hierarchy) -> Backend<Hierarchy> {
    init_tracing();
    Backend::new(
        hierarchy,
        QueryClient::new(api, Cache::in_memory(Ttl::default())),
    )
}

pub fn scope(variables: &[(&str, &str)]) -> Scope {
    variables
        .iter()
        .map(|(name, value)| (name.to_string(), Value::from(*value)))
        .collect()
}

pub fn calls(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}
