//! # cfstack-lookup - configuration lookups backed by CloudFormation
//!
//! Answers hierarchical configuration lookups (think hiera) from CloudFormation stack outputs and
//! stack resource metadata.
//!
//! ## Introduction for developers
//!
//! Read this to understand how a lookup flows through the crate.
//!
//! ### Data sources
//!
//! The [host::Host] hands us an ordered list of data source locators. Only two shapes are ours
//! (see [locator::QueryTarget::resolve]):
//!
//! | **locator**                            | **answers from**                             |
//! |----------------------------------------|----------------------------------------------|
//! | `cfstack/<stack>/outputs`              | the output named `key` of `<stack>`          |
//! | `cfstack/<stack>/resources/<resource>` | `hiera.<key>` in the resource's metadata     |
//!
//! Any other locator is skipped silently, it is meant for a different backend.
//!
//! ### Metadata
//!
//! Resource metadata is a JSON object. Only the reserved `hiera` namespace is visible:
//!
//! ```json
//! {
//!   "AWS::CloudFormation::Init": {},
//!   "hiera": {
//!     "env": "prod",
//!     "workers": "4"
//!   }
//! }
//! ```
//!
//! CloudFormation stringifies scalars in metadata. With `parse_metadata` enabled
//! [coerce::coerce] turns `"4"` back into `4`.
//!
//! ### Caching
//!
//! Remote data is fetched per stack (all outputs) or per resource (the full metadata blob) by
//! [query::QueryClient] and kept in a [cache::Cache]. A stack or resource that does not exist is
//! cached as an empty answer, so repeated lookups don't hammer the API. Any other remote failure
//! is returned as an error and nothing is cached.
//!
//! ### Resolution
//!
//! [lookup::Backend::lookup] walks the data sources lazily and shapes the answers according to
//! [lookup::ResolutionType]:
//! - `priority`: the first answer, remaining sources are never queried
//! - `array`: all answers in source order
//! - `hash`: all answers merged by the host
//!
//! Each answer is interpreted by the host first ([host::Host::parse_answer]), which for
//! [host::Hierarchy] means `%{variable}` interpolation from the scope.
//!
//! ### Output
//!
//! Answers are [value::Value]s, which serialize via [serde].
//!
pub mod cache;
pub mod coerce;
pub mod config;
pub mod host;
pub mod locator;
pub mod lookup;
pub mod query;
pub mod remote;
pub mod value;
