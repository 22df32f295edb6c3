//! AWS CloudFormation [StackApi]
use super::{RemoteError, StackApi, StackOutput};
use aws_sdk_cloudformation::config::Credentials;
use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cloudformation::types::Output;
use aws_sdk_cloudformation::Client;

/// Explicit AWS settings
///
/// Static credentials are only used when both parts are present. Anything left out is taken
/// from the default provider chain (environment, profile, instance role).
#[derive(Debug, Clone, Default)]
pub struct AwsSettings {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub region: Option<String>,
}

/// Blocking CloudFormation client
///
/// Owns a current-thread runtime that drives the async SDK for one request at a time. Request
/// timeouts are whatever the SDK config says.
pub struct CloudFormationApi {
    client: Client,
    runtime: tokio::runtime::Runtime,
}

impl CloudFormationApi {
    pub fn new(settings: &AwsSettings) -> Result<Self, RemoteError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| RemoteError::Request {
                message: "unable to start runtime for AWS requests".to_string(),
                source: Some(Box::new(err)),
            })?;

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(region) = &settings.region {
            tracing::debug!(%region, "found AWS region in configuration");
            loader = loader.region(aws_config::Region::new(region.clone()));
        }

        match (&settings.access_key_id, &settings.secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => {
                tracing::debug!(%access_key_id, "found AWS access key in configuration");
                loader = loader.credentials_provider(Credentials::new(
                    access_key_id.clone(),
                    secret_access_key.clone(),
                    None,
                    None,
                    "cfstack-lookup",
                ));
            }
            _ => {
                tracing::debug!("no AWS credentials configured, using environment or IAM role");
            }
        }

        let sdk_config = runtime.block_on(loader.load());
        Ok(Self::from_client(Client::new(&sdk_config), runtime))
    }

    pub fn from_client(client: Client, runtime: tokio::runtime::Runtime) -> Self {
        Self { client, runtime }
    }
}

impl StackApi for CloudFormationApi {
    fn stack_outputs(&self, stack: &str) -> Result<Vec<StackOutput>, RemoteError> {
        let response = self
            .runtime
            .block_on(self.client.describe_stacks().stack_name(stack).send());

        let output = match response {
            Ok(output) => output,
            Err(err) if is_validation_error(&err) => {
                return Err(RemoteError::NotFound(format!("stack {stack}")))
            }
            Err(err) => return Err(request_error(err.into_service_error())),
        };

        Ok(output
            .stacks()
            .iter()
            .flat_map(|stack| stack.outputs())
            .filter_map(stack_output)
            .collect())
    }

    fn resource_metadata(
        &self,
        stack: &str,
        resource: &str,
    ) -> Result<Option<String>, RemoteError> {
        let response = self.runtime.block_on(
            self.client
                .describe_stack_resource()
                .stack_name(stack)
                .logical_resource_id(resource)
                .send(),
        );

        let output = match response {
            Ok(output) => output,
            Err(err) if is_validation_error(&err) => {
                return Err(RemoteError::NotFound(format!(
                    "stack {stack} resource {resource}"
                )))
            }
            Err(err) => return Err(request_error(err.into_service_error())),
        };

        Ok(output
            .stack_resource_detail()
            .and_then(|detail| detail.metadata())
            .map(str::to_string))
    }
}

/// Outputs without a key or a value can't answer anything
fn stack_output(output: &Output) -> Option<StackOutput> {
    Some(StackOutput::new(
        output.description().map(str::to_string),
        output.output_key()?.to_string(),
        output.output_value()?.to_string(),
    ))
}

/// CloudFormation reports unknown stacks and resources as `ValidationError`
fn is_validation_error<E: ProvideErrorMetadata, R>(err: &SdkError<E, R>) -> bool {
    err.as_service_error().and_then(|err| err.code()) == Some("ValidationError")
}

fn request_error<E>(service_err: E) -> RemoteError
where
    E: std::error::Error + Send + Sync + 'static,
{
    RemoteError::Request {
        message: DisplayErrorContext(&service_err).to_string(),
        source: Some(Box::new(service_err)),
    }
}
