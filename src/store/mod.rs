//! Remote storage of lifecycle configurations.
//!
//! The `LifecycleStore` trait is the only way commands talk to a server;
//! every method works on a whole `RuleSet` since S3 offers no partial
//! updates of a lifecycle configuration. The trait is implemented by the
//! `S3Store`, which writes its own lifecycle documents via `xml`.
use async_trait::async_trait;
use rusoto_core::param::{Params, ServiceParams};
use rusoto_core::signature::SignedRequest;
use rusoto_core::{Client, Region, RusotoError};
use rusoto_s3::{
    DeleteBucketLifecycleError, DeleteBucketLifecycleRequest, GetBucketLifecycleConfigurationError,
    PutBucketLifecycleConfigurationError, S3Client, S3,
};

use std::fmt::{self, Display, Formatter};

use crate::rule::RuleSet;
use crate::types::xml_error_field;

mod xml;

/// Error code returned by S3 when a bucket has no lifecycle configuration.
const NO_SUCH_CONFIGURATION: &str = "NoSuchLifecycleConfiguration";

/// Typed failures raised by a `LifecycleStore`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// The bucket has no lifecycle configuration at all.
    NoSuchConfiguration,
    /// The stored configuration uses a feature this tool cannot represent.
    Unsupported(String),
    /// The lifecycle document could not be read or written.
    Malformed(String),
    /// Any other failure reported by (or while talking to) the remote.
    Remote(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            StoreError::NoSuchConfiguration => f.write_str("lifecycle configuration is not set"),
            StoreError::Unsupported(feature) => write!(f, "{} is not supported", feature),
            StoreError::Malformed(message) => {
                write!(f, "invalid lifecycle configuration: {}", message)
            }
            StoreError::Remote(message) => f.write_str(message),
        }
    }
}

impl From<quick_xml::Error> for StoreError {
    /// Converts an XML error to a `StoreError`.
    fn from(err: quick_xml::Error) -> StoreError {
        StoreError::Malformed(err.to_string())
    }
}

/// Macro to implement `From` for Rusoto error types.
///
/// A missing configuration is detected through the `Code` of the S3 XML
/// error body (or a 404), everything else keeps the `Message` of the body.
macro_rules! derive_from_rusoto {
    ($type:ty) => {
        impl From<RusotoError<$type>> for StoreError {
            /// Converts a Rusoto error to a `StoreError`.
            fn from(err: RusotoError<$type>) -> StoreError {
                if let RusotoError::Unknown(ref resp) = err {
                    // the body of the response holds the S3 error document
                    let body = String::from_utf8_lossy(&resp.body);
                    let code = xml_error_field(&body, b"Code");

                    if code.as_deref() == Some(NO_SUCH_CONFIGURATION)
                        || (code.is_none() && resp.status.as_u16() == 404)
                    {
                        return StoreError::NoSuchConfiguration;
                    }

                    if let Some(message) = xml_error_field(&body, b"Message") {
                        return StoreError::Remote(message);
                    }
                }

                // grab the raw conversion
                let msg = err.to_string();

                // XML, look for a message!
                match xml_error_field(&msg, b"Message") {
                    Some(message) => StoreError::Remote(message),
                    None => StoreError::Remote(msg),
                }
            }
        }
    };
}

// derive error conversion for all used rusoto_s3 types
derive_from_rusoto!(DeleteBucketLifecycleError);
derive_from_rusoto!(GetBucketLifecycleConfigurationError);
derive_from_rusoto!(PutBucketLifecycleConfigurationError);

/// A bucket (and optional prefix) to operate on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub bucket: String,
    pub prefix: Option<String>,
}

impl Target {
    /// Parses a target of the form `[s3://]bucket[/prefix]`.
    ///
    /// Returns `None` if no bucket name is present.
    pub fn parse(input: &str) -> Option<Target> {
        let mut splitn = input.trim().trim_start_matches("s3://").splitn(2, '/');

        // bucket is required, prefix is optional after `/`
        let bucket = splitn.next().filter(|b| !b.is_empty())?.to_string();
        let prefix = splitn
            .next()
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        Some(Target { bucket, prefix })
    }
}

/// Display implementation for `Target`, as an `s3://` URL.
impl Display for Target {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.prefix {
            Some(ref prefix) => write!(f, "s3://{}/{}", self.bucket, prefix),
            None => write!(f, "s3://{}", self.bucket),
        }
    }
}

/// Whole-configuration access to the lifecycle rules of a bucket.
#[async_trait]
pub trait LifecycleStore: Send + Sync {
    /// Fetches the current rule set of the target bucket.
    ///
    /// A bucket without any configuration fails with
    /// `StoreError::NoSuchConfiguration`.
    async fn fetch(&self, target: &Target) -> Result<RuleSet, StoreError>;

    /// Replaces the rule set of the target bucket wholesale.
    ///
    /// An empty rule set removes the configuration entirely.
    async fn replace(&self, target: &Target, rules: &RuleSet) -> Result<(), StoreError>;

    /// Fetches the current rule set, treating a missing configuration as empty.
    async fn fetch_or_default(&self, target: &Target) -> Result<RuleSet, StoreError> {
        match self.fetch(target).await {
            Err(StoreError::NoSuchConfiguration) => Ok(RuleSet::default()),
            result => result,
        }
    }
}

/// `LifecycleStore` backed by an S3 compatible server.
///
/// Lifecycle documents are written and read by the `xml` module and sent
/// as signed `?lifecycle` requests.
pub struct S3Store {
    client: Client,
    region: Region,
    s3: S3Client,
}

impl S3Store {
    /// Creates a new store on top of a signing client.
    pub fn new(client: Client, region: Region) -> S3Store {
        let s3 = S3Client::new_with_client(client.clone(), region.clone());
        S3Store { client, region, s3 }
    }

    /// Creates a signed `?lifecycle` request for the target bucket.
    fn request(&self, method: &str, target: &Target) -> SignedRequest {
        let path = format!("/{}", target.bucket);
        let mut request = SignedRequest::new(method, "s3", &self.region, &path);

        let mut params = Params::new();
        params.put_key("lifecycle");
        request.set_params(params);
        request
    }
}

#[async_trait]
impl LifecycleStore for S3Store {
    async fn fetch(&self, target: &Target) -> Result<RuleSet, StoreError> {
        let request = self.request("GET", target);

        let mut response = self
            .client
            .sign_and_dispatch(request)
            .await
            .map_err(RusotoError::<GetBucketLifecycleConfigurationError>::from)?;

        let response = response
            .buffer()
            .await
            .map_err(RusotoError::<GetBucketLifecycleConfigurationError>::HttpDispatch)?;

        if !response.status.is_success() {
            return Err(GetBucketLifecycleConfigurationError::from_response(response).into());
        }

        debug!("Fetched {} byte(s) of lifecycle configuration", response.body.len());

        if response.body.is_empty() {
            return Ok(RuleSet::default());
        }

        xml::decode(&response.body)
    }

    async fn replace(&self, target: &Target, rules: &RuleSet) -> Result<(), StoreError> {
        // S3 rejects empty configurations, so they're deleted instead
        if rules.is_empty() {
            let request = DeleteBucketLifecycleRequest {
                bucket: target.bucket.to_string(),
                ..DeleteBucketLifecycleRequest::default()
            };
            return Ok(self.s3.delete_bucket_lifecycle(request).await?);
        }

        let body = xml::encode(rules)?;

        debug!("Sending {} byte(s) of lifecycle configuration", body.len());

        let mut request = self.request("PUT", target);
        request.set_payload(Some(body));
        request.set_content_md5_header();

        let mut response = self
            .client
            .sign_and_dispatch(request)
            .await
            .map_err(RusotoError::<PutBucketLifecycleConfigurationError>::from)?;

        if !response.status.is_success() {
            let response = response
                .buffer()
                .await
                .map_err(RusotoError::<PutBucketLifecycleConfigurationError>::HttpDispatch)?;
            return Err(PutBucketLifecycleConfigurationError::from_response(response).into());
        }

        Ok(())
    }
}

/// In-memory `LifecycleStore` used to exercise commands in tests.
#[cfg(test)]
pub mod memory {
    use async_trait::async_trait;

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::{LifecycleStore, StoreError, Target};
    use crate::rule::RuleSet;

    #[derive(Default)]
    pub struct MemoryStore {
        buckets: Mutex<HashMap<String, RuleSet>>,
        failure: Option<StoreError>,
    }

    impl MemoryStore {
        /// Creates a store holding a rule set for a single bucket.
        pub fn with(bucket: &str, rules: RuleSet) -> MemoryStore {
            let store = MemoryStore::default();
            store.buckets.lock().unwrap().insert(bucket.to_string(), rules);
            store
        }

        /// Creates a store which fails every call with the given error.
        pub fn failing(failure: StoreError) -> MemoryStore {
            MemoryStore {
                failure: Some(failure),
                ..MemoryStore::default()
            }
        }

        /// Returns the rule set currently stored for a bucket.
        pub fn get(&self, bucket: &str) -> Option<RuleSet> {
            self.buckets.lock().unwrap().get(bucket).cloned()
        }
    }

    #[async_trait]
    impl LifecycleStore for MemoryStore {
        async fn fetch(&self, target: &Target) -> Result<RuleSet, StoreError> {
            if let Some(ref failure) = self.failure {
                return Err(failure.clone());
            }
            self.get(&target.bucket)
                .filter(|rules| !rules.is_empty())
                .ok_or(StoreError::NoSuchConfiguration)
        }

        async fn replace(&self, target: &Target, rules: &RuleSet) -> Result<(), StoreError> {
            if let Some(ref failure) = self.failure {
                return Err(failure.clone());
            }

            let mut buckets = self.buckets.lock().unwrap();
            if rules.is_empty() {
                buckets.remove(&target.bucket);
            } else {
                buckets.insert(target.bucket.clone(), rules.clone());
            }
            Ok(())
        }
    }
}
