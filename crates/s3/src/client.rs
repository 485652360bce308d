//! S3 store implementation
//!
//! Wraps aws-sdk-s3 and implements the RemoteStore trait from bm-core for a
//! single bucket.

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;

use bm_core::{Error, ListPage, ListRequest, ObjectInfo, ObjectStream, Profile, RemoteStore, Result};

/// S3 bucket wrapper
pub struct S3Store {
    inner: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Store {
    /// Create a new store from a profile
    ///
    /// Static credentials are used when the profile carries both keys;
    /// otherwise the SDK's default provider chain applies.
    pub async fn new(profile: &Profile) -> Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(profile.region.clone()));

        if let Some((access_key, secret_key)) = profile.static_credentials() {
            let credentials = aws_credential_types::Credentials::new(
                access_key,
                secret_key,
                None, // session token
                None, // expiry
                "bm-static-credentials",
            );
            loader = loader.credentials_provider(credentials);
        }

        if let Some(endpoint) = &profile.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let config = loader.load().await;

        // Path-style addressing keeps custom endpoints (MinIO, RustFS) working
        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(profile.bucket_lookup == "path" || profile.bucket_lookup == "auto")
            .build();

        tracing::debug!(
            "Created S3 client for bucket {} in {}",
            profile.bucket,
            profile.region
        );

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: profile.bucket.clone(),
        })
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }
}

/// Map an SDK error, turning "missing" responses into `NotFound(what)`
fn map_sdk_error(message: String, what: &str) -> Error {
    if is_missing(&message) {
        Error::NotFound(what.to_string())
    } else {
        Error::Remote(message)
    }
}

fn is_missing(message: &str) -> bool {
    message.contains("NotFound") || message.contains("NoSuchKey") || message.contains("NoSuchBucket")
}

fn error_message<E: std::error::Error>(e: &E) -> String {
    DisplayErrorContext(e).to_string()
}

#[async_trait]
impl RemoteStore for S3Store {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn bucket_exists(&self) -> Result<bool> {
        match self.inner.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let message = error_message(&e);
                if is_missing(&message) {
                    Ok(false)
                } else {
                    Err(Error::Remote(message))
                }
            }
        }
    }

    async fn list_objects(&self, request: ListRequest) -> Result<ListPage> {
        // No delimiter: every key below the prefix comes back flat
        let mut call = self.inner.list_objects_v2().bucket(&self.bucket);

        if let Some(prefix) = request.prefix {
            call = call.prefix(prefix);
        }
        if let Some(max) = request.max_keys {
            call = call.max_keys(max);
        }
        if let Some(token) = request.continuation_token {
            call = call.continuation_token(token);
        }

        let response = call
            .send()
            .await
            .map_err(|e| map_sdk_error(error_message(&e), &self.bucket))?;

        let keys = response
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect();

        Ok(ListPage {
            keys,
            continuation_token: response.next_continuation_token().map(|s| s.to_string()),
        })
    }

    async fn head_object(&self, key: &str) -> Result<ObjectInfo> {
        let response = self
            .inner
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(error_message(&e), key))?;

        let size = response.content_length().unwrap_or(0);
        let mut info = if key.ends_with(bm_core::key::SEPARATOR) {
            ObjectInfo::dir(key)
        } else {
            ObjectInfo::file(key, size)
        };

        if let Some(modified) = response.last_modified() {
            info.last_modified = jiff::Timestamp::from_second(modified.secs()).ok();
        }

        if let Some(etag) = response.e_tag() {
            info.etag = Some(etag.trim_matches('"').to_string());
        }

        if let Some(ct) = response.content_type() {
            info.content_type = Some(ct.to_string());
        }

        Ok(info)
    }

    async fn get_object(&self, key: &str) -> Result<ObjectStream> {
        let response = self
            .inner
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(error_message(&e), key))?;

        Ok(Box::pin(response.body.into_async_read()))
    }
}
