use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Builder, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;

use crate::config::Settings;

/// Raw client for an S3-compatible bucket (Yandex Object Storage in
/// production). Addressing is path-style, so public object URLs are
/// `{endpoint}/{bucket}/{key}`.
pub struct S3Client {
    client: Client,
    bucket: String,
    endpoint: String,
}

impl S3Client {
    pub fn new(settings: &Settings) -> Self {
        let credentials = Credentials::new(
            settings.s3_access_key.clone(),
            settings.s3_secret_key.clone(),
            None,
            None,
            "static",
        );
        let config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(settings.s3_region.clone()))
            .endpoint_url(&settings.s3_endpoint)
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(config),
            bucket: settings.s3_bucket.clone(),
            endpoint: settings.s3_endpoint.trim_end_matches('/').to_string(),
        }
    }

    pub async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        public: bool,
    ) -> Result<(), String> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes));
        if public {
            request = request.acl(ObjectCannedAcl::PublicRead);
        }
        request
            .send()
            .await
            .map_err(|err| format!("Failed to store {}: {}", key, err.into_service_error()))?;
        Ok(())
    }

    pub async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, String> {
        match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => {
                let data = output
                    .body
                    .collect()
                    .await
                    .map_err(|err| format!("Failed to read body of {}: {}", key, err))?;
                Ok(Some(data.into_bytes().to_vec()))
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    Ok(None)
                } else {
                    Err(format!("Failed to fetch {}: {}", key, service_err))
                }
            }
        }
    }

    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
    }
}
