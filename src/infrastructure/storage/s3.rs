use crate::config::settings::MirrorConfig;
use aws_sdk_s3::{Client, config::Region, config::Credentials, config::BehaviorVersion};
use aws_sdk_s3::config::{Builder, RequestChecksumCalculation};
use aws_sdk_s3::primitives::ByteStream;
use tracing::info;

/// Copies artifacts into an S3-compatible bucket (MinIO in development).
#[derive(Clone)]
pub struct MirrorService {
    pub client: Client,
    pub bucket: String,
    endpoint: String,
}

impl MirrorService {
    pub fn new(config: &MirrorConfig) -> Self {
        let credentials = Credentials::new(&config.access_key, &config.secret_key, None, None, "static");

        let s3_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .force_path_style(true) // Required for MinIO
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .build();

        let client = Client::from_conf(s3_config);

        info!("✅ Artifact mirror configured for bucket {}", config.bucket);

        Self {
            client,
            bucket: config.bucket.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        }
    }

    pub async fn put_object(
        &self,
        key: &str,
        body: bytes::Bytes,
        content_type: &str,
    ) -> Result<String, aws_sdk_s3::Error> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await?;

        Ok(self.object_url(key))
    }

    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
    }
}
