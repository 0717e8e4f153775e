use crate::{BlobSink, BlobSinkError, VIDEO_CONTENT_TYPE};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tokio::io::{AsyncRead, AsyncReadExt};

pub struct S3 {
    client: Client,
    bucket_name: String,
}

impl S3 {
    pub async fn new(endpoint: &str, access_key_id: &str, secret_access_key: &str, bucket_name: &str) -> Self {
        let credentials = aws_sdk_s3::config::Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "ytbridge",
        );
        let config = aws_sdk_s3::Config::builder()
            .endpoint_url(endpoint)
            .credentials_provider(credentials)
            .region(aws_sdk_s3::config::Region::new("us-east-1"))
            .force_path_style(true)
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .build();
        S3 {
            client: Client::from_conf(config),
            bucket_name: bucket_name.to_owned(),
        }
    }
}

#[async_trait::async_trait]
impl BlobSink for S3 {
    async fn exists(&self, name: &str) -> Result<bool, BlobSinkError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket_name)
            .key(name)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false)
                {
                    Ok(false)
                } else {
                    Err(BlobSinkError::S3(err.to_string()))
                }
            }
        }
    }

    async fn save(
        &self,
        name: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<u64, BlobSinkError> {
        // Buffered read: the S3 API requires a known-length body or chunked
        // multipart upload; for the video sizes this service handles,
        // buffering into memory before upload is acceptable.
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        let len = buf.len() as u64;
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(name)
            .content_type(VIDEO_CONTENT_TYPE)
            .body(ByteStream::from(buf))
            .send()
            .await
            .map_err(|e| BlobSinkError::S3(e.to_string()))?;
        Ok(len)
    }

    async fn delete(&self, name: &str) -> Result<(), BlobSinkError> {
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(name)
            .send()
            .await
            .map_err(|e| BlobSinkError::S3(e.to_string()))?;
        Ok(())
    }
}
