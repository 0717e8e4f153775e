use crate::{BlobSink, BlobSinkError, VIDEO_CONTENT_TYPE};
use google_cloud_storage::client::{Client, ClientConfig};
use google_cloud_storage::http::objects::delete::DeleteObjectRequest;
use google_cloud_storage::http::objects::get::GetObjectRequest;
use google_cloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};
use tokio::io::{AsyncRead, AsyncReadExt};

pub struct Gcs {
    client: Client,
    bucket_name: String,
}

impl Gcs {
    /// `credential_json_file_path` is passed through `GOOGLE_APPLICATION_CREDENTIALS`
    /// rather than parsed directly, matching the ambient-credentials convention the
    /// client library expects.
    pub async fn new(bucket_name: &str, credential_json_file_path: Option<&str>) -> Result<Self, BlobSinkError> {
        if let Some(path) = credential_json_file_path {
            // Safety: single-threaded at startup, before any worker reads this var.
            unsafe {
                std::env::set_var("GOOGLE_APPLICATION_CREDENTIALS", path);
            }
        }
        let config = ClientConfig::default()
            .with_auth()
            .await
            .map_err(|e| BlobSinkError::Gcs(e.to_string()))?;
        Ok(Gcs {
            client: Client::new(config),
            bucket_name: bucket_name.to_owned(),
        })
    }
}

#[async_trait::async_trait]
impl BlobSink for Gcs {
    async fn exists(&self, name: &str) -> Result<bool, BlobSinkError> {
        let request = GetObjectRequest {
            bucket: self.bucket_name.clone(),
            object: name.to_owned(),
            ..Default::default()
        };
        match self.client.get_object(&request).await {
            Ok(_) => Ok(true),
            Err(e) if e.to_string().contains("404") => Ok(false),
            Err(e) => Err(BlobSinkError::Gcs(e.to_string())),
        }
    }

    async fn save(
        &self,
        name: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<u64, BlobSinkError> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        let len = buf.len() as u64;
        let upload_type = UploadType::Simple(Media {
            name: name.to_owned().into(),
            content_type: VIDEO_CONTENT_TYPE.into(),
            content_length: Some(len),
        });
        self.client
            .upload_object(
                &UploadObjectRequest {
                    bucket: self.bucket_name.clone(),
                    ..Default::default()
                },
                buf,
                &upload_type,
            )
            .await
            .map_err(|e| BlobSinkError::Gcs(e.to_string()))?;
        Ok(len)
    }

    async fn delete(&self, name: &str) -> Result<(), BlobSinkError> {
        self.client
            .delete_object(&DeleteObjectRequest {
                bucket: self.bucket_name.clone(),
                object: name.to_owned(),
                ..Default::default()
            })
            .await
            .map_err(|e| BlobSinkError::Gcs(e.to_string()))?;
        Ok(())
    }
}
