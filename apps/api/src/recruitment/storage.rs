use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::recruitment::resume::ResumeFile;

pub const MAX_RESUME_BYTES: usize = 5 * 1024 * 1024;

/// Keeps ASCII letters, digits, dots, dashes and underscores; everything else becomes `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        "resume".to_string()
    } else {
        cleaned.to_string()
    }
}

pub fn resume_key(candidate_id: Uuid, file_name: &str) -> String {
    format!(
        "resumes/{candidate_id}/{}-{}",
        Uuid::new_v4(),
        sanitize_file_name(file_name)
    )
}

pub fn check_size(file: &ResumeFile) -> Result<(), AppError> {
    if file.data.is_empty() {
        return Err(AppError::Validation("Resume file is empty".to_string()));
    }
    if file.data.len() > MAX_RESUME_BYTES {
        return Err(AppError::Validation(
            "Resume exceeds the 5 MB limit".to_string(),
        ));
    }
    Ok(())
}

/// Uploads a resume under a key chosen by the caller.
pub async fn store_resume(
    s3: &S3Client,
    bucket: &str,
    key: &str,
    file: &ResumeFile,
) -> Result<(), AppError> {
    s3.put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(file.data.clone()))
        .content_type(
            file.content_type
                .as_deref()
                .unwrap_or("application/octet-stream"),
        )
        .send()
        .await
        .map_err(|e| AppError::Storage(format!("S3 upload failed: {e}")))?;

    info!("Uploaded resume to s3://{}/{}", bucket, key);
    Ok(())
}

/// Best-effort removal of an object whose database row never landed.
pub async fn discard_resume(s3: &S3Client, bucket: &str, key: &str) {
    match s3.delete_object().bucket(bucket).key(key).send().await {
        Ok(_) => info!("Removed orphaned resume s3://{}/{}", bucket, key),
        Err(e) => warn!("Could not remove orphaned resume s3://{bucket}/{key}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_sanitize_strips_paths_and_odd_characters() {
        assert_eq!(sanitize_file_name("C:\\Users\\me\\My CV (1).pdf"), "My_CV__1_.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name(".."), "resume");
        assert_eq!(sanitize_file_name(""), "resume");
    }

    #[test]
    fn test_resume_key_is_scoped_to_candidate() {
        let candidate = Uuid::new_v4();
        let key = resume_key(candidate, "cv.pdf");
        assert!(key.starts_with(&format!("resumes/{candidate}/")));
        assert!(key.ends_with("-cv.pdf"));
    }

    #[test]
    fn test_size_limits() {
        let file = |len: usize| ResumeFile {
            file_name: "cv.pdf".into(),
            content_type: None,
            data: Bytes::from(vec![0u8; len]),
        };
        assert!(check_size(&file(0)).is_err());
        assert!(check_size(&file(1024)).is_ok());
        assert!(check_size(&file(MAX_RESUME_BYTES + 1)).is_err());
    }

    fn unreachable_s3() -> S3Client {
        use aws_sdk_s3::config::{retry::RetryConfig, BehaviorVersion, Credentials, Region};

        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("minio", "minio123", None, None, "test"))
            .endpoint_url("http://127.0.0.1:1")
            .force_path_style(true)
            .retry_config(RetryConfig::disabled())
            .build();
        S3Client::from_conf(config)
    }

    #[tokio::test]
    async fn test_failed_upload_is_a_storage_error_and_discard_never_fails() {
        let s3 = unreachable_s3();
        let file = ResumeFile {
            file_name: "cv.pdf".into(),
            content_type: Some("application/pdf".into()),
            data: Bytes::from_static(b"%PDF-1.4"),
        };
        let key = resume_key(Uuid::new_v4(), &file.file_name);
        assert!(matches!(
            store_resume(&s3, "resumes", &key, &file).await,
            Err(AppError::Storage(_))
        ));
        discard_resume(&s3, "resumes", &key).await;
    }
}
