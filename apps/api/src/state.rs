use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::auth::AuthConfig;
use crate::config::Config;
use crate::recruitment::resume::ResumeParser;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Resume object storage (S3 or MinIO).
    pub s3: S3Client,
    pub config: Config,
    pub auth: AuthConfig,
    /// Keyword parser by default; remote when `RESUME_PARSER_URL` is set.
    pub resume_parser: Arc<dyn ResumeParser>,
}
