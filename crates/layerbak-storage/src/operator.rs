//! OpenDAL Operator factory for layerbak storage backends

use std::path::PathBuf;

use anyhow::{Context, Result};
use layerbak_core::config::{StorageBackend, StorageConfig};
use opendal::Operator;

/// Build an operator for the configured backend.
///
/// S3 credentials are not part of the config file; OpenDAL picks them up
/// from the usual `AWS_*` environment variables and profile files.
/// If `enforce_tls` is true and the S3 endpoint uses HTTP, this returns an
/// error. Otherwise a warning is logged for non-HTTPS endpoints.
pub fn build_operator(cfg: &StorageConfig) -> Result<Operator> {
    let op = match cfg.backend {
        StorageBackend::Memory => Operator::new(opendal::services::Memory::default())
            .context("creating OpenDAL memory operator")?
            .finish(),

        StorageBackend::Fs => {
            let root = expand_tilde(&cfg.root);
            let builder = opendal::services::Fs::default().root(&root.to_string_lossy());
            Operator::new(builder)
                .with_context(|| format!("creating OpenDAL fs operator at {}", root.display()))?
                .layer(opendal::layers::LoggingLayer::default())
                .finish()
        }

        StorageBackend::S3 => {
            check_endpoint(cfg)?;
            // opendal 0.55: consuming builder; path-style addressing is the default
            let mut builder = opendal::services::S3::default()
                .bucket(&cfg.bucket)
                .region(&cfg.region)
                .root(remote_root(cfg));
            if !cfg.endpoint.is_empty() {
                builder = builder.endpoint(&cfg.endpoint);
            }
            with_remote_layers(
                Operator::new(builder)
                    .context("creating OpenDAL S3 operator")?
                    .finish(),
            )
        }

        StorageBackend::Gcs => {
            let mut builder = opendal::services::Gcs::default()
                .bucket(&cfg.bucket)
                .root(remote_root(cfg));
            if let Some(path) = &cfg.credential_path {
                let path = expand_tilde(&path.to_string_lossy());
                builder = builder.credential_path(&path.to_string_lossy());
            }
            with_remote_layers(
                Operator::new(builder)
                    .context("creating OpenDAL GCS operator")?
                    .finish(),
            )
        }
    };

    tracing::debug!(backend = ?cfg.backend, root = %cfg.root, "storage operator ready");
    Ok(op)
}

fn with_remote_layers(op: Operator) -> Operator {
    op.layer(opendal::layers::LoggingLayer::default())
        .layer(
            opendal::layers::RetryLayer::new()
                .with_max_times(5)
                .with_jitter(),
        )
}

/// Key root inside a bucket. The default root is a local path, which maps to
/// the bucket root.
fn remote_root(cfg: &StorageConfig) -> &str {
    if cfg.root.starts_with('~') {
        "/"
    } else {
        &cfg.root
    }
}

fn check_endpoint(cfg: &StorageConfig) -> Result<()> {
    if cfg.bucket.is_empty() {
        anyhow::bail!("storage.bucket must be set for the s3 backend");
    }
    if cfg.endpoint.starts_with("http://") {
        if cfg.enforce_tls {
            anyhow::bail!(
                "S3 endpoint uses plaintext HTTP ({}), but enforce_tls is enabled. \
                 Use an HTTPS endpoint or set storage.enforce_tls = false for local development.",
                cfg.endpoint
            );
        }
        tracing::warn!(
            endpoint = %cfg.endpoint,
            "S3 endpoint uses plaintext HTTP. Set storage.enforce_tls = true and use HTTPS in production."
        );
    }
    Ok(())
}

/// Expand a leading `~/` to `$HOME`.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_memory_operator() {
        let cfg = StorageConfig {
            backend: StorageBackend::Memory,
            ..Default::default()
        };
        assert!(build_operator(&cfg).is_ok());
    }

    #[test]
    fn test_build_fs_operator() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = StorageConfig {
            backend: StorageBackend::Fs,
            root: dir.path().to_string_lossy().into_owned(),
            ..Default::default()
        };
        assert!(build_operator(&cfg).is_ok());
    }

    #[test]
    fn test_s3_http_warning() {
        let cfg = StorageConfig {
            backend: StorageBackend::S3,
            bucket: "backups".into(),
            endpoint: "http://localhost:8333".into(),
            enforce_tls: false,
            ..Default::default()
        };
        assert!(build_operator(&cfg).is_ok());
    }

    #[test]
    fn test_s3_http_enforce_tls() {
        let cfg = StorageConfig {
            backend: StorageBackend::S3,
            bucket: "backups".into(),
            endpoint: "http://insecure:8333".into(),
            enforce_tls: true,
            ..Default::default()
        };
        let err = build_operator(&cfg).unwrap_err();
        assert!(err.to_string().contains("enforce_tls"));
    }

    #[test]
    fn test_s3_requires_bucket() {
        let cfg = StorageConfig {
            backend: StorageBackend::S3,
            endpoint: "https://s3.example.com".into(),
            ..Default::default()
        };
        assert!(build_operator(&cfg).is_err());
    }

    #[test]
    fn test_expand_tilde() {
        let home = std::env::var("HOME").unwrap();
        assert_eq!(expand_tilde("~/backups"), PathBuf::from(home).join("backups"));
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_tilde("rel/~/x"), PathBuf::from("rel/~/x"));
    }
}
