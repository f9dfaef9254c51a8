use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::ServiceError;

/// Subdirectory for product instruction manuals, one folder per product
const INSTRUCTIONS_DIR: &str = "product_instructions";
/// Flat subdirectory for variant images
const VARIANT_IMAGES_DIR: &str = "product_variants";

/// Filesystem-backed store for uploaded media.
///
/// Files land under the configured media root and are addressed by a
/// relative path which is what gets persisted on the owning entity and
/// served back under `/media/{path}`.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(cfg.media_root.clone())
    }

    /// The media root directory served under `/media`
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path for a stored relative media path
    pub fn absolute_path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Stores an instruction manual for a product.
    ///
    /// Returns the relative media path, e.g.
    /// `product_instructions/product_3/manual.pdf`.
    pub async fn store_instruction_manual(
        &self,
        product_id: i64,
        filename: &str,
        bytes: &[u8],
    ) -> Result<String, ServiceError> {
        let safe_name = sanitize_filename(filename);
        let dir = self
            .root
            .join(INSTRUCTIONS_DIR)
            .join(format!("product_{}", product_id));
        let final_name = self.write_unique(&dir, &safe_name, bytes).await?;

        Ok(format!(
            "{}/product_{}/{}",
            INSTRUCTIONS_DIR, product_id, final_name
        ))
    }

    /// Stores a variant image. Returns the relative media path, e.g.
    /// `product_variants/front.png`.
    pub async fn store_variant_image(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> Result<String, ServiceError> {
        let safe_name = sanitize_filename(filename);
        let dir = self.root.join(VARIANT_IMAGES_DIR);
        let final_name = self.write_unique(&dir, &safe_name, bytes).await?;

        Ok(format!("{}/{}", VARIANT_IMAGES_DIR, final_name))
    }

    /// Removes a stored file if it exists. Missing files are not an error;
    /// the database row may outlive its media.
    pub async fn remove(&self, relative: &str) -> Result<(), ServiceError> {
        let path = self.absolute_path(relative);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ServiceError::IoError(e)),
        }
    }

    async fn write_unique(
        &self,
        dir: &Path,
        filename: &str,
        bytes: &[u8],
    ) -> Result<String, ServiceError> {
        fs::create_dir_all(dir).await?;

        let mut final_name = filename.to_string();
        if fs::try_exists(dir.join(&final_name)).await? {
            final_name = dedupe_filename(filename);
        }

        let target = dir.join(&final_name);
        fs::write(&target, bytes).await?;
        info!(path = %target.display(), size = bytes.len(), "Stored media file");

        Ok(final_name)
    }
}

/// Reduces an arbitrary client-supplied filename to a safe single path
/// segment: the last component only, restricted to `[A-Za-z0-9._-]`,
/// with leading dots stripped.
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name);

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

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Appends a short random suffix before the extension to avoid
/// clobbering an existing upload with the same name.
fn dedupe_filename(filename: &str) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_{}.{}", stem, suffix, ext),
        _ => format!("{}_{}", filename, suffix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case("manual.pdf", "manual.pdf")]
    #[case("front-01_v2.png", "front-01_v2.png")]
    #[case("../../etc/passwd", "passwd")]
    #[case("C:\\Users\\x\\doc.pdf", "doc.pdf")]
    #[case("my file (1).pdf", "my_file__1_.pdf")]
    #[case(".hidden", "hidden")]
    #[case("...", "file")]
    #[case("", "file")]
    fn sanitize_reduces_names_to_safe_segments(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize_filename(input), expected);
    }

    #[test]
    fn dedupe_keeps_extension() {
        let renamed = dedupe_filename("manual.pdf");
        assert!(renamed.starts_with("manual_"));
        assert!(renamed.ends_with(".pdf"));
        assert_ne!(renamed, "manual.pdf");
    }

    #[tokio::test]
    async fn stores_instruction_manual_under_product_directory() {
        let tmp = TempDir::new().unwrap();
        let store = MediaStore::new(tmp.path());

        let rel = store
            .store_instruction_manual(3, "manual.pdf", b"pdf-bytes")
            .await
            .unwrap();

        assert_eq!(rel, "product_instructions/product_3/manual.pdf");
        let bytes = fs::read(store.absolute_path(&rel)).await.unwrap();
        assert_eq!(bytes, b"pdf-bytes");
    }

    #[tokio::test]
    async fn second_upload_with_same_name_is_deduped() {
        let tmp = TempDir::new().unwrap();
        let store = MediaStore::new(tmp.path());

        let first = store.store_variant_image("front.png", b"one").await.unwrap();
        let second = store.store_variant_image("front.png", b"two").await.unwrap();

        assert_eq!(first, "product_variants/front.png");
        assert_ne!(first, second);
        assert!(second.starts_with("product_variants/front_"));
        assert!(second.ends_with(".png"));

        let kept = fs::read(store.absolute_path(&first)).await.unwrap();
        assert_eq!(kept, b"one");
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = MediaStore::new(tmp.path());

        let rel = store.store_variant_image("gone.png", b"x").await.unwrap();
        store.remove(&rel).await.unwrap();
        store.remove(&rel).await.unwrap();
        assert!(!store.absolute_path(&rel).exists());
    }
}
