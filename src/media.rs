//! Secure media gateway: serves user-uploaded files behind
//! authentication, independent of the console registry.
//!
//! Every request walks the same states: authenticate, resolve the
//! caller-supplied relative path against the configured root,
//! validate containment, check the target is a regular file, then
//! dispatch delivery. Containment is the core invariant: no response may
//! expose bytes from outside the root, however the relative path is
//! crafted (`..` segments, absolute-path injection, symlink escape).
//! Rejections are a uniform "not found" so probes learn nothing about
//! paths outside the root.

use std::path::{Path, PathBuf};

use anyhow::Context;

/// How file bytes reach the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// The service streams the file body itself.
    Direct,
    /// The service emits an `X-Accel-Redirect` header naming an internal
    /// path and a front-end proxy streams the bytes.
    Offload,
}

impl DeliveryMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "direct" => Some(Self::Direct),
            "offload" => Some(Self::Offload),
            _ => None,
        }
    }
}

/// Gateway configuration. The root is canonicalized once at construction;
/// delivery mode is an operator switch, never caller-controlled.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    root: PathBuf,
    delivery: DeliveryMode,
    internal_prefix: String,
}

impl MediaConfig {
    pub fn new(
        root: impl Into<PathBuf>,
        delivery: DeliveryMode,
        internal_prefix: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create media root {}", root.display()))?;
        let root = root
            .canonicalize()
            .with_context(|| format!("Failed to canonicalize media root {}", root.display()))?;
        Ok(Self {
            root,
            delivery,
            internal_prefix: internal_prefix.into(),
        })
    }

    /// Load from `OPSCONSOLE_MEDIA_ROOT`, `OPSCONSOLE_MEDIA_DELIVERY`
    /// (`direct` | `offload`) and `OPSCONSOLE_MEDIA_INTERNAL_PREFIX`.
    pub fn from_env() -> anyhow::Result<Self> {
        let root = match std::env::var("OPSCONSOLE_MEDIA_ROOT") {
            Ok(root) => PathBuf::from(root),
            Err(_) => {
                let dirs = directories::ProjectDirs::from("", "", "opsconsole")
                    .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
                dirs.data_dir().join("media")
            }
        };

        let delivery = match std::env::var("OPSCONSOLE_MEDIA_DELIVERY") {
            Ok(raw) => DeliveryMode::from_str(&raw)
                .ok_or_else(|| anyhow::anyhow!("Unknown media delivery mode `{}`", raw))?,
            Err(_) => DeliveryMode::Direct,
        };

        let internal_prefix = std::env::var("OPSCONSOLE_MEDIA_INTERNAL_PREFIX")
            .unwrap_or_else(|_| "/protected-media".to_string());

        Self::new(root, delivery, internal_prefix)
    }

    /// Direct-streaming config rooted at `root` (for testing).
    pub fn direct(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        Self::new(root, DeliveryMode::Direct, "/protected-media")
    }

    /// Offload config rooted at `root` (for testing).
    pub fn offload(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        Self::new(root, DeliveryMode::Offload, "/protected-media")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn delivery(&self) -> DeliveryMode {
        self.delivery
    }

    /// Internal path a front-end proxy serves in offload mode.
    pub fn internal_path(&self, file: &ResolvedFile) -> String {
        format!(
            "{}/{}",
            self.internal_prefix.trim_end_matches('/'),
            file.relative
        )
    }

    /// Resolve and validate a caller-supplied relative path.
    pub fn resolve(&self, relative: &str) -> MediaVerdict {
        let candidate = self.root.join(relative);

        // Canonicalization resolves `..` and symlinks; a missing target is
        // indistinguishable from a contained miss at this point.
        let resolved = match candidate.canonicalize() {
            Ok(resolved) => resolved,
            Err(_) => return MediaVerdict::NotFound,
        };

        if !resolved.starts_with(&self.root) {
            return MediaVerdict::OutsideRoot;
        }

        if !resolved.is_file() {
            return MediaVerdict::NotFound;
        }

        let rel = resolved
            .strip_prefix(&self.root)
            .expect("containment checked above");
        let relative = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let filename = resolved
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        MediaVerdict::Ok(ResolvedFile {
            absolute: resolved,
            relative,
            filename,
        })
    }
}

/// A validated, contained, regular file.
#[derive(Debug, Clone)]
pub struct ResolvedFile {
    /// Canonical absolute path, strictly inside the root.
    pub absolute: PathBuf,
    /// Path relative to the root, forward-slash separated.
    pub relative: String,
    pub filename: String,
}

impl ResolvedFile {
    pub fn content_type(&self) -> String {
        mime_guess::from_path(&self.filename)
            .first_or_octet_stream()
            .to_string()
    }

    pub fn content_disposition(&self) -> String {
        format!("inline; filename=\"{}\"", self.filename)
    }
}

/// Outcome of path resolution. `OutsideRoot` and `NotFound` both answer
/// 404 to the caller; the distinction exists only for audit logging.
#[derive(Debug)]
pub enum MediaVerdict {
    Ok(ResolvedFile),
    NotFound,
    OutsideRoot,
}
