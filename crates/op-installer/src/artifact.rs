//! Agent artifact naming and retrieval.
//!
//! Naming is pure and format-aware. Retrieval goes through
//! [`ArtifactFetcher`]; [`HttpArtifactFetcher`] prefers a local build,
//! then the download cache, then the artifacts server.

use std::path::{Path, PathBuf};

use op_common::error::{OpError, Result};
use sha2::{Digest, Sha512};

/// Inputs that identify one published artifact file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName<'a> {
    /// Artifact name, e.g. `elastic-agent`.
    pub artifact: &'a str,
    /// Version to fetch.
    pub version: &'a str,
    /// Target operating system, e.g. `linux`.
    pub os: &'a str,
    /// Target architecture as the package format spells it.
    pub arch: &'a str,
    /// File extension without the leading dot.
    pub extension: &'a str,
    /// Whether this is the container image flavour.
    pub docker: bool,
    /// Whether to force a `-SNAPSHOT` version suffix.
    pub snapshot: bool,
}

/// Builds the published file name of an artifact.
///
/// `rpm` and `deb` packages carry no OS segment; everything else is
/// `{artifact}-{version}-{os}-{arch}[.docker].{extension}`.
#[must_use]
pub fn build_artifact_name(name: &ArtifactName<'_>) -> String {
    let version = if name.snapshot && !name.version.ends_with("-SNAPSHOT") {
        format!("{}-SNAPSHOT", name.version)
    } else {
        name.version.to_string()
    };
    let extension = name.extension.to_ascii_lowercase();

    match extension.as_str() {
        "rpm" | "deb" => format!("{}-{version}-{}.{extension}", name.artifact, name.arch),
        _ => {
            let docker = if name.docker { ".docker" } else { "" };
            format!(
                "{}-{version}-{}-{}{docker}.{extension}",
                name.artifact, name.os, name.arch
            )
        }
    }
}

/// Host architecture in the spelling most packages use (`x86_64`/`arm64`).
#[must_use]
pub const fn architecture() -> &'static str {
    if cfg!(target_arch = "aarch64") {
        "arm64"
    } else {
        "x86_64"
    }
}

/// Host architecture in Debian spelling (`amd64`/`arm64`).
#[must_use]
pub const fn debian_architecture() -> &'static str {
    if cfg!(target_arch = "aarch64") {
        "arm64"
    } else {
        "amd64"
    }
}

/// A request for one artifact file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRequest {
    /// Artifact name, used as the download directory.
    pub artifact: String,
    /// File name for the requested version.
    pub file_name: String,
    /// File name for the fallback version, tried once if the first is missing.
    pub fallback_file_name: Option<String>,
}

/// Supplies locally staged package binaries.
pub trait ArtifactFetcher: Send + Sync {
    /// Returns a local path holding the requested artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact cannot be found or downloaded.
    fn fetch_binary(&self, request: &ArtifactRequest) -> Result<PathBuf>;
}

/// Fetches artifacts from a local build, the download cache, or over HTTP.
#[derive(Debug, Clone)]
pub struct HttpArtifactFetcher {
    base_url: String,
    downloads_dir: PathBuf,
    local_path: Option<PathBuf>,
}

impl HttpArtifactFetcher {
    /// Creates a fetcher downloading from `base_url` into `downloads_dir`.
    pub fn new(base_url: impl Into<String>, downloads_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_url: base_url.into(),
            downloads_dir: downloads_dir.into(),
            local_path: None,
        }
    }

    /// Uses the build distributions of a local checkout instead of downloading.
    #[must_use]
    pub fn with_local_path(mut self, local_path: Option<PathBuf>) -> Self {
        self.local_path = local_path;
        self
    }

    fn local_candidate(local: &Path, request: &ArtifactRequest) -> PathBuf {
        local
            .join("x-pack")
            .join(&request.artifact)
            .join("build")
            .join("distributions")
            .join(&request.file_name)
    }

    fn download(&self, artifact: &str, file_name: &str) -> Result<Option<PathBuf>> {
        let dest = self.downloads_dir.join(file_name);
        if cached_artifact(&dest)? {
            tracing::debug!(path = %dest.display(), "artifact already downloaded");
            return Ok(Some(dest));
        }

        let url = format!("{}/{artifact}/{file_name}", self.base_url);
        tracing::info!(url = %url, "downloading artifact");
        let response = reqwest::blocking::get(&url).map_err(|e| OpError::Download {
            url: url.clone(),
            message: e.to_string(),
        })?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(OpError::Download {
                message: format!("HTTP {}", response.status()),
                url,
            });
        }
        let bytes = response.bytes().map_err(|e| OpError::Download {
            url: url.clone(),
            message: format!("failed to read response body: {e}"),
        })?;

        let checksum = fetch_checksum(&url)?;
        if let Some(expected) = &checksum {
            let actual = sha512_hex(&bytes);
            if &actual != expected {
                return Err(OpError::Download {
                    url,
                    message: format!("sha512 mismatch: expected {expected}, got {actual}"),
                });
            }
        }

        std::fs::create_dir_all(&self.downloads_dir)
            .map_err(|e| OpError::io(&self.downloads_dir, e))?;
        write_atomically(&dest, &bytes)?;
        if let Some(expected) = checksum {
            write_atomically(&sidecar_path(&dest, "sha512"), expected.as_bytes())?;
        }
        Ok(Some(dest))
    }
}

impl ArtifactFetcher for HttpArtifactFetcher {
    fn fetch_binary(&self, request: &ArtifactRequest) -> Result<PathBuf> {
        if let Some(local) = &self.local_path {
            let candidate = Self::local_candidate(local, request);
            tracing::debug!(path = %candidate.display(), "using local build");
            return if candidate.is_file() {
                Ok(candidate)
            } else {
                Err(OpError::NotFound {
                    kind: "local artifact",
                    name: candidate.to_string_lossy().into_owned(),
                })
            };
        }

        if let Some(path) = self.download(&request.artifact, &request.file_name)? {
            return Ok(path);
        }
        if let Some(fallback) = &request.fallback_file_name {
            tracing::warn!(file = %request.file_name, fallback = %fallback, "artifact not published, trying fallback version");
            if let Some(path) = self.download(&request.artifact, fallback)? {
                return Ok(path);
            }
        }
        Err(OpError::NotFound {
            kind: "artifact",
            name: request.file_name.clone(),
        })
    }
}

/// Downloads `{url}.sha512`. Only a 404 means no checksum is published;
/// any other failure is an error.
fn fetch_checksum(url: &str) -> Result<Option<String>> {
    let sha_url = format!("{url}.sha512");
    let download_error = |message: String| OpError::Download {
        url: sha_url.clone(),
        message,
    };

    let response = reqwest::blocking::get(&sha_url).map_err(|e| download_error(e.to_string()))?;
    if !checksum_published(response.status()).map_err(download_error)? {
        tracing::debug!(url = %sha_url, "no checksum published");
        return Ok(None);
    }
    let body = response
        .text()
        .map_err(|e| download_error(format!("failed to read response body: {e}")))?;
    parse_checksum(&body)
        .map(Some)
        .ok_or_else(|| download_error("empty checksum file".into()))
}

fn checksum_published(status: reqwest::StatusCode) -> std::result::Result<bool, String> {
    if status == reqwest::StatusCode::NOT_FOUND {
        Ok(false)
    } else if status.is_success() {
        Ok(true)
    } else {
        Err(format!("HTTP {status}"))
    }
}

/// `<dest>.<suffix>`, keeping the full file name (`a.tar.gz.sha512`).
fn sidecar_path(dest: &Path, suffix: &str) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    dest.with_file_name(name)
}

/// Writes to a temporary sibling, then renames over `dest`, so readers
/// never see a partial file.
fn write_atomically(dest: &Path, bytes: &[u8]) -> Result<()> {
    let temp_path = sidecar_path(dest, "part");
    std::fs::write(&temp_path, bytes).map_err(|e| OpError::io(&temp_path, e))?;
    std::fs::rename(&temp_path, dest).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        OpError::io(dest, e)
    })
}

/// Whether `dest` holds a usable download. A cached file whose recorded
/// checksum no longer matches is removed so it gets fetched again.
fn cached_artifact(dest: &Path) -> Result<bool> {
    if !dest.is_file() {
        return Ok(false);
    }
    let checksum_file = sidecar_path(dest, "sha512");
    let Ok(recorded) = std::fs::read_to_string(&checksum_file) else {
        return Ok(true);
    };
    let Some(expected) = parse_checksum(&recorded) else {
        return Ok(true);
    };

    let bytes = std::fs::read(dest).map_err(|e| OpError::io(dest, e))?;
    if sha512_hex(&bytes) == expected {
        return Ok(true);
    }
    tracing::warn!(path = %dest.display(), "cached artifact does not match its checksum, downloading again");
    std::fs::remove_file(dest).map_err(|e| OpError::io(dest, e))?;
    let _ = std::fs::remove_file(&checksum_file);
    Ok(false)
}

/// Extracts the digest from a `<hex>  <file name>` checksum line.
fn parse_checksum(content: &str) -> Option<String> {
    content
        .split_whitespace()
        .next()
        .map(str::to_ascii_lowercase)
}

fn sha512_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha512::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name<'a>(extension: &'a str, arch: &'a str) -> ArtifactName<'a> {
        ArtifactName {
            artifact: "elastic-agent",
            version: "7.12.0",
            os: "linux",
            arch,
            extension,
            docker: false,
            snapshot: false,
        }
    }

    #[test]
    fn tar_name_includes_os() {
        assert_eq!(
            build_artifact_name(&name("tar.gz", "x86_64")),
            "elastic-agent-7.12.0-linux-x86_64.tar.gz"
        );
    }

    #[test]
    fn rpm_and_deb_names_omit_os() {
        assert_eq!(build_artifact_name(&name("rpm", "x86_64")), "elastic-agent-7.12.0-x86_64.rpm");
        assert_eq!(build_artifact_name(&name("DEB", "amd64")), "elastic-agent-7.12.0-amd64.deb");
    }

    #[test]
    fn docker_name_has_docker_marker() {
        let mut n = name("tar.gz", "amd64");
        n.docker = true;
        assert_eq!(
            build_artifact_name(&n),
            "elastic-agent-7.12.0-linux-amd64.docker.tar.gz"
        );
    }

    #[test]
    fn snapshot_suffix_is_added_once() {
        let mut n = name("zip", "x86_64");
        n.os = "windows";
        n.snapshot = true;
        assert_eq!(
            build_artifact_name(&n),
            "elastic-agent-7.12.0-SNAPSHOT-windows-x86_64.zip"
        );
        n.version = "8.0.0-SNAPSHOT";
        assert_eq!(
            build_artifact_name(&n),
            "elastic-agent-8.0.0-SNAPSHOT-windows-x86_64.zip"
        );
    }

    #[test]
    fn checksum_line_is_parsed() {
        assert_eq!(
            parse_checksum("ABCDEF  elastic-agent-7.12.0-x86_64.rpm\n").as_deref(),
            Some("abcdef")
        );
        assert_eq!(parse_checksum("   "), None);
    }

    #[test]
    fn sha512_of_empty_input() {
        assert!(sha512_hex(b"").starts_with("cf83e1357eefb8bd"));
    }

    fn request(file: &str) -> ArtifactRequest {
        ArtifactRequest {
            artifact: "elastic-agent".into(),
            file_name: file.into(),
            fallback_file_name: None,
        }
    }

    #[test]
    fn local_build_is_preferred() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dist = dir.path().join("x-pack/elastic-agent/build/distributions");
        std::fs::create_dir_all(&dist).expect("mkdir");
        std::fs::write(dist.join("agent.rpm"), "rpm").expect("write");

        let fetcher = HttpArtifactFetcher::new("http://unused.invalid", dir.path().join("dl"))
            .with_local_path(Some(dir.path().to_path_buf()));
        let path = fetcher.fetch_binary(&request("agent.rpm")).expect("local");
        assert_eq!(path, dist.join("agent.rpm"));
    }

    #[test]
    fn missing_local_build_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fetcher = HttpArtifactFetcher::new("http://unused.invalid", dir.path().join("dl"))
            .with_local_path(Some(dir.path().to_path_buf()));
        let err = fetcher.fetch_binary(&request("agent.rpm")).expect_err("missing");
        assert!(matches!(err, OpError::NotFound { kind: "local artifact", .. }));
    }

    #[test]
    fn corrupt_cached_download_is_discarded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dest = dir.path().join("agent.tar.gz");
        std::fs::write(&dest, "trunc").expect("write");
        std::fs::write(
            dir.path().join("agent.tar.gz.sha512"),
            format!("{}  agent.tar.gz\n", sha512_hex(b"complete archive")),
        )
        .expect("write checksum");

        assert!(!cached_artifact(&dest).expect("check"));
        assert!(!dest.exists());
        assert!(!dir.path().join("agent.tar.gz.sha512").exists());
    }

    #[test]
    fn verified_cached_download_is_kept() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dest = dir.path().join("agent.rpm");
        std::fs::write(&dest, "complete").expect("write");
        std::fs::write(dir.path().join("agent.rpm.sha512"), sha512_hex(b"complete"))
            .expect("write checksum");
        assert!(cached_artifact(&dest).expect("check"));
    }

    #[test]
    fn atomic_write_leaves_no_partial_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dest = dir.path().join("agent.tar.gz");
        write_atomically(&dest, b"payload").expect("write");
        assert_eq!(std::fs::read(&dest).expect("read"), b"payload");
        assert!(!dir.path().join("agent.tar.gz.part").exists());
    }

    #[test]
    fn only_not_found_means_no_checksum() {
        assert_eq!(checksum_published(reqwest::StatusCode::NOT_FOUND), Ok(false));
        assert_eq!(checksum_published(reqwest::StatusCode::OK), Ok(true));
        assert!(checksum_published(reqwest::StatusCode::INTERNAL_SERVER_ERROR).is_err());
        assert!(checksum_published(reqwest::StatusCode::FORBIDDEN).is_err());
    }

    #[test]
    fn unreachable_checksum_server_is_an_error() {
        let err = fetch_checksum("http://127.0.0.1:9/agent.rpm").expect_err("connection refused");
        assert!(matches!(err, OpError::Download { ref url, .. } if url.ends_with(".sha512")));
    }

    #[test]
    fn cached_download_is_reused() {
        let dir = tempfile::tempdir().expect("tempdir");
        let downloads = dir.path().join("dl");
        std::fs::create_dir_all(&downloads).expect("mkdir");
        std::fs::write(downloads.join("agent.deb"), "deb").expect("write");

        let fetcher = HttpArtifactFetcher::new("http://unused.invalid", &downloads);
        let path = fetcher.fetch_binary(&request("agent.deb")).expect("cached");
        assert_eq!(path, downloads.join("agent.deb"));
    }
}
