//! Installation of the UDLF binary and its default config
//!
//! The binary is not bundled. On first use the platform archive is downloaded
//! into the install dir (`~/.udlf` by default) and unpacked, leaving
//! `bin/udlf` and `bin/config.ini` behind.
//!
//! # Archive formats
//! The download URL does not name the format, so it is detected from the
//! first bytes of the file: gzip means a tarball, `PK` means zip.

use std::env;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::{debug, info, warn};

use crate::error::{Result, UdlfError};

const DOWNLOAD_ATTEMPTS: usize = 2;

/// Operating systems the UDLF binary is published for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Windows,
}

impl Platform {
    /// Platform of the running build
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Linux
        }
    }

    /// Default archive URL for this platform
    pub fn download_url(&self) -> &'static str {
        match self {
            Self::Linux => "http://udlf_linux.lucasvalem.com",
            Self::Windows => "http://udlf_windows.lucasvalem.com",
        }
    }

    /// File name of the binary inside `bin/`
    pub fn binary_name(&self) -> &'static str {
        match self {
            Self::Linux => "udlf",
            Self::Windows => "udlf.exe",
        }
    }
}

/// Resolved locations of an UDLF installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    install_dir: PathBuf,
    binary_path: PathBuf,
    config_path: PathBuf,
    download_url: String,
}

impl Installation {
    /// Standard layout under `install_dir`
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        let install_dir = install_dir.into();
        let platform = Platform::current();
        let bin_dir = install_dir.join("bin");
        Self {
            binary_path: bin_dir.join(platform.binary_name()),
            config_path: bin_dir.join("config.ini"),
            download_url: platform.download_url().to_string(),
            install_dir,
        }
    }

    /// `~/.udlf`
    pub fn default_dir() -> Result<PathBuf> {
        env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".udlf"))
            .ok_or_else(|| UdlfError::install("HOME is not set, cannot locate ~/.udlf"))
    }

    /// Use a binary at a custom location
    pub fn with_binary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary_path = path.into();
        self
    }

    /// Use a config at a custom location
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    pub fn with_download_url(mut self, url: impl Into<String>) -> Self {
        self.download_url = url.into();
        self
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn download_url(&self) -> &str {
        &self.download_url
    }

    /// Where the archive is saved before extraction
    pub fn archive_path(&self) -> PathBuf {
        self.install_dir.join("udlf_bin.archive")
    }

    fn binary_dir(&self) -> &Path {
        self.binary_path.parent().unwrap_or(&self.install_dir)
    }

    /// Captured stdout/stderr of the last run
    pub fn run_log_path(&self) -> PathBuf {
        self.binary_dir().join("log_out.txt")
    }

    /// Config written for runs started from an in-memory config
    pub fn generated_config_path(&self) -> PathBuf {
        self.binary_dir().join("run_created_config.ini")
    }

    pub fn is_installed(&self) -> bool {
        self.binary_path.is_file() && self.config_path.is_file()
    }

    /// Download and unpack the binary unless it and the config already exist
    pub fn ensure_installed(&self) -> Result<()> {
        if self.is_installed() {
            debug!("UDLF found at {}", self.binary_path.display());
            return Ok(());
        }

        info!(
            "Installing UDLF into {} from {}",
            self.install_dir.display(),
            self.download_url
        );
        fs::create_dir_all(&self.install_dir)?;
        let archive = self.archive_path();
        download(&self.download_url, &archive)?;
        extract_archive(&archive, &self.install_dir)?;
        if let Err(e) = fs::remove_file(&archive) {
            debug!("Could not remove {}: {}", archive.display(), e);
        }

        if !self.is_installed() {
            return Err(UdlfError::install(format!(
                "Archive from {} did not contain {} and {}",
                self.download_url,
                self.binary_path.display(),
                self.config_path.display()
            )));
        }
        make_executable(&self.binary_path)?;
        info!("UDLF installed at {}", self.binary_path.display());
        Ok(())
    }
}

/// Fetch `url` into `dest`, retrying once
pub fn download(url: &str, dest: &Path) -> Result<()> {
    let mut last_error = String::new();
    for attempt in 1..=DOWNLOAD_ATTEMPTS {
        match download_once(url, dest) {
            Ok(bytes) => {
                debug!("Downloaded {} bytes to {}", bytes, dest.display());
                return Ok(());
            }
            Err(e) => {
                warn!("Download attempt {} of {} failed: {}", attempt, url, e);
                last_error = e.to_string();
            }
        }
    }
    Err(UdlfError::download(format!(
        "Could not download {}: {}",
        url, last_error
    )))
}

fn download_once(url: &str, dest: &Path) -> Result<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| UdlfError::download(e.to_string()))?;
    let mut file = File::create(dest)?;
    response
        .copy_to(&mut file)
        .map_err(|e| UdlfError::download(e.to_string()))
}

/// Compression detected from the first bytes of an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    Zip,
}

/// Detect the archive format from its magic bytes
pub fn detect_archive(path: &Path) -> Result<ArchiveKind> {
    let mut magic = [0u8; 2];
    File::open(path)?.read_exact(&mut magic).map_err(|_| {
        UdlfError::install(format!("{} is too short to be an archive", path.display()))
    })?;
    match magic {
        [0x1f, 0x8b] => Ok(ArchiveKind::TarGz),
        [b'P', b'K'] => Ok(ArchiveKind::Zip),
        _ => Err(UdlfError::install(format!(
            "{} is neither a tar.gz nor a zip archive",
            path.display()
        ))),
    }
}

/// Unpack a tar.gz or zip archive into `dest`
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let kind = detect_archive(archive)?;
    debug!("Extracting {:?} archive {}", kind, archive.display());
    let file = BufReader::new(File::open(archive)?);
    match kind {
        ArchiveKind::TarGz => tar::Archive::new(GzDecoder::new(file))
            .unpack(dest)
            .map_err(|e| UdlfError::install(format!("Failed to unpack tarball: {}", e))),
        ArchiveKind::Zip => zip::ZipArchive::new(file)
            .and_then(|mut zip| zip.extract(dest))
            .map_err(|e| UdlfError::install(format!("Failed to unpack zip: {}", e))),
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
