//! Stage 01: dataset acquisition.
//!
//! Downloads the remote dataset archive and extracts it into the working
//! directory. Download must complete before extraction; neither operation
//! retries, and a partial download is not resumable. A failed run starts
//! over from scratch.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::artifacts::DataIngestionArtifact;
use crate::config::DataIngestionConfig;
use crate::error::{Result, SkinScanError};
use crate::utils::ensure_dir;

/// Data ingestion stage runner.
pub struct DataIngestion {
    config: DataIngestionConfig,
}

impl DataIngestion {
    pub fn new(config: DataIngestionConfig) -> Self {
        Self { config }
    }

    /// Resolve the configured remote file id into a download URL.
    fn download_url(&self) -> String {
        format!("https://drive.google.com/uc?id={}", self.config.remote_file_id)
    }

    /// Download the dataset archive to the configured local path.
    ///
    /// Creates parent directories as needed. Any network or IO error
    /// propagates unchanged; there is no retry.
    pub fn download_archive(&self) -> Result<PathBuf> {
        let url = self.download_url();
        let output_path = &self.config.local_archive_path;

        if let Some(parent) = output_path.parent() {
            ensure_dir(parent)?;
        }

        info!("Downloading dataset archive from: {url}");
        info!("Saving to: {}", output_path.display());

        let response = reqwest::blocking::get(&url).map_err(|source| SkinScanError::Download {
            url: url.clone(),
            source,
        })?;

        if !response.status().is_success() {
            return Err(SkinScanError::DownloadStatus {
                url,
                status: response.status().as_u16(),
            });
        }

        let bytes = response.bytes().map_err(|source| SkinScanError::Download {
            url: url.clone(),
            source,
        })?;

        let mut file = File::create(output_path)?;
        file.write_all(&bytes)?;

        info!("Download completed ({} bytes)", bytes.len());
        Ok(output_path.clone())
    }

    /// Extract the downloaded archive into the configured unzip directory.
    ///
    /// Accepts an explicit archive path override; defaults to the configured
    /// archive path. The unzip directory is created first if absent.
    pub fn extract_archive(&self, archive_path: Option<&Path>) -> Result<PathBuf> {
        let archive_path = archive_path.unwrap_or(&self.config.local_archive_path);
        let unzip_dir = &self.config.unzip_dir;

        ensure_dir(unzip_dir)?;

        info!("Extracting: {}", archive_path.display());

        let file = File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(file).map_err(|e| SkinScanError::Archive {
            path: archive_path.to_path_buf(),
            message: e.to_string(),
        })?;
        archive.extract(unzip_dir).map_err(|e| SkinScanError::Archive {
            path: archive_path.to_path_buf(),
            message: e.to_string(),
        })?;

        info!("Extraction completed: {}", unzip_dir.display());
        Ok(unzip_dir.clone())
    }

    /// Run download + extraction and produce the stage artifact.
    pub fn initiate(&self) -> Result<DataIngestionArtifact> {
        info!("=== Stage 01: Data Ingestion started ===");

        let archive_path = self.download_archive()?;
        let unzip_dir = self.extract_archive(Some(&archive_path))?;

        info!("=== Stage 01: Data Ingestion completed ===");

        Ok(DataIngestionArtifact {
            archive_path,
            unzip_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn test_config(dir: &Path) -> DataIngestionConfig {
        DataIngestionConfig {
            root_dir: dir.to_path_buf(),
            local_archive_path: dir.join("dataset.zip"),
            unzip_dir: dir.join("extracted"),
            remote_file_id: "test-file-id".to_string(),
        }
    }

    fn write_test_zip(path: &Path) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);

        writer.add_directory("dataset/train/", options).unwrap();
        writer.start_file("dataset/train/_classes.csv", options).unwrap();
        writer.write_all(b"filename,Acne\na.jpg,1\n").unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn test_download_url_resolution() {
        let tmp = tempfile::tempdir().unwrap();
        let ingestion = DataIngestion::new(test_config(tmp.path()));
        assert_eq!(
            ingestion.download_url(),
            "https://drive.google.com/uc?id=test-file-id"
        );
    }

    #[test]
    fn test_extract_archive_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(tmp.path());
        write_test_zip(&config.local_archive_path);

        let ingestion = DataIngestion::new(config);
        let unzip_dir = ingestion.extract_archive(None).unwrap();

        let extracted = unzip_dir.join("dataset/train/_classes.csv");
        let content = std::fs::read_to_string(extracted).unwrap();
        assert!(content.starts_with("filename,Acne"));
    }

    #[test]
    fn test_extract_missing_archive_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let ingestion = DataIngestion::new(test_config(tmp.path()));
        assert!(ingestion.extract_archive(None).is_err());
    }

    #[test]
    fn test_extract_malformed_archive_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(tmp.path());
        std::fs::write(&config.local_archive_path, b"not a zip file").unwrap();

        let ingestion = DataIngestion::new(config);
        assert!(matches!(
            ingestion.extract_archive(None),
            Err(SkinScanError::Archive { .. })
        ));
    }
}
