//! Generated documents on the local filesystem.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

pub const INVOICES: &str = "invoices";
pub const RECEIPTS: &str = "receipts";

#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

fn check_segment(segment: &str) -> Result<()> {
    if segment.is_empty()
        || segment == "."
        || segment.contains("..")
        || segment.contains('/')
        || segment.contains('\\')
    {
        return Err(Error::InvalidParam(format!(
            "invalid document name {:?}",
            segment
        )));
    }
    Ok(())
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` to `namespace/file_name`, returns the relative path.
    ///
    /// The file is written next to its final name and renamed into place, readers
    /// never see a partial document.
    pub async fn save(&self, namespace: &str, file_name: &str, bytes: &[u8]) -> Result<String> {
        check_segment(namespace)?;
        check_segment(file_name)?;
        let dir = self.root.join(namespace);
        fs::create_dir_all(&dir).await?;

        let tmp = dir.join(format!(".{}.tmp", file_name));
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, dir.join(file_name)).await?;

        let path = format!("{}/{}", namespace, file_name);
        debug!(path = %path, size = bytes.len(), "document saved");
        Ok(path)
    }

    /// Read a document by the relative path `save` returned.
    pub async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let (namespace, file_name) = path
            .split_once('/')
            .ok_or_else(|| Error::InvalidParam(format!("invalid document path {:?}", path)))?;
        check_segment(namespace)?;
        check_segment(file_name)?;
        Ok(fs::read(self.root.join(namespace).join(file_name)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[tokio::test]
    async fn save_and_read() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = DocumentStore::new(dir.path());

        let path = store.save(INVOICES, "receipt_TR25020001.pdf", b"one").await?;
        assert_eq!(path, "invoices/receipt_TR25020001.pdf");
        assert_eq!(store.read(&path).await?, b"one");
        assert!(dir.path().join("invoices/receipt_TR25020001.pdf").is_file());
        assert!(!dir.path().join("invoices/.receipt_TR25020001.pdf.tmp").exists());

        // overwrite
        store.save(INVOICES, "receipt_TR25020001.pdf", b"two").await?;
        assert_eq!(store.read(&path).await?, b"two");

        assert!(matches!(
            store.read("receipts/missing.pdf").await,
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound
        ));
        Ok(())
    }

    #[tokio::test]
    async fn reject_traversal() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = DocumentStore::new(dir.path());
        for (ns, name) in [
            ("invoices", "../x.pdf"),
            ("invoices", "a/b.pdf"),
            ("..", "x.pdf"),
            ("invoices", ""),
            ("invoices", "a\\b.pdf"),
        ] {
            assert!(matches!(
                store.save(ns, name, b"x").await,
                Err(Error::InvalidParam(_))
            ));
        }
        assert!(matches!(
            store.read("../../etc/passwd").await,
            Err(Error::InvalidParam(_))
        ));
        assert!(matches!(
            store.read("no_namespace.pdf").await,
            Err(Error::InvalidParam(_))
        ));
        Ok(())
    }
}
