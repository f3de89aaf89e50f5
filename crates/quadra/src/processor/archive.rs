//! Expansion of zip uploads into individual documents.

use std::io::{Cursor, Read};

use zip::ZipArchive;

use crate::error::ArchiveError;
use crate::processor::{DocumentFormat, RawDocument};
use crate::sanitize;

/// Replaces every archive in `uploads` by the documents it contains, keeping
/// upload order. Any corrupt archive fails the whole call.
pub fn expand_uploads(uploads: Vec<RawDocument>) -> Result<Vec<RawDocument>, ArchiveError> {
    let mut documents = Vec::with_capacity(uploads.len());
    for upload in uploads {
        if upload.format() == Some(DocumentFormat::Archive) {
            documents.extend(expand(&upload)?);
        } else {
            documents.push(upload);
        }
    }
    Ok(documents)
}

/// Documents inside one zip archive, in archive order. Directories, hidden
/// files and entries of unknown or archive format are skipped.
pub fn expand(archive: &RawDocument) -> Result<Vec<RawDocument>, ArchiveError> {
    let _span = tracing::info_span!(
        "archive.expand",
        archive = %sanitize::redact_name(&archive.filename)
    )
    .entered();

    let mut zip = ZipArchive::new(Cursor::new(archive.bytes.as_slice())).map_err(|e| {
        ArchiveError::Corrupt {
            name: archive.filename.clone(),
            reason: e.to_string(),
        }
    })?;

    let mut documents = Vec::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| ArchiveError::Corrupt {
            name: archive.filename.clone(),
            reason: e.to_string(),
        })?;

        let path = entry.name().to_string();
        if entry.is_dir() || path.starts_with("__MACOSX") {
            continue;
        }
        let filename = path.rsplit('/').next().unwrap_or(&path).to_string();
        if filename.is_empty() || filename.starts_with('.') {
            continue;
        }

        match DocumentFormat::detect(&filename, None) {
            None | Some(DocumentFormat::Archive) => {
                tracing::debug!(entry = %filename, "Ignoring non-document entry");
                continue;
            }
            Some(_) => {}
        }

        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| ArchiveError::ReadEntry {
                name: archive.filename.clone(),
                entry: path.clone(),
                source: e,
            })?;

        documents.push(RawDocument::new(filename, bytes));
    }

    tracing::debug!(documents = documents.len(), "Archive expanded");
    Ok(documents)
}

#[cfg(test)]
pub(crate) fn sample_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        if name.ends_with('/') {
            writer
                .add_directory(*name, SimpleFileOptions::default())
                .unwrap();
        } else {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(bytes).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}
