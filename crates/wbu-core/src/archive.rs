//! Zip packaging of the per-table backup files.

use crate::error::{BackupError, Result};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

fn copy_with_buffer<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    buffer: &mut [u8],
) -> std::io::Result<u64> {
    let mut written = 0u64;
    loop {
        let read = reader.read(buffer)?;
        if read == 0 {
            break;
        }
        writer.write_all(&buffer[..read])?;
        written += read as u64;
    }
    Ok(written)
}

/// Zip `files` into `target`, one deflated entry per file named after it.
///
/// The archive is built in a temporary file beside `target` and moved into
/// place once complete.
pub fn zip(target: &Path, files: &[PathBuf]) -> Result<PathBuf> {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    let staging = NamedTempFile::new_in(parent)?;

    let mut writer = ZipWriter::new(staging);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o600);
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut names = HashSet::new();

    for path in files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| BackupError::Io(format!("no usable file name: {}", path.display())))?;
        if !names.insert(name.to_string()) {
            return Err(BackupError::Io(format!("duplicate archive entry: {name}")));
        }
        let mut input = File::open(path)?;
        writer.start_file(name, options)?;
        let bytes = copy_with_buffer(&mut input, &mut writer, &mut buffer)?;
        debug!(entry = name, bytes, "added archive entry");
    }

    let staging = writer.finish()?;
    staging.persist(target)?;
    Ok(target.to_path_buf())
}

/// Extract every entry of `zip` into `dest`. Returns the extracted files.
pub fn unzip(zip: &Path, dest: &Path) -> Result<Vec<PathBuf>> {
    let mut archive = ZipArchive::new(File::open(zip)?)?;
    fs::create_dir_all(dest)?;
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut extracted = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let enclosed = entry.enclosed_name().ok_or_else(|| {
            BackupError::Io(format!("refusing unsafe archive entry: {}", entry.name()))
        })?;
        let out_path = dest.join(enclosed);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut output = BufWriter::with_capacity(COPY_BUFFER_SIZE, File::create(&out_path)?);
        copy_with_buffer(&mut entry, &mut output, &mut buffer)?;
        output.flush()?;
        extracted.push(out_path);
    }

    debug!(entries = extracted.len(), dest = %dest.display(), "archive extracted");
    Ok(extracted)
}

/// Extract into a fresh temporary directory, removed when the handle drops.
pub fn unzip_to_temp(zip: &Path) -> Result<(TempDir, Vec<PathBuf>)> {
    let dir = tempfile::Builder::new().prefix("wbu-restore-").tempdir()?;
    let files = unzip(zip, dir.path())?;
    Ok((dir, files))
}
