//! On-disk corpus layout.
//!
//! Raw documents are `.txt` files directly under the raw directory, one per
//! crawled page; the file stem is the document id. Chunks are written to the
//! processed directory as `{document_id}_chunk{index}.txt`, which is how chunk
//! identity survives between the normalize and build steps.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};
use walkdir::WalkDir;

use crate::document::{Chunk, RawDocument};
use crate::error::{RagError, Result};

const TEXT_EXTENSION: &str = "txt";
const CHUNK_MARKER: &str = "_chunk";

/// Raw documents read from disk, plus those that had to be skipped.
#[derive(Debug, Default)]
pub struct RawCorpus {
    /// Documents that decoded as UTF-8, sorted by file name.
    pub documents: Vec<RawDocument>,
    /// One [`RagError::InvalidDocument`] per skipped file.
    pub invalid: Vec<RagError>,
}

/// Read every `.txt` file directly under `dir`.
///
/// Files that cannot be read or are not valid UTF-8 are logged and recorded
/// in [`RawCorpus::invalid`]; they never abort the batch.
///
/// # Errors
///
/// Returns [`RagError::Io`] if `dir` is not a readable directory.
pub fn read_raw_documents(dir: &Path) -> Result<RawCorpus> {
    let mut corpus = RawCorpus::default();
    for path in text_files(dir)? {
        let id = file_stem(&path);
        match fs::read(&path) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => corpus.documents.push(RawDocument { id, text }),
                Err(e) => {
                    warn!(document.id = %id, error = %e, "skipping non UTF-8 document");
                    corpus.invalid.push(RagError::InvalidDocument { id, message: e.to_string() });
                }
            },
            Err(e) => {
                warn!(document.id = %id, error = %e, "skipping unreadable document");
                corpus.invalid.push(RagError::InvalidDocument { id, message: e.to_string() });
            }
        }
    }
    Ok(corpus)
}

/// Replace the chunk files in `dir` with `chunks`.
///
/// The new set is written into a sibling staging directory together with
/// copies of any non-chunk files already in `dir`, then swapped in with two
/// renames. A failed write leaves `dir` untouched. Returns the number of chunk
/// files written.
///
/// # Errors
///
/// Returns [`RagError::Io`] on any filesystem failure.
pub fn write_chunks(dir: &Path, chunks: &[Chunk]) -> Result<usize> {
    let staging = sibling(dir, "staging")?;
    let retired = sibling(dir, "old")?;

    remove_dir_if_exists(&staging)?;
    if let Err(e) = stage_chunks(dir, &staging, chunks) {
        let _ = fs::remove_dir_all(&staging);
        return Err(e);
    }

    if dir.exists() {
        remove_dir_if_exists(&retired)?;
        fs::rename(dir, &retired).map_err(|e| RagError::io(dir, e))?;
    }
    if let Err(e) = fs::rename(&staging, dir) {
        error!(dir = %dir.display(), error = %e, "failed to swap in new chunk set");
        if retired.exists() {
            let _ = fs::rename(&retired, dir);
        }
        return Err(RagError::io(dir, e));
    }
    if let Err(e) = remove_dir_if_exists(&retired) {
        warn!(error = %e, "left previous chunk set behind");
    }

    debug!(dir = %dir.display(), chunk_count = chunks.len(), "replaced chunk set");
    Ok(chunks.len())
}

fn stage_chunks(dir: &Path, staging: &Path, chunks: &[Chunk]) -> Result<()> {
    fs::create_dir_all(staging).map_err(|e| RagError::io(staging, e))?;

    if dir.is_dir() {
        for path in text_files(dir)? {
            if parse_chunk_file_name(&path).is_none() {
                let dest = staging.join(path.file_name().unwrap_or_default());
                fs::copy(&path, &dest).map_err(|e| RagError::io(&path, e))?;
            }
        }
    }

    for chunk in chunks {
        let path = chunk_path(staging, chunk);
        fs::write(&path, chunk.text.as_bytes()).map_err(|e| RagError::io(&path, e))?;
    }
    Ok(())
}

/// `dir` with a dotted sibling name, e.g. `data/.processed.staging`.
fn sibling(dir: &Path, suffix: &str) -> Result<PathBuf> {
    let name = dir
        .file_name()
        .ok_or_else(|| RagError::io(dir, "chunk directory has no file name"))?
        .to_string_lossy();
    Ok(dir.with_file_name(format!(".{name}.{suffix}")))
}

fn remove_dir_if_exists(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RagError::io(path, e)),
    }
}

/// Read all chunk files in `dir`, ordered by `(document_id, index)`.
///
/// Files whose names do not follow the chunk naming scheme are ignored.
///
/// # Errors
///
/// Returns [`RagError::Io`] if `dir` or a chunk file cannot be read.
pub fn read_chunks(dir: &Path) -> Result<Vec<Chunk>> {
    let mut chunks = Vec::new();
    for path in text_files(dir)? {
        let Some((document_id, index)) = parse_chunk_file_name(&path) else {
            debug!(path = %path.display(), "ignoring non-chunk file");
            continue;
        };
        let text = fs::read_to_string(&path).map_err(|e| RagError::io(&path, e))?;
        if text.trim().is_empty() {
            warn!(path = %path.display(), "ignoring empty chunk file");
            continue;
        }
        chunks.push(Chunk { document_id, index, text });
    }
    chunks.sort_by(|a, b| a.document_id.cmp(&b.document_id).then(a.index.cmp(&b.index)));
    Ok(chunks)
}

/// Path of the file holding `chunk` inside `dir`.
pub fn chunk_path(dir: &Path, chunk: &Chunk) -> PathBuf {
    dir.join(format!("{}.{TEXT_EXTENSION}", chunk.id()))
}

/// Split `{document_id}_chunk{index}.txt` back into its parts.
pub fn parse_chunk_file_name(path: &Path) -> Option<(String, usize)> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(".txt")?;
    let (document_id, index) = stem.rsplit_once(CHUNK_MARKER)?;
    if document_id.is_empty() || index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((document_id.to_string(), index.parse().ok()?))
}

fn text_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(RagError::io(dir, "not a directory"));
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| RagError::io(dir, e))?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == TEXT_EXTENSION)
        {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn file_stem(path: &Path) -> String {
    path.file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_default()
}
