use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("I/O error while archiving {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> ArchiveError + '_ {
    move |source| ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Deflates every file under `dir` into `zip_path`, entry names relative to `dir`.
///
/// Returns the number of files written.
pub fn create_zip_archive(dir: &Path, zip_path: &Path) -> Result<usize, ArchiveError> {
    let mut files = Vec::new();
    collect_files(dir, &mut files)?;
    files.sort();

    let out = File::create(zip_path).map_err(io_err(zip_path))?;
    let mut zip = ZipWriter::new(out);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in &files {
        let relative = path.strip_prefix(dir).unwrap_or(path);
        let entry_name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        debug!(entry = %entry_name, "Adding file to archive");

        let data = std::fs::read(path).map_err(io_err(path))?;
        zip.start_file(entry_name, options)?;
        zip.write_all(&data).map_err(io_err(zip_path))?;
    }

    zip.finish()?;
    Ok(files.len())
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), ArchiveError> {
    for entry in std::fs::read_dir(dir).map_err(io_err(dir))? {
        let entry = entry.map_err(io_err(dir))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(io_err(&path))?;
        if file_type.is_dir() {
            collect_files(&path, files)?;
        } else if file_type.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn archives_nested_tree_with_relative_names() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("doc");
        std::fs::create_dir_all(doc.join("images")).unwrap();
        std::fs::write(doc.join("doc_output.md"), "# Title").unwrap();
        std::fs::write(doc.join("images").join("doc_p1_img1.png"), [1u8, 2, 3]).unwrap();

        let zip_path = dir.path().join("doc_output.zip");
        let count = create_zip_archive(&doc, &zip_path).unwrap();
        assert_eq!(count, 2);

        let mut archive = zip::ZipArchive::new(File::open(&zip_path).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(String::from).collect();
        names.sort();
        assert_eq!(names, vec!["doc_output.md", "images/doc_p1_img1.png"]);

        let mut md = String::new();
        archive
            .by_name("doc_output.md")
            .unwrap()
            .read_to_string(&mut md)
            .unwrap();
        assert_eq!(md, "# Title");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = create_zip_archive(&dir.path().join("absent"), &dir.path().join("x.zip"));
        assert!(matches!(result, Err(ArchiveError::Io { .. })));
    }
}
