//! The archive operations behind each CLI command.
//!
//! Every operation writes its user-facing output to the given sink; progress
//! bars go to stderr and diagnostics go through `tracing`.

use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use qda_archive::{EntryDescriptor, Error as ArchiveError, QdaArchive, QdaWriter};
use tracing::{debug, info};
use walkdir::WalkDir;

/// File name never packed into an archive.
const EXCLUDED_FILE: &str = "Thumbs.db";

/// Outcome of a bulk operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub succeeded: usize,
    pub failed: usize,
}

/// List entry names in file order, one per line.
///
/// Names are written as their raw id bytes.
pub fn print<W: Write>(archive_path: &Path, out: &mut W) -> Result<usize> {
    let archive = open_archive(archive_path)?;

    for entry in archive.iter() {
        out.write_all(entry.name_bytes())?;
        out.write_all(b"\n")?;
    }

    info!(archive = archive.name(), entries = archive.entry_count(), "listed archive");
    Ok(archive.entry_count())
}

/// Extract every entry into `output`.
///
/// Failures on a single entry are reported and skipped.
pub fn dump<W: Write>(archive_path: &Path, output: &Path, out: &mut W) -> Result<Summary> {
    let archive = open_archive(archive_path)?;
    require_dir(output)?;

    let pb = progress_bar(archive.entry_count() as u64)?;
    let mut summary = Summary::default();

    for entry in archive.iter() {
        let result = entry
            .output_path(output)
            .and_then(|path| write_entry(&archive, entry, &path).map(|()| path));

        pb.suspend(|| match &result {
            Ok(path) => writeln!(out, "{}", path.display()),
            Err(e) => writeln!(out, "Error: {}: {}", entry.name(), e),
        })?;

        match result {
            Ok(_) => summary.succeeded += 1,
            Err(e) => {
                debug!(archive = archive.name(), entry = %entry.name(), error = %e, "skipped entry");
                summary.failed += 1;
            }
        }

        pb.inc(1);
    }

    pb.finish_and_clear();
    writeln!(
        out,
        "Dumped {} entries ({} errors)",
        summary.succeeded, summary.failed
    )?;

    Ok(summary)
}

/// Extract the first entry named `name` to `dest/name`.
///
/// `name` is matched against the id bytes exactly.
pub fn extract<W: Write>(archive_path: &Path, name: &OsStr, dest: &Path, out: &mut W) -> Result<PathBuf> {
    let archive = open_archive(archive_path)?;
    let id = name_bytes(name)
        .ok_or_else(|| ArchiveError::UnrepresentableName(name.to_string_lossy().into_owned()))?;
    let entry = archive
        .find_required(id)
        .with_context(|| format!("Nothing extracted from '{}'", archive_path.display()))?;

    let target = dest.join(name);
    write_entry(&archive, entry, &target)
        .with_context(|| format!("Could not write '{}'", target.display()))?;

    writeln!(out, "{}", target.display())?;
    Ok(target)
}

/// Pack every regular file directly inside `input` into a new archive.
///
/// Files are added in file-name order and `Thumbs.db` is skipped. Files that
/// cannot be read or named are reported and left out.
pub fn build<W: Write>(archive_path: &Path, input: &Path, out: &mut W) -> Result<Summary> {
    require_dir(input)?;

    let files = collect_input_files(input)?;
    pack(archive_path, &files, out)
}

/// Write `files` into a new archive, in the given order.
fn pack<W: Write>(archive_path: &Path, files: &[PathBuf], out: &mut W) -> Result<Summary> {
    let pb = progress_bar(files.len() as u64)?;
    let mut writer = QdaWriter::new();
    let mut summary = Summary::default();

    for path in files {
        let result = add_file(&mut writer, path);

        pb.suspend(|| match &result {
            Ok(name) => writeln!(out, "{name}"),
            Err(e) => writeln!(out, "Error: {}: {:#}", path.display(), e),
        })?;

        match result {
            Ok(_) => summary.succeeded += 1,
            Err(_) => summary.failed += 1,
        }

        pb.inc(1);
    }

    pb.finish_and_clear();

    writer
        .write_file(archive_path)
        .with_context(|| format!("Could not write '{}'", archive_path.display()))?;

    writeln!(
        out,
        "Built {}: {} entries ({} errors)",
        archive_path.display(),
        summary.succeeded,
        summary.failed
    )?;

    Ok(summary)
}

fn open_archive(path: &Path) -> Result<QdaArchive> {
    QdaArchive::open(path).with_context(|| format!("Failed to open '{}'", path.display()))
}

fn require_dir(path: &Path) -> Result<(), ArchiveError> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(ArchiveError::NotADirectory(path.to_path_buf())),
        Err(_) => Err(ArchiveError::PathNotFound(path.to_path_buf())),
    }
}

fn write_entry(
    archive: &QdaArchive,
    entry: &EntryDescriptor,
    path: &Path,
) -> qda_archive::Result<()> {
    let data = archive.read(entry)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, data)?;
    Ok(())
}

fn collect_input_files(input: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(input)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("Could not read '{}'", input.display()))?;

        if !entry.file_type().is_file() {
            debug!(path = %entry.path().display(), "skipping non-file");
            continue;
        }
        if entry.file_name() == EXCLUDED_FILE {
            debug!(path = %entry.path().display(), "skipping excluded file");
            continue;
        }

        files.push(entry.into_path());
    }

    Ok(files)
}

fn add_file(writer: &mut QdaWriter, path: &Path) -> Result<String> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("path has no file name"))?;
    let name = name_bytes(file_name)
        .ok_or_else(|| anyhow!("file name cannot be stored as an entry id"))?;

    let data = fs::read(path).context("could not read file")?;
    writer.add(name, data)?;

    Ok(file_name.to_string_lossy().into_owned())
}

/// Raw bytes of a file name as stored in an entry id.
#[cfg(unix)]
fn name_bytes(name: &OsStr) -> Option<&[u8]> {
    use std::os::unix::ffi::OsStrExt;

    Some(name.as_bytes())
}

#[cfg(not(unix))]
fn name_bytes(name: &OsStr) -> Option<&[u8]> {
    name.to_str().map(str::as_bytes)
}

fn progress_bar(len: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn output_lines(buf: &[u8]) -> Vec<String> {
        String::from_utf8_lossy(buf).lines().map(str::to_string).collect()
    }

    fn archive_error(err: &anyhow::Error) -> &ArchiveError {
        err.downcast_ref::<ArchiveError>()
            .unwrap_or_else(|| panic!("not an archive error: {err:#}"))
    }

    fn write_archive<N: AsRef<[u8]>>(dir: &Path, entries: &[(N, &[u8])]) -> PathBuf {
        let mut writer = QdaWriter::new();
        for (name, data) in entries {
            writer.add(name, data.to_vec()).unwrap();
        }
        let path = dir.join("test.qda");
        writer.write_file(&path).unwrap();
        path
    }

    #[test]
    fn test_build_then_print() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        fs::create_dir(&input).unwrap();
        fs::write(input.join("b.bin"), [1u8, 2, 3]).unwrap();
        fs::write(input.join("a.txt"), b"hi").unwrap();

        let archive = tmp.path().join("out.qda");
        let mut out = Vec::new();
        let summary = build(&archive, &input, &mut out).unwrap();

        assert_eq!(summary, Summary { succeeded: 2, failed: 0 });
        assert_eq!(fs::metadata(&archive).unwrap().len(), 797);
        assert_eq!(&output_lines(&out)[..2], ["a.txt", "b.bin"]);

        let mut listing = Vec::new();
        assert_eq!(print(&archive, &mut listing).unwrap(), 2);
        assert_eq!(listing, b"a.txt\nb.bin\n");
    }

    #[test]
    fn test_build_skips_thumbs_db_and_directories() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        fs::create_dir_all(input.join("nested")).unwrap();
        fs::write(input.join("nested").join("inner.txt"), b"no").unwrap();
        fs::write(input.join("Thumbs.db"), b"junk").unwrap();
        fs::write(input.join("Thumbs.db.bak"), b"kept").unwrap();
        fs::write(input.join("c"), b"3").unwrap();
        fs::write(input.join("a"), b"1").unwrap();

        let archive_path = tmp.path().join("out.qda");
        build(&archive_path, &input, &mut Vec::new()).unwrap();

        let archive = QdaArchive::open(&archive_path).unwrap();
        let names: Vec<_> = archive.iter().map(|e| e.name().into_owned()).collect();
        assert_eq!(names, ["Thumbs.db.bak", "a", "c"]);
    }

    #[test]
    fn test_build_continues_past_unreadable_files() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        fs::create_dir(&input).unwrap();
        fs::write(input.join("a"), b"1").unwrap();
        fs::write(input.join("c"), b"3").unwrap();

        let files = [input.join("a"), input.join("b"), input.join("c")];
        let archive_path = tmp.path().join("out.qda");
        let mut out = Vec::new();
        let summary = pack(&archive_path, &files, &mut out).unwrap();

        assert_eq!(summary, Summary { succeeded: 2, failed: 1 });
        let lines = output_lines(&out);
        assert!(lines[1].starts_with("Error: ") && lines[1].contains("could not read file"));
        assert_eq!(lines.last().unwrap(), &format!("Built {}: 2 entries (1 errors)", archive_path.display()));

        let archive = QdaArchive::open(&archive_path).unwrap();
        let names: Vec<_> = archive.iter().map(|e| e.name().into_owned()).collect();
        assert_eq!(names, ["a", "c"]);
    }

    #[test]
    fn test_build_empty_folder() {
        let tmp = TempDir::new().unwrap();
        let archive_path = tmp.path().join("empty.qda");
        let input = tmp.path().join("in");
        fs::create_dir(&input).unwrap();

        let summary = build(&archive_path, &input, &mut Vec::new()).unwrap();
        assert_eq!(summary, Summary::default());
        assert_eq!(fs::metadata(&archive_path).unwrap().len(), 256);
    }

    #[test]
    fn test_build_requires_directory() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("file.txt");
        fs::write(&file, b"x").unwrap();
        let archive_path = tmp.path().join("out.qda");

        let err = build(&archive_path, &file, &mut Vec::new()).unwrap_err();
        assert!(matches!(archive_error(&err), ArchiveError::NotADirectory(_)));

        let err = build(&archive_path, &tmp.path().join("missing"), &mut Vec::new()).unwrap_err();
        assert!(matches!(archive_error(&err), ArchiveError::PathNotFound(_)));
        assert!(!archive_path.exists());
    }

    #[test]
    fn test_print_rejects_non_archive() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("plain.txt");
        fs::write(&path, b"this is not an archive").unwrap();

        let mut out = Vec::new();
        let err = print(&path, &mut out).unwrap_err();
        assert!(matches!(archive_error(&err), ArchiveError::NotAnArchive { .. }));
        assert!(out.is_empty());
    }

    #[test]
    fn test_dump_writes_every_entry() {
        let tmp = TempDir::new().unwrap();
        let archive = write_archive(
            tmp.path(),
            &[("a.txt", b"hi"), ("sub/dir/b.bin", &[1, 2, 3]), ("empty", b"")],
        );
        let output = tmp.path().join("out");
        fs::create_dir(&output).unwrap();

        let mut out = Vec::new();
        let summary = dump(&archive, &output, &mut out).unwrap();

        assert_eq!(summary, Summary { succeeded: 3, failed: 0 });
        assert_eq!(fs::read(output.join("a.txt")).unwrap(), b"hi");
        assert_eq!(fs::read(output.join("sub/dir/b.bin")).unwrap(), [1, 2, 3]);
        assert_eq!(fs::read(output.join("empty")).unwrap(), b"");
        assert_eq!(
            output_lines(&out).last().unwrap(),
            "Dumped 3 entries (0 errors)"
        );
    }

    #[test]
    fn test_dump_continues_past_failed_entries() {
        let tmp = TempDir::new().unwrap();
        let archive = write_archive(
            tmp.path(),
            &[("../escape.txt", b"bad"), ("ok.txt", b"good")],
        );
        let output = tmp.path().join("out");
        fs::create_dir(&output).unwrap();

        let mut out = Vec::new();
        let summary = dump(&archive, &output, &mut out).unwrap();

        assert_eq!(summary, Summary { succeeded: 1, failed: 1 });
        assert!(!tmp.path().join("escape.txt").exists());
        assert_eq!(fs::read(output.join("ok.txt")).unwrap(), b"good");

        let lines = output_lines(&out);
        assert!(lines[0].starts_with("Error: ../escape.txt:"));
    }

    #[test]
    fn test_dump_continues_past_unwritable_targets() {
        let tmp = TempDir::new().unwrap();
        let archive = write_archive(tmp.path(), &[("a.txt", b"hi"), ("b.txt", b"ok")]);
        let output = tmp.path().join("out");
        fs::create_dir_all(output.join("a.txt")).unwrap();

        let mut out = Vec::new();
        let summary = dump(&archive, &output, &mut out).unwrap();

        assert_eq!(summary, Summary { succeeded: 1, failed: 1 });
        assert!(output.join("a.txt").is_dir());
        assert_eq!(fs::read(output.join("b.txt")).unwrap(), b"ok");

        let lines = output_lines(&out);
        assert!(lines[0].starts_with("Error: a.txt:"));
        assert_eq!(lines.last().unwrap(), "Dumped 1 entries (1 errors)");
    }

    #[test]
    fn test_print_writes_raw_ids() {
        let tmp = TempDir::new().unwrap();
        let archive = write_archive(
            tmp.path(),
            &[([0x82u8, 0xA0], &b"first"[..]), ([0x82u8, 0xA2], &b"second"[..])],
        );

        let mut listing = Vec::new();
        print(&archive, &mut listing).unwrap();
        assert_eq!(listing, b"\x82\xA0\n\x82\xA2\n");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_dump_keeps_non_utf8_names_apart() {
        use std::os::unix::ffi::OsStrExt;

        let tmp = TempDir::new().unwrap();
        let archive = write_archive(
            tmp.path(),
            &[([0x82u8, 0xA0], &b"first"[..]), ([0x82u8, 0xA2], &b"second"[..])],
        );
        let output = tmp.path().join("out");
        fs::create_dir(&output).unwrap();

        let summary = dump(&archive, &output, &mut Vec::new()).unwrap();

        assert_eq!(summary, Summary { succeeded: 2, failed: 0 });
        assert_eq!(fs::read_dir(&output).unwrap().count(), 2);
        assert_eq!(fs::read(output.join(OsStr::from_bytes(&[0x82, 0xA0]))).unwrap(), b"first");
        assert_eq!(fs::read(output.join(OsStr::from_bytes(&[0x82, 0xA2]))).unwrap(), b"second");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_extract_non_utf8_name() {
        use std::os::unix::ffi::OsStrExt;

        let tmp = TempDir::new().unwrap();
        let archive = write_archive(
            tmp.path(),
            &[([0x82u8, 0xA0], &b"first"[..]), ([0x82u8, 0xA2], &b"second"[..])],
        );
        let dest = tmp.path().join("dest");
        fs::create_dir(&dest).unwrap();

        let name = OsStr::from_bytes(&[0x82, 0xA2]);
        let target = extract(&archive, name, &dest, &mut Vec::new()).unwrap();

        assert_eq!(target, dest.join(name));
        assert_eq!(fs::read(&target).unwrap(), b"second");
    }

    #[test]
    fn test_dump_truncated_entry_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let archive = write_archive(tmp.path(), &[("a", b"aaaa"), ("b", b"bbbb")]);
        let len = fs::metadata(&archive).unwrap().len();
        let file = fs::OpenOptions::new().write(true).open(&archive).unwrap();
        file.set_len(len - 2).unwrap();
        drop(file);

        let output = tmp.path().join("out");
        fs::create_dir(&output).unwrap();

        let summary = dump(&archive, &output, &mut Vec::new()).unwrap();
        assert_eq!(summary, Summary { succeeded: 1, failed: 1 });
        assert!(!output.join("b").exists());
    }

    #[test]
    fn test_dump_requires_output_directory() {
        let tmp = TempDir::new().unwrap();
        let archive = write_archive(tmp.path(), &[("a", b"1")]);

        let err = dump(&archive, &tmp.path().join("missing"), &mut Vec::new()).unwrap_err();
        assert!(matches!(archive_error(&err), ArchiveError::PathNotFound(_)));

        let err = dump(&archive, &archive, &mut Vec::new()).unwrap_err();
        assert!(matches!(archive_error(&err), ArchiveError::NotADirectory(_)));
    }

    #[test]
    fn test_extract_first_match() {
        let tmp = TempDir::new().unwrap();
        let archive = write_archive(
            tmp.path(),
            &[("dup.txt", b"first"), ("dup.txt", b"second")],
        );
        let dest = tmp.path().join("dest");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("dup.txt"), b"old contents").unwrap();

        let target = extract(&archive, OsStr::new("dup.txt"), &dest, &mut Vec::new()).unwrap();

        assert_eq!(target, dest.join("dup.txt"));
        assert_eq!(fs::read(&target).unwrap(), b"first");
    }

    #[test]
    fn test_extract_missing_entry() {
        let tmp = TempDir::new().unwrap();
        let archive = write_archive(tmp.path(), &[("a.txt", b"hi")]);
        let dest = tmp.path().join("dest");
        fs::create_dir(&dest).unwrap();

        let err = extract(&archive, OsStr::new("b.txt"), &dest, &mut Vec::new()).unwrap_err();
        assert!(matches!(archive_error(&err), ArchiveError::EntryNotFound(name) if name == "b.txt"));
        assert_eq!(fs::read_dir(&dest).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_archive() {
        let tmp = TempDir::new().unwrap();
        let err = print(&tmp.path().join("nope.qda"), &mut Vec::new()).unwrap_err();
        assert!(matches!(archive_error(&err), ArchiveError::PathNotFound(_)));
    }
}
