//! Filesystem tree operations used to stage and materialize templates.
//!
//! Unlike a plain recursive copy, [`copy_tree`] never overwrites a file that
//! already exists in the destination, and [`find_duplicates`] reports exactly
//! the files such a copy would skip.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use globset::Glob;
use log::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::Result;

/// Predicate deciding whether a source entry (and its subtree) is skipped.
pub type Ignore<'a> = Option<&'a dyn Fn(&Path) -> bool>;

/// Files sort before directories so a directory's files are visited before
/// the walk descends any deeper.
fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

fn walk<'a>(
    source: &Path,
    ignore: Ignore<'a>,
) -> impl Iterator<Item = walkdir::Result<DirEntry>> + 'a {
    WalkDir::new(source)
        .min_depth(1)
        .sort_by(files_first)
        .into_iter()
        .filter_entry(move |entry| !ignore.is_some_and(|ignore| ignore(entry.path())))
}

fn target_path(source: &Path, destination: &Path, entry: &DirEntry) -> PathBuf {
    match entry.path().strip_prefix(source) {
        Ok(relative) => destination.join(relative),
        Err(_) => destination.join(entry.file_name()),
    }
}

/// Recursively copies the files of `source` into `destination`.
///
/// Directories are created only when a file is about to be written into them,
/// and files that already exist in `destination` are left untouched.
///
/// # Arguments
/// * `source` - Directory to copy from
/// * `destination` - Directory to merge into, created on demand
/// * `ignore` - Optional predicate; matching entries are skipped with their subtree
pub fn copy_tree<P, Q>(source: P, destination: Q, ignore: Ignore<'_>) -> Result<()>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let source = source.as_ref();
    let destination = destination.as_ref();

    for entry in walk(source, ignore) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }

        let target = target_path(source, destination, &entry);
        if target.exists() {
            debug!("Skipping existing file: '{}'", target.display());
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &target)?;
    }

    Ok(())
}

/// Lists the files in `destination` that a [`copy_tree`] from `source` would skip.
///
/// The sequence is lazy and depth-first, yielding a directory's files before
/// descending into its subdirectories. Detection never touches the filesystem
/// beyond reading it.
pub fn find_duplicates<'a>(
    source: &'a Path,
    destination: &'a Path,
    ignore: Ignore<'a>,
) -> impl Iterator<Item = Result<PathBuf>> + 'a {
    walk(source, ignore).filter_map(move |entry| match entry {
        Err(e) => Some(Err(e.into())),
        Ok(entry) if entry.file_type().is_dir() => None,
        Ok(entry) => {
            let target = target_path(source, destination, &entry);
            target.exists().then_some(Ok(target))
        }
    })
}

/// Deletes every entry below `directory` whose file name matches `pattern`.
///
/// Matching directories are removed together with their contents.
///
/// # Errors
/// * `Error::IoError` if `directory` does not exist or an entry cannot be removed
/// * `Error::GlobError` if `pattern` is not a valid glob
pub fn recursive_delete<P: AsRef<Path>>(directory: P, pattern: &str) -> Result<()> {
    let directory = directory.as_ref();
    let matcher = Glob::new(pattern)?.compile_matcher();

    // Surface a missing root instead of treating it as an empty tree.
    fs::metadata(directory)?;

    let mut entries = WalkDir::new(directory).min_depth(1).into_iter();
    while let Some(entry) = entries.next() {
        let entry = entry?;
        if !matcher.is_match(entry.file_name()) {
            continue;
        }

        debug!("Removing '{}'", entry.path().display());
        if entry.file_type().is_dir() {
            fs::remove_dir_all(entry.path())?;
            entries.skip_current_dir();
        } else {
            fs::remove_file(entry.path())?;
        }
    }

    Ok(())
}
