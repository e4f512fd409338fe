//! Output files: backups, intermediate documents and directory mode

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use tracing::{debug, info};

/// Default output file for a single conversion
pub const DEFAULT_OUTPUT: &str = "output.drawio";

/// Default output directory when converting a directory
pub const DEFAULT_OUTPUT_DIR: &str = "c4_output";

/// Prefix of files written in directory mode
const OUTPUT_PREFIX: &str = "c4_";

fn stem_and_extension(path: &Path) -> (String, Option<String>) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());
    (stem, extension)
}

/// The first free `<stem>.v<N>.<ext>` next to `path`
pub fn backup_path(path: &Path) -> PathBuf {
    let (stem, extension) = stem_and_extension(path);
    let mut version = 1u32;
    loop {
        let name = match &extension {
            Some(ext) => format!("{}.v{}.{}", stem, version, ext),
            None => format!("{}.v{}", stem, version),
        };
        let candidate = path.with_file_name(name);
        if !candidate.exists() {
            return candidate;
        }
        version += 1;
    }
}

/// `<stem>_intermediate.drawio` next to the output file
pub fn intermediate_path(output: &Path) -> PathBuf {
    let (stem, _) = stem_and_extension(output);
    output.with_file_name(format!("{}_intermediate.drawio", stem))
}

/// Write `content` to `path`, moving an existing file aside first
///
/// Returns the backup path when one was made.
pub fn write_document(path: &Path, content: &str, backup: bool) -> io::Result<Option<PathBuf>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let moved = if backup && path.is_file() {
        let target = backup_path(path);
        fs::rename(path, &target)?;
        info!(from = %path.display(), to = %target.display(), "Backed up existing output");
        Some(target)
    } else {
        None
    };

    fs::write(path, content)?;
    debug!(path = %path.display(), bytes = content.len(), "Wrote document");
    Ok(moved)
}

fn is_drawio_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("drawio"))
}

/// All `.drawio` files below `dir`, sorted by path
pub fn collect_drawio_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if is_drawio_file(&path) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Output path of `file` (found below `input_root`) in directory mode
///
/// The relative path is prefixed with `c4_`, so `a.drawio` becomes
/// `c4_a.drawio` and `team/a.drawio` becomes `c4_team/a.drawio`.
pub fn directory_output_path(input_root: &Path, file: &Path, output_root: &Path) -> PathBuf {
    let relative = file.strip_prefix(input_root).unwrap_or(file);
    let mut components = relative.components();
    match components.next() {
        Some(first) => {
            let prefixed = format!("{}{}", OUTPUT_PREFIX, first.as_os_str().to_string_lossy());
            let target = output_root.join(prefixed);
            let rest = components.as_path();
            if rest.as_os_str().is_empty() {
                target
            } else {
                target.join(rest)
            }
        }
        None => output_root.join(OUTPUT_PREFIX),
    }
}

/// Where the draw.io desktop app usually lives
pub fn default_drawio_path() -> PathBuf {
    if cfg!(target_os = "windows") {
        PathBuf::from(r"C:\Program Files\draw.io\draw.io.exe")
    } else if cfg!(target_os = "macos") {
        PathBuf::from("/Applications/draw.io.app/Contents/MacOS/draw.io")
    } else {
        PathBuf::from("drawio")
    }
}

/// Start draw.io on `file` without waiting for it
pub fn open_in_drawio(program: &Path, file: &Path) -> io::Result<Child> {
    let child = Command::new(program)
        .arg(file)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .spawn()?;
    info!(program = %program.display(), file = %file.display(), "Opened output in draw.io");
    Ok(child)
}
