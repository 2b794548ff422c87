use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use regex::Regex;

pub fn is_gzipped(path: &Path) -> io::Result<bool> {
    let mut file = File::open(path)?;
    let mut buffer = [0u8; 2];
    match file.read_exact(&mut buffer) {
        Ok(()) => Ok(buffer == [0x1F, 0x8B]), // Gzip magic bytes
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Opens a plain or gzip-compressed text file.
pub fn open_text(path: &Path) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    if is_gzipped(path)? {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Returns the first line of a file split on whitespace.
pub fn first_line_fields(path: &Path) -> io::Result<Vec<String>> {
    let mut reader = open_text(path)?;
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(line.split_whitespace().map(str::to_string).collect())
}

/// Compresses `src` into `dst` and removes `src`.
pub fn gzip_file(src: &Path, dst: &Path) -> io::Result<()> {
    let mut input = BufReader::new(File::open(src)?);
    let mut encoder = GzEncoder::new(File::create(dst)?, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?;
    fs::remove_file(src)
}

/// Creates a directory and its parents.
/// With `ignore_if_exists` unset an existing directory is an error.
pub fn mkdir(path: &Path, ignore_if_exists: bool) -> io::Result<()> {
    if path.is_dir() {
        if ignore_if_exists {
            return Ok(());
        }
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("Directory exists: {}", path.display()),
        ));
    }
    fs::create_dir_all(path)
}

fn wildcard_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut expr = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr)
}

/// Lists the files matching a glob whose wildcards (`*`, `?`) sit in the final component.
/// A missing directory yields no files. Results are sorted by file name.
pub fn glob_files(pattern: &Path) -> io::Result<Vec<PathBuf>> {
    let dir = match pattern.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name_pattern = pattern
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name_re = wildcard_to_regex(&name_pattern)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name_re.is_match(&name) && entry.path().is_file() {
            files.push(dir.join(name));
        }
    }
    files.sort();
    Ok(files)
}
