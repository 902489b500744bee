use flate2::bufread::MultiGzDecoder;
use regex::Regex;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Open `path` for reading; a missing file is reported with its path.
pub fn open_file<P: AsRef<Path>>(path: P) -> Result<File> {
    let path = path.as_ref();
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => {
            io::Error::new(io::ErrorKind::NotFound, format!("{:?} does not exist", path))
        }
        _ => e,
    })
}

/// Wrap a raw stream in a buffered reader, decompressing it when it starts
/// with the gzip magic bytes.
///
/// Detection looks at the stream content rather than the file name, so a
/// renamed or extension-less catalog is still read correctly.
pub fn buffered_reader<R: io::Read + 'static>(inner: R) -> Result<Box<dyn BufRead>> {
    let mut reader = BufReader::new(inner);
    let is_gzipped = {
        let head = reader.fill_buf()?;
        head.len() >= 2 && head[..2] == GZIP_MAGIC
    };
    if is_gzipped {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

/// Open a plain or gzip-compressed text file for line-oriented reading.
pub fn open_reader<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let file = open_file(&path)?;
    buffered_reader(file)
}

/// Strip a trailing `\n` or `\r\n`.
pub fn trim_line_end(line: &str) -> &str {
    line.trim_end_matches(|c| c == '\n' || c == '\r')
}

pub fn trim_line_end_bytes(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && (line[end - 1] == b'\n' || line[end - 1] == b'\r') {
        end -= 1;
    }
    &line[..end]
}

/// Build the error reported for a row that does not have the columns a
/// reader relies on.
pub fn malformed_row(source: &str, line_no: usize, expected: usize, found: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!(
            "{}:{}: expected at least {} tab-separated columns, found {}",
            source, line_no, expected, found
        ),
    )
}

/// Feed every non-blank line of `reader` to `f` as raw bytes, line ending
/// stripped, along with its 1-based line number.
///
/// Nothing is decoded here: tables carry free-text columns that are not
/// always valid UTF-8.
pub fn for_each_line<R, F>(mut reader: R, mut f: F) -> Result<()>
where
    R: BufRead,
    F: FnMut(usize, &[u8]) -> Result<()>,
{
    let mut buf = Vec::new();
    let mut line_no = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        line_no += 1;
        let line = trim_line_end_bytes(&buf);
        if !line.is_empty() {
            f(line_no, line)?;
        }
    }
}

/// Split a tab-delimited row and require at least `min_columns` fields.
pub fn split_row<'a>(
    line: &'a [u8],
    min_columns: usize,
    source: &str,
    line_no: usize,
) -> Result<Vec<&'a [u8]>> {
    let columns: Vec<&[u8]> = line.split(|&b| b == b'\t').collect();
    if columns.len() < min_columns {
        return Err(malformed_row(source, line_no, min_columns, columns.len()));
    }
    Ok(columns)
}

/// Recursively collect files whose name matches `pattern`, sorted by path.
pub fn find_files_matching<P: AsRef<Path>>(path: P, pattern: &Regex) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .file_name()
                .and_then(|name| name.to_str())
                .map_or(false, |name| pattern.is_match(name))
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort_unstable();
    files
}
