//! Splitting large CSV files into shards and merging them back
//!
//! Shard boundaries are only placed between product groups, so a product's
//! main row and its variant/image rows always land in the same file. Every
//! shard starts with a copy of the header.

use miette::Diagnostic;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::stream::{GroupReader, ProductGroup, RecordStream, StreamError};

#[derive(Debug, Error, Diagnostic)]
pub enum ShardError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Stream(#[from] StreamError),

    #[error("IO error on {path}: {source}")]
    #[diagnostic(code(rts::shard::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Header of {path} does not match the first input")]
    #[diagnostic(
        code(rts::shard::header_mismatch),
        help("Only files produced from the same export (same column layout) can be merged")
    )]
    HeaderMismatch { path: PathBuf },

    #[error("No input files to merge")]
    #[diagnostic(code(rts::shard::no_inputs))]
    NoInputs,

    #[error("Split limit must be greater than zero")]
    #[diagnostic(code(rts::shard::zero_limit))]
    ZeroLimit,
}

impl ShardError {
    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| ShardError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// When to roll over to a new shard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitLimit {
    /// Maximum shard size in bytes, header included
    Bytes(usize),
    /// Maximum number of data records per shard
    Records(usize),
}

impl SplitLimit {
    fn value(self) -> usize {
        match self {
            SplitLimit::Bytes(n) | SplitLimit::Records(n) => n,
        }
    }

    /// Would adding `group` to a shard currently at `bytes`/`records` exceed the limit?
    fn exceeded_by(self, bytes: usize, records: usize, group: &ProductGroup) -> bool {
        match self {
            SplitLimit::Bytes(max) => bytes + group.byte_len() > max,
            SplitLimit::Records(max) => records + group.record_count() > max,
        }
    }
}

/// One written shard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardInfo {
    pub path: PathBuf,
    pub groups: usize,
    pub records: usize,
    pub bytes: usize,
}

/// Outcome of a split
#[derive(Debug, Default)]
pub struct SplitReport {
    pub shards: Vec<ShardInfo>,
    /// Groups that exceed the limit on their own and were written whole
    pub oversized_groups: usize,
}

impl SplitReport {
    pub fn total_records(&self) -> usize {
        self.shards.iter().map(|s| s.records).sum()
    }
}

/// Path of the `index`-th shard (1-based) for `input` inside `out_dir`
pub fn shard_path(input: &Path, out_dir: &Path, index: usize) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "shard".to_string());
    out_dir.join(format!("{}_{:03}.csv", stem, index))
}

struct OpenShard {
    info: ShardInfo,
    writer: BufWriter<File>,
}

impl OpenShard {
    fn create(path: PathBuf, header: &[u8]) -> Result<Self, ShardError> {
        let file = File::create(&path).map_err(ShardError::io(&path))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(header).map_err(ShardError::io(&path))?;
        Ok(Self {
            info: ShardInfo {
                path,
                groups: 0,
                records: 0,
                bytes: header.len(),
            },
            writer,
        })
    }

    fn push(&mut self, group: &ProductGroup) -> Result<(), ShardError> {
        for record in &group.records {
            self.writer
                .write_all(&record.bytes)
                .map_err(ShardError::io(&self.info.path))?;
        }
        self.info.groups += 1;
        self.info.records += group.record_count();
        self.info.bytes += group.byte_len();
        Ok(())
    }

    fn finish(mut self) -> Result<ShardInfo, ShardError> {
        self.writer.flush().map_err(ShardError::io(&self.info.path))?;
        Ok(self.info)
    }
}

/// Split `input` into shards in `out_dir`
///
/// A group that alone exceeds the limit is still written whole, into a shard
/// of its own. Header-only input yields a single header-only shard.
pub fn split_file(
    input: &Path,
    out_dir: &Path,
    limit: SplitLimit,
    max_record_lines: usize,
) -> Result<SplitReport, ShardError> {
    if limit.value() == 0 {
        return Err(ShardError::ZeroLimit);
    }

    let file = File::open(input).map_err(ShardError::io(input))?;
    let mut stream = RecordStream::new(BufReader::new(file), max_record_lines);
    let header = stream.next_record()?.ok_or(StreamError::EmptyInput)?;
    let mut header_bytes = header.bytes;
    if !header_bytes.ends_with(b"\n") {
        header_bytes.push(b'\n');
    }

    fs::create_dir_all(out_dir).map_err(ShardError::io(out_dir))?;

    let mut report = SplitReport::default();
    let mut current = OpenShard::create(shard_path(input, out_dir, 1), &header_bytes)?;

    for group in GroupReader::new(stream) {
        let group = group?;

        if current.info.groups > 0
            && limit.exceeded_by(current.info.bytes, current.info.records, &group)
        {
            let next = shard_path(input, out_dir, report.shards.len() + 2);
            let finished = std::mem::replace(&mut current, OpenShard::create(next, &header_bytes)?);
            report.shards.push(finished.finish()?);
        }

        if limit.exceeded_by(header_bytes.len(), 0, &group) {
            tracing::warn!(
                handle = %group.handle,
                bytes = group.byte_len(),
                records = group.record_count(),
                "product group exceeds the split limit on its own, writing it whole"
            );
            report.oversized_groups += 1;
        }

        current.push(&group)?;
    }

    report.shards.push(current.finish()?);
    Ok(report)
}

/// Collect merge inputs: directories contribute their `*.csv` files in
/// lexical order, plain files are taken as given
pub fn collect_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = walkdir::WalkDir::new(input)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| {
                    p.extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
                })
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    files
}

/// Outcome of a merge
#[derive(Debug, Default)]
pub struct MergeReport {
    pub files: usize,
    pub records: usize,
    pub bytes: usize,
}

/// Concatenate the data records of `inputs` under a single header
pub fn merge_files(
    inputs: &[PathBuf],
    output: &Path,
    max_record_lines: usize,
) -> Result<MergeReport, ShardError> {
    if inputs.is_empty() {
        return Err(ShardError::NoInputs);
    }

    let out = File::create(output).map_err(ShardError::io(output))?;
    let mut writer = BufWriter::new(out);
    let mut report = MergeReport::default();
    let mut header: Option<Vec<u8>> = None;
    let mut needs_newline = false;

    for path in inputs {
        let file = File::open(path).map_err(ShardError::io(path))?;
        let mut stream = RecordStream::new(BufReader::new(file), max_record_lines);
        let Some(file_header) = stream.next_record()? else {
            tracing::warn!(path = %path.display(), "skipping empty file");
            continue;
        };

        match &header {
            None => {
                writer
                    .write_all(&file_header.bytes)
                    .map_err(ShardError::io(output))?;
                report.bytes += file_header.len();
                needs_newline = !file_header.ends_with_newline();
                header = Some(file_header.content().to_vec());
            }
            Some(expected) if expected.as_slice() != file_header.content() => {
                return Err(ShardError::HeaderMismatch { path: path.clone() });
            }
            Some(_) => {}
        }

        while let Some(record) = stream.next_record()? {
            if needs_newline {
                writer.write_all(b"\n").map_err(ShardError::io(output))?;
                report.bytes += 1;
            }
            writer
                .write_all(&record.bytes)
                .map_err(ShardError::io(output))?;
            report.bytes += record.len();
            report.records += 1;
            needs_newline = !record.ends_with_newline();
        }

        report.files += 1;
    }

    writer.flush().map_err(ShardError::io(output))?;
    Ok(report)
}
