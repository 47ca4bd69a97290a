//! `.fvecs` / `.ivecs` readers and writers.
//!
//! The SIFT-style benchmark formats: each record is one little-endian 32-bit
//! signed integer `dim` followed by `dim` little-endian 32-bit payload values
//! (floats in `.fvecs`, integers in `.ivecs`). Every record in a file must
//! declare the same dimension; a mismatch or a short record is a format
//! error, never silently truncated or reinterpreted.

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

fn format_error(path: &Path, message: impl Into<String>) -> Error {
    Error::Format {
        path: path.display().to_string(),
        message: message.into(),
    }
}

/// Reads one record header; `Ok(None)` at clean EOF.
fn read_record_dim(reader: &mut impl Read, path: &Path) -> Result<Option<usize>> {
    let mut word = [0u8; 4];
    match reader.read_exact(&mut word) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let dim = i32::from_le_bytes(word);
    if dim <= 0 {
        return Err(format_error(
            path,
            format!("record declares non-positive dimension {dim}"),
        ));
    }
    Ok(Some(dim as usize))
}

fn read_payload(reader: &mut impl Read, dim: usize, path: &Path, record: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; dim * 4];
    reader.read_exact(&mut buf).map_err(|_| {
        format_error(
            path,
            format!("record {record} truncated: expected {dim} components"),
        )
    })?;
    Ok(buf)
}

/// Reads a `.fvecs` file into a [`Dataset`].
///
/// # Errors
///
/// Fails on IO errors, a non-positive or non-uniform declared dimension, or
/// a truncated record.
pub fn read_fvecs(path: &Path) -> Result<Dataset> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut vectors: Vec<Vec<f32>> = Vec::new();
    let mut file_dim: Option<usize> = None;

    while let Some(dim) = read_record_dim(&mut reader, path)? {
        match file_dim {
            None => file_dim = Some(dim),
            Some(expected) if expected != dim => {
                return Err(format_error(
                    path,
                    format!(
                        "record {} declares dimension {dim}, file dimension is {expected}",
                        vectors.len()
                    ),
                ));
            }
            Some(_) => {}
        }
        let buf = read_payload(&mut reader, dim, path, vectors.len())?;
        vectors.push(
            buf.chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        );
    }

    let dim = file_dim.ok_or_else(|| format_error(path, "file contains no records"))?;
    Dataset::from_vectors(dim, vectors)
}

/// Reads an `.ivecs` file (ground-truth neighbor lists) into rows of ids.
///
/// # Errors
///
/// Same conditions as [`read_fvecs`].
pub fn read_ivecs(path: &Path) -> Result<Vec<Vec<i32>>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut rows: Vec<Vec<i32>> = Vec::new();
    let mut file_dim: Option<usize> = None;

    while let Some(dim) = read_record_dim(&mut reader, path)? {
        match file_dim {
            None => file_dim = Some(dim),
            Some(expected) if expected != dim => {
                return Err(format_error(
                    path,
                    format!(
                        "record {} declares dimension {dim}, file dimension is {expected}",
                        rows.len()
                    ),
                ));
            }
            Some(_) => {}
        }
        let buf = read_payload(&mut reader, dim, path, rows.len())?;
        rows.push(
            buf.chunks_exact(4)
                .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        );
    }

    if rows.is_empty() {
        return Err(format_error(path, "file contains no records"));
    }
    Ok(rows)
}

/// Writes vectors as `.fvecs`.
///
/// # Errors
///
/// Fails on IO errors or if `vectors` rows disagree in length.
pub fn write_fvecs(path: &Path, vectors: &[Vec<f32>]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let dim = vectors.first().map_or(0, Vec::len);
    for v in vectors {
        if v.len() != dim {
            return Err(Error::DimensionMismatch {
                expected: dim,
                actual: v.len(),
            });
        }
        writer.write_all(&(dim as i32).to_le_bytes())?;
        for &x in v {
            writer.write_all(&x.to_le_bytes())?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Writes id rows as `.ivecs`.
///
/// # Errors
///
/// Fails on IO errors or if `rows` disagree in length.
pub fn write_ivecs(path: &Path, rows: &[Vec<i32>]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let dim = rows.first().map_or(0, Vec::len);
    for row in rows {
        if row.len() != dim {
            return Err(Error::DimensionMismatch {
                expected: dim,
                actual: row.len(),
            });
        }
        writer.write_all(&(dim as i32).to_le_bytes())?;
        for &x in row {
            writer.write_all(&x.to_le_bytes())?;
        }
    }
    writer.flush()?;
    Ok(())
}
