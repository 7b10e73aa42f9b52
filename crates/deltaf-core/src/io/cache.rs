use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use memmap2::Mmap;
use ndarray::{Array, ArrayD, Dimension, IxDyn};
use tracing::{debug, info, warn};

use crate::consts::{CACHE_EXTENSION, CACHE_MAGIC, CACHE_VERSION};
use crate::error::{DeltaError, Result};

/// Header size before the shape: magic + version + ndim.
const CACHE_PREAMBLE_SIZE: usize = 4 + 4 + 4;

/// How a `load_or_compute` call was satisfied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheStatus {
    /// The cached array matched and was reused.
    Hit,
    /// No cached array existed; it was computed and stored.
    Miss,
    /// A cached array existed but was unreadable or had the wrong shape; it was recomputed.
    Stale,
}

/// Directory of derived arrays keyed by source identity.
///
/// The source files stay the source of truth: a cached array is only reused
/// while its leading dimension matches the expected frame count.
#[derive(Clone, Debug)]
pub struct ArrayCache {
    dir: PathBuf,
}

impl ArrayCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that stores the array for `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.{CACHE_EXTENSION}"))
    }

    /// Return the cached array for `key` if its first axis has `expected_length`
    /// entries, otherwise run `compute`, store its result, and return it.
    pub fn load_or_compute<D, F>(
        &self,
        key: &str,
        compute: F,
        expected_length: usize,
    ) -> Result<(Array<f64, D>, CacheStatus)>
    where
        D: Dimension,
        F: FnOnce() -> Result<Array<f64, D>>,
    {
        let path = self.path_for(key);
        let mut status = CacheStatus::Miss;

        if path.exists() {
            match read_array(&path).and_then(into_dim::<D>) {
                Ok(array) if array.shape().first() == Some(&expected_length) => {
                    debug!(key, path = %path.display(), "Cache hit");
                    return Ok((array, CacheStatus::Hit));
                }
                Ok(array) => {
                    info!(
                        key,
                        cached = array.shape().first().copied().unwrap_or(0),
                        expected = expected_length,
                        "Cached array has a different frame count; recomputing"
                    );
                    status = CacheStatus::Stale;
                }
                Err(e) => {
                    warn!(key, error = %e, "Unreadable cache entry; recomputing");
                    status = CacheStatus::Stale;
                }
            }
        }

        let array = compute()?;
        write_array(&path, &array)?;
        info!(key, shape = ?array.shape(), "Cached derived array");
        Ok((array, status))
    }

    /// Remove the cached array for `key`, if any.
    pub fn invalidate(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

fn into_dim<D: Dimension>(array: ArrayD<f64>) -> Result<Array<f64, D>> {
    array
        .into_dimensionality::<D>()
        .map_err(|e| DeltaError::Cache(format!("dimensionality mismatch: {e}")))
}

/// Write an array as `DFFC | version | ndim | shape... | values...`, little-endian.
pub fn write_array<D: Dimension>(path: &Path, array: &Array<f64, D>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension(format!("{CACHE_EXTENSION}.tmp"));
    {
        let mut w = BufWriter::new(File::create(&tmp)?);
        w.write_all(CACHE_MAGIC)?;
        w.write_u32::<LittleEndian>(CACHE_VERSION)?;
        w.write_u32::<LittleEndian>(array.ndim() as u32)?;
        for &dim in array.shape() {
            w.write_u64::<LittleEndian>(dim as u64)?;
        }
        for &v in array.iter() {
            w.write_f64::<LittleEndian>(v)?;
        }
        w.flush()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Read an array written by [`write_array`].
pub fn read_array(path: &Path) -> Result<ArrayD<f64>> {
    let file = File::open(path)?;
    if file.metadata()?.len() < CACHE_PREAMBLE_SIZE as u64 {
        return Err(DeltaError::Cache("file too small for header".into()));
    }
    let mmap = unsafe { Mmap::map(&file)? };
    let mut cursor = Cursor::new(&mmap[..]);

    let mut magic = [0u8; 4];
    cursor.read_exact(&mut magic)?;
    if &magic != CACHE_MAGIC {
        return Err(DeltaError::Cache("missing DFFC magic".into()));
    }
    let version = cursor.read_u32::<LittleEndian>()?;
    if version != CACHE_VERSION {
        return Err(DeltaError::Cache(format!("unsupported version {version}")));
    }

    let ndim = cursor.read_u32::<LittleEndian>()? as usize;
    let header_left = mmap.len() - CACHE_PREAMBLE_SIZE;
    if ndim.checked_mul(8).is_none_or(|bytes| bytes > header_left) {
        return Err(DeltaError::Cache(format!(
            "header claims {ndim} dims, file has {header_left} bytes left"
        )));
    }
    let mut shape = Vec::with_capacity(ndim);
    for _ in 0..ndim {
        shape.push(cursor.read_u64::<LittleEndian>()? as usize);
    }

    let count = shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| DeltaError::Cache("shape overflows".into()))?;
    let remaining = mmap.len() - cursor.position() as usize;
    if count.checked_mul(8) != Some(remaining) {
        return Err(DeltaError::Cache(format!(
            "expected {count} values, found {remaining} bytes"
        )));
    }

    let mut values = vec![0.0f64; count];
    cursor.read_f64_into::<LittleEndian>(&mut values)?;
    ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|e| DeltaError::Cache(e.to_string()))
}
