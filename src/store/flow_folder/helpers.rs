// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowsplit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowsplit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

// Flow folder helpers: filename-safe node ids, path validation, and atomic writes.

static TEMP_FILE_COUNTER: AtomicU64 = AtomicU64::new(0);

const RESERVED_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// The file name stem for a node's sidecars: the id itself when it is portable, otherwise `~`
/// followed by the id's UTF-8 bytes in lowercase hex.
fn sidecar_file_stem(node_id: &str) -> String {
    if is_portable_file_stem(node_id) {
        return node_id.to_owned();
    }
    node_id.bytes().fold(String::from("~"), |mut stem, byte| {
        stem.push_str(&format!("{byte:02x}"));
        stem
    })
}

fn is_portable_file_stem(node_id: &str) -> bool {
    // `~` is reserved for escaped stems; `.` and `..` are caught by the trailing-dot check.
    if node_id.is_empty() || node_id.starts_with('~') || node_id.ends_with(['.', ' ']) {
        return false;
    }
    let device = node_id.split('.').next().unwrap_or_default();
    !is_reserved_device_name(device)
        && !node_id
            .chars()
            .any(|ch| ch.is_control() || RESERVED_FILENAME_CHARS.contains(&ch))
}

/// `CON`, `PRN`, `AUX`, `NUL`, `COM1`-`COM9` and `LPT1`-`LPT9`, in any case.
fn is_reserved_device_name(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    if matches!(upper.as_str(), "CON" | "PRN" | "AUX" | "NUL") {
        return true;
    }
    let port = upper.strip_prefix("COM").or_else(|| upper.strip_prefix("LPT"));
    matches!(port.map(str::as_bytes), Some([b'1'..=b'9']))
}

/// Non-empty, relative, and free of `..`.
fn is_safe_relative_path(path: &Path) -> bool {
    if path.as_os_str().is_empty() || path.is_absolute() {
        return false;
    }

    path.components().all(|component| {
        matches!(component, Component::CurDir | Component::Normal(_))
    })
}

fn to_relative_path(folder: &Path, path: &Path) -> Result<PathBuf, StoreError> {
    let outside = || StoreError::PathOutsideFolder {
        folder: folder.to_path_buf(),
        path: path.to_path_buf(),
    };

    let relative = path.strip_prefix(folder).map_err(|_| outside())?;
    if !is_safe_relative_path(relative) {
        return Err(outside());
    }
    Ok(relative.to_path_buf())
}

/// Moves the temp file over `to`. On Windows an existing target can block the rename; it is
/// removed and the rename retried once.
fn replace_file(from: &Path, to: &Path) -> io::Result<()> {
    let renamed = fs::rename(from, to);
    if cfg!(windows) {
        if let Err(err) = &renamed {
            if matches!(
                err.kind(),
                io::ErrorKind::AlreadyExists | io::ErrorKind::PermissionDenied
            ) {
                let _ = fs::remove_file(to);
                return fs::rename(from, to);
            }
        }
    }
    renamed
}

/// A temp file that is removed again when dropped, unless it was renamed into place.
struct PendingFile {
    path: PathBuf,
    file: Option<fs::File>,
    persisted: bool,
}

impl PendingFile {
    fn create(path: PathBuf) -> io::Result<Self> {
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        Ok(Self {
            path,
            file: Some(file),
            persisted: false,
        })
    }

    fn write(&mut self, contents: &[u8], durability: WriteDurability) -> io::Result<()> {
        let Some(file) = self.file.as_mut() else {
            return Err(io::Error::other("temp file already closed"));
        };
        file.write_all(contents)?;
        if durability == WriteDurability::Durable {
            file.sync_all()?;
        }
        Ok(())
    }

    fn persist(mut self, to: &Path) -> io::Result<()> {
        drop(self.file.take());
        replace_file(&self.path, to)?;
        self.persisted = true;
        Ok(())
    }
}

impl Drop for PendingFile {
    fn drop(&mut self) {
        drop(self.file.take());
        if !self.persisted {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Writes `contents` to `path` (which must sit inside `folder`) via temp file and rename.
fn write_atomic_in_folder(
    folder: &Path,
    path: &Path,
    contents: &[u8],
    durability: WriteDurability,
) -> Result<(), StoreError> {
    fs::create_dir_all(folder).map_err(|source| StoreError::Io {
        path: folder.to_path_buf(),
        source,
    })?;

    to_relative_path(folder, path)?;

    match fs::symlink_metadata(path) {
        Ok(md) if md.file_type().is_symlink() => {
            return Err(StoreError::SymlinkRefused {
                path: path.to_path_buf(),
            });
        }
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    let Some(parent) = path.parent() else {
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source: io::Error::other("path has no parent"),
        });
    };

    let Some(file_name) = path.file_name() else {
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source: io::Error::other("path has no file name"),
        });
    };

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let counter = TEMP_FILE_COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_path = parent.join(format!(
        ".flowsplit.tmp.{}.{nanos}.{counter}",
        file_name.to_string_lossy(),
    ));

    let tmp_err = |source| StoreError::Io {
        path: tmp_path.clone(),
        source,
    };
    let mut pending = PendingFile::create(tmp_path.clone()).map_err(tmp_err)?;
    pending.write(contents, durability).map_err(tmp_err)?;
    pending.persist(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if durability == WriteDurability::Durable {
        #[cfg(unix)]
        {
            let dir = fs::File::open(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
            dir.sync_all().map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    Ok(())
}
