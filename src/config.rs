//! Session configuration: the immutable value built once from argv/env and
//! read by every later stage. See spec §3 (Data model).

use thiserror::Error;

/// Execution mode, decided once by [`crate::mode::detect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// This process is PID 1 of its namespace, typically inside a VM.
    Init,
    /// Effective UID is 0 on the host; mounts happen before the namespace clone.
    PrivilegedContainer,
    /// Ordinary user; mounts happen inside the cloned child.
    UnprivilegedContainer,
}

impl Mode {
    pub fn is_init(self) -> bool {
        matches!(self, Mode::Init)
    }
}

/// How a [`Mapping`]'s `outside` path should be mounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingKind {
    /// A plain host directory, bind-mounted in.
    LocalDir,
    /// `/dev/...` — mounted as a squashfs image.
    BlockSquashfs,
    /// `9p/<tag>` — mounted as a virtio-9p share, `tag` is the part after `9p/`.
    NinePShare { tag: String },
}

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("mapping '{0}' is missing a ':' separating outside and inside paths")]
    MissingColon(String),
    #[error("outside path '{0}' must be absolute or start with '9p/'")]
    InvalidOutside(String),
}

/// A single `outside:inside` mapping, either a read-only shard (`--map`) or
/// a read-write workspace (`--workspace`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub outside: String,
    pub inside: String,
    pub kind: MappingKind,
}

impl Mapping {
    /// Parse a `--map`/`--workspace` argument of the form `outside:inside`.
    ///
    /// `kind` is derived from `outside`'s prefix (spec §3):
    /// - `/dev/...`  -> `BlockSquashfs`
    /// - `9p/...`    -> `NinePShare { tag }`
    /// - `/...`      -> `LocalDir`
    /// - anything else is rejected; the caller drops the mapping and warns.
    pub fn parse(raw: &str) -> Result<Mapping, MappingError> {
        let (outside, inside) = raw
            .split_once(':')
            .ok_or_else(|| MappingError::MissingColon(raw.to_string()))?;

        let kind = if let Some(tag) = outside.strip_prefix("9p/") {
            MappingKind::NinePShare {
                tag: tag.to_string(),
            }
        } else if outside.starts_with("/dev/") {
            MappingKind::BlockSquashfs
        } else if outside.starts_with('/') {
            MappingKind::LocalDir
        } else {
            return Err(MappingError::InvalidOutside(outside.to_string()));
        };

        Ok(Mapping {
            outside: outside.to_string(),
            inside: inside.to_string(),
            kind,
        })
    }

    /// `inside` with any leading `/`s stripped, ready to be joined onto a
    /// chroot destination (spec §3 invariant).
    pub fn inside_relative(&self) -> &str {
        self.inside.trim_start_matches('/')
    }
}

/// The immutable, fully-resolved configuration for one sandbox invocation.
#[derive(Clone)]
pub struct SessionConfig {
    pub root_dir: String,
    pub work_cwd: Option<String>,
    pub uid: u32,
    pub gid: u32,
    pub shards: Vec<Mapping>,
    pub workspaces: Vec<Mapping>,
    pub argv: Vec<String>,
    pub env: Vec<(String, String)>,
    pub verbose: bool,
    pub mode: Mode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_local_dir() {
        let m = Mapping::parse("/host/shard:/opt/shard").unwrap();
        assert_eq!(m.kind, MappingKind::LocalDir);
        assert_eq!(m.outside, "/host/shard");
        assert_eq!(m.inside, "/opt/shard");
        assert_eq!(m.inside_relative(), "opt/shard");
    }

    #[test]
    fn parses_block_squashfs() {
        let m = Mapping::parse("/dev/vda:/opt/x").unwrap();
        assert_eq!(m.kind, MappingKind::BlockSquashfs);
    }

    #[test]
    fn parses_9p_share() {
        let m = Mapping::parse("9p/workspace:/workspace").unwrap();
        assert_eq!(
            m.kind,
            MappingKind::NinePShare {
                tag: "workspace".to_string()
            }
        );
    }

    #[test]
    fn rejects_relative_outside() {
        let err = Mapping::parse("relative_path:/x").unwrap_err();
        assert!(matches!(err, MappingError::InvalidOutside(_)));
    }

    #[test]
    fn rejects_missing_colon() {
        let err = Mapping::parse("/no/colon/here").unwrap_err();
        assert!(matches!(err, MappingError::MissingColon(_)));
    }

    #[test]
    fn strips_leading_slashes_for_join() {
        let m = Mapping::parse("/a:///triple/leading").unwrap();
        assert_eq!(m.inside_relative(), "triple/leading");
    }
}
