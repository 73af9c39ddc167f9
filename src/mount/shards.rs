//! Shard and workspace mounting: one primitive per [`MappingKind`], then an
//! overlay stacked on top of every shard (§4.3 steps 3, 6).

use std::path::Path;

use nix::mount::{mount, MsFlags};

use crate::checked;
use crate::config::{Mapping, MappingKind};
use crate::mount::workdir::stack_overlay;

/// Mount one shard under `dest` and stack its protective overlay on top.
/// Iterate shards in reverse insertion order at the call site (§3, §4.3).
pub fn mount_shard(dest: &Path, mapping: &Mapping) {
    let target = dest.join(mapping.inside_relative());
    checked!(std::fs::create_dir_all(&target));

    match &mapping.kind {
        MappingKind::BlockSquashfs => {
            checked!(mount(
                Some(mapping.outside.as_str()),
                &target,
                Some("squashfs"),
                MsFlags::empty(),
                None::<&str>,
            ));
        }
        MappingKind::NinePShare { tag } => {
            checked!(mount(
                Some(tag.as_str()),
                &target,
                Some("9p"),
                MsFlags::MS_RDONLY,
                Some("trans=virtio,version=9p2000.L"),
            ));
        }
        MappingKind::LocalDir => {
            checked!(mount(
                Some(mapping.outside.as_str()),
                &target,
                None::<&str>,
                MsFlags::MS_BIND,
                None::<&str>,
            ));
            checked!(mount(
                None::<&str>,
                &target,
                None::<&str>,
                MsFlags::MS_BIND
                    | MsFlags::MS_REMOUNT
                    | MsFlags::MS_RDONLY
                    | MsFlags::MS_NODEV
                    | MsFlags::MS_NOSUID,
                None::<&str>,
            ));
        }
    }

    let name = basename(&target);
    stack_overlay(&target, &name, &target);
}

/// Bind (or 9p-mount) a workspace under `dest`. Writes persist to the host,
/// so no overlay is stacked — unlike shards, `REC` is used because the
/// workspace may already contain further submounts.
pub fn mount_workspace(dest: &Path, mapping: &Mapping) {
    let target = dest.join(mapping.inside_relative());
    checked!(std::fs::create_dir_all(&target));

    match &mapping.kind {
        MappingKind::NinePShare { tag } => {
            checked!(mount(
                Some(tag.as_str()),
                &target,
                Some("9p"),
                MsFlags::empty(),
                Some("trans=virtio,version=9p2000.L"),
            ));
        }
        _ => {
            checked!(mount(
                Some(mapping.outside.as_str()),
                &target,
                None::<&str>,
                MsFlags::MS_BIND | MsFlags::MS_REC,
                None::<&str>,
            ));
        }
    }
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "shard".to_string())
}
