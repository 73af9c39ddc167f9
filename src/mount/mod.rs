//! Mount composer: a single straight-line `mount_the_world`, parameterized by
//! `(root_dir, dest)`, shared across all three modes (§4.3, Design Notes
//! "Three-mode convergence"). Step order is load-bearing; do not reorder.

pub mod dev;
pub mod shards;
pub mod workdir;

use std::path::Path;

use nix::unistd::{chown, Gid, Uid};

use crate::checked;
use crate::config::SessionConfig;

use dev::{mount_dev, mount_procfs, restore_outer_procfs};
use shards::{mount_shard, mount_workspace};
use workdir::{create_overlay_workdir, stack_overlay};

/// Where the fully-assembled view lives before `chroot` (§4.5 step 1).
pub const DEST: &str = "/tmp/sandbox_root";

pub fn mount_the_world(config: &SessionConfig) {
    create_overlay_workdir();

    let dest = Path::new(DEST);
    let lower = if config.root_dir.is_empty() {
        "/"
    } else {
        config.root_dir.as_str()
    };
    stack_overlay(Path::new(lower), "rootfs", dest);
    checked!(chown(
        dest,
        Some(Uid::from_raw(config.uid)),
        Some(Gid::from_raw(config.gid)),
    ));

    for mapping in config.shards.iter().rev() {
        mount_shard(dest, mapping);
    }

    mount_procfs(dest);
    mount_dev(dest, config.mode);

    for mapping in config.workspaces.iter().rev() {
        mount_workspace(dest, mapping);
    }

    restore_outer_procfs();
}
