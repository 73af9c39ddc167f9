//! Overlay workdir: a fresh tmpfs holding `upper/` and `work/` roots for
//! every overlay this session stacks (§4.3 step 1).

use std::path::{Path, PathBuf};

use nix::mount::{mount, MsFlags};

use crate::checked;

/// Reused as the workdir mount point: the path already exists outside the
/// chroot and gets shadowed by a real procfs mount later (§4.3 steps 1, 7).
pub const WORKDIR_PATH: &str = "/proc";

pub fn upper_dir(name: &str) -> PathBuf {
    Path::new(WORKDIR_PATH).join("upper").join(name)
}

pub fn work_dir(name: &str) -> PathBuf {
    Path::new(WORKDIR_PATH).join("work").join(name)
}

/// Mount a >=1 GiB tmpfs at [`WORKDIR_PATH`] and create its `upper/`/`work/`
/// roots.
pub fn create_overlay_workdir() {
    checked!(mount(
        Some("tmpfs"),
        WORKDIR_PATH,
        Some("tmpfs"),
        MsFlags::empty(),
        Some("size=1G"),
    ));
    checked!(std::fs::create_dir_all(Path::new(WORKDIR_PATH).join("upper")));
    checked!(std::fs::create_dir_all(Path::new(WORKDIR_PATH).join("work")));
}

/// Stack an overlay named `name` on top of `dest`, with `lower = lower`.
/// Creates `upper/<name>` and `work/<name>` under the workdir on demand.
pub fn stack_overlay(lower: &Path, name: &str, dest: &Path) {
    let upper = upper_dir(name);
    let work = work_dir(name);
    checked!(std::fs::create_dir_all(&upper));
    checked!(std::fs::create_dir_all(&work));
    checked!(std::fs::create_dir_all(dest));

    let options = format!(
        "lowerdir={},upperdir={},workdir={}",
        lower.display(),
        upper.display(),
        work.display(),
    );
    checked!(mount(
        Some("overlay"),
        dest,
        Some("overlay"),
        MsFlags::empty(),
        Some(options.as_str()),
    ));
}
