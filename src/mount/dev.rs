//! `/proc` and `/dev` setup inside the overlayed destination (§4.3 steps 4, 5).

use std::path::Path;

use nix::mount::{mount, MsFlags};
use nix::sys::stat::Mode;

use crate::checked;
use crate::config::Mode as SessionMode;

pub fn mount_procfs(dest: &Path) {
    let target = dest.join("proc");
    checked!(std::fs::create_dir_all(&target));
    checked!(mount(
        Some("proc"),
        &target,
        Some("proc"),
        MsFlags::empty(),
        None::<&str>,
    ));
}

/// Init mode gets a real devtmpfs (nothing else has populated `/dev` yet);
/// container modes just need `/dev/null` (and `/dev/urandom`, if the host
/// has one) bound in from the host.
pub fn mount_dev(dest: &Path, mode: SessionMode) {
    let dev = dest.join("dev");
    checked!(std::fs::create_dir_all(&dev));

    if mode.is_init() {
        checked!(mount(
            Some("devtmpfs"),
            &dev,
            Some("devtmpfs"),
            MsFlags::empty(),
            None::<&str>,
        ));
        let pts = dev.join("pts");
        checked!(std::fs::create_dir_all(&pts));
        checked!(nix::sys::stat::fchmodat(
            None,
            &pts,
            Mode::from_bits_truncate(0o600),
            nix::sys::stat::FchmodatFlags::FollowSymlink,
        ));
        return;
    }

    bind_dev_node(&dev, "null");
    if Path::new("/dev/urandom").exists() {
        bind_dev_node(&dev, "urandom");
    }
}

fn bind_dev_node(dev: &Path, name: &str) {
    let target = dev.join(name);
    checked!(std::fs::File::create(&target));
    checked!(mount(
        Some(Path::new("/dev").join(name).as_path()),
        &target,
        None::<&str>,
        MsFlags::MS_BIND,
        None::<&str>,
    ));
}

/// Mount a plain procfs back at the outer `/proc` path once the workdir
/// tmpfs there is no longer needed (§4.3 step 7) — harmless once the chroot
/// below takes effect.
pub fn restore_outer_procfs() {
    checked!(mount(
        Some("proc"),
        "/proc",
        Some("proc"),
        MsFlags::empty(),
        None::<&str>,
    ));
}
