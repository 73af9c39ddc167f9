//! Mode detection and the uid/gid pair the session maps to root (§4.1).

use nix::unistd::{getpid, geteuid, Pid};

use crate::config::Mode;

/// PID 1 means we are the init of our own namespace (typically inside a VM);
/// euid 0 otherwise means the host handed us real root.
pub fn detect() -> Mode {
    if getpid() == Pid::from_raw(1) {
        Mode::Init
    } else if geteuid().is_root() {
        Mode::PrivilegedContainer
    } else {
        Mode::UnprivilegedContainer
    }
}

/// The uid/gid to install as root inside the user namespace.
///
/// `SUDO_UID`/`SUDO_GID` win over the live ids: under a setuid-style
/// escalation helper the live ids are already 0:0, and the only useful
/// mapping is back to the user who invoked the helper.
pub fn resolve_uid_gid() -> (u32, u32) {
    let uid = std::env::var("SUDO_UID")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(|| nix::unistd::getuid().as_raw());
    let gid = std::env::var("SUDO_GID")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(|| nix::unistd::getgid().as_raw());
    (uid, gid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_live_ids_without_sudo_env() {
        std::env::remove_var("SUDO_UID");
        std::env::remove_var("SUDO_GID");
        let (uid, gid) = resolve_uid_gid();
        assert_eq!(uid, nix::unistd::getuid().as_raw());
        assert_eq!(gid, nix::unistd::getgid().as_raw());
    }

    #[test]
    fn prefers_sudo_env_when_present() {
        std::env::set_var("SUDO_UID", "1000");
        std::env::set_var("SUDO_GID", "1000");
        let (uid, gid) = resolve_uid_gid();
        assert_eq!(uid, 1000);
        assert_eq!(gid, 1000);
        std::env::remove_var("SUDO_UID");
        std::env::remove_var("SUDO_GID");
    }
}
