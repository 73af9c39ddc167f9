//! Namespace clone harness (§4.4): spawns the in-sandbox init into new PID,
//! mount, and user namespaces, and runs the two-pipe UID/GID-map handshake
//! across the clone boundary.
//!
//! `nix::sched::clone` is used instead of the more common fork()+unshare()
//! because unshare() only namespaces the caller's *future children*, not the
//! caller itself — this process must itself become PID 1 of the new
//! namespace.

use std::os::fd::{IntoRawFd, RawFd};

use nix::mount::{mount, MsFlags};
use nix::sched::CloneFlags;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{close, pipe, read, setresgid, setresuid, Gid, Pid, Uid};

use crate::checked;
use crate::config::{Mode, SessionConfig};
use crate::entry;
use crate::mount::mount_the_world;
use crate::teardown;

const CHILD_STACK_SIZE: usize = 1024 * 1024;

fn container_flags() -> CloneFlags {
    CloneFlags::CLONE_NEWPID | CloneFlags::CLONE_NEWNS | CloneFlags::CLONE_NEWUSER
}

/// Block on a pipe's read end until every copy of its write end is closed
/// ("close end = signal" discipline — never replace with a token-byte write;
/// see Design Notes, Cross-process coordination).
fn block_until_closed(fd: RawFd) {
    let mut buf = [0u8; 1];
    loop {
        match read(fd, &mut buf) {
            Ok(0) => return,
            Ok(_) => continue,
            Err(nix::errno::Errno::EINTR) => continue,
            Err(e) => {
                tracing::error!(file = file!(), line = line!(), error = %e, "handshake read failed");
                std::process::abort();
            }
        }
    }
}

extern "C" fn sigint_exit(_: i32) {
    // PID 1 of a namespace ignores signals by kernel default; this restores
    // the expected "SIGINT terminates" behavior for the supervisor (§4.4 step 2).
    unsafe { nix::unistd::_exit(130) };
}

fn reacquire_dumpability() {
    unsafe {
        nix::libc::prctl(nix::libc::PR_SET_DUMPABLE, 1, 0, 0, 0);
    }
}

fn install_sigint_handler() {
    unsafe {
        checked!(signal::signal(Signal::SIGINT, SigHandler::Handler(sigint_exit)));
    }
}

/// Write the UID/GID maps for `child_pid`: `uid_map`, then `setgroups=deny`,
/// then `gid_map`, in that order (§4.4 step 6 — `setgroups=deny` must
/// precede `gid_map`).
fn write_id_maps(child_pid: Pid, uid: u32, gid: u32) {
    let pid = child_pid.as_raw();
    checked!(std::fs::write(format!("/proc/{pid}/uid_map"), format!("0 {uid} 1\n")));
    checked!(std::fs::write(format!("/proc/{pid}/setgroups"), "deny"));
    checked!(std::fs::write(format!("/proc/{pid}/gid_map"), format!("0 {gid} 1\n")));
}

/// The child side of the handshake plus the rest of the in-sandbox init's
/// work. Runs entirely inside the new PID/mount/user namespaces.
fn run_container_init(
    config: SessionConfig,
    child_block_rd: RawFd,
    child_block_wr: RawFd,
    parent_block_rd: RawFd,
    parent_block_wr: RawFd,
) -> isize {
    // Step 1: close the ends this side doesn't own.
    let _ = close(child_block_wr);
    let _ = close(parent_block_rd);

    // Step 2.
    reacquire_dumpability();
    install_sigint_handler();

    // Step 3: signal the parent it may write the UID/GID maps.
    let _ = close(parent_block_wr);

    // Step 4: block until the parent has written the maps.
    block_until_closed(child_block_rd);
    let _ = close(child_block_rd);

    if matches!(config.mode, Mode::PrivilegedContainer) {
        checked!(setresuid(Uid::from_raw(0), Uid::from_raw(0), Uid::from_raw(0)));
        checked!(setresgid(Gid::from_raw(0), Gid::from_raw(0), Gid::from_raw(0)));
    } else {
        mount_the_world(&config);
    }

    let code = entry::run_sandbox(&config);
    teardown::restore_terminal();
    code as isize
}

/// Spawn the container init, run the full handshake, and block until it
/// exits. Returns the exit code to mirror on this process.
pub fn spawn_container(config: &SessionConfig) -> i32 {
    if matches!(config.mode, Mode::PrivilegedContainer) {
        // Run the mount composer in the parent, in a private copy of the
        // mount namespace, before the clone (§4.4 "Privileged container
        // mode differences").
        checked!(nix::sched::unshare(CloneFlags::CLONE_NEWNS));
        checked!(mount(
            None::<&str>,
            "/",
            None::<&str>,
            MsFlags::MS_PRIVATE | MsFlags::MS_REC,
            None::<&str>,
        ));
        mount_the_world(config);
    }

    let (child_block_rd, child_block_wr) = checked!(pipe());
    let (parent_block_rd, parent_block_wr) = checked!(pipe());
    let child_block_rd = child_block_rd.into_raw_fd();
    let child_block_wr = child_block_wr.into_raw_fd();
    let parent_block_rd = parent_block_rd.into_raw_fd();
    let parent_block_wr = parent_block_wr.into_raw_fd();

    let child_config = config.clone();
    let mut stack = vec![0u8; CHILD_STACK_SIZE];
    let child_fn = Box::new(move || -> isize {
        run_container_init(
            child_config.clone(),
            child_block_rd,
            child_block_wr,
            parent_block_rd,
            parent_block_wr,
        )
    });

    let child_pid = checked!(unsafe {
        nix::sched::clone(
            child_fn,
            stack.as_mut_slice(),
            container_flags(),
            Some(nix::libc::SIGCHLD),
        )
    });

    // Step 5: close the ends this side doesn't own.
    let _ = close(child_block_rd);
    let _ = close(parent_block_wr);

    block_until_closed(parent_block_rd);
    let _ = close(parent_block_rd);

    write_id_maps(child_pid, config.uid, config.gid);

    // Step 7: unblock the child.
    let _ = close(child_block_wr);

    match checked!(waitpid(child_pid, None)) {
        WaitStatus::Exited(_, code) => code,
        WaitStatus::Signaled(_, _, _) => 1,
        _ => 1,
    }
}
