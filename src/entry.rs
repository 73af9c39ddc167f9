//! Sandbox entry and reap loop (§4.5): enters the chroot, forks the target
//! program, and acts as a minimal PID-1 init until it exits.

use std::ffi::CString;

use nix::sys::signal::{SigSet, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{chdir, chroot, execv, fork, ForkResult, Pid};

use crate::checked;
use crate::config::SessionConfig;
use crate::mount::DEST;

/// Runs the target program inside the prepared mount view and supervises it.
/// Returns the exit code to report for the whole sandbox invocation.
pub fn run_sandbox(config: &SessionConfig) -> i32 {
    checked!(chdir(DEST));
    checked!(chroot("."));

    if let Some(cwd) = &config.work_cwd {
        checked!(chdir(cwd.as_str()));
    }

    match checked!(unsafe { fork() }) {
        ForkResult::Child => exec_target(&config.argv),
        ForkResult::Parent { child } => reap_loop(child),
    }
}

fn exec_target(argv: &[String]) -> ! {
    let cstrings: Vec<CString> = argv
        .iter()
        .map(|s| CString::new(s.as_str()).expect("argv entry contains NUL"))
        .collect();
    // execv, not execvp: argv[0] is exec'd literally, with no $PATH search,
    // matching the original's execve(sandbox_argv[0], ...) (§4.5 step 3).
    let err = execv(&cstrings[0], &cstrings).expect_err("execv returned");
    tracing::error!(error = %err, program = argv[0].as_str(), "execv failed");
    std::process::exit(1);
}

/// Blocks `SIGCHLD`, then loops `sigwait` -> drain `waitpid(-1, WNOHANG)`,
/// reaping every orphan. Returns once the primary child's exit is observed,
/// decoding its exit status (abnormal termination is reported as 1).
fn reap_loop(primary: Pid) -> i32 {
    let mut mask = SigSet::empty();
    mask.add(Signal::SIGCHLD);
    checked!(mask.thread_block());

    loop {
        checked!(mask.wait());

        loop {
            match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::Exited(pid, code)) if pid == primary => return code,
                Ok(WaitStatus::Signaled(pid, _, _)) if pid == primary => return 1,
                Ok(WaitStatus::StillAlive) => break,
                Ok(_) => continue,
                Err(nix::errno::Errno::ECHILD) => break,
                Err(e) => {
                    tracing::error!(file = file!(), line = line!(), error = %e, "waitpid failed");
                    std::process::abort();
                }
            }
        }
    }
}
