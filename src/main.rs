mod cli;
mod config;
mod entry;
mod logging;
mod mode;
mod mount;
mod namespace;
mod sys;
mod teardown;
mod transport;

use clap::Parser;
use nix::unistd::setsid;

use crate::checked;
use cli::Cli;
use config::{Mapping, SessionConfig};

fn main() {
    let detected_mode = mode::detect();

    let cli = if detected_mode.is_init() {
        let spec = transport::read_launch_spec();
        install_environment(&spec.env);
        Cli::parse_from(spec.argv)
    } else {
        Cli::parse()
    };

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("sandbox: failed to initialize logging: {e}");
        std::process::exit(1);
    }

    let rootfs = cli.rootfs_trimmed();
    if !detected_mode.is_init() && rootfs.is_none() {
        tracing::error!("--rootfs is required outside init mode");
        std::process::exit(1);
    }
    if cli.argv.is_empty() {
        tracing::error!("missing command: a program to run is required");
        std::process::exit(1);
    }

    let (uid, gid) = mode::resolve_uid_gid();

    let config = SessionConfig {
        root_dir: rootfs.unwrap_or_default(),
        work_cwd: cli.cd.clone(),
        uid,
        gid,
        shards: parse_mappings(&cli.map),
        workspaces: parse_mappings(&cli.workspace),
        argv: cli.argv.clone(),
        env: Vec::new(),
        verbose: cli.verbose,
        mode: detected_mode,
    };

    if detected_mode.is_init() {
        acquire_controlling_terminal();
        mount::mount_the_world(&config);
        let _ = entry::run_sandbox(&config);
        teardown::restore_terminal();
        teardown::power_off();
    } else {
        let code = namespace::spawn_container(&config);
        std::process::exit(code);
    }
}

/// Init mode only: become a session leader and claim the VM console as the
/// controlling terminal, so `teardown::restore_terminal`'s `tcsetpgrp` later
/// has a real controlling terminal to hand back.
fn acquire_controlling_terminal() {
    checked!(setsid());
    let ret = unsafe { nix::libc::ioctl(0, nix::libc::TIOCSCTTY as _, 1) };
    if ret < 0 {
        tracing::error!(
            file = file!(),
            line = line!(),
            error = %std::io::Error::last_os_error(),
            "fatal syscall failure, aborting"
        );
        std::process::abort();
    }
}

/// Init mode replaces the inherited environment entirely (§4.2).
fn install_environment(env: &[(String, String)]) {
    for (key, _) in std::env::vars() {
        std::env::remove_var(key);
    }
    for (key, value) in env {
        std::env::set_var(key, value);
    }
}

fn parse_mappings(raw: &[String]) -> Vec<Mapping> {
    raw.iter()
        .filter_map(|s| match Mapping::parse(s) {
            Ok(m) => Some(m),
            Err(e) => {
                tracing::warn!(mapping = s.as_str(), error = %e, "dropping malformed mapping");
                None
            }
        })
        .collect()
}
