//! Command-line surface (§6). No subcommands: this binary does one thing.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "sandbox",
    version,
    about = "Run a command inside an ephemeral overlay root filesystem"
)]
pub struct Cli {
    /// Outside path to the base rootfs. Required unless running as init.
    #[arg(long)]
    pub rootfs: Option<String>,

    /// Directory to change to after chroot, interpreted inside the sandbox.
    #[arg(long)]
    pub cd: Option<String>,

    /// Read-only shard: `outside:inside`. Repeatable.
    #[arg(long = "map")]
    pub map: Vec<String>,

    /// Writable bind mount: `outside:inside`. Repeatable.
    #[arg(long)]
    pub workspace: Vec<String>,

    /// Raise log verbosity to debug.
    #[arg(long)]
    pub verbose: bool,

    /// Program to run, followed by its arguments.
    ///
    /// Not marked `required`: a missing program is a pre-flight rejection
    /// (exit 1), not a clap usage error (exit 2) — see the manual check in
    /// `main.rs` alongside the `--rootfs` check (§6).
    #[arg(trailing_var_arg = true)]
    pub argv: Vec<String>,
}

impl Cli {
    /// `--rootfs` with a trailing `/` stripped (§4.3 tie-break).
    pub fn rootfs_trimmed(&self) -> Option<String> {
        self.rootfs
            .as_deref()
            .map(|s| s.trim_end_matches('/').to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeats_map_and_workspace_in_insertion_order() {
        let cli = Cli::parse_from([
            "sandbox",
            "--rootfs",
            "/rfs",
            "--map",
            "/a:/x",
            "--map",
            "/b:/y",
            "--workspace",
            "/c:/z",
            "/bin/true",
        ]);
        assert_eq!(cli.map, vec!["/a:/x", "/b:/y"]);
        assert_eq!(cli.workspace, vec!["/c:/z"]);
        assert_eq!(cli.argv, vec!["/bin/true"]);
    }

    #[test]
    fn trailing_var_arg_captures_flags_after_program() {
        let cli = Cli::parse_from(["sandbox", "--rootfs", "/rfs", "/bin/sh", "-c", "echo hi"]);
        assert_eq!(cli.argv, vec!["/bin/sh", "-c", "echo hi"]);
    }

    #[test]
    fn strips_trailing_slash_from_rootfs() {
        let cli = Cli::parse_from(["sandbox", "--rootfs", "/rfs/", "/bin/true"]);
        assert_eq!(cli.rootfs_trimmed().as_deref(), Some("/rfs"));
    }

    #[test]
    fn missing_program_parses_as_empty_argv_not_a_clap_error() {
        let cli = Cli::parse_from(["sandbox", "--rootfs", "/rfs"]);
        assert!(cli.argv.is_empty());
    }
}
