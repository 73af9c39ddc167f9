//! Teardown (§4.6): hand the controlling terminal back to the outer process
//! group, and in init mode, power the machine off.

use nix::sys::reboot::{reboot, RebootMode};
use nix::sys::signal::{self, SigHandler, Signal};
use nix::unistd::{getpgrp, sync, tcsetpgrp};

use crate::checked;

/// Restores the original foreground process group on the controlling tty.
/// `SIGTTOU` is ignored first since a background process attempting this
/// would otherwise be stopped by it.
pub fn restore_terminal() {
    unsafe {
        let _ = signal::signal(Signal::SIGTTOU, SigHandler::SigIgn);
    }
    let pgrp = getpgrp();
    let _ = tcsetpgrp(std::io::stdin(), pgrp);
}

/// Init-mode-only: `sync()` then power off. Never returns.
pub fn power_off() -> ! {
    sync();
    checked!(reboot(RebootMode::RB_POWER_OFF));
    unreachable!("reboot(RB_POWER_OFF) returned")
}
