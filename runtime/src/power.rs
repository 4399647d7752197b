//! Host power control.

use warden_core::{Result, WardenError};

/// Host power capability used by the reboot supervisor.
pub trait HostPower: Send + Sync {
    /// Perform a cold reset of the host. On real hardware this call does
    /// not return on success.
    fn cold_reset(&self) -> Result<()>;
}

/// Cold reset through the kernel reboot syscall.
#[cfg(target_os = "linux")]
pub struct LinuxPower;

#[cfg(target_os = "linux")]
impl HostPower for LinuxPower {
    fn cold_reset(&self) -> Result<()> {
        // Flush pending writes before the reset takes the disks down.
        unsafe {
            libc::sync();
        }

        let rc = unsafe { libc::reboot(libc::RB_AUTOBOOT) };
        if rc != 0 {
            return Err(WardenError::Io(std::io::Error::last_os_error()));
        }
        Ok(())
    }
}

/// Logging stand-in for hosts where a real reset is unwanted (development,
/// tests, dry runs).
pub struct NullPower;

impl HostPower for NullPower {
    fn cold_reset(&self) -> Result<()> {
        tracing::warn!("Cold reset requested; ignoring (null power adapter)");
        Ok(())
    }
}
