//! Raw port transport: byte access to the index/data port pair and
//! exclusive claims on the port range.

use crate::error::Result;

/// Byte-wide access to x86 I/O ports plus exclusive ownership of port ranges.
///
/// Register reads and writes must only be issued while the caller holds the
/// region covering those ports (see [`crate::session::Session`]).
pub trait PortIo: Send + Sync {
    /// Reads one byte from `port`.
    fn read_byte(&self, port: u16) -> Result<u8>;

    /// Writes one byte to `port`.
    fn write_byte(&self, port: u16, value: u8) -> Result<()>;

    /// Atomically claims `len` ports starting at `base`.
    ///
    /// Returns [`crate::Error::AddressBusy`] if the range is already held by
    /// anyone, including other processes. Never blocks.
    fn request_region(&self, base: u16, len: u16) -> Result<()>;

    /// Releases a range previously claimed with [`PortIo::request_region`].
    fn release_region(&self, base: u16, len: u16);
}

#[cfg(target_os = "linux")]
pub use self::linux::DevPort;

#[cfg(target_os = "linux")]
mod linux {
    use super::PortIo;
    use crate::consts;
    use crate::error::{Error, Result};
    use log::{debug, trace};
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::fs::{File, OpenOptions, TryLockError};
    use std::os::unix::fs::FileExt;
    use std::path::{Path, PathBuf};

    /// Port transport backed by the Linux `/dev/port` character device.
    ///
    /// Region claims take a non-blocking exclusive lock (`flock` on Linux) on
    /// a per-address lock file, so they exclude other processes using the same
    /// lock directory as well as other sessions in this process. Claims are keyed on the base address.
    ///
    /// Requires `CAP_SYS_RAWIO` (usually root).
    #[derive(Debug)]
    pub struct DevPort {
        port: File,
        lock_dir: PathBuf,
        claims: Mutex<HashMap<u16, File>>,
    }

    impl DevPort {
        /// Opens `/dev/port` and uses `/run/lock` for region lock files.
        pub fn new() -> Result<Self> {
            Self::with_paths(consts::DEV_PORT_PATH, consts::LOCK_DIR)
        }

        /// Opens the given port device and keeps region lock files in `lock_dir`.
        pub fn with_paths(port_path: impl AsRef<Path>, lock_dir: impl Into<PathBuf>) -> Result<Self> {
            let port_path = port_path.as_ref();
            let port = OpenOptions::new().read(true).write(true).open(port_path)?;
            let lock_dir = lock_dir.into();
            debug!(
                "Opened port device {} (lock dir {})",
                port_path.display(),
                lock_dir.display()
            );
            Ok(Self {
                port,
                lock_dir,
                claims: Mutex::new(HashMap::new()),
            })
        }

        fn lock_path(&self, base: u16) -> PathBuf {
            self.lock_dir.join(format!("superio-0x{:04x}.lock", base))
        }
    }

    impl PortIo for DevPort {
        fn read_byte(&self, port: u16) -> Result<u8> {
            let mut buf = [0u8; 1];
            self.port.read_exact_at(&mut buf, u64::from(port))?;
            trace!("inb(0x{:04x}) = 0x{:02x}", port, buf[0]);
            Ok(buf[0])
        }

        fn write_byte(&self, port: u16, value: u8) -> Result<()> {
            trace!("outb(0x{:02x}, 0x{:04x})", value, port);
            self.port.write_all_at(&[value], u64::from(port))?;
            Ok(())
        }

        fn request_region(&self, base: u16, len: u16) -> Result<()> {
            let mut claims = self.claims.lock();
            if claims.contains_key(&base) {
                return Err(Error::AddressBusy { address: base });
            }

            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(self.lock_path(base))?;
            match file.try_lock() {
                Ok(()) => {}
                Err(TryLockError::WouldBlock) => {
                    return Err(Error::AddressBusy { address: base });
                }
                Err(TryLockError::Error(e)) => return Err(e.into()),
            }

            trace!("Claimed region 0x{:04x}+{}", base, len);
            claims.insert(base, file);
            Ok(())
        }

        fn release_region(&self, base: u16, len: u16) {
            // Closing the lock file drops the lock.
            if self.claims.lock().remove(&base).is_some() {
                trace!("Released region 0x{:04x}+{}", base, len);
            }
        }
    }
}
