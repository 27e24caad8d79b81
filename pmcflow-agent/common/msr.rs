use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::common::affinity::{first_cpu, AffinityGuard, PinGuard};
use crate::error::{PmcError, Result};

/// Access to numbered 64-bit hardware registers plus execution pinning.
///
/// A failed access is always an `Err`; `Ok(0)` means the register really
/// holds zero.
pub trait RegisterPort: Send + Sync {
    fn read(&self, addr: u64) -> Result<u64>;

    fn write(&self, addr: u64, value: u64) -> Result<()>;

    /// Restrict the calling thread to the processors in `mask` until the
    /// returned guard is dropped. Register accesses made while the guard is
    /// held execute on a processor in `mask`.
    fn pin_to(&self, mask: u64) -> Result<PinGuard>;
}

const DEV_CPU_ROOT: &str = "/dev/cpu";

/// Register port backed by the Linux `msr` driver (`/dev/cpu/N/msr`).
///
/// The driver executes every access on CPU `N`, whatever CPU the caller runs
/// on. Accesses go to the node of the CPU given at construction, or of the
/// pinned CPU while a pin is held. Uncore registers are package-wide, so any
/// CPU's node reaches every cache box.
pub struct DevMsrPort {
    root: PathBuf,
    default_cpu: u32,
    handles: Mutex<HashMap<u32, File>>,
    /// Innermost pin last
    pinned: Arc<Mutex<Vec<u32>>>,
}

impl DevMsrPort {
    pub fn new(cpu: u32) -> Result<Self> {
        Self::with_root(DEV_CPU_ROOT, cpu)
    }

    /// Port over `<root>/N/msr` nodes
    pub fn with_root(root: impl Into<PathBuf>, cpu: u32) -> Result<Self> {
        let root = root.into();
        let file = open_device(&root, cpu)?;

        let mut handles = HashMap::new();
        handles.insert(cpu, file);

        Ok(Self {
            root,
            default_cpu: cpu,
            handles: Mutex::new(handles),
            pinned: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// CPU that the next access executes on
    pub fn target_cpu(&self) -> u32 {
        self.pinned
            .lock()
            .last()
            .copied()
            .unwrap_or(self.default_cpu)
    }

    fn with_device<T>(
        &self,
        addr: u64,
        op: impl FnOnce(&mut File, u32) -> std::io::Result<T>,
    ) -> Result<T> {
        let cpu = self.target_cpu();
        let mut handles = self.handles.lock();
        let file = handles
            .get_mut(&cpu)
            .ok_or_else(|| PmcError::register(addr, format!("no MSR handle for CPU {cpu}")))?;

        file.seek(SeekFrom::Start(addr))
            .and_then(|_| op(file, cpu))
            .map_err(|e| PmcError::register(addr, format!("access on CPU {cpu} failed: {e}")))
    }
}

fn open_device(root: &Path, cpu: u32) -> Result<File> {
    let path = root.join(cpu.to_string()).join("msr");
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_SYNC)
        .open(&path)
        .map_err(|e| PmcError::register(0, format!("Failed to open {}: {e}", path.display())))?;

    tracing::info!("Opened MSR handle {} for core {}", file.as_raw_fd(), cpu);
    Ok(file)
}

impl RegisterPort for DevMsrPort {
    fn read(&self, addr: u64) -> Result<u64> {
        let (value, cpu) = self.with_device(addr, |file, cpu| {
            let mut buffer = [0u8; 8];
            file.read_exact(&mut buffer)?;
            Ok((u64::from_ne_bytes(buffer), cpu))
        })?;

        tracing::debug!(
            "MSR read: CPU {} MSR 0x{:08x} = 0x{:016x}",
            cpu,
            addr,
            value
        );
        Ok(value)
    }

    fn write(&self, addr: u64, value: u64) -> Result<()> {
        let cpu = self.with_device(addr, |file, cpu| {
            file.write_all(&value.to_ne_bytes())?;
            Ok(cpu)
        })?;

        tracing::debug!(
            "MSR write: CPU {} MSR 0x{:08x} <- 0x{:016x}",
            cpu,
            addr,
            value
        );
        Ok(())
    }

    fn pin_to(&self, mask: u64) -> Result<PinGuard> {
        let cpu = first_cpu(mask)?;

        {
            let mut handles = self.handles.lock();
            if !handles.contains_key(&cpu) {
                let file = open_device(&self.root, cpu)
                    .map_err(|e| PmcError::Pinning(format!("CPU {cpu}: {e}")))?;
                handles.insert(cpu, file);
            }
        }

        let affinity = AffinityGuard::with_mask(mask)?;
        self.pinned.lock().push(cpu);

        let pinned = Arc::clone(&self.pinned);
        Ok(PinGuard::new(mask, affinity).on_release(move || {
            pinned.lock().pop();
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::affinity::allowed_cpu;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Directory laid out like `/dev/cpu`, with plain files as MSR nodes
    struct FakeDevTree {
        root: PathBuf,
    }

    impl FakeDevTree {
        fn new(cpus: &[u32]) -> Self {
            static NEXT: AtomicUsize = AtomicUsize::new(0);
            let root = std::env::temp_dir().join(format!(
                "pmcflow-msr-{}-{}",
                std::process::id(),
                NEXT.fetch_add(1, Ordering::SeqCst)
            ));
            for cpu in cpus {
                let dir = root.join(cpu.to_string());
                std::fs::create_dir_all(&dir).unwrap();
                File::create(dir.join("msr")).unwrap();
            }
            Self { root }
        }

        fn register(&self, cpu: u32, addr: u64) -> u64 {
            let mut file = File::open(self.root.join(cpu.to_string()).join("msr")).unwrap();
            let mut buffer = [0u8; 8];
            file.seek(SeekFrom::Start(addr)).unwrap();
            match file.read_exact(&mut buffer) {
                Ok(()) => u64::from_ne_bytes(buffer),
                Err(_) => 0,
            }
        }
    }

    impl Drop for FakeDevTree {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.root);
        }
    }

    #[test]
    fn test_missing_cpu_reports_register_error() {
        let err = DevMsrPort::new(u32::MAX).err();
        assert!(matches!(err, Some(PmcError::RegisterAccess { .. })));
    }

    #[test]
    fn test_accesses_go_to_construction_cpu() {
        let tree = FakeDevTree::new(&[3]);
        let port = DevMsrPort::with_root(&tree.root, 3).unwrap();

        port.write(0x2000, 0x408F34).unwrap();

        assert_eq!(port.target_cpu(), 3);
        assert_eq!(port.read(0x2000).unwrap(), 0x408F34);
        assert_eq!(tree.register(3, 0x2000), 0x408F34);
    }

    #[test]
    fn test_pinned_accesses_go_to_pinned_cpu() {
        let Some(pinned) = allowed_cpu() else {
            return;
        };
        let pinned = pinned as u32;
        let other = pinned + 1;
        let tree = FakeDevTree::new(&[pinned, other]);
        let port = DevMsrPort::with_root(&tree.root, other).unwrap();

        {
            let guard = port.pin_to(1u64 << pinned).unwrap();
            assert_eq!(guard.mask(), 1u64 << pinned);
            assert_eq!(port.target_cpu(), pinned);

            port.write(0x2002, 77).unwrap();
            assert_eq!(port.read(0x2002).unwrap(), 77);
        }

        assert_eq!(tree.register(pinned, 0x2002), 77);
        assert_eq!(tree.register(other, 0x2002), 0);

        assert_eq!(port.target_cpu(), other);
        port.write(0x2002, 5).unwrap();
        assert_eq!(tree.register(other, 0x2002), 5);
        assert_eq!(tree.register(pinned, 0x2002), 77);
    }

    #[test]
    fn test_pin_to_cpu_without_device_fails() {
        let tree = FakeDevTree::new(&[0]);
        let port = DevMsrPort::with_root(&tree.root, 0).unwrap();

        let err = port.pin_to(1u64 << 63).err();
        assert!(matches!(err, Some(PmcError::Pinning(_))));
        assert_eq!(port.target_cpu(), 0);
    }
}
