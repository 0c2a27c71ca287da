#[cfg(feature = "cli")]
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};

#[derive(Debug, Clone, Default)]
pub struct ProcessStats {
    pub matching: usize,
    pub total_memory_mb: u64,
}

/// Counts processes whose command line contains `needle`, the same test
/// `check_procs -a` applies.
#[cfg(feature = "cli")]
pub fn count_processes(needle: &str) -> ProcessStats {
    let mut system = System::new_with_specifics(
        RefreshKind::nothing().with_processes(ProcessRefreshKind::everything()),
    );
    system.refresh_processes(ProcessesToUpdate::All, true);

    let mut matching = 0usize;
    let mut memory = 0u64;
    for process in system.processes().values() {
        let cmdline = process
            .cmd()
            .iter()
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        if cmdline.contains(needle) {
            matching += 1;
            memory += process.memory();
        }
    }

    ProcessStats {
        matching,
        total_memory_mb: memory / 1024 / 1024,
    }
}

// 非 CLI 環境沒有 sysinfo
#[cfg(not(feature = "cli"))]
pub fn count_processes(_needle: &str) -> ProcessStats {
    ProcessStats::default()
}
