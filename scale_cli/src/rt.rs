//! Real-time scheduling helpers (Linux SCHED_FIFO + mlockall).
//!
//! Bit-banged pulses must stay well under 60 us of clock HIGH; preemption in
//! the middle of a pulse powers the chip down and corrupts the word.

use crate::cli::RtLock;

#[cfg(target_os = "linux")]
fn mem_lock(lock: RtLock) -> eyre::Result<()> {
    use libc::{MCL_CURRENT, MCL_FUTURE, mlockall};

    let flags = match lock {
        RtLock::None => return Ok(()),
        RtLock::Current => MCL_CURRENT,
        RtLock::All => MCL_CURRENT | MCL_FUTURE,
    };
    let rc = unsafe { mlockall(flags) };
    if rc == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    let mut msg = format!("mlockall failed: {err}");
    if matches!(err.raw_os_error(), Some(code) if code == libc::EPERM || code == libc::ENOMEM) {
        msg.push_str("; hint: needs CAP_IPC_LOCK (or root) and sufficient 'ulimit -l'");
    }
    Err(eyre::eyre!(msg))
}

/// SCHED_FIFO at `prio`, clamped to the system range (default: max).
#[cfg(target_os = "linux")]
fn fifo_priority(prio: Option<i32>) -> eyre::Result<i32> {
    use libc::{SCHED_FIFO, sched_get_priority_max, sched_get_priority_min, sched_param};

    let (min, max) = unsafe {
        let min = sched_get_priority_min(SCHED_FIFO);
        let max = sched_get_priority_max(SCHED_FIFO);
        if min < 0 || max < 0 { (1, 99) } else { (min, max) }
    };
    let prio_val = prio.unwrap_or(max).clamp(min, max);
    let param = sched_param {
        sched_priority: prio_val,
    };
    let rc = unsafe { libc::sched_setscheduler(0, SCHED_FIFO, &param) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        eyre::bail!("sched_setscheduler(SCHED_FIFO, {prio_val}) failed: {err}; needs CAP_SYS_NICE or root");
    }
    Ok(prio_val)
}

/// Apply real-time settings once per process. Failures are logged, never fatal.
#[cfg(target_os = "linux")]
pub fn setup_rt_once(prio: Option<i32>, lock: RtLock) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    RT_ONCE.get_or_init(|| {
        match mem_lock(lock) {
            Ok(()) => tracing::info!(?lock, "rt: memory lock applied"),
            Err(err) => tracing::warn!(error = %err, "rt: memory lock not applied"),
        }
        match fifo_priority(prio) {
            Ok(p) => tracing::info!(prio = p, "rt: SCHED_FIFO enabled"),
            Err(err) => tracing::warn!(error = %err, "rt: SCHED_FIFO not applied"),
        }
    });
}

#[cfg(not(target_os = "linux"))]
pub fn setup_rt_once(_prio: Option<i32>, _lock: RtLock) {
    tracing::warn!("rt: real-time mode is only supported on Linux; ignoring --rt");
}
