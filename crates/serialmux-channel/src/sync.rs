//! The gate and wake signals shared by application threads and the
//! transport loop.
//!
//! Both signals are level-triggered and manually reset: any number of
//! `set` calls before a `clear` collapse into one wake, and a `set` that
//! lands before the waiter blocks is still seen because the flag persists.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, BorrowedFd, FromRawFd, OwnedFd};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::warn;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A wake signal threads block on with a condition variable.
///
/// Besides the flag, every `set` bumps a generation counter. A waiter that
/// records [`generation`](Self::generation) before it lets go of the gate
/// and then waits with [`wait_past`](Self::wait_past) cannot miss a `set`,
/// even when another waiter clears the flag first.
#[derive(Debug, Default)]
pub struct Event {
    state: Mutex<EventState>,
    cond: Condvar,
}

#[derive(Debug, Default)]
struct EventState {
    set: bool,
    generation: u64,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal and wake every waiter.
    pub fn set(&self) {
        let mut state = lock(&self.state);
        state.set = true;
        state.generation = state.generation.wrapping_add(1);
        self.cond.notify_all();
    }

    /// Lower the signal. The generation is left alone.
    pub fn clear(&self) {
        lock(&self.state).set = false;
    }

    pub fn is_set(&self) -> bool {
        lock(&self.state).set
    }

    /// Number of `set` calls so far.
    pub fn generation(&self) -> u64 {
        lock(&self.state).generation
    }

    /// Block until the signal is raised. Returns at once if it already is.
    pub fn wait(&self) {
        let state = lock(&self.state);
        let _state = self
            .cond
            .wait_while(state, |s| !s.set)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Like [`wait`](Self::wait) with an upper bound. Returns whether the
    /// signal was raised.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let state = lock(&self.state);
        let (state, _) = self
            .cond
            .wait_timeout_while(state, timeout, |s| !s.set)
            .unwrap_or_else(PoisonError::into_inner);
        state.set
    }

    /// Block until `set` has been called since the generation `seen` was read.
    pub fn wait_past(&self, seen: u64) {
        let state = lock(&self.state);
        let _state = self
            .cond
            .wait_while(state, |s| s.generation == seen)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Like [`wait_past`](Self::wait_past) with an upper bound. Returns
    /// whether a `set` happened.
    pub fn wait_past_timeout(&self, seen: u64, timeout: Duration) -> bool {
        let state = lock(&self.state);
        let (state, _) = self
            .cond
            .wait_timeout_while(state, timeout, |s| s.generation == seen)
            .unwrap_or_else(PoisonError::into_inner);
        state.generation != seen
    }
}

/// A wake signal that can sit in a poll(2) set next to a stream.
///
/// Backed by a pipe that holds exactly one byte while the signal is raised,
/// so the read end polls readable for as long as the flag is set.
#[derive(Debug)]
pub struct WakeEvent {
    flag: Mutex<bool>,
    reader: File,
    writer: File,
}

impl WakeEvent {
    pub fn new() -> io::Result<Self> {
        let mut fds = [0 as libc::c_int; 2];
        // SAFETY: `fds` is a valid two-element array for pipe(2) to fill.
        if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: pipe(2) succeeded, so both descriptors are open and owned
        // by nobody else.
        let (reader, writer) =
            unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
        for fd in [&reader, &writer] {
            set_cloexec(fd)?;
        }

        Ok(Self {
            flag: Mutex::new(false),
            reader: File::from(reader),
            writer: File::from(writer),
        })
    }

    /// Raise the signal. Repeated calls before a [`clear`](Self::clear)
    /// are no-ops.
    pub fn set(&self) {
        let mut flag = lock(&self.flag);
        if *flag {
            return;
        }
        match (&self.writer).write_all(&[1]) {
            Ok(()) => *flag = true,
            Err(err) => warn!(error = %err, "failed to raise wake signal"),
        }
    }

    /// Lower the signal.
    pub fn clear(&self) {
        let mut flag = lock(&self.flag);
        if !*flag {
            return;
        }
        let mut byte = [0u8; 1];
        match (&self.reader).read_exact(&mut byte) {
            Ok(()) => *flag = false,
            Err(err) => warn!(error = %err, "failed to lower wake signal"),
        }
    }

    pub fn is_set(&self) -> bool {
        *lock(&self.flag)
    }
}

impl AsFd for WakeEvent {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.reader.as_fd()
    }
}

fn set_cloexec(fd: &OwnedFd) -> io::Result<()> {
    use std::os::fd::AsRawFd;

    // SAFETY: `fd` is an open descriptor owned by the caller.
    if unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFD, libc::FD_CLOEXEC) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// The single lock over channel state, plus the two signals around it.
///
/// - `tx_ready`: there may be something new to send (raised by producers,
///   waited on by the transport loop alongside the stream)
/// - `tx_done`: the transport loop wrote at least one frame, or a `get`
///   freed a slot (raised under the gate, waited on by producers stalled on
///   a full queue through its generation)
#[derive(Debug)]
pub struct SyncGate<S> {
    state: Mutex<S>,
    tx_ready: WakeEvent,
    tx_done: Event,
}

impl<S> SyncGate<S> {
    pub fn new(state: S) -> io::Result<Self> {
        Ok(Self {
            state: Mutex::new(state),
            tx_ready: WakeEvent::new()?,
            tx_done: Event::new(),
        })
    }

    /// Take the gate. A panic in another holder does not lock everyone out.
    pub fn lock(&self) -> MutexGuard<'_, S> {
        lock(&self.state)
    }

    pub fn tx_ready(&self) -> &WakeEvent {
        &self.tx_ready
    }

    pub fn tx_done(&self) -> &Event {
        &self.tx_done
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    use serialmux_transport::wait_readable;

    use super::*;

    #[test]
    fn event_set_before_wait_is_not_lost() {
        let event = Event::new();
        event.set();
        event.wait();
        assert!(event.is_set());
    }

    #[test]
    fn event_stays_set_until_cleared() {
        let event = Event::new();
        event.set();
        event.set();
        assert!(event.wait_timeout(Duration::ZERO));
        event.clear();
        assert!(!event.is_set());
        assert!(!event.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn event_wakes_blocked_thread() {
        let event = Arc::new(Event::new());
        let waiter = {
            let event = Arc::clone(&event);
            thread::spawn(move || event.wait())
        };
        thread::sleep(Duration::from_millis(20));
        event.set();
        waiter.join().unwrap();
    }

    #[test]
    fn event_wait_timeout_gives_up() {
        let event = Event::new();
        let start = Instant::now();
        assert!(!event.wait_timeout(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn one_set_releases_every_generation_waiter_even_after_a_clear() {
        let event = Arc::new(Event::new());
        let seen = event.generation();
        let waiters: Vec<_> = (0..2)
            .map(|_| {
                let event = Arc::clone(&event);
                thread::spawn(move || event.wait_past_timeout(seen, Duration::from_secs(5)))
            })
            .collect();
        thread::sleep(Duration::from_millis(20));
        event.set();
        // A waiter that lowers the flag must not strand the other one.
        event.clear();
        for waiter in waiters {
            assert!(waiter.join().unwrap());
        }
    }

    #[test]
    fn set_between_read_and_wait_is_not_lost() {
        let event = Event::new();
        let seen = event.generation();
        event.set();
        event.clear();
        event.wait_past(seen);
        assert!(!event.wait_past_timeout(event.generation(), Duration::from_millis(10)));
    }

    #[test]
    fn wake_event_is_pollable_while_set() {
        let wake = WakeEvent::new().unwrap();
        let idle = wait_readable(&[wake.as_fd()], Some(Duration::from_millis(5))).unwrap();
        assert!(idle.is_empty());

        wake.set();
        wake.set();
        let ready = wait_readable(&[wake.as_fd()], Some(Duration::ZERO)).unwrap();
        assert!(ready.is_readable(0));
        // Still readable: polling does not consume the signal.
        let again = wait_readable(&[wake.as_fd()], Some(Duration::ZERO)).unwrap();
        assert!(again.is_readable(0));

        wake.clear();
        assert!(!wake.is_set());
        let cleared = wait_readable(&[wake.as_fd()], Some(Duration::from_millis(5))).unwrap();
        assert!(cleared.is_empty());
    }

    #[test]
    fn wake_event_clear_without_set_is_a_no_op() {
        let wake = WakeEvent::new().unwrap();
        wake.clear();
        wake.set();
        assert!(wake.is_set());
    }

    #[test]
    fn gate_serializes_state_access() {
        let gate = Arc::new(SyncGate::new(0u32).unwrap());
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let gate = Arc::clone(&gate);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        *gate.lock() += 1;
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(*gate.lock(), 4000);
    }
}
