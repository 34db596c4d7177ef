use std::io;
use std::os::fd::{AsRawFd, BorrowedFd};
use std::time::Duration;

/// Per-source result of [`wait_readable`], in the order the fds were given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Readiness {
    revents: Vec<libc::c_short>,
}

const HANGUP: libc::c_short = libc::POLLHUP | libc::POLLERR | libc::POLLNVAL;

impl Readiness {
    /// The source has bytes to read, or a condition a read will report.
    pub fn is_readable(&self, index: usize) -> bool {
        self.revents
            .get(index)
            .is_some_and(|ev| ev & (libc::POLLIN | HANGUP) != 0)
    }

    /// The source hung up or is in an error state.
    pub fn is_hangup(&self, index: usize) -> bool {
        self.revents.get(index).is_some_and(|ev| ev & HANGUP != 0)
    }

    /// Nothing became ready (the wait timed out).
    pub fn is_empty(&self) -> bool {
        self.revents.iter().all(|ev| *ev == 0)
    }
}

/// Block until at least one of `fds` is readable or `timeout` elapses.
///
/// `None` waits indefinitely. Interrupted waits are restarted with the full
/// timeout.
pub fn wait_readable(fds: &[BorrowedFd<'_>], timeout: Option<Duration>) -> io::Result<Readiness> {
    let mut pollfds: Vec<libc::pollfd> = fds
        .iter()
        .map(|fd| libc::pollfd {
            fd: fd.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        })
        .collect();

    let timeout_ms = match timeout {
        None => -1,
        Some(duration) => libc::c_int::try_from(duration.as_millis()).unwrap_or(libc::c_int::MAX),
    };

    loop {
        // SAFETY: `pollfds` is a live, correctly sized array of pollfd and
        // every fd in it is borrowed for the duration of the call.
        let rc = unsafe {
            libc::poll(
                pollfds.as_mut_ptr(),
                pollfds.len() as libc::nfds_t,
                timeout_ms,
            )
        };
        if rc >= 0 {
            break;
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }

    Ok(Readiness {
        revents: pollfds.iter().map(|p| p.revents).collect(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::os::fd::AsFd;
    use std::os::unix::net::UnixStream;

    use super::*;

    #[test]
    fn times_out_when_nothing_is_pending() {
        let (_left, right) = UnixStream::pair().unwrap();
        let ready = wait_readable(&[right.as_fd()], Some(Duration::from_millis(10))).unwrap();
        assert!(ready.is_empty());
        assert!(!ready.is_readable(0));
    }

    #[test]
    fn reports_which_source_is_readable() {
        let (_a_left, a_right) = UnixStream::pair().unwrap();
        let (mut b_left, b_right) = UnixStream::pair().unwrap();
        b_left.write_all(b"x").unwrap();

        let ready = wait_readable(&[a_right.as_fd(), b_right.as_fd()], None).unwrap();
        assert!(!ready.is_readable(0));
        assert!(ready.is_readable(1));
        assert!(!ready.is_hangup(1));
    }

    #[test]
    fn peer_close_wakes_the_wait() {
        let (left, right) = UnixStream::pair().unwrap();
        drop(left);

        let ready = wait_readable(&[right.as_fd()], Some(Duration::from_secs(5))).unwrap();
        assert!(ready.is_readable(0));
    }

    #[test]
    fn out_of_range_index_is_not_ready() {
        let (_left, right) = UnixStream::pair().unwrap();
        let ready = wait_readable(&[right.as_fd()], Some(Duration::ZERO)).unwrap();
        assert!(!ready.is_readable(7));
        assert!(!ready.is_hangup(7));
    }
}
