use crate::gateway::{CallError, CallGateway};
use crate::model::{CallRequest, Student};
use std::collections::BTreeSet;
use std::io;
use std::thread::{self, ScopedJoinHandle};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub succeeded: BTreeSet<String>,
    pub failed: BTreeSet<String>,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Asks the gateway to call every student in `absent`.
///
/// Requests within a window of `max_in_flight` run on their own threads and
/// are joined before the next window starts. One failed or panicking request
/// never stops the others; every student is attempted exactly once.
pub fn dispatch(
    gateway: &dyn CallGateway,
    absent: &[&Student],
    max_in_flight: usize,
) -> DispatchReport {
    let mut report = DispatchReport::default();
    for window in absent.chunks(max_in_flight.max(1)) {
        let results: Vec<(String, Result<(), CallError>)> = thread::scope(|scope| {
            let handles: Vec<_> = window
                .iter()
                .map(|student| {
                    let req = CallRequest::for_student(student);
                    let roll = req.roll.clone();
                    let spawned = thread::Builder::new()
                        .name(format!("dispatch-{}", roll))
                        .spawn_scoped(scope, move || gateway.start_call(&req));
                    (roll, spawned)
                })
                .collect();
            handles
                .into_iter()
                .map(|(roll, spawned)| (roll, settle(spawned)))
                .collect()
        });

        for (roll, res) in results {
            match res {
                Ok(()) => {
                    info!(roll = %roll, "call initiation accepted");
                    report.succeeded.insert(roll);
                }
                Err(error) => {
                    warn!(roll = %roll, %error, "call initiation failed");
                    report.failed.insert(roll);
                }
            }
        }
    }
    report
}

/// Folds a worker that never started or that panicked into a failed call.
fn settle(
    spawned: io::Result<ScopedJoinHandle<'_, Result<(), CallError>>>,
) -> Result<(), CallError> {
    match spawned {
        Ok(handle) => handle
            .join()
            .unwrap_or_else(|_| Err(CallError::Transport("dispatch worker panicked".to_string()))),
        Err(e) => Err(CallError::Transport(format!("dispatch worker not started: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    struct StubGateway {
        fail_rolls: HashSet<String>,
        delay: Duration,
        seen: Mutex<Vec<CallRequest>>,
    }

    impl StubGateway {
        fn failing(rolls: &[&str]) -> Self {
            Self {
                fail_rolls: rolls.iter().map(|s| s.to_string()).collect(),
                delay: Duration::ZERO,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen_rolls(&self) -> Vec<String> {
            let mut v: Vec<String> = self
                .seen
                .lock()
                .expect("lock")
                .iter()
                .map(|r| r.roll.clone())
                .collect();
            v.sort();
            v
        }
    }

    impl CallGateway for StubGateway {
        fn start_call(&self, req: &CallRequest) -> Result<(), CallError> {
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            self.seen.lock().expect("lock").push(req.clone());
            if self.fail_rolls.contains(&req.roll) {
                return Err(CallError::Rejected { status: 500 });
            }
            Ok(())
        }
    }

    struct PanickingGateway;

    impl CallGateway for PanickingGateway {
        fn start_call(&self, req: &CallRequest) -> Result<(), CallError> {
            if req.roll == "P" {
                panic!("boom");
            }
            Ok(())
        }
    }

    fn student(roll: &str) -> Student {
        Student {
            roll: roll.to_string(),
            name: roll.to_string(),
            phone: format!("+9100000000{}", roll.len()),
            parent_name: String::new(),
        }
    }

    #[test]
    fn one_failure_does_not_stop_siblings() {
        let students: Vec<Student> = ["A", "B", "C", "D", "E"].iter().map(|r| student(r)).collect();
        let refs: Vec<&Student> = students.iter().collect();
        let gw = StubGateway::failing(&["C"]);

        let report = dispatch(&gw, &refs, 2);

        assert_eq!(gw.seen_rolls(), vec!["A", "B", "C", "D", "E"]);
        assert_eq!(report.attempted(), 5);
        assert_eq!(report.failed.iter().collect::<Vec<_>>(), vec!["C"]);
        assert_eq!(report.succeeded.len(), 4);
    }

    #[test]
    fn request_carries_student_phone_and_roll() {
        let s = student("CS-101");
        let gw = StubGateway::failing(&[]);
        let _ = dispatch(&gw, &[&s], 4);
        let seen = gw.seen.lock().expect("lock");
        assert_eq!(seen.as_slice(), &[CallRequest::for_student(&s)]);
    }

    #[test]
    fn nothing_to_dispatch_is_a_noop() {
        let gw = StubGateway::failing(&[]);
        let report = dispatch(&gw, &[], 4);
        assert_eq!(report, DispatchReport::default());
        assert!(gw.seen_rolls().is_empty());
    }

    #[test]
    fn panicking_request_is_reported_as_failed() {
        let students = [student("P"), student("Q")];
        let refs: Vec<&Student> = students.iter().collect();
        let report = dispatch(&PanickingGateway, &refs, 8);
        assert!(report.failed.contains("P"));
        assert!(report.succeeded.contains("Q"));
    }

    #[test]
    fn worker_that_cannot_start_is_a_failed_call() {
        let res = settle(Err(io::Error::new(io::ErrorKind::WouldBlock, "no threads left")));
        assert!(matches!(res, Err(CallError::Transport(msg)) if msg.contains("no threads left")));
    }

    #[test]
    fn requests_in_a_window_run_concurrently() {
        let students: Vec<Student> = (0..6).map(|i| student(&format!("S{}", i))).collect();
        let refs: Vec<&Student> = students.iter().collect();
        let gw = StubGateway {
            fail_rolls: HashSet::new(),
            delay: Duration::from_millis(200),
            seen: Mutex::new(Vec::new()),
        };

        let started = Instant::now();
        let report = dispatch(&gw, &refs, 6);
        assert_eq!(report.succeeded.len(), 6);
        assert!(
            started.elapsed() < Duration::from_millis(1_000),
            "took {:?}",
            started.elapsed()
        );
    }
}
