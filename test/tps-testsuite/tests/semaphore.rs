//! The blocking semaphore: down/up across threads, FIFO wake order, and
//! `getvalue`'s sign convention.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tps_sched_std::StdScheduler;
use tps_sem::Semaphore;

#[test]
fn up_wakes_the_first_thread_that_blocked() {
    let sched = Arc::new(StdScheduler::new());
    let sem = Arc::new(Semaphore::new(sched, 0));
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));

    let mut waiters = Vec::new();
    for n in 0..3 {
        let sem = Arc::clone(&sem);
        let order = Arc::clone(&order);
        waiters.push(thread::spawn(move || {
            sem.down();
            order.lock().unwrap().push(n);
        }));
        // Give each thread time to queue up before the next one starts,
        // so the wait order is deterministic.
        thread::sleep(Duration::from_millis(30));
    }

    assert_eq!(sem.getvalue(), -3);

    for _ in 0..3 {
        sem.up();
    }
    for w in waiters {
        w.join().unwrap();
    }

    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
}

#[test]
fn getvalue_reports_free_permits_when_nobody_is_waiting() {
    let sched = Arc::new(StdScheduler::new());
    let sem = Semaphore::new(sched, 3);
    assert_eq!(sem.getvalue(), 3);
    sem.down();
    sem.down();
    assert_eq!(sem.getvalue(), 1);
    sem.up();
    assert_eq!(sem.getvalue(), 2);
    sem.destroy().expect("no waiters left");
}
