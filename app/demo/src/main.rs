//! Demonstrates thread-private storage end to end.
//!
//! With no arguments, runs the create/write/read/clone/copy-on-write
//! sequence and prints what each thread observes. With `--fault`, a
//! second thread obtains its own page's raw base address and writes
//! through it directly rather than through `tps_engine::write` --
//! deliberately triggering the protection fault the signal handler is
//! there to diagnose. That run is expected to print `TPS protection
//! error!` to stderr and terminate via SIGSEGV/SIGBUS, so it is not run by
//! default.

use std::sync::Arc;
use std::thread;

use tps_sched_std::StdScheduler;

fn main() {
    env_logger::init();

    let fault_demo = std::env::args().nth(1).as_deref() == Some("--fault");

    let scheduler = Arc::new(StdScheduler::new());
    tps_engine::init(scheduler, true).expect("tps_engine::init");

    if fault_demo {
        run_fault_demo();
    } else {
        run_basic_demo();
    }
}

fn run_basic_demo() {
    tps_engine::create().expect("create");
    tps_engine::write(0, b"hello from the main thread").expect("write");

    let mut buf = [0u8; 27];
    tps_engine::read(0, &mut buf).expect("read");
    println!("main thread reads back: {:?}", std::str::from_utf8(&buf).unwrap());

    let owner = tps_engine::current_thread().expect("current_thread");
    let handle = thread::spawn(move || {
        tps_engine::clone(owner).expect("clone");
        let mut buf = [0u8; 27];
        tps_engine::read(0, &mut buf).expect("read after clone");
        println!(
            "cloned thread reads the same bytes before writing: {:?}",
            std::str::from_utf8(&buf).unwrap()
        );

        tps_engine::write(0, b"overwritten by the clone!!!").expect("copy-on-write");
        tps_engine::read(0, &mut buf).expect("read after cow");
        println!("cloned thread now reads its own copy: {:?}", std::str::from_utf8(&buf).unwrap());

        tps_engine::destroy().expect("destroy");
    });
    handle.join().unwrap();

    tps_engine::read(0, &mut buf).expect("read");
    println!(
        "main thread's copy is unaffected by the clone's write: {:?}",
        std::str::from_utf8(&buf).unwrap()
    );

    tps_engine::destroy().expect("destroy");
}

fn run_fault_demo() {
    tps_engine::create().expect("create");
    let base = tps_engine::debug_region_base().expect("debug_region_base") as *mut u8;
    println!("about to write through a raw pointer to an unprotected TPS page...");
    // Safety: none. This is exactly the misuse the fault interceptor
    // exists to diagnose -- the page is PROT_NONE outside of
    // tps_engine::read/write, so this deliberately segfaults.
    unsafe {
        base.write(0);
    }
    unreachable!("the write above should have crashed the process");
}
