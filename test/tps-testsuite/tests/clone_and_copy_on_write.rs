//! A thread clones another thread's region, observes the same bytes until
//! either side writes, and then copy-on-write gives each side its own
//! page -- the scenario the design's "Shared sharer" and "Copy-on-write
//! divergence" laws describe.
//!
//! `tps_engine::init` succeeds exactly once per process, and Cargo runs the
//! `#[test]` functions within one integration test binary concurrently by
//! default, so both scenarios here run sequentially from a single `#[test]`.

use std::sync::Arc;
use std::thread;

use tps_sched_std::StdScheduler;

fn clone_shares_until_a_write_diverges_it() {
    tps_engine::create().expect("create");
    tps_engine::write(0, b"shared contents").expect("write");
    let owner = tps_engine::current_thread().expect("current_thread");

    let cloner = thread::spawn(move || {
        tps_engine::clone(owner).expect("clone");

        let mut buf = [0u8; 15];
        tps_engine::read(0, &mut buf).expect("read before divergence");
        assert_eq!(&buf, b"shared contents");

        tps_engine::write(0, b"private to me!!").expect("write triggers cow");

        let mut buf = [0u8; 15];
        tps_engine::read(0, &mut buf).expect("read after divergence");
        assert_eq!(&buf, b"private to me!!");

        tps_engine::destroy().expect("destroy");
    });
    cloner.join().unwrap();

    // The owner's original contents are untouched by the clone's write.
    let mut buf = [0u8; 15];
    tps_engine::read(0, &mut buf).expect("read");
    assert_eq!(&buf, b"shared contents");

    tps_engine::destroy().expect("destroy");
}

fn destroying_one_sharer_leaves_the_others_intact() {
    tps_engine::create().expect("create");
    tps_engine::write(0, b"still here").expect("write");
    let owner = tps_engine::current_thread().expect("current_thread");

    let sharer = thread::spawn(move || {
        tps_engine::clone(owner).expect("clone");
        tps_engine::destroy().expect("destroy own share");
    });
    sharer.join().unwrap();

    let mut buf = [0u8; 10];
    tps_engine::read(0, &mut buf).expect("read");
    assert_eq!(&buf, b"still here");

    tps_engine::destroy().expect("destroy");
}

#[test]
fn clone_and_copy_on_write_scenarios() {
    tps_engine::init(Arc::new(StdScheduler::new()), true).expect("init");

    clone_shares_until_a_write_diverges_it();
    destroying_one_sharer_leaves_the_others_intact();
}
