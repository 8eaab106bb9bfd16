//! Create/write/read/destroy on a single thread, and the bounds checks on
//! `read`/`write`.
//!
//! `tps_engine::init` succeeds exactly once per process, and Cargo runs the
//! `#[test]` functions within one integration test binary concurrently by
//! default, so every scenario here runs sequentially from a single `#[test]`
//! -- the same dispatch-by-argv shape the original C test binary used to
//! keep its scenarios in one process.

use std::sync::Arc;

use tps_sched_std::StdScheduler;

fn create_write_read_destroy() {
    tps_engine::create().expect("create");

    let payload = b"a page holds exactly this thread's bytes";
    tps_engine::write(0, payload).expect("write");

    let mut out = vec![0u8; payload.len()];
    tps_engine::read(0, &mut out).expect("read");
    assert_eq!(&out, payload);

    tps_engine::destroy().expect("destroy");
}

fn write_at_an_offset_only_touches_that_range() {
    tps_engine::create().expect("create");

    tps_engine::write(0, &[0xAA; 16]).expect("write prefix");
    tps_engine::write(16, &[0xBB; 16]).expect("write suffix");

    let mut out = vec![0u8; 32];
    tps_engine::read(0, &mut out).expect("read");
    assert!(out[..16].iter().all(|&b| b == 0xAA));
    assert!(out[16..].iter().all(|&b| b == 0xBB));

    tps_engine::destroy().expect("destroy");
}

fn offset_length_past_the_page_is_rejected() {
    tps_engine::create().expect("create");

    let page_bytes = abi::page_bytes();
    let mut buf = vec![0u8; 4];
    assert!(tps_engine::read(page_bytes - 1, &mut buf).is_err());
    assert!(tps_engine::write(page_bytes - 1, &buf).is_err());
    // `offset` at or past the page boundary is rejected independently of
    // `len`, even when `len` is zero.
    assert!(tps_engine::read(page_bytes, &mut [0u8; 0]).is_err());

    tps_engine::destroy().expect("destroy");
}

fn offset_plus_length_exactly_at_the_boundary_is_valid() {
    tps_engine::create().expect("create");

    let page_bytes = abi::page_bytes();
    let mut buf = vec![0xCCu8; 4];
    tps_engine::write(page_bytes - 4, &buf).expect("write up to the exact boundary");

    let mut out = vec![0u8; 4];
    tps_engine::read(page_bytes - 4, &mut out).expect("read up to the exact boundary");
    assert_eq!(out, buf);

    tps_engine::destroy().expect("destroy");
}

#[test]
fn lifecycle_scenarios() {
    tps_engine::init(Arc::new(StdScheduler::new()), true).expect("init");

    create_write_read_destroy();
    write_at_an_offset_only_touches_that_range();
    offset_length_past_the_page_is_rejected();
    offset_plus_length_exactly_at_the_boundary_is_valid();
}
