#![feature(test)]

extern crate test;

use cuckoo_ring::CuckooRing;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, atomic::Ordering};
use std::thread;
use test::Bencher;

/// Ring test() while 10 background threads also call test(). Readers share
/// the lock, so this measures read-side contention only.
///
/// Setup: 4-slot ring for 400k keys with 100k even keys added
#[bench]
fn concurrent_test(b: &mut Bencher) {
    let ring = Arc::new(CuckooRing::new(4, 400_000));
    let stop_flag = Arc::new(AtomicBool::new(false));
    let mut handles = vec![];

    for i in 0u64..100_000 {
        ring.add(&(i * 2).to_le_bytes());
    }

    for _ in 0..10 {
        let r = ring.clone();
        let stop = stop_flag.clone();
        handles.push(thread::spawn(move || {
            let mut i: u64 = 0;
            while !stop.load(Ordering::Relaxed) {
                i = (i + 1) % 200_000;
                r.test(&i.to_le_bytes());
            }
        }))
    }

    let mut i: u64 = 0;
    b.iter(|| {
        i = (i + 1) % 200_000;
        ring.test(&i.to_le_bytes())
    });

    stop_flag.store(true, Ordering::Relaxed);
    for h in handles {
        h.join().unwrap();
    }
}

/// Ring test() while 10 background threads call check() on fresh keys,
/// which takes the lock exclusively and rotates slots as they fill.
#[bench]
fn concurrent_test_under_check_contention(b: &mut Bencher) {
    let ring = Arc::new(CuckooRing::new(4, 400_000));
    let stop_flag = Arc::new(AtomicBool::new(false));
    let mut handles = vec![];

    for c in 0u64..10 {
        let r = ring.clone();
        let stop = stop_flag.clone();
        handles.push(thread::spawn(move || {
            let mut i = c;
            while !stop.load(Ordering::Relaxed) {
                i += 10;
                r.check(&i.to_le_bytes());
            }
        }))
    }

    let mut i: u64 = 0;
    b.iter(|| {
        i += 1;
        ring.test(&i.to_le_bytes())
    });

    stop_flag.store(true, Ordering::Relaxed);
    for h in handles {
        h.join().unwrap();
    }
}
