use ahash::AHasher;
use cuckoo_ring::{CuckooRing, CuckooRingBuilder, Precision};
use test_log::test;

#[test]
fn test_new_ring() {
    let ring = CuckooRing::new(4, 1000);
    assert_eq!(ring.slot_count(), 4);
    assert_eq!(ring.slot_capacity(), 250);
    assert_eq!(ring.capacity(), 1000);
    assert_eq!(ring.cursor(), 0);
    assert_eq!(ring.precision(), Precision::Medium);
    assert!(ring.is_empty());
    assert_eq!(ring.load_factor(), 0.0);
}

#[test]
fn test_zero_slots_is_raised_to_one() {
    let ring = CuckooRing::new(0, 100);
    assert_eq!(ring.slot_count(), 1);
    assert_eq!(ring.slot_capacity(), 100);
    assert!(ring.add("key"));
    assert!(ring.test("key"));
}

#[test]
fn test_add_then_test() {
    let ring = CuckooRing::new(2, 1000);
    assert!(!ring.test("hello"));
    assert!(ring.add("hello"));
    assert!(ring.test("hello"));
    assert!(ring.test("hello".as_bytes()));
    assert_eq!(ring.len(), 1);
    assert!(!ring.is_empty());
}

#[test]
fn test_check_is_test_and_set() {
    let ring = CuckooRing::new(2, 1000);
    assert!(!ring.check("request-1"));
    assert!(ring.check("request-1"));
    assert!(ring.check("request-1"));
    assert_eq!(ring.len(), 1);

    assert!(!ring.check("request-2"));
    assert_eq!(ring.len(), 2);
}

#[test]
fn test_rotation_evicts_oldest_slot() {
    let ring = CuckooRing::builder()
        .slots(2)
        .capacity(200)
        .seed(5)
        .build()
        .unwrap();
    assert_eq!(ring.slot_capacity(), 100);

    let key = |i: usize| format!("key-{i}");

    // A slot takes one key past its share before the ring moves on
    for i in 0..=100 {
        assert!(ring.add(&key(i)));
    }
    assert_eq!(ring.cursor(), 0);

    assert!(ring.add(&key(101)));
    assert_eq!(ring.cursor(), 1);
    assert!(ring.test(&key(0)), "first slot must survive the first rotation");
    assert!(ring.test(&key(101)));

    for i in 102..=201 {
        assert!(ring.add(&key(i)));
    }
    assert_eq!(ring.cursor(), 1);

    // Wraps around and wipes slot 0
    assert!(ring.add(&key(202)));
    assert_eq!(ring.cursor(), 0);
    assert_eq!(ring.len(), 102);
    for i in 101..=202 {
        assert!(ring.test(&key(i)), "lost {}", key(i));
    }
}

#[test]
fn test_small_window_rotation() {
    let ring = CuckooRing::new(2, 8);
    assert_eq!(ring.slot_capacity(), 4);

    let key = |i: usize| format!("window-{i}");
    let cursors = [0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 0];
    for (i, &cursor) in cursors.iter().enumerate() {
        assert!(ring.add(&key(i)));
        assert!(ring.test(&key(i)), "{} missing right after add", key(i));
        assert_eq!(ring.cursor(), cursor, "after adding {}", key(i));
    }

    // Second rotation wiped slot 0, keeping only the newest key there
    assert_eq!(ring.len(), 6);
    assert!(!ring.test(&key(0)));
    for i in 5..=10 {
        assert!(ring.test(&key(i)));
    }
}

#[test]
fn test_reset() {
    let ring = CuckooRing::builder()
        .slots(3)
        .capacity(30)
        .build()
        .unwrap();
    for i in 0..25 {
        ring.add(&format!("key-{i}"));
    }
    assert_ne!(ring.cursor(), 0);
    assert!(!ring.is_empty());

    ring.reset();
    assert_eq!(ring.cursor(), 0);
    assert!(ring.is_empty());
    assert_eq!(ring.load_factor(), 0.0);
    for i in 0..25 {
        assert!(!ring.test(&format!("key-{i}")));
    }
}

#[test]
fn test_builder_rejects_zero_slots() {
    let error = CuckooRing::builder().slots(0).build().unwrap_err();
    assert!(
        error.to_string().contains("slots must be greater than zero"),
        "{error}"
    );
}

#[test]
fn test_builder_precision() {
    let ring = CuckooRing::builder()
        .slots(2)
        .capacity(1000)
        .precision(Precision::Low)
        .max_kicks(50)
        .build()
        .unwrap();
    assert_eq!(ring.precision(), Precision::Low);

    for i in 0u32..100 {
        assert!(ring.add(&i.to_le_bytes()));
    }
    for i in 0u32..100 {
        assert!(ring.test(&i.to_le_bytes()));
    }
}

#[test]
fn test_load_factor_follows_current_slot() {
    let ring = CuckooRing::new(2, 200);
    // 100 elements per slot, 32 buckets of 4
    for i in 0u32..64 {
        assert!(ring.add(&i.to_le_bytes()));
    }
    assert_eq!(ring.load_factor(), 0.5);
}

#[test]
fn test_custom_hasher() {
    let ring = CuckooRingBuilder::<AHasher>::default()
        .slots(2)
        .capacity(1000)
        .build()
        .unwrap();

    for i in 0..100 {
        assert!(!ring.check(&format!("item-{i}")));
    }
    for i in 0..100 {
        assert!(ring.test(&format!("item-{i}")));
    }
    assert_eq!(ring.len(), 100);
}

#[test]
fn test_debug_output() {
    let ring = CuckooRing::new(2, 100);
    ring.add("key");
    let debug = format!("{ring:?}");
    assert!(debug.contains("CuckooRing"));
    assert!(debug.contains("cursor: 0"));
}
