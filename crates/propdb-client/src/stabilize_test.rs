use std::time::Duration;

use tokio::time::Instant;

use super::*;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

// ---------------------------------------------------------------------------
// Debounce
// ---------------------------------------------------------------------------

#[test]
fn debounce_emits_last_value_of_a_burst_once() {
    let t0 = Instant::now();
    let mut debounce = Debounce::new(ms(300));
    let mut emitted = Vec::new();

    for (at, value) in [(0, "a"), (50, "b"), (100, "c"), (400, "d")] {
        if let Some(v) = debounce.push(value, t0 + ms(at)) {
            emitted.push((at, v));
        }
    }

    assert_eq!(emitted, [(400, "c")]);
    assert_eq!(debounce.deadline(), Some(t0 + ms(700)));
}

#[test]
fn debounce_poll_waits_for_quiet_period() {
    let t0 = Instant::now();
    let mut debounce = Debounce::new(ms(300));
    debounce.push(1, t0);

    assert_eq!(debounce.poll(t0 + ms(299)), None);
    assert_eq!(debounce.poll(t0 + ms(300)), Some(1));
    assert_eq!(debounce.poll(t0 + ms(900)), None);
}

#[test]
fn debounce_new_value_resets_timer() {
    let t0 = Instant::now();
    let mut debounce = Debounce::new(ms(300));
    debounce.push(1, t0);
    debounce.push(2, t0 + ms(200));

    assert_eq!(debounce.poll(t0 + ms(300)), None);
    assert_eq!(debounce.poll(t0 + ms(500)), Some(2));
}

#[test]
fn debounce_equal_value_does_not_reset_timer() {
    let t0 = Instant::now();
    let mut debounce = Debounce::new(ms(300));
    debounce.push("house", t0);
    debounce.push("house", t0 + ms(200));

    assert_eq!(debounce.poll(t0 + ms(300)), Some("house"));
}

#[test]
fn debounce_repeat_after_forget_emits_again() {
    let t0 = Instant::now();
    let mut debounce = Debounce::new(ms(300));
    debounce.push("house", t0);
    assert_eq!(debounce.poll(t0 + ms(300)), Some("house"));

    debounce.forget_latest();
    assert_eq!(debounce.push("house", t0 + ms(400)), None);
    assert_eq!(debounce.poll(t0 + ms(700)), Some("house"));
}

#[test]
fn debounce_repeating_an_emitted_value_emits_nothing() {
    let t0 = Instant::now();
    let mut debounce = Debounce::new(ms(100));
    debounce.push(5, t0);
    assert_eq!(debounce.poll(t0 + ms(100)), Some(5));

    assert_eq!(debounce.push(5, t0 + ms(150)), None);
    assert_eq!(debounce.deadline(), None);
}

// ---------------------------------------------------------------------------
// Throttle
// ---------------------------------------------------------------------------

#[test]
fn throttle_first_value_emits_immediately() {
    let t0 = Instant::now();
    let mut throttle = Throttle::new(ms(200));
    assert_eq!(throttle.push(1, t0), Some(1));
    assert_eq!(throttle.window_end(), Some(t0 + ms(200)));
}

#[test]
fn throttle_keeps_only_latest_value_in_window() {
    let t0 = Instant::now();
    let mut throttle = Throttle::new(ms(200));
    throttle.push(1, t0);

    assert_eq!(throttle.push(2, t0 + ms(50)), None);
    assert_eq!(throttle.push(3, t0 + ms(150)), None);
    assert_eq!(throttle.tick(t0 + ms(199)), None);
    assert_eq!(throttle.tick(t0 + ms(200)), Some(3));

    // The survivor opened a new window.
    assert_eq!(throttle.window_end(), Some(t0 + ms(400)));
    assert_eq!(throttle.tick(t0 + ms(400)), None);
    assert_eq!(throttle.window_end(), None);
}

#[test]
fn throttle_push_after_untacked_window_emits_survivor() {
    let t0 = Instant::now();
    let mut throttle = Throttle::new(ms(200));
    throttle.push(1, t0);
    throttle.push(2, t0 + ms(100));

    assert_eq!(throttle.push(3, t0 + ms(250)), Some(2));
    assert_eq!(throttle.tick(t0 + ms(450)), Some(3));
}

#[test]
fn throttle_fresh_window_after_idle_period() {
    let t0 = Instant::now();
    let mut throttle = Throttle::new(ms(200));
    throttle.push(1, t0);
    assert_eq!(throttle.tick(t0 + ms(200)), None);

    assert_eq!(throttle.push(2, t0 + ms(1_000)), Some(2));
}

// ---------------------------------------------------------------------------
// Memo / ByRef
// ---------------------------------------------------------------------------

#[test]
fn memo_recomputes_only_on_change() {
    let mut memo = Memo::new();
    assert_eq!(*memo.get_or_compute(3, |n| n * 10), 30);
    assert_eq!(*memo.get_or_compute(3, |_| unreachable!()), 30);
    assert_eq!(*memo.get_or_compute(4, |n| n * 10), 40);
    assert_eq!(memo.computations(), 2);
}

#[test]
fn memo_uses_value_equality_for_plain_values() {
    let mut memo = Memo::new();
    memo.get_or_compute(vec![1, 2], Vec::len);
    memo.get_or_compute(vec![1, 2], Vec::len);
    assert_eq!(memo.computations(), 1);
}

#[test]
fn by_ref_compares_identity_not_contents() {
    let shared = ByRef::new(vec![1, 2, 3]);
    let rebuilt = ByRef::new(vec![1, 2, 3]);

    let mut memo = Memo::new();
    memo.get_or_compute(shared.clone(), |v| v.len());
    memo.get_or_compute(shared.clone(), |v| v.len());
    assert_eq!(memo.computations(), 1);

    memo.get_or_compute(rebuilt, |v| v.len());
    assert_eq!(memo.computations(), 2);
    assert_eq!(shared.len(), 3);
}

// ---------------------------------------------------------------------------
// Drivers
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn debouncer_driver_emits_after_quiet_period() {
    let (tx, mut rx) = spawn_debouncer(ms(300));
    let start = Instant::now();

    tx.send("a").unwrap();
    tokio::time::sleep(ms(50)).await;
    tx.send("b").unwrap();
    tokio::time::sleep(ms(50)).await;
    tx.send("c").unwrap();

    let value = rx.recv().await.expect("debounced value");
    assert_eq!(value, "c");
    assert_eq!(start.elapsed(), ms(400));

    drop(tx);
    assert_eq!(rx.recv().await, None);
}

#[tokio::test(start_paused = true)]
async fn debouncer_driver_flushes_on_close() {
    let (tx, mut rx) = spawn_debouncer(ms(300));
    tx.send(7).unwrap();
    drop(tx);

    assert_eq!(rx.recv().await, Some(7));
    assert_eq!(rx.recv().await, None);
}

#[tokio::test(start_paused = true)]
async fn throttler_driver_emits_leading_and_trailing() {
    let (tx, mut rx) = spawn_throttler(ms(200));
    let start = Instant::now();

    tx.send(1).unwrap();
    assert_eq!(rx.recv().await, Some(1));

    tokio::time::sleep(ms(50)).await;
    tx.send(2).unwrap();
    tx.send(3).unwrap();

    assert_eq!(rx.recv().await, Some(3));
    assert_eq!(start.elapsed(), ms(200));

    drop(tx);
    assert_eq!(rx.recv().await, None);
}
