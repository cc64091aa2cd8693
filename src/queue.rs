// Licensed under the MIT license or the Apache License, Version 2.0, at your option.

/*!
Output queues (spec.md §4.6, §5).

Both queues live behind a single mutex, as the worker is the sole writer
for either of them and a client is free to call `get_video`/`get_audio`
from any thread other than the worker, concurrently with each other.

spec.md §9's Design Notes license any container whose items are owned
exclusively by the queue while enqueued and handed off whole on dequeue;
the "next is null" invariant only needs to hold observably. A `VecDeque`
gives exactly that without a hand-rolled intrusive list.
*/

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

struct Inner<V, A> {
    video: VecDeque<V>,
    audio: VecDeque<A>,
}

/// The shared state behind the decoder handle: two FIFOs plus the condvar
/// the worker waits on when the video queue is saturated (spec.md §4.4's
/// backpressure gate, upgraded per §9's Design Notes from poll-sleep to a
/// condition variable signalled on every dequeue).
pub struct Queues<V, A> {
    inner: Mutex<Inner<V, A>>,
    space_available: Condvar,
}

impl<V, A> Queues<V, A> {
    pub fn new() -> Self {
        Queues {
            inner: Mutex::new(Inner { video: VecDeque::new(), audio: VecDeque::new() }),
            space_available: Condvar::new(),
        }
    }

    pub fn push_video(&self, item: V) {
        let mut inner = self.inner.lock().unwrap();
        inner.video.push_back(item);
    }

    pub fn push_audio(&self, item: A) {
        let mut inner = self.inner.lock().unwrap();
        inner.audio.push_back(item);
    }

    pub fn pop_video(&self) -> Option<V> {
        let mut inner = self.inner.lock().unwrap();
        let item = inner.video.pop_front();
        drop(inner);
        if item.is_some() {
            self.space_available.notify_one();
        }
        item
    }

    pub fn pop_audio(&self) -> Option<A> {
        let mut inner = self.inner.lock().unwrap();
        inner.audio.pop_front()
    }

    pub fn video_len(&self) -> usize {
        self.inner.lock().unwrap().video.len()
    }

    /// Blocks the calling (worker) thread until the video queue has
    /// fewer than `max` items, or `halted` becomes true. Polls `halted`
    /// at each wakeup so cancellation latency stays bounded even if a
    /// dequeue notification is missed (spec.md §5's worst-case latency
    /// of "one backpressure interval").
    pub fn wait_for_space(&self, max: usize, halted: &std::sync::atomic::AtomicBool) {
        let mut inner = self.inner.lock().unwrap();
        while inner.video.len() >= max && !halted.load(std::sync::atomic::Ordering::Acquire) {
            let (next, _timeout) = self
                .space_available
                .wait_timeout(inner, Duration::from_millis(10))
                .unwrap();
            inner = next;
        }
    }

    /// Drains and drops every queued item (spec.md §4.1's `stop` contract).
    pub fn drain(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.video.clear();
        inner.audio.clear();
    }
}

#[cfg(test)]
#[test]
fn test_fifo_order_preserved() {
    let q: Queues<u32, ()> = Queues::new();
    for i in 0..5 {
        q.push_video(i);
    }
    for i in 0..5 {
        assert_eq!(q.pop_video(), Some(i));
    }
    assert_eq!(q.pop_video(), None);
}

#[cfg(test)]
#[test]
fn test_pop_after_empty_stays_empty() {
    let q: Queues<u32, ()> = Queues::new();
    assert_eq!(q.pop_video(), None);
    assert_eq!(q.pop_video(), None);
}

#[cfg(test)]
#[test]
fn test_video_len_tracks_pushes_and_pops() {
    let q: Queues<u32, ()> = Queues::new();
    assert_eq!(q.video_len(), 0);
    q.push_video(1);
    q.push_video(2);
    assert_eq!(q.video_len(), 2);
    q.pop_video();
    assert_eq!(q.video_len(), 1);
}

#[cfg(test)]
#[test]
fn test_drain_empties_both_queues() {
    let q: Queues<u32, u32> = Queues::new();
    q.push_video(1);
    q.push_audio(2);
    q.drain();
    assert_eq!(q.pop_video(), None);
    assert_eq!(q.pop_audio(), None);
}

#[cfg(test)]
#[test]
fn test_wait_for_space_returns_once_halted() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    let q: Arc<Queues<u32, ()>> = Arc::new(Queues::new());
    q.push_video(1);
    q.push_video(2);
    let halted = Arc::new(AtomicBool::new(false));

    let q2 = q.clone();
    let halted2 = halted.clone();
    let t = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        halted2.store(true, Ordering::Release);
    });

    let start = Instant::now();
    q.wait_for_space(2, &halted);
    assert!(start.elapsed() < Duration::from_millis(500));
    t.join().unwrap();
}
