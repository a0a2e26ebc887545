//! 재사용 이미지 버퍼 풀.
//!
//! 프레임마다 발생하는 픽셀 버퍼 할당을 줄이기 위한 유한 free-list.
//! 반납 시 풀이 가득 차 있으면 버퍼를 버리며, 상한 이상으로 커지지 않는다.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::models::performance::PoolStats;

/// 유한 버퍼 풀
#[derive(Debug)]
pub struct BufferPool {
    free: Mutex<Vec<Vec<u8>>>,
    capacity: AtomicUsize,
    hits: AtomicU64,
    misses: AtomicU64,
    dropped: AtomicU64,
}

impl BufferPool {
    /// 최대 보관 수를 지정해 생성
    pub fn new(capacity: usize) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(capacity)),
            capacity: AtomicUsize::new(capacity),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// `len` 바이트 버퍼 대여 (내용은 0으로 초기화)
    pub fn borrow(&self, len: usize) -> Vec<u8> {
        let reused = {
            let mut free = self.free.lock();
            free.iter()
                .position(|buf| buf.capacity() >= len)
                .map(|idx| free.swap_remove(idx))
        };

        match reused {
            Some(mut buf) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                buf.clear();
                buf.resize(len, 0);
                buf
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                vec![0; len]
            }
        }
    }

    /// 버퍼 반납 — 풀이 가득 차 있으면 버림
    pub fn give_back(&self, buf: Vec<u8>) {
        let cap = self.capacity.load(Ordering::Relaxed);
        let mut free = self.free.lock();
        if free.len() >= cap {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        free.push(buf);
    }

    /// 최대 보관 수 변경 (초과분은 즉시 해제)
    pub fn set_capacity(&self, capacity: usize) {
        self.capacity.store(capacity, Ordering::Relaxed);
        let mut free = self.free.lock();
        if free.len() > capacity {
            let excess = free.len() - capacity;
            free.truncate(capacity);
            self.dropped.fetch_add(excess as u64, Ordering::Relaxed);
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed)
    }

    /// 현재 보관 중인 버퍼 수
    pub fn available(&self) -> usize {
        self.free.lock().len()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            available: self.available(),
            capacity: self.capacity(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(8)
    }
}
