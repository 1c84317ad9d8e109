//! Relay endpoint allocation
//!
//! Each relay instance owns an exclusive pair of local UDP ports, one per
//! media kind, handed out from a configured pool. Pairs return to the
//! pool when the instance shuts down, so concurrently active instances
//! never contend for an endpoint.

use std::collections::BTreeSet;

use tokio::sync::Mutex;

use crate::error::{Error, Result};

/// An exclusive pair of local ports for one relay instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortPair {
    /// Port the transcoder addresses the video substream to
    pub video: u16,
    /// Port the transcoder addresses the audio substream to
    pub audio: u16,
}

/// Pool of relay port pairs
pub struct PortAllocator {
    /// Free pair base ports; the pair is (base, base + 1)
    free: Mutex<BTreeSet<u16>>,
}

impl PortAllocator {
    /// Create a pool covering `min..max` (consecutive-port pairs)
    pub fn new(min: u16, max: u16) -> Self {
        let free = (min..max)
            .step_by(2)
            .filter(|base| base + 1 < max)
            .collect();

        Self {
            free: Mutex::new(free),
        }
    }

    /// Take the lowest free pair from the pool
    pub async fn allocate(&self) -> Result<PortPair> {
        let mut free = self.free.lock().await;
        let base = free.pop_first().ok_or(Error::PortsExhausted)?;

        Ok(PortPair {
            video: base,
            audio: base + 1,
        })
    }

    /// Return a pair to the pool
    pub async fn release(&self, pair: PortPair) {
        self.free.lock().await.insert(pair.video);
    }

    /// Number of free pairs
    pub async fn available(&self) -> usize {
        self.free.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allocate_distinct_pairs() {
        let ports = PortAllocator::new(5004, 5010);
        assert_eq!(ports.available().await, 3);

        let a = ports.allocate().await.unwrap();
        let b = ports.allocate().await.unwrap();

        assert_eq!(a, PortPair { video: 5004, audio: 5005 });
        assert_eq!(b, PortPair { video: 5006, audio: 5007 });
        assert_ne!(a.video, b.video);
    }

    #[tokio::test]
    async fn test_exhaustion() {
        let ports = PortAllocator::new(6000, 6002);

        ports.allocate().await.unwrap();
        assert!(matches!(
            ports.allocate().await,
            Err(Error::PortsExhausted)
        ));
    }

    #[tokio::test]
    async fn test_release_returns_pair() {
        let ports = PortAllocator::new(6000, 6002);

        let pair = ports.allocate().await.unwrap();
        ports.release(pair).await;

        let again = ports.allocate().await.unwrap();
        assert_eq!(pair, again);
    }

    #[tokio::test]
    async fn test_odd_range_excludes_incomplete_pair() {
        // 7000..7003 only fits one full pair
        let ports = PortAllocator::new(7000, 7003);
        assert_eq!(ports.available().await, 1);
    }
}
