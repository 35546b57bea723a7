use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Hands out request tickets. Only the most recent ticket is current, so a slow response to an
/// older request can be recognized and dropped.
#[derive(Clone, Debug, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supersedes every ticket handed out before.
    pub fn next(&self) -> Ticket {
        let id = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket {
            id,
            latest: self.0.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Ticket {
    id: u64,
    latest: Arc<AtomicU64>,
}

impl Ticket {
    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.id
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_newest_ticket_is_current() {
        let gen = Generation::new();
        let first = gen.next();
        assert!(first.is_current());
        let second = gen.clone().next();
        assert!(!first.is_current());
        assert!(second.is_current());
        assert!(second.id() > first.id());
    }
}
