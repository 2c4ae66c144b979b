use std::collections::VecDeque;
use std::sync::Mutex;

use ingestgraph_core::EngineError;

/// A FIFO queue of canned results, for building a mock HTTP client trait
/// per connector without re-deriving the same `Mutex<VecDeque<...>>`
/// plumbing in every connector's own test module. A connector's test
/// mock holds one `CannedResponses<T>` per API method it stubs and
/// implements the connector's own `*Api` trait (`DropboxApi`, `GmailApi`,
/// `LinearApi`, `ServiceNowApi`) by popping from it.
pub struct CannedResponses<T> {
    queue: Mutex<VecDeque<Result<T, EngineError>>>,
}

impl<T> CannedResponses<T> {
    pub fn new() -> Self {
        Self { queue: Mutex::new(VecDeque::new()) }
    }

    pub fn push_ok(&self, value: T) {
        self.queue.lock().unwrap().push_back(Ok(value));
    }

    pub fn push_err(&self, error: EngineError) {
        self.queue.lock().unwrap().push_back(Err(error));
    }

    /// Pop the next canned result. Panics if the queue is empty — an
    /// unstubbed call in a scenario test is a test bug, not something to
    /// paper over with a default.
    pub fn next(&self) -> Result<T, EngineError> {
        self.queue.lock().unwrap().pop_front().expect("CannedResponses exhausted: test called the mock more times than it was stubbed")
    }

    pub fn remaining(&self) -> usize {
        self.queue.lock().unwrap().len()
    }
}

impl<T> Default for CannedResponses<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_fifo_order() {
        let responses: CannedResponses<i32> = CannedResponses::new();
        responses.push_ok(1);
        responses.push_ok(2);
        assert_eq!(responses.next().unwrap(), 1);
        assert_eq!(responses.next().unwrap(), 2);
    }

    #[test]
    fn can_stub_an_error() {
        let responses: CannedResponses<i32> = CannedResponses::new();
        responses.push_err(EngineError::transient("rate limited"));
        assert!(responses.next().is_err());
    }

    #[test]
    #[should_panic(expected = "exhausted")]
    fn panics_when_exhausted() {
        let responses: CannedResponses<i32> = CannedResponses::new();
        let _ = responses.next();
    }
}
