use connectors::http::transport::HeaderMap;

/// One non-rate-limit HTTP failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub code: u16,
    pub message: String,
    pub headers: HeaderMap,
}

/// Recent hard failures for one pull client, shared by every resource it
/// pulls. Reaching capacity means the run must stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLedger {
    entries: Vec<LedgerEntry>,
    capacity: usize,
}

impl ErrorLedger {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Records a failure; returns `true` once the ledger is full.
    pub fn record(&mut self, entry: LedgerEntry) -> bool {
        self.entries.push(entry);
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
