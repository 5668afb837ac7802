use expertise_core::history::VirtualOperation;

/// Append-only destination for virtual operations.
///
/// The ledger only ever writes to a sink; history indexers consume it.
pub trait EventSink {
    fn record(&mut self, op: VirtualOperation);
}

impl EventSink for Vec<VirtualOperation> {
    fn record(&mut self, op: VirtualOperation) {
        self.push(op);
    }
}

/// Sink that drops everything. For hosts without a history indexer.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&mut self, _op: VirtualOperation) {}
}
