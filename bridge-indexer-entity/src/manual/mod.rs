use crate::bridge_transactions;

impl bridge_transactions::Model {
    pub fn has_out_half(&self) -> bool {
        self.from_tx_hash.is_some()
    }

    pub fn has_in_half(&self) -> bool {
        self.to_tx_hash.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.has_out_half() && self.has_in_half()
    }
}
