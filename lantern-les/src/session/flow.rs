//! Per-peer flow-control bookkeeping.
//!
//! The remote grants a credit budget during the handshake and reports the
//! remaining credit with every response. This module only tracks that data;
//! deciding when to throttle is the caller's policy.

use crate::protocol::schema::Command;
use crate::protocol::status::{CostEntry, StatusMessage};

/// Flow-control parameters negotiated with a peer, plus the most recent
/// credit the peer reported.
#[derive(Debug, Clone, Default)]
pub struct FlowControl {
    /// Maximum credit (flowControl/BL), if the peer advertised one.
    buffer_limit: Option<u64>,
    /// Credit recharge rate (flowControl/MRR), if advertised.
    recharge_rate: Option<u64>,
    /// Per-command cost table (flowControl/MRC).
    cost_table: Vec<CostEntry>,
    /// Last buffer_value reported by the remote, if any response arrived yet.
    last_buffer_value: Option<u64>,
}

impl FlowControl {
    /// Build bookkeeping from the flow-control keys of a Status message.
    pub fn from_status(status: &StatusMessage) -> Self {
        FlowControl {
            buffer_limit: status.flow_buffer_limit,
            recharge_rate: status.flow_recharge_rate,
            cost_table: status.flow_cost_table.clone().unwrap_or_default(),
            last_buffer_value: None,
        }
    }

    /// Maximum credit granted by the remote.
    pub fn buffer_limit(&self) -> Option<u64> {
        self.buffer_limit
    }

    /// Credit recharge rate advertised by the remote.
    pub fn recharge_rate(&self) -> Option<u64> {
        self.recharge_rate
    }

    /// The negotiated cost table.
    pub fn cost_table(&self) -> &[CostEntry] {
        &self.cost_table
    }

    /// Record the credit reported by a response.
    pub fn record_buffer_value(&mut self, value: u64) {
        self.last_buffer_value = Some(value);
    }

    /// Most recently reported credit, if any response arrived yet.
    pub fn last_buffer_value(&self) -> Option<u64> {
        self.last_buffer_value
    }

    /// Cost of a request for `units` items under the negotiated table.
    ///
    /// Returns `None` when the remote published no entry for the command.
    pub fn cost_of(&self, command: Command, units: u64) -> Option<u64> {
        self.cost_table
            .iter()
            .find(|entry| entry.command == u64::from(command.code()))
            .map(|entry| entry.base_cost.saturating_add(entry.unit_cost.saturating_mul(units)))
    }
}
