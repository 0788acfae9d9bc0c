use crate::attr::{AttrId, NotifyError};

/// Message codes understood by change consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MsgCode {
    AttrChanged,
}

/// Framework header carried by every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsgHeader {
    pub code: MsgCode,
    pub tx_id: u8,
    pub rx_id: u8,
}

/// Task id used for messages originating from the attribute engine.
pub const ATTR_TASK_ID: u8 = 0;
/// Receiver id meaning every subscriber.
pub const BROADCAST_RX_ID: u8 = 0xFF;

/// Ids of broadcast entries that changed in one cycle, in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrChangedMsg<'a> {
    pub header: MsgHeader,
    pub list: &'a [AttrId],
}

impl<'a> AttrChangedMsg<'a> {
    pub const fn new(list: &'a [AttrId]) -> Self {
        Self {
            header: MsgHeader {
                code: MsgCode::AttrChanged,
                tx_id: ATTR_TASK_ID,
                rx_id: BROADCAST_RX_ID,
            },
            list,
        }
    }

    pub fn contains(&self, id: AttrId) -> bool {
        self.list.contains(&id)
    }
}

/// Receives change broadcasts and per-entry notifications.
///
/// Both callbacks run with the engine locked; implementations must not call
/// back into the store.
pub trait ChangeSink {
    /// Delivers `msg` and returns how many consumers took it.
    fn broadcast(&mut self, msg: &AttrChangedMsg<'_>) -> usize;

    /// Called for a changed entry whose notify bit is set.
    fn notify(&mut self, _id: AttrId) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Sink with no consumers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBroadcast;

impl ChangeSink for NoBroadcast {
    fn broadcast(&mut self, _msg: &AttrChangedMsg<'_>) -> usize {
        0
    }
}
