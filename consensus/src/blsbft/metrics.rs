use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum MessageType {
    Propose,
    Vote,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct Inbound {
    pub message: MessageType,
}

impl Inbound {
    pub const PROPOSE: Self = Self {
        message: MessageType::Propose,
    };
    pub const VOTE: Self = Self {
        message: MessageType::Vote,
    };
}
