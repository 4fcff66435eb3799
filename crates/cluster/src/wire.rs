//! Fixed message header (spec §6): 1-byte type, 4-byte id, 4-byte payload
//! size. Dispatch on the type byte is an exhaustive match over
//! [`WireMessageType`], not a global factory keyed by a type byte (spec
//! §9's re-architecture note on message dispatch).

/// The wire-level type tag. `DataRaw` is special-cased: it is matched
/// only by `fetch_data`'s receive path and must never reach `check_mail`
/// (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireMessageType {
    TaskNew = 0,
    TaskFinished = 1,
    Satisfiability = 2,
    RemoteAccessRelease = 3,
    DataRaw = 4,
}

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("unknown wire message type byte {0}")]
    UnknownType(u8),
    #[error("header requires at least 9 bytes, got {0}")]
    ShortHeader(usize),
}

impl WireMessageType {
    pub fn from_byte(b: u8) -> Result<Self, WireError> {
        match b {
            0 => Ok(WireMessageType::TaskNew),
            1 => Ok(WireMessageType::TaskFinished),
            2 => Ok(WireMessageType::Satisfiability),
            3 => Ok(WireMessageType::RemoteAccessRelease),
            4 => Ok(WireMessageType::DataRaw),
            other => Err(WireError::UnknownType(other)),
        }
    }

    pub fn is_data_raw(self) -> bool {
        matches!(self, WireMessageType::DataRaw)
    }
}

/// Fixed 9-byte header preceding every message's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireHeader {
    pub msg_type: WireMessageType,
    pub id: u32,
    pub payload_size: u32,
}

pub const HEADER_LEN: usize = 1 + 4 + 4;

impl WireHeader {
    pub fn new(msg_type: WireMessageType, id: u32, payload_size: u32) -> Self {
        Self { msg_type, id, payload_size }
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0] = self.msg_type as u8;
        out[1..5].copy_from_slice(&self.id.to_le_bytes());
        out[5..9].copy_from_slice(&self.payload_size.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() < HEADER_LEN {
            return Err(WireError::ShortHeader(bytes.len()));
        }
        let msg_type = WireMessageType::from_byte(bytes[0])?;
        let id = u32::from_le_bytes(bytes[1..5].try_into().unwrap());
        let payload_size = u32::from_le_bytes(bytes[5..9].try_into().unwrap());
        Ok(Self { msg_type, id, payload_size })
    }
}
