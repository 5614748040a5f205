use std::ops::{BitOr, BitOrAssign};

/// Outcome of handling one inbound handshake message, returned to the
/// inbound pipeline.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HandshakeFlags(u8);

impl HandshakeFlags {
    /// Continue ordinary chat assignment for the message.
    pub const CONTINUE_NORMAL_PROCESSING: HandshakeFlags = HandshakeFlags(0x01);
    /// The message is consumed by the handshake.
    pub const STOP_NORMAL_PROCESSING: HandshakeFlags = HandshakeFlags(0x02);
    /// Schedule deletion of the message from the server.
    pub const ADD_DELETE_JOB: HandshakeFlags = HandshakeFlags(0x04);

    /// Result of every rejected message.
    pub const FAILURE: HandshakeFlags =
        Self::STOP_NORMAL_PROCESSING.union(Self::ADD_DELETE_JOB);

    pub const fn empty() -> Self {
        HandshakeFlags(0)
    }

    pub const fn union(self, other: HandshakeFlags) -> Self {
        HandshakeFlags(self.0 | other.0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: HandshakeFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for HandshakeFlags {
    type Output = HandshakeFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl BitOrAssign for HandshakeFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl std::fmt::Debug for HandshakeFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = [
            (Self::CONTINUE_NORMAL_PROCESSING, "CONTINUE_NORMAL_PROCESSING"),
            (Self::STOP_NORMAL_PROCESSING, "STOP_NORMAL_PROCESSING"),
            (Self::ADD_DELETE_JOB, "ADD_DELETE_JOB"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if set.is_empty() {
            write!(f, "HandshakeFlags(empty)")
        } else {
            write!(f, "HandshakeFlags({})", set.join(" | "))
        }
    }
}
