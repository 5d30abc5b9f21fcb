//! Input events consumed by the session controller.

/// A single input event.
///
/// Every input source (matrix keypad, tag reader, timer) funnels into this
/// one type, so the controller has exactly one dispatch point per iteration
/// instead of per-source callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A key press: `'0'..='9'` plus the four function keys.
    Key(char),
    /// A tag read, 4-byte UID big-endian-packed into `u32`. Zero never
    /// matches a user.
    TagScanned(u32),
    /// Periodic timer tick driving timeout checks.
    Tick,
}

impl Event {
    /// Pack a raw 4-byte tag UID into its `u32` wire value.
    #[inline]
    pub fn tag_from_uid(uid: [u8; 4]) -> Self {
        Event::TagScanned(u32::from_be_bytes(uid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_uid_packs_big_endian() {
        assert_eq!(
            Event::tag_from_uid([0xDA, 0x98, 0x3C, 0x03]),
            Event::TagScanned(0xDA98_3C03)
        );
    }
}
