//! Android key codes fixed by the remote-control protocol.

/// A remote-control key, mapped to the Android keycode the protocol expects
/// in a `RemoteKeyInject` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// D-pad up.
    Up,
    /// D-pad down.
    Down,
    /// D-pad left.
    Left,
    /// D-pad right.
    Right,
    /// D-pad center / OK.
    Select,
    /// Back navigation.
    Back,
    /// Home screen.
    Home,
    /// Power toggle.
    Power,
    /// Volume up.
    VolumeUp,
    /// Volume down.
    VolumeDown,
    /// Mute toggle.
    Mute,
    /// Channel up.
    ChannelUp,
    /// Channel down.
    ChannelDown,
}

impl KeyCode {
    /// The Android keycode value the protocol transmits for this key.
    #[must_use]
    pub const fn android_code(self) -> u32 {
        match self {
            Self::Home => 3,
            Self::Back => 4,
            Self::Up => 19,
            Self::Down => 20,
            Self::Left => 21,
            Self::Right => 22,
            Self::Select => 23,
            Self::VolumeUp => 24,
            Self::VolumeDown => 25,
            Self::Power => 26,
            Self::Mute => 164,
            Self::ChannelUp => 166,
            Self::ChannelDown => 167,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_protocol_fixed_codes() {
        assert_eq!(KeyCode::Up.android_code(), 19);
        assert_eq!(KeyCode::Down.android_code(), 20);
        assert_eq!(KeyCode::Left.android_code(), 21);
        assert_eq!(KeyCode::Right.android_code(), 22);
        assert_eq!(KeyCode::Select.android_code(), 23);
        assert_eq!(KeyCode::Back.android_code(), 4);
        assert_eq!(KeyCode::Home.android_code(), 3);
        assert_eq!(KeyCode::Power.android_code(), 26);
        assert_eq!(KeyCode::VolumeUp.android_code(), 24);
        assert_eq!(KeyCode::VolumeDown.android_code(), 25);
        assert_eq!(KeyCode::Mute.android_code(), 164);
        assert_eq!(KeyCode::ChannelUp.android_code(), 166);
        assert_eq!(KeyCode::ChannelDown.android_code(), 167);
    }
}
