/// One stereo sample pair, the unit of all buffer accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Frame {
    pub left: i16,
    pub right: i16,
}

impl Frame {
    /// Digital silence on both channels.
    pub const SILENCE: Frame = Frame { left: 0, right: 0 };

    pub const fn new(left: i16, right: i16) -> Self {
        Frame { left, right }
    }

    /// The same sample on both channels.
    pub const fn mono(sample: i16) -> Self {
        Frame {
            left: sample,
            right: sample,
        }
    }

    pub const fn is_silent(&self) -> bool {
        self.left == 0 && self.right == 0
    }
}

impl From<(i16, i16)> for Frame {
    fn from((left, right): (i16, i16)) -> Self {
        Frame { left, right }
    }
}

impl From<[i16; 2]> for Frame {
    fn from([left, right]: [i16; 2]) -> Self {
        Frame { left, right }
    }
}
