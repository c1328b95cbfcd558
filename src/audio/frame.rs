// One stereo frame of device output. Voices render planar blocks in their
// own channel count and fold down to this when mixing into the device buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

impl StereoFrame {
    pub fn zero() -> Self { // just giving `default` a better name for clarity
        Self::default()
    }

    // mono is duplicated, anything past two channels is dropped
    pub fn from_planar(channels: &[Vec<f32>], i: usize) -> Self {
        match channels {
            [] => Self::zero(),
            [mono] => Self { left: mono[i], right: mono[i] },
            [l, r, ..] => Self { left: l[i], right: r[i] },
        }
    }
}
