#[derive(Clone, Debug, PartialEq)]
pub struct AudioStreamTarget {
    pub codec: String,
    pub bitrate_kbps: u32,
}

/// One target per input audio stream, index-aligned with the input.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioStreamPlan {
    pub streams: Vec<AudioStreamTarget>,
}

pub fn bitrate_for_channels(channels: u32) -> u32 {
    match channels {
        0 | 1 => 96,
        2 => 160,
        _ => 384,
    }
}

impl AudioStreamPlan {
    pub fn build(codec: &str, audio_channels: &[u32]) -> Self {
        AudioStreamPlan {
            streams: audio_channels
                .iter()
                .map(|&channels| AudioStreamTarget {
                    codec: String::from(codec),
                    bitrate_kbps: bitrate_for_channels(channels),
                })
                .collect(),
        }
    }

    pub fn bitrates(&self) -> Vec<u32> {
        self.streams.iter().map(|s| s.bitrate_kbps).collect()
    }
}
