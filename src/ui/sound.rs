/// Sound engine: procedural 8-bit style sound effects via rodio.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile without the "sound" feature to disable audio entirely
/// (the stub SoundEngine does nothing).

use crate::sim::event::GameEvent;

/// One sound per tick, picked by `cue_for`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cue {
    Step,
    Push,
    Drag,
    Bump,
}

/// The most significant sound for a tick's events. A rejected player
/// move wins over everything, then pushes, then dragged companions.
pub fn cue_for(events: &[GameEvent]) -> Option<Cue> {
    let has = |pred: fn(&GameEvent) -> bool| events.iter().any(pred);
    if has(|e| matches!(e, GameEvent::PlayerBlocked { .. })) {
        Some(Cue::Bump)
    } else if has(|e| matches!(e, GameEvent::BlockPushed { .. })) {
        Some(Cue::Push)
    } else if has(|e| matches!(e, GameEvent::StickyMoved { .. } | GameEvent::ClingyMoved { .. })) {
        Some(Cue::Drag)
    } else if has(|e| matches!(e, GameEvent::PlayerMoved { .. })) {
        Some(Cue::Step)
    } else {
        None
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::Cue;

    const SAMPLE_RATE: u32 = 22050;

    /// Pre-generated WAV buffers for each sound effect.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_step: Arc<Vec<u8>>,
        sfx_push: Arc<Vec<u8>>,
        sfx_drag: Arc<Vec<u8>>,
        sfx_bump: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = OutputStream::try_default().ok()?;

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_step: Arc::new(make_wav(&gen_blip(660.0, 0.03, 0.15))),
                sfx_push: Arc::new(make_wav(&gen_push())),
                sfx_drag: Arc::new(make_wav(&gen_drag())),
                sfx_bump: Arc::new(make_wav(&gen_bump())),
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }

        pub fn play_cue(&self, cue: Cue) {
            match cue {
                Cue::Step => self.play(&self.sfx_step),
                Cue::Push => self.play(&self.sfx_push),
                Cue::Drag => self.play(&self.sfx_drag),
                Cue::Bump => self.play(&self.sfx_bump),
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    /// Simple sine blip at given frequency and duration
    fn gen_blip(freq: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32); // linear fade out
                (t * freq * 2.0 * std::f32::consts::PI).sin() * env * volume
            })
            .collect()
    }

    /// Push: low scrape, noise over a falling tone
    fn gen_push() -> Vec<f32> {
        let duration = 0.09;
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut rng: u32 = 2463534242;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = 180.0 - t * 60.0;
                let ti = i as f32 / SAMPLE_RATE as f32;
                let tone = (ti * freq * 2.0 * std::f32::consts::PI).sin();
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                let env = (1.0 - t).powf(0.7);
                (tone * 0.6 + noise * 0.4) * env * 0.3
            })
            .collect()
    }

    /// Drag: two quick rising notes
    fn gen_drag() -> Vec<f32> {
        let notes = [440.0_f32, 587.0]; // A4, D5
        let note_dur = 0.035;
        let mut samples = Vec::new();
        for &freq in &notes {
            let n = (SAMPLE_RATE as f32 * note_dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                let wave = (t * freq * 2.0 * std::f32::consts::PI).sin() * 0.7
                    + (t * freq * 3.0 * 2.0 * std::f32::consts::PI).sin() * 0.3;
                samples.push(wave * env * 0.2);
            }
        }
        samples
    }

    /// Bump: dull thud with a fast decay
    fn gen_bump() -> Vec<f32> {
        let duration = 0.07;
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = 110.0 - t * 40.0;
                let ti = i as f32 / SAMPLE_RATE as f32;
                let env = (1.0 - t).powf(2.0);
                (ti * freq * 2.0 * std::f32::consts::PI).sin() * env * 0.35
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2; // 16-bit = 2 bytes per sample
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        // RIFF header
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        // fmt chunk
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes());  // PCM format
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let clamped = s.clamp(-1.0, 1.0);
            let val = (clamped * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }

}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_cue(&self, _cue: Cue) {}
}

impl SoundEngine {
    /// Play the cue for one tick's events, if any.
    pub fn play_for_events(&self, events: &[GameEvent]) {
        if let Some(cue) = cue_for(events) {
            self.play_cue(cue);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::EntityId;
    use crate::domain::grid::GridPos;
    use crate::domain::rules::MoveOutcome;

    fn moved() -> GameEvent {
        GameEvent::PlayerMoved { from: GridPos::new(1, 1), to: GridPos::new(2, 1) }
    }

    #[test]
    fn quiet_tick_has_no_cue() {
        assert_eq!(cue_for(&[]), None);
        let blocked_companion = GameEvent::StickyBlocked {
            id: EntityId(1),
            outcome: MoveOutcome::BlockedByWall,
        };
        assert_eq!(cue_for(&[blocked_companion]), None);
    }

    #[test]
    fn plain_step() {
        assert_eq!(cue_for(&[moved()]), Some(Cue::Step));
    }

    #[test]
    fn push_beats_drag_and_step() {
        let events = [
            GameEvent::StickyMoved { id: EntityId(1), to: GridPos::new(2, 2) },
            GameEvent::BlockPushed { id: EntityId(2), to: GridPos::new(3, 1) },
            moved(),
        ];
        assert_eq!(cue_for(&events), Some(Cue::Push));
    }

    #[test]
    fn drag_beats_step() {
        let events = [GameEvent::ClingyMoved { id: EntityId(3), to: GridPos::new(1, 2) }, moved()];
        assert_eq!(cue_for(&events), Some(Cue::Drag));
    }

    #[test]
    fn bump_wins() {
        let events = [
            GameEvent::StickyMoved { id: EntityId(1), to: GridPos::new(2, 2) },
            GameEvent::PlayerBlocked { at: GridPos::new(2, 2), outcome: MoveOutcome::BlockedByWall },
        ];
        assert_eq!(cue_for(&events), Some(Cue::Bump));
    }
}
