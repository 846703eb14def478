//! Turns rendered cards into timed still segments with a sound effect.

use std::path::{Path, PathBuf};

use reelstitch_card_render::{CardRenderer, CardSpec};
use reelstitch_common::config::AssetConfig;
use reelstitch_common::error::{StitchError, StitchResult};

use crate::media::MediaProbe;
use crate::segment::{AudioTrack, Segment};

/// Sound effect files played at the start of cards.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundEffects {
    /// Played on every numbered card.
    pub tick: PathBuf,
    /// Played on the closing card.
    pub end: PathBuf,
    pub tick_max_secs: f64,
    pub end_max_secs: f64,
}

impl SoundEffects {
    pub fn from_config(assets: &AssetConfig) -> Self {
        Self {
            tick: assets.tick_path(),
            end: assets.end_path(),
            tick_max_secs: assets.tick_max_secs,
            end_max_secs: assets.end_max_secs,
        }
    }
}

pub struct CardClipBuilder<'a> {
    renderer: CardRenderer,
    probe: &'a dyn MediaProbe,
    sounds: SoundEffects,
}

impl<'a> CardClipBuilder<'a> {
    pub fn new(renderer: CardRenderer, probe: &'a dyn MediaProbe, sounds: SoundEffects) -> Self {
        Self {
            renderer,
            probe,
            sounds,
        }
    }

    /// Render the card and wrap it as a still segment of `spec.duration_secs`.
    ///
    /// A missing sound effect only drops the audio; a render failure is
    /// returned as [`StitchError::CardRender`].
    pub fn build(&self, spec: &CardSpec) -> StitchResult<Segment> {
        let card = self.renderer.render(spec)?;
        let audio = self.sound_for(spec);
        Ok(Segment::card(
            spec.index,
            spec.is_final,
            card.path,
            spec.duration_secs,
            audio,
        ))
    }

    fn sound_for(&self, spec: &CardSpec) -> Option<AudioTrack> {
        let (path, max_secs) = if spec.is_final {
            (&self.sounds.end, self.sounds.end_max_secs)
        } else {
            (&self.sounds.tick, self.sounds.tick_max_secs)
        };

        match self.load_sound(path, max_secs) {
            Ok(track) => Some(track),
            // The closing card is silent without its sound; nothing to report.
            Err(e) if spec.is_final => {
                tracing::debug!(index = spec.index, error = %e, "Closing card sound unavailable");
                None
            }
            Err(e) => {
                tracing::warn!(
                    index = spec.index,
                    path = %path.display(),
                    error = %e,
                    "sound effect asset missing"
                );
                None
            }
        }
    }

    fn load_sound(&self, path: &Path, max_secs: f64) -> StitchResult<AudioTrack> {
        if !path.is_file() {
            return Err(StitchError::missing_asset(path));
        }
        let info = self
            .probe
            .probe(path)
            .map_err(|_| StitchError::missing_asset(path))?;
        let duration_secs = max_secs.min(info.duration_secs);
        if !info.has_audio || duration_secs <= 0.0 {
            return Err(StitchError::missing_asset(path));
        }
        Ok(AudioTrack {
            source_path: path.to_path_buf(),
            duration_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaInfo;
    use crate::segment::{SegmentKind, VisualTrack};
    use reelstitch_card_render::{GlyphSource, ThemeCatalog};
    use reelstitch_common::frame::FrameSize;

    struct FixedAudio(f64);

    impl MediaProbe for FixedAudio {
        fn probe(&self, _path: &Path) -> StitchResult<MediaInfo> {
            Ok(MediaInfo {
                video_size: None,
                duration_secs: self.0,
                has_audio: true,
            })
        }
    }

    fn sounds(dir: &Path) -> SoundEffects {
        SoundEffects::from_config(&AssetConfig {
            dir: dir.to_path_buf(),
            ..AssetConfig::default()
        })
    }

    fn renderer(dir: &Path) -> CardRenderer {
        CardRenderer::new(
            FrameSize::VERTICAL_720P,
            GlyphSource::builtin_only(),
            0,
            dir.join("cards"),
        )
    }

    #[test]
    fn tick_sound_is_capped_at_half_a_second() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ding.wav"), b"riff").unwrap();
        let probe = FixedAudio(1.7);
        let builder = CardClipBuilder::new(renderer(dir.path()), &probe, sounds(dir.path()));

        let segment = builder
            .build(&CardSpec::counter(2, 0.5, ThemeCatalog::lookup("p6")))
            .unwrap();

        assert_eq!(
            segment.kind,
            SegmentKind::Card {
                index: 2,
                is_final: false
            }
        );
        let audio = segment.audio.unwrap();
        assert_eq!(audio.source_path, dir.path().join("ding.wav"));
        assert!((audio.duration_secs - 0.5).abs() < 1e-9);
        assert!(matches!(segment.visual, VisualTrack::Still { ref image_path } if image_path.exists()));
    }

    #[test]
    fn short_end_sound_keeps_its_own_length() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("end.wav"), b"riff").unwrap();
        let probe = FixedAudio(0.4);
        let builder = CardClipBuilder::new(renderer(dir.path()), &probe, sounds(dir.path()));

        let segment = builder
            .build(&CardSpec::closing(3, 2.0, ThemeCatalog::lookup("p1")))
            .unwrap();
        assert!((segment.duration_secs - 2.0).abs() < 1e-9);
        assert!((segment.audio.unwrap().duration_secs - 0.4).abs() < 1e-9);
    }

    #[test]
    fn missing_sound_yields_silent_segment() {
        let dir = tempfile::tempdir().unwrap();
        let probe = FixedAudio(1.0);
        let builder = CardClipBuilder::new(renderer(dir.path()), &probe, sounds(dir.path()));

        let counter = builder
            .build(&CardSpec::counter(1, 0.5, ThemeCatalog::lookup("p6")))
            .unwrap();
        let closing = builder
            .build(&CardSpec::closing(2, 2.0, ThemeCatalog::lookup("p6")))
            .unwrap();
        assert!(counter.audio.is_none());
        assert!(closing.audio.is_none());
    }

    #[test]
    fn render_failure_is_propagated() {
        let dir = tempfile::tempdir().unwrap();
        let probe = FixedAudio(1.0);
        let builder = CardClipBuilder::new(renderer(dir.path()), &probe, sounds(dir.path()));

        let err = builder
            .build(&CardSpec::counter(1, -1.0, ThemeCatalog::lookup("p6")))
            .unwrap_err();
        assert!(matches!(err, StitchError::CardRender { .. }));
    }
}
