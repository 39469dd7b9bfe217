use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::core::model::{Role, TranscriptRecord};
use crate::export::RecordSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    Empty,
    InScene,
    InSpeaker,
    InDialogue,
}

/// What a new speaker cue gets as scene text when none is buffered.
#[derive(ValueEnum, Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SceneCarryOver {
    /// Leave the scene field empty.
    #[default]
    Never,
    /// Reuse the scene text of the last committed record that had one.
    LastCommitted,
}

fn collapse_newlines(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

fn strip_newlines(text: &str) -> String {
    text.replace(['\n', '\r'], "")
}

/// Turns a role-tagged line stream into (scene, speaker, dialogue) records.
///
/// A record is written only once its dialogue is complete: when the next
/// scene or speaker line arrives, or on [`TranscriptBuilder::close`].
pub struct TranscriptBuilder<S: RecordSink> {
    sink: S,
    state: BuilderState,
    scene: String,
    speaker: String,
    dialogue: String,
    last_scene: String,
    carry_over: SceneCarryOver,
    committed: usize,
}

impl<S: RecordSink> TranscriptBuilder<S> {
    pub fn new(sink: S) -> Self {
        Self::with_carry_over(sink, SceneCarryOver::default())
    }

    pub fn with_carry_over(sink: S, carry_over: SceneCarryOver) -> Self {
        Self {
            sink,
            state: BuilderState::Empty,
            scene: String::new(),
            speaker: String::new(),
            dialogue: String::new(),
            last_scene: String::new(),
            carry_over,
            committed: 0,
        }
    }

    pub fn state(&self) -> BuilderState {
        self.state
    }

    /// Records written so far.
    pub fn committed(&self) -> usize {
        self.committed
    }

    pub fn push(&mut self, role: Role, text: &str) -> Result<()> {
        match role {
            Role::Scene | Role::Unassigned => self.push_scene(text),
            Role::Speaker => self.push_speaker(text),
            Role::Dialogue => {
                self.push_dialogue(text);
                Ok(())
            }
        }
    }

    pub fn push_scene(&mut self, text: &str) -> Result<()> {
        if self.state == BuilderState::InDialogue {
            self.commit()?;
        }
        self.scene.push_str(&collapse_newlines(text));
        self.scene.push(' ');
        self.state = BuilderState::InScene;
        Ok(())
    }

    pub fn push_speaker(&mut self, text: &str) -> Result<()> {
        let text = strip_newlines(text);
        if self.state == BuilderState::InDialogue {
            self.commit()?;
        }

        if self.state == BuilderState::InSpeaker {
            // continuation lines are glued on as-is
            self.speaker.push_str(&text);
        } else {
            if self.state != BuilderState::InScene
                && self.scene.is_empty()
                && self.carry_over == SceneCarryOver::LastCommitted
            {
                self.scene = self.last_scene.clone();
            }
            self.speaker = text;
            self.dialogue.clear();
        }
        self.state = BuilderState::InSpeaker;
        Ok(())
    }

    /// Dialogue before any scene or speaker has nowhere to go and is dropped.
    pub fn push_dialogue(&mut self, text: &str) {
        if self.state == BuilderState::Empty {
            return;
        }
        if !self.dialogue.is_empty() {
            self.dialogue.push(' ');
        }
        self.dialogue.push_str(&collapse_newlines(text));
        self.state = BuilderState::InDialogue;
    }

    fn commit(&mut self) -> Result<()> {
        let record = TranscriptRecord {
            scene_description: std::mem::take(&mut self.scene),
            speaker: self.speaker.clone(),
            dialogue: self.dialogue.clone(),
        };
        self.sink.write_record(&record)?;
        if !record.scene_description.is_empty() {
            self.last_scene = record.scene_description;
        }
        self.committed += 1;
        Ok(())
    }

    /// Commits pending dialogue and hands the finished sink back.
    /// Scene or speaker text without dialogue is dropped.
    pub fn close(self) -> Result<S> {
        self.finish().map(|(sink, _)| sink)
    }

    /// Like [`TranscriptBuilder::close`], also returning the number of records written.
    pub fn finish(mut self) -> Result<(S, usize)> {
        if self.state == BuilderState::InDialogue {
            self.commit()?;
        }
        self.sink.finish()?;
        Ok((self.sink, self.committed))
    }
}
