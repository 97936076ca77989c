//! Per-invocation accumulated state shared by the pipeline's roles.
//!
//! A [`ProjectContext`] is created empty at the start of a run, owned by
//! that run, and dropped when the run ends. Only documents derived from it
//! are persisted.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use kiln_store::Role;

use crate::template::Bindings;

/// One "role produced text" entry in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub text: String,
    pub recorded_at: DateTime<Utc>,
}

/// Running transcript plus one cumulative slot per role.
#[derive(Debug, Clone, Default)]
pub struct ProjectContext {
    transcript: Vec<TranscriptEntry>,
    slots: BTreeMap<Role, String>,
}

impl ProjectContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text` to `role`'s slot (preceded by a newline) and to the
    /// transcript. No other slot is touched.
    pub fn record(&mut self, role: Role, text: &str) {
        let slot = self.slots.entry(role).or_default();
        slot.push('\n');
        slot.push_str(text);
        self.transcript.push(TranscriptEntry {
            role,
            text: text.to_owned(),
            recorded_at: Utc::now(),
        });
    }

    /// The cumulative output of `role`; empty if it has not run.
    pub fn slot(&self, role: Role) -> &str {
        self.slots.get(&role).map(String::as_str).unwrap_or("")
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn is_empty(&self) -> bool {
        self.transcript.is_empty()
    }

    /// The transcript as prompt-ready text.
    pub fn render_transcript(&self) -> String {
        let mut out = String::new();
        for entry in &self.transcript {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("[{}]\n{}\n", entry.role.title(), entry.text));
        }
        out
    }

    /// Bindings for the transcript (`context`) and every role slot.
    pub fn snapshot(&self) -> Bindings {
        let mut bindings = Bindings::new();
        bindings.insert("context".to_owned(), self.render_transcript());
        for role in Role::ALL {
            bindings.insert(role.slot().to_owned(), self.slot(role).to_owned());
        }
        bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_context_is_empty() {
        let ctx = ProjectContext::new();
        assert!(ctx.is_empty());
        assert_eq!(ctx.slot(Role::Visionary), "");
        assert_eq!(ctx.render_transcript(), "");
    }

    #[test]
    fn record_appends_with_leading_newline() {
        let mut ctx = ProjectContext::new();
        ctx.record(Role::Designer, "first");
        ctx.record(Role::Designer, "second");
        assert_eq!(ctx.slot(Role::Designer), "\nfirst\nsecond");
        assert_eq!(ctx.transcript().len(), 2);
        assert_eq!(ctx.transcript()[1].text, "second");
    }

    #[test]
    fn snapshot_has_context_and_all_slots() {
        let mut ctx = ProjectContext::new();
        ctx.record(Role::Visionary, "big idea");
        let snap = ctx.snapshot();
        assert_eq!(snap["vision"], "\nbig idea");
        assert_eq!(snap["design"], "");
        assert!(snap["context"].contains("[Visionary]\nbig idea"));
        assert_eq!(snap.len(), Role::ALL.len() + 1);
    }

    fn role_strategy() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn slot_is_newline_joined_history(
            steps in prop::collection::vec((role_strategy(), ".{0,40}"), 0..24)
        ) {
            let mut ctx = ProjectContext::new();
            for (role, text) in &steps {
                let before: Vec<String> = Role::ALL
                    .iter()
                    .map(|r| ctx.slot(*r).to_owned())
                    .collect();

                ctx.record(*role, text);

                for (i, other) in Role::ALL.iter().enumerate() {
                    if other != role {
                        prop_assert_eq!(ctx.slot(*other), before[i].as_str());
                    }
                }
            }

            for role in Role::ALL {
                let expected: String = steps
                    .iter()
                    .filter(|(r, _)| *r == role)
                    .map(|(_, t)| format!("\n{t}"))
                    .collect();
                prop_assert_eq!(ctx.slot(role), expected.as_str());
            }
            prop_assert_eq!(ctx.transcript().len(), steps.len());
        }
    }
}
