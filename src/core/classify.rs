//! Transcript classification via the language model.
//!
//! One fixed instruction, one user message carrying the transcript. The
//! completion is returned verbatim; splitting it into note/to-do sections
//! is the caller's job (`domain::classified`).

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::adapters::LanguageModel;

/// System instruction sent with every classification call.
pub const CLASSIFY_INSTRUCTION: &str = "你扮演一個業務助理,請將記錄分類為 '#記事' 與 '#待辦' ,先給#記事再給#待辦,不記錄日期,每項開頭不要使用數字,如果沒有待辦就回答'沒有資料',如果安排會議請加入'解決什麼問題'例如安排會議討論客訴問題,人名需要保留.換行使用\\r\\n \r\n";

/// Classifies transcripts into tagged note/to-do text.
#[derive(Clone)]
pub struct Classifier {
    model: Arc<dyn LanguageModel>,
}

impl Classifier {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Ask the model to classify a transcript. Collaborator errors pass
    /// through unchanged; there is no retry at this layer.
    pub async fn classify(&self, transcript: &str) -> Result<String> {
        let completion = self
            .model
            .complete(CLASSIFY_INSTRUCTION, &user_prompt(transcript))
            .await?;
        debug!(chars = completion.chars().count(), "transcript classified");
        Ok(completion)
    }
}

fn user_prompt(transcript: &str) -> String {
    format!("記錄:\r\n{transcript}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NOTE_TAG, NO_DATA, TODO_TAG};

    #[test]
    fn test_user_prompt_prefix() {
        assert_eq!(
            user_prompt("業務阿雷反映客戶的客訴"),
            "記錄:\r\n業務阿雷反映客戶的客訴"
        );
    }

    #[test]
    fn test_instruction_names_the_tags_and_sentinel() {
        assert!(CLASSIFY_INSTRUCTION.contains(NOTE_TAG));
        assert!(CLASSIFY_INSTRUCTION.contains(TODO_TAG));
        assert!(CLASSIFY_INSTRUCTION.contains(NO_DATA));
        // The line-break guidance is the literal two-character escapes, not
        // a real CRLF.
        assert!(CLASSIFY_INSTRUCTION.contains("\\r\\n"));
    }
}
