use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use taskchain::errors::StepError;
use taskchain::step::Prompter;

/// Answers prompts from a fixed script and records the questions asked.
///
/// Running out of answers behaves like end-of-input.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompter {
    answers: Arc<Mutex<VecDeque<bool>>>,
    asked: Arc<Mutex<Vec<String>>>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Arc::new(Mutex::new(answers.into_iter().collect())),
            asked: Arc::default(),
        }
    }

    pub fn questions(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn ask<'a>(
        &'a self,
        question: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, StepError>> + Send + 'a>> {
        Box::pin(async move {
            self.asked.lock().unwrap().push(question.to_string());
            self.answers.lock().unwrap().pop_front().ok_or_else(|| StepError::Io {
                path: "<stdin>".into(),
                message: "unexpected end of input".to_string(),
            })
        })
    }
}
