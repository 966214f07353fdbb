//! In-memory classification service
//!
//! Answers each prompt by the key on its `Subject:` line, records every
//! key it was asked about, and can be told to fail for a key or after a
//! number of calls.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tagtax_pipeline::classifier::{Classifier, ClassifierError};
use tagtax_pipeline::prompts::subject_of;

#[derive(Default)]
pub struct ScriptedClassifier {
    answers: Mutex<HashMap<String, String>>,
    failing: Mutex<HashSet<String>>,
    fail_after: Mutex<Option<usize>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer prompts about `key` with `response`
    pub fn answer(self, key: &str, response: &str) -> Self {
        self.answers
            .lock()
            .unwrap()
            .insert(key.to_string(), response.to_string());
        self
    }

    /// Calls about `key` fail as if the service were unreachable
    pub fn fail_for(self, key: &str) -> Self {
        self.failing.lock().unwrap().insert(key.to_string());
        self
    }

    /// Every call after the first `calls` fails
    pub fn fail_after(self, calls: usize) -> Self {
        *self.fail_after.lock().unwrap() = Some(calls);
        self
    }

    /// Let every later call through again
    pub fn recover(&self) {
        *self.fail_after.lock().unwrap() = None;
        self.failing.lock().unwrap().clear();
    }

    /// Keys asked about, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str) -> Result<String, ClassifierError> {
        let key = subject_of(prompt)
            .ok_or_else(|| ClassifierError::InvalidResponse("prompt has no subject".into()))?;

        let call_index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(key.clone());
            calls.len()
        };

        if let Some(limit) = *self.fail_after.lock().unwrap() {
            if call_index > limit {
                return Err(ClassifierError::Network("connection refused".into()));
            }
        }
        if self.failing.lock().unwrap().contains(&key) {
            return Err(ClassifierError::Network("connection refused".into()));
        }

        self.answers
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| ClassifierError::Api(404, format!("no scripted answer for '{}'", key)))
    }
}
