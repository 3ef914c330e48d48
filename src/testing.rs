//! Scripted collaborators for tests.
//!
//! [`ScriptedModelClient`] answers by matching substrings of the prompt and
//! records when each call started and finished; [`StaticPageFetcher`] serves
//! a fixed page or a fixed error.

use crate::agent::ModelClient;
use crate::errors::{FetchError, InvokeError};
use crate::fetch::{PageFetcher, PageSnapshot};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Error(InvokeError),
    Panic(String),
}

#[derive(Debug, Clone)]
struct Rule {
    trigger: String,
    reply: Reply,
    delay: Duration,
}

/// One recorded model call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub prompt: String,
    pub started: Instant,
    pub finished: Instant,
}

/// A model client driven by prompt-substring rules.
///
/// Rules are tried in the order they were added; an empty trigger matches
/// every prompt. A prompt no rule matches gets `InvokeError::Other`.
#[derive(Debug, Default)]
pub struct ScriptedModelClient {
    rules: Vec<Rule>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedModelClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, trigger: &str, response: &str) -> Self {
        self.rule(trigger, Reply::Text(response.to_string()), Duration::ZERO)
    }

    /// Respond after sleeping for `delay`.
    pub fn respond_after(self, trigger: &str, response: &str, delay: Duration) -> Self {
        self.rule(trigger, Reply::Text(response.to_string()), delay)
    }

    pub fn fail(self, trigger: &str, error: InvokeError) -> Self {
        self.rule(trigger, Reply::Error(error), Duration::ZERO)
    }

    pub fn panic_on(self, trigger: &str, message: &str) -> Self {
        self.rule(trigger, Reply::Panic(message.to_string()), Duration::ZERO)
    }

    fn rule(mut self, trigger: &str, reply: Reply, delay: Duration) -> Self {
        self.rules.push(Rule {
            trigger: trigger.to_string(),
            reply,
            delay,
        });
        self
    }

    /// Every call made so far, in completion order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.prompt).collect()
    }

    /// The first call whose prompt contains `needle`.
    pub fn call_containing(&self, needle: &str) -> Option<RecordedCall> {
        self.calls().into_iter().find(|c| c.prompt.contains(needle))
    }

    fn record(&self, prompt: &str, started: Instant) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                prompt: prompt.to_string(),
                started,
                finished: Instant::now(),
            });
        }
    }
}

#[async_trait]
impl ModelClient for ScriptedModelClient {
    async fn invoke(&self, prompt: &str, _schema_hint: &str) -> Result<String, InvokeError> {
        let started = Instant::now();
        let rule = self
            .rules
            .iter()
            .find(|r| prompt.contains(&r.trigger))
            .cloned();

        let Some(rule) = rule else {
            self.record(prompt, started);
            return Err(InvokeError::Other("no scripted response".to_string()));
        };

        if !rule.delay.is_zero() {
            tokio::time::sleep(rule.delay).await;
        }
        self.record(prompt, started);

        match rule.reply {
            Reply::Text(text) => Ok(text),
            Reply::Error(err) => Err(err),
            Reply::Panic(message) => panic!("{}", message),
        }
    }
}

/// A page fetcher with a fixed result.
#[derive(Debug, Clone)]
pub struct StaticPageFetcher {
    result: Result<String, FetchError>,
}

impl StaticPageFetcher {
    /// Serve `html` for any URL.
    pub fn html(html: &str) -> Self {
        Self {
            result: Ok(html.to_string()),
        }
    }

    /// Fail every fetch with `error`.
    pub fn failing(error: FetchError) -> Self {
        Self { result: Err(error) }
    }
}

#[async_trait]
impl PageFetcher for StaticPageFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<PageSnapshot, FetchError> {
        match &self.result {
            Ok(html) => Ok(PageSnapshot::from_html(url, html)),
            Err(err) => Err(err.clone()),
        }
    }
}
