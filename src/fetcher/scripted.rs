//! In-memory [`PageFetcher`] serving canned responses, for tests.
//!
//! Each URL is given a queue of responses; every navigation pops the next
//! one and the last response repeats forever. Every navigation (including
//! auxiliary pages) is recorded so tests can assert exactly which pages were
//! fetched.

use super::{PageFetcher, Target, dom};
use crate::error::FetchError;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Scripted {
    Html(String),
    Timeout,
    Status(u16),
}

#[derive(Debug, Default)]
struct Script {
    routes: HashMap<String, VecDeque<Scripted>>,
    visits: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedFetcher {
    script: Arc<Mutex<Script>>,
    page: Option<(String, String)>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.respond(url, [Scripted::Html(html.into())])
    }

    pub fn respond(
        self,
        url: impl Into<String>,
        responses: impl IntoIterator<Item = Scripted>,
    ) -> Self {
        self.script
            .lock()
            .unwrap()
            .routes
            .insert(url.into(), responses.into_iter().collect());
        self
    }

    /// Every URL navigated to so far, in order.
    pub fn visits(&self) -> Vec<String> {
        self.script.lock().unwrap().visits.clone()
    }

    fn body(&self) -> Result<&str, FetchError> {
        self.page.as_ref().map(|(_, b)| b.as_str()).ok_or(FetchError::NoPage)
    }
}

impl PageFetcher for ScriptedFetcher {
    type Auxiliary = ScriptedFetcher;

    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), FetchError> {
        self.page = None;
        let response = {
            let mut script = self.script.lock().unwrap();
            script.visits.push(url.to_string());
            match script.routes.get_mut(url) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match response {
            Some(Scripted::Html(body)) => {
                self.page = Some((url.to_string(), body));
                Ok(())
            }
            Some(Scripted::Timeout) => Err(FetchError::NavigationTimeout {
                url: url.to_string(),
                timeout,
            }),
            Some(Scripted::Status(status)) => Err(FetchError::HttpStatus {
                url: url.to_string(),
                status,
            }),
            None => Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: 404,
            }),
        }
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), FetchError> {
        if dom::has_match(self.body()?, selector)? {
            Ok(())
        } else {
            Err(FetchError::SelectorNotFound {
                selector: selector.to_string(),
                timeout,
            })
        }
    }

    fn current_url(&self) -> Option<&str> {
        self.page.as_ref().map(|(u, _)| u.as_str())
    }

    async fn extract_one(
        &self,
        selector: &str,
        target: Target<'_>,
    ) -> Result<Option<String>, FetchError> {
        dom::select_one(self.body()?, selector, target)
    }

    async fn extract_all(
        &self,
        row_selector: &str,
        inner_selector: Option<&str>,
        target: Target<'_>,
    ) -> Result<Vec<String>, FetchError> {
        dom::select_all(self.body()?, row_selector, inner_selector, target)
    }

    async fn extract_rows(
        &self,
        row_selector: &str,
        fields: &[(&str, Target<'_>)],
    ) -> Result<Vec<Vec<Option<String>>>, FetchError> {
        dom::select_rows(self.body()?, row_selector, fields)
    }

    async fn open_auxiliary(&self) -> Result<Self::Auxiliary, FetchError> {
        Ok(Self {
            script: Arc::clone(&self.script),
            page: None,
        })
    }

    async fn close(self) {}
}
