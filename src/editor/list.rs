use std::time::{Duration, Instant};

use crate::schema::SelectOption;

/// Option list shown while picking a value for a select or boolean cell
#[derive(Debug, Clone)]
pub struct OptionList {
    /// Options as last supplied, without the synthetic blank entry
    options: Vec<SelectOption>,
    nullable: bool,
    /// Remote lists are filtered by the resolver, local ones here
    remote: bool,
    query: String,
    highlighted: usize,
    loading: bool,
    /// Job id of the latest request this list is waiting for
    job: u64,
    search_due: Option<Instant>,
}

impl OptionList {
    pub fn local(options: Vec<SelectOption>, nullable: bool, job: u64) -> Self {
        Self {
            options,
            nullable,
            remote: false,
            query: String::new(),
            highlighted: 0,
            loading: false,
            job,
            search_due: None,
        }
    }

    /// A list filled by a resolver; starts out loading
    pub fn remote(nullable: bool, job: u64) -> Self {
        Self {
            remote: true,
            loading: true,
            ..Self::local(Vec::new(), nullable, job)
        }
    }

    pub fn boolean(nullable: bool, job: u64) -> Self {
        Self::local(
            vec![SelectOption::new("true", "Yes"), SelectOption::new("false", "No")],
            nullable,
            job,
        )
    }

    pub fn is_remote(&self) -> bool {
        self.remote
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn job(&self) -> u64 {
        self.job
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn highlighted(&self) -> usize {
        self.highlighted
    }

    /// Options as displayed: blank first when nullable, then matches for the query
    pub fn visible(&self) -> Vec<SelectOption> {
        let query = self.query.to_lowercase();
        let matches = self
            .options
            .iter()
            .filter(|o| self.remote || query.is_empty() || o.label.to_lowercase().contains(&query))
            .cloned();
        if self.nullable {
            std::iter::once(SelectOption::blank()).chain(matches).collect()
        } else {
            matches.collect()
        }
    }

    pub fn highlighted_option(&self) -> Option<SelectOption> {
        self.visible().into_iter().nth(self.highlighted)
    }

    pub fn highlight_next(&mut self) {
        let count = self.visible().len();
        if count > 0 {
            self.highlighted = (self.highlighted + 1).min(count - 1);
        }
    }

    pub fn highlight_prev(&mut self) {
        self.highlighted = self.highlighted.saturating_sub(1);
    }

    pub fn highlight(&mut self, idx: usize) {
        self.highlighted = idx.min(self.visible().len().saturating_sub(1));
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.highlighted = 0;
    }

    pub fn push_query(&mut self, c: char) {
        self.query.push(c);
        self.highlighted = 0;
    }

    pub fn pop_query(&mut self) {
        self.query.pop();
        self.highlighted = 0;
    }

    /// Stamp a new request; results for older jobs no longer apply
    pub fn begin_request(&mut self, job: u64) {
        self.job = job;
        self.loading = true;
        self.search_due = None;
    }

    /// Accept options for `job`. Returns false if the job is stale.
    pub fn receive(&mut self, job: u64, options: Vec<SelectOption>) -> bool {
        if job != self.job {
            return false;
        }
        self.options = options;
        self.loading = false;
        self.highlighted = 0;
        true
    }

    /// Defer a search for the current query. `job` supersedes the request
    /// in flight so its reply is dropped on arrival.
    pub fn schedule_search(&mut self, now: Instant, delay: Duration, job: u64) {
        self.job = job;
        self.search_due = Some(now + delay);
        self.loading = true;
    }

    pub fn search_pending(&self) -> bool {
        self.search_due.is_some()
    }

    /// Whether a debounced search should fire at `now`
    pub fn search_due(&self, now: Instant) -> bool {
        self.search_due.map(|at| now >= at).unwrap_or(false)
    }

    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }
}
