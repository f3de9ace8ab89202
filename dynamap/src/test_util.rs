/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Test utilities: a rule based mock transport and a settable clock.
//!
//! ```
//! use dynamap::request::Request;
//! use dynamap::test_util::{MockTransport, RuleBuilder};
//! use aws_sdk_dynamodb::operation::get_item::GetItemOutput;
//!
//! let get = RuleBuilder::new()
//!     .match_requests(|req| matches!(req, Request::GetItem(_)))
//!     .then_output(|_| GetItemOutput::builder().build().into());
//! let transport = MockTransport::new().with_rule(&get);
//! # let _ = transport;
//! ```

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use aws_smithy_async::time::TimeSource;

use crate::error::TransportError;
use crate::request::{Request, Response};
use crate::transport::Transport;

type MatchFn = Arc<dyn Fn(&Request) -> bool + Send + Sync>;
type ServeFn = Arc<dyn Fn(&Request) -> Result<Response, TransportError> + Send + Sync>;

/// How a [`MockTransport`] picks the rule for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleMode {
    /// Rules are used in order, each one once. The next rule must match the request.
    Sequential,
    /// The first matching rule is used. Rules may be used any number of times.
    #[default]
    MatchAny,
}

/// A mock response rule.
#[derive(Clone)]
pub struct Rule {
    matcher: MatchFn,
    response_handler: ServeFn,
    call_count: Arc<AtomicUsize>,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rule")
    }
}

impl Rule {
    fn respond(&self, request: &Request) -> Result<Response, TransportError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        (self.response_handler)(request)
    }

    /// Number of requests this rule has answered.
    pub fn num_calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Resets the call count.
    pub fn reset(&self) {
        self.call_count.store(0, Ordering::SeqCst);
    }
}

/// Builder for a [`Rule`].
pub struct RuleBuilder {
    matcher: MatchFn,
}

impl Default for RuleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RuleBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RuleBuilder")
    }
}

impl RuleBuilder {
    /// A builder matching every request.
    pub fn new() -> Self {
        Self {
            matcher: Arc::new(|_| true),
        }
    }

    /// Only apply the rule to requests for which `filter` returns true.
    pub fn match_requests(
        mut self,
        filter: impl Fn(&Request) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.matcher = Arc::new(filter);
        self
    }

    /// Answer matching requests with the response returned by `output`.
    pub fn then_output(
        self,
        output: impl Fn(&Request) -> Response + Send + Sync + 'static,
    ) -> Rule {
        self.serve(move |request| Ok(output(request)))
    }

    /// Fail matching requests with the error returned by `error`.
    pub fn then_error(
        self,
        error: impl Fn(&Request) -> TransportError + Send + Sync + 'static,
    ) -> Rule {
        self.serve(move |request| Err(error(request)))
    }

    /// Answer matching requests with `handler`.
    pub fn serve(
        self,
        handler: impl Fn(&Request) -> Result<Response, TransportError> + Send + Sync + 'static,
    ) -> Rule {
        Rule {
            matcher: self.matcher,
            response_handler: Arc::new(handler),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/// A [`Transport`] that answers from a list of [`Rule`]s and records every request.
///
/// A request that matches no rule fails with a transport error.
#[derive(Clone, Default)]
pub struct MockTransport {
    rules: Arc<Mutex<VecDeque<Rule>>>,
    rule_mode: RuleMode,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rules", self.rules.lock().unwrap().len())
    }
}

impl MockTransport {
    /// A transport with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule. Rules are tried in the order they were added.
    pub fn with_rule(self, rule: &Rule) -> Self {
        self.rules.lock().unwrap().push_back(rule.clone());
        self
    }

    /// Sets how rules are picked.
    pub fn rule_mode(mut self, rule_mode: RuleMode) -> Self {
        self.rule_mode = rule_mode;
        self
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    /// Names of the operations sent so far, in order.
    pub fn operations(&self) -> Vec<&'static str> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(Request::operation_name)
            .collect()
    }

    fn answer(&self, request: &Request) -> Result<Response, TransportError> {
        let rule = {
            let mut rules = self.rules.lock().unwrap();
            match self.rule_mode {
                RuleMode::Sequential => match rules.pop_front() {
                    Some(rule) if (rule.matcher)(request) => Some(rule),
                    Some(_) => {
                        return Err(format!(
                            "the next rule does not match {}",
                            request.operation_name()
                        )
                        .into())
                    }
                    None => None,
                },
                RuleMode::MatchAny => rules.iter().find(|rule| (rule.matcher)(request)).cloned(),
            }
        };
        match rule {
            Some(rule) => rule.respond(request),
            None => Err(format!("no rule matches {}", request.operation_name()).into()),
        }
    }
}

impl Transport for MockTransport {
    fn send(&self, request: Request) -> BoxFuture<'_, Result<Response, TransportError>> {
        let result = self.answer(&request);
        self.requests.lock().unwrap().push(request);
        futures_util::future::ready(result).boxed()
    }
}

/// A [`TimeSource`] that only moves when told to.
#[derive(Clone, Debug)]
pub struct FixedTimeSource {
    now: Arc<Mutex<SystemTime>>,
}

impl FixedTimeSource {
    /// A clock reading `time`.
    pub fn new(time: SystemTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(time)),
        }
    }

    /// A clock reading `secs` seconds after the Unix epoch.
    pub fn from_secs(secs: u64) -> Self {
        Self::new(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
    }

    /// Moves the clock forward.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += duration;
    }
}

impl TimeSource for FixedTimeSource {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap()
    }
}
