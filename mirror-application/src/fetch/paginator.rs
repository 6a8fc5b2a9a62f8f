use std::collections::VecDeque;

use mirror_domain::{QueryKind, RemoteError, RemoteSource, Variables};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::fetch::{RetryError, RetryExecutor};

#[derive(Debug, Error)]
#[error("{kind} page {failed_page} failed (last good page {last_page:?}): {error}")]
pub struct PageFetchError {
    pub kind: QueryKind,
    /// Last page delivered successfully, if any.
    pub last_page: Option<u32>,
    pub failed_page: u32,
    #[source]
    pub error: RetryError<RemoteError>,
}

/// Lazy node stream over one paginated query. Pages are 1-based.
pub struct Paginator<'a> {
    remote: &'a dyn RemoteSource,
    executor: &'a RetryExecutor,
    kind: QueryKind,
    variables: Variables,
    per_page: u32,
    max_pages: u32,
    next_page: u32,
    pages_fetched: u32,
    last_page: Option<u32>,
    total_pages: Option<u32>,
    buffer: VecDeque<Value>,
    finished: bool,
}

impl<'a> Paginator<'a> {
    pub fn new(
        remote: &'a dyn RemoteSource,
        executor: &'a RetryExecutor,
        kind: QueryKind,
        variables: Variables,
        per_page: u32,
    ) -> Self {
        Self {
            remote,
            executor,
            kind,
            variables,
            per_page: per_page.max(1),
            max_pages: u32::MAX,
            next_page: 1,
            pages_fetched: 0,
            last_page: None,
            total_pages: None,
            buffer: VecDeque::new(),
            finished: false,
        }
    }

    pub fn starting_at(mut self, page: u32) -> Self {
        self.next_page = page.max(1);
        self
    }

    pub fn max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn last_successful_page(&self) -> Option<u32> {
        self.last_page
    }

    /// Next node, fetching the following page when the buffer runs dry.
    pub async fn next(&mut self) -> Result<Option<Value>, PageFetchError> {
        loop {
            if let Some(node) = self.buffer.pop_front() {
                return Ok(Some(node));
            }
            match self.next_page().await? {
                Some(nodes) => self.buffer.extend(nodes),
                None => return Ok(None),
            }
        }
    }

    pub async fn collect_all(mut self) -> Result<Vec<Value>, PageFetchError> {
        let mut nodes = Vec::new();
        while let Some(node) = self.next().await? {
            nodes.push(node);
        }
        Ok(nodes)
    }

    async fn next_page(&mut self) -> Result<Option<Vec<Value>>, PageFetchError> {
        if self.finished {
            return Ok(None);
        }
        if let Some(total) = self.total_pages {
            if self.next_page > total {
                self.finished = true;
                return Ok(None);
            }
        }
        // Remote still reports more pages; a truncated result must not pass as complete.
        if self.pages_fetched >= self.max_pages {
            warn!(
                "{} hit the page cap of {} with more pages remaining",
                self.kind, self.max_pages
            );
            self.finished = true;
            return Err(PageFetchError {
                kind: self.kind,
                last_page: self.last_page,
                failed_page: self.next_page,
                error: RetryError::Fatal {
                    attempts: 0,
                    error: RemoteError::malformed(format!(
                        "page cap of {} reached before the last page",
                        self.max_pages
                    )),
                },
            });
        }

        let page_number = self.next_page;
        let remote = self.remote;
        let kind = self.kind;
        let per_page = self.per_page;
        let variables = &self.variables;
        let label = format!("{} page {}", kind, page_number);
        let result = self
            .executor
            .run_remote(&label, || remote.fetch_page(kind, variables, page_number, per_page))
            .await;

        let page = match result {
            Ok(page) => page,
            Err(error) => {
                self.finished = true;
                return Err(PageFetchError {
                    kind,
                    last_page: self.last_page,
                    failed_page: page_number,
                    error,
                });
            }
        };

        self.pages_fetched += 1;
        self.last_page = Some(page_number);
        self.next_page = page_number + 1;
        if page.total_pages.is_some() {
            self.total_pages = page.total_pages;
        }
        let has_more = match self.total_pages {
            Some(total) => page_number < total,
            None => page.has_more,
        };
        if !has_more || page.nodes.is_empty() {
            self.finished = true;
        }
        debug!(
            "{} page {} returned {} node(s)",
            kind,
            page_number,
            page.nodes.len()
        );
        Ok(Some(page.nodes))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mirror_domain::{Page, RetryPolicy};
    use serde_json::json;

    use super::*;
    use crate::testing::ScriptedRemote;

    fn executor() -> RetryExecutor {
        RetryExecutor::new(RetryPolicy {
            max_attempts: 3,
            rate_limit_floor: Duration::from_secs(60),
            backoff_base: Duration::from_millis(10),
            backoff_max: Duration::from_millis(100),
            attempt_timeout: Duration::from_secs(30),
        })
    }

    fn page(ids: &[u64], has_more: bool, total_pages: Option<u32>) -> Page {
        Page {
            nodes: ids.iter().map(|id| json!({ "id": id })).collect(),
            has_more,
            total_pages,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn yields_nodes_across_pages_in_order() {
        let remote = ScriptedRemote::new();
        remote.push_page(QueryKind::EventStandings, 1, Ok(page(&[1, 2], true, Some(3))));
        remote.push_page(QueryKind::EventStandings, 2, Ok(page(&[3, 4], true, Some(3))));
        remote.push_page(QueryKind::EventStandings, 3, Ok(page(&[5], false, Some(3))));
        let executor = executor();

        let paginator =
            Paginator::new(&remote, &executor, QueryKind::EventStandings, Variables::new(), 2);
        let nodes = paginator
            .collect_all()
            .await
            .expect("all pages");

        let ids: Vec<u64> = nodes.iter().filter_map(|n| n["id"].as_u64()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(remote.page_calls(QueryKind::EventStandings), vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_reported_total_even_if_has_more() {
        let remote = ScriptedRemote::new();
        remote.push_page(QueryKind::EventSets, 1, Ok(page(&[1], true, Some(1))));
        let executor = executor();

        let nodes = Paginator::new(&remote, &executor, QueryKind::EventSets, Variables::new(), 1)
            .collect_all()
            .await
            .expect("single page");

        assert_eq!(nodes.len(), 1);
        assert_eq!(remote.page_calls(QueryKind::EventSets), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn falls_back_to_has_more_without_total() {
        let remote = ScriptedRemote::new();
        remote.push_page(QueryKind::EventSets, 1, Ok(page(&[1], true, None)));
        remote.push_page(QueryKind::EventSets, 2, Ok(page(&[2], false, None)));
        let executor = executor();

        let nodes = Paginator::new(&remote, &executor, QueryKind::EventSets, Variables::new(), 1)
            .collect_all()
            .await
            .expect("two pages");

        assert_eq!(nodes.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_reports_last_good_page() {
        let remote = ScriptedRemote::new();
        remote.push_page(QueryKind::PhaseSeeds, 1, Ok(page(&[1, 2], true, Some(4))));
        for _ in 0..3 {
            remote.push_page(
                QueryKind::PhaseSeeds,
                2,
                Err(RemoteError::http(503, None, "unavailable")),
            );
        }
        let executor = executor();
        let mut paginator =
            Paginator::new(&remote, &executor, QueryKind::PhaseSeeds, Variables::new(), 2);

        assert!(paginator.next().await.expect("first").is_some());
        assert!(paginator.next().await.expect("second").is_some());
        let err = paginator.next().await.expect_err("page 2 exhausts retries");

        assert_eq!(err.last_page, Some(1));
        assert_eq!(err.failed_page, 2);
        assert!(err.error.is_exhausted());
        assert!(paginator.next().await.expect("finished").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn page_cap_fails_instead_of_truncating() {
        let remote = ScriptedRemote::new();
        for number in 1..=5 {
            let nodes = page(&[number as u64], true, None);
            remote.push_page(QueryKind::TournamentsByGame, number, Ok(nodes));
        }
        let executor = executor();

        let err = Paginator::new(
            &remote,
            &executor,
            QueryKind::TournamentsByGame,
            Variables::new(),
            1,
        )
        .max_pages(2)
        .collect_all()
        .await
        .expect_err("cap reached with pages remaining");

        assert_eq!(err.last_page, Some(2));
        assert_eq!(err.failed_page, 3);
        assert!(!err.error.is_exhausted());
        assert_eq!(remote.page_calls(QueryKind::TournamentsByGame), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn page_cap_is_fine_when_the_last_page_fits() {
        let remote = ScriptedRemote::new();
        remote.push_page(QueryKind::EventSets, 1, Ok(page(&[1], true, Some(2))));
        remote.push_page(QueryKind::EventSets, 2, Ok(page(&[2], false, Some(2))));
        let executor = executor();

        let nodes = Paginator::new(&remote, &executor, QueryKind::EventSets, Variables::new(), 1)
            .max_pages(2)
            .collect_all()
            .await
            .expect("exactly at cap");

        assert_eq!(nodes.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn resumes_from_a_starting_page() {
        let remote = ScriptedRemote::new();
        remote.push_page(QueryKind::EventSets, 3, Ok(page(&[9], false, Some(3))));
        let executor = executor();

        let nodes = Paginator::new(&remote, &executor, QueryKind::EventSets, Variables::new(), 1)
            .starting_at(3)
            .collect_all()
            .await
            .expect("last page");

        assert_eq!(nodes.len(), 1);
        assert_eq!(remote.page_calls(QueryKind::EventSets), vec![3]);
    }
}
