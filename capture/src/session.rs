//! The scroll-driven capture loop and its per-page session.
//!
//! One [`CaptureLoop`] exists per attached page. It owns the session state
//! (pending queue, last snapshot, display counter) behind an async mutex,
//! so triggers that arrive while a cycle is waiting on storage queue up
//! behind it instead of interleaving.

use anyhow::Result;
use crossai_types::Turn;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::config::CaptureConfig;
use crate::dom::Document;
use crate::extract::extract_candidates;
use crate::platform::{identify, Platform};
use crate::queue::PendingQueue;
use crate::store::TurnStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Capturing,
}

/// A newly seen turn handed to the panel, with its display number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayedTurn {
    pub number: usize,
    pub turn: Turn,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Turns to append to the panel, in order.
    pub emitted: Vec<DisplayedTurn>,
    /// Complete pairs read from the page this cycle.
    pub candidates: usize,
    /// Queue length after the cycle.
    pub pending: usize,
    /// False when the loop was inactive and nothing ran.
    pub ran: bool,
}

#[derive(Debug)]
struct CaptureSession {
    url: String,
    queue: PendingQueue,
    snapshot: Vec<Turn>,
    display_counter: usize,
    state: SessionState,
}

impl CaptureSession {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            queue: PendingQueue::new(),
            snapshot: Vec::new(),
            display_counter: 0,
            state: SessionState::Idle,
        }
    }

    /// Track the page's live URL. Single-page apps change it without
    /// replacing the thread, so pending state is kept.
    fn follow(&mut self, url: &str) {
        if self.url != url {
            tracing::debug!(from = %self.url, to = url, "page url changed");
            self.url = url.to_string();
        }
    }

    fn reset(&mut self, url: &str) {
        self.url = url.to_string();
        self.queue.reset();
        self.snapshot.clear();
        self.display_counter = 0;
        self.state = SessionState::Idle;
    }

    async fn cycle<D: Document>(
        &mut self,
        doc: &D,
        platform: &Platform,
        store: &TurnStore,
    ) -> Result<CycleReport> {
        let candidates = extract_candidates(doc, platform);
        let mut report = CycleReport {
            candidates: candidates.len(),
            ran: true,
            ..CycleReport::default()
        };

        self.queue.add(store, &self.url, candidates).await?;

        if self.queue.has_changed() {
            let current = self.queue.queue().to_vec();
            let added: Vec<Turn> = current
                .iter()
                .filter(|t| !self.snapshot.contains(t))
                .cloned()
                .collect();
            self.snapshot = current;
            for turn in added {
                self.display_counter += 1;
                report.emitted.push(DisplayedTurn {
                    number: self.display_counter,
                    turn,
                });
            }
        }

        report.pending = self.queue.len();
        Ok(report)
    }
}

pub struct CaptureLoop {
    platform: &'static Platform,
    store: TurnStore,
    session: Mutex<CaptureSession>,
    active: AtomicBool,
    removal_threshold: usize,
}

impl CaptureLoop {
    /// Start a session for `url`, or `None` when no platform serves it.
    pub fn attach(url: &str, store: TurnStore, config: &CaptureConfig) -> Option<Self> {
        let Some(platform) = identify(url) else {
            tracing::debug!(url, "page is not a supported chat platform");
            return None;
        };
        tracing::info!(url, platform = %platform.id, "capture session attached");
        Some(Self {
            platform,
            store,
            session: Mutex::new(CaptureSession::new(url)),
            active: AtomicBool::new(false),
            removal_threshold: config.nav_removal_threshold,
        })
    }

    pub fn platform(&self) -> &'static Platform {
        self.platform
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub async fn url(&self) -> String {
        self.session.lock().await.url.clone()
    }

    pub async fn state(&self) -> SessionState {
        self.session.lock().await.state
    }

    /// The panel opened: start reacting to scrolls and capture right away.
    ///
    /// Every trigger carries the page's current URL; stored turns are
    /// keyed by it, not by the URL seen at attach time.
    pub async fn open<D: Document>(&self, doc: &D, current_url: &str) -> Result<CycleReport> {
        self.active.store(true, Ordering::SeqCst);
        self.run(doc, current_url).await
    }

    /// The panel closed. A cycle already running finishes normally.
    pub fn close(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub async fn on_scroll<D: Document>(&self, doc: &D, current_url: &str) -> Result<CycleReport> {
        self.run(doc, current_url).await
    }

    /// The host saw `removed` nodes leave the page in one mutation batch.
    /// A large removal means the single-page app switched conversations:
    /// the session is reset for `current_url` and a cycle runs at once.
    /// Returns `None` when the removal was too small to count.
    pub async fn on_nodes_removed<D: Document>(
        &self,
        doc: &D,
        removed: usize,
        current_url: &str,
    ) -> Result<Option<CycleReport>> {
        if removed <= self.removal_threshold {
            return Ok(None);
        }
        {
            let mut session = self.session.lock().await;
            tracing::info!(
                from = %session.url,
                to = current_url,
                removed,
                "conversation changed; resetting capture session"
            );
            session.reset(current_url);
        }
        self.run(doc, current_url).await.map(Some)
    }

    /// The user saved a turn from the panel.
    pub async fn save(&self, turn: &Turn, current_url: &str) -> Result<bool> {
        let mut session = self.session.lock().await;
        session.follow(current_url);
        let url = session.url.clone();
        session
            .queue
            .release_to_storage(&self.store, &url, turn)
            .await
    }

    /// Save every pending turn.
    pub async fn save_all(&self, current_url: &str) -> Result<usize> {
        let mut session = self.session.lock().await;
        session.follow(current_url);
        let url = session.url.clone();
        session.queue.flush(&self.store, &url).await
    }

    pub async fn pending(&self) -> Vec<Turn> {
        self.session.lock().await.queue.queue().to_vec()
    }

    /// Page unload.
    pub async fn teardown(self) {
        let session = self.session.into_inner();
        tracing::info!(
            url = %session.url,
            pending = session.queue.len(),
            "capture session closed"
        );
    }

    async fn run<D: Document>(&self, doc: &D, current_url: &str) -> Result<CycleReport> {
        if !self.is_active() {
            return Ok(CycleReport::default());
        }
        let mut session = self.session.lock().await;
        session.follow(current_url);
        session.state = SessionState::Capturing;
        let result = session.cycle(doc, self.platform, &self.store).await;
        session.state = SessionState::Idle;

        match &result {
            Ok(report) if !report.emitted.is_empty() => tracing::debug!(
                emitted = report.emitted.len(),
                pending = report.pending,
                "capture cycle found new turns"
            ),
            Ok(_) => {}
            Err(e) => tracing::warn!(err = ?e, "capture cycle failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::memory::{MemoryDocument, MemoryNode};
    use crate::store::{Entries, KvStore, MemoryKv};
    use async_trait::async_trait;
    use crossai_types::PlatformId;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    const URL: &str = "https://chatgpt.com/c/first";

    fn article(role: &str, text: &str) -> MemoryNode {
        MemoryNode::text_node(text).with_attr("data-turn", role)
    }

    fn show(doc: &MemoryDocument, pairs: &[(&str, &str)]) {
        let mut nodes = Vec::new();
        for (q, a) in pairs {
            nodes.push(article("user", q));
            nodes.push(article("assistant", a));
        }
        doc.set("article", nodes);
    }

    fn turn(q: &str, a: &str) -> Turn {
        Turn::new(q, PlatformId::ChatGpt, a)
    }

    fn attach(store: TurnStore) -> CaptureLoop {
        CaptureLoop::attach(URL, store, &CaptureConfig::default()).expect("chatgpt is supported")
    }

    fn memory_store() -> TurnStore {
        TurnStore::new(Arc::new(MemoryKv::new()))
    }

    fn numbers(report: &CycleReport) -> Vec<usize> {
        report.emitted.iter().map(|d| d.number).collect()
    }

    #[test]
    fn unsupported_pages_do_not_attach() {
        assert!(CaptureLoop::attach("https://example.com", memory_store(), &CaptureConfig::default())
            .is_none());
    }

    #[tokio::test]
    async fn scrolls_are_ignored_until_panel_opens() {
        let doc = MemoryDocument::new();
        show(&doc, &[("q1", "a1")]);
        let capture = attach(memory_store());

        let report = capture.on_scroll(&doc, URL).await.unwrap();
        assert!(!report.ran);
        assert!(capture.pending().await.is_empty());

        let report = capture.open(&doc, URL).await.unwrap();
        assert!(report.ran);
        assert_eq!(report.emitted[0].turn, turn("q1", "a1"));
    }

    #[tokio::test]
    async fn emits_only_new_turns_with_increasing_numbers() {
        let doc = MemoryDocument::new();
        show(&doc, &[("q1", "a1"), ("q2", "a2")]);
        let capture = attach(memory_store());

        let first = capture.open(&doc, URL).await.unwrap();
        assert_eq!(numbers(&first), vec![1, 2]);

        let unchanged = capture.on_scroll(&doc, URL).await.unwrap();
        assert!(unchanged.emitted.is_empty());
        assert_eq!(unchanged.pending, 2);

        show(&doc, &[("q2", "a2"), ("q3", "a3")]);
        let scrolled = capture.on_scroll(&doc, URL).await.unwrap();
        assert_eq!(numbers(&scrolled), vec![3]);
        assert_eq!(scrolled.emitted[0].turn, turn("q3", "a3"));
        assert_eq!(scrolled.pending, 3);
    }

    #[tokio::test]
    async fn stored_turns_never_reach_the_queue() {
        let store = memory_store();
        store.insert(URL, &turn("q1", "a1")).await.unwrap();
        let doc = MemoryDocument::new();
        show(&doc, &[("q1", "a1")]);

        let capture = attach(store);
        let report = capture.open(&doc, URL).await.unwrap();
        assert!(report.emitted.is_empty());
        assert!(capture.pending().await.is_empty());
    }

    #[tokio::test]
    async fn saving_moves_turn_into_store() {
        let store = memory_store();
        let doc = MemoryDocument::new();
        show(&doc, &[("q1", "a1"), ("q2", "a2")]);
        let capture = attach(store.clone());
        capture.open(&doc, URL).await.unwrap();

        assert!(capture.save(&turn("q1", "a1"), URL).await.unwrap());
        capture.on_scroll(&doc, URL).await.unwrap();
        assert_eq!(capture.pending().await, vec![turn("q2", "a2")]);
        assert_eq!(store.turns(URL).await.unwrap(), vec![turn("q1", "a1")]);

        assert_eq!(capture.save_all(URL).await.unwrap(), 1);
        assert_eq!(store.stored_count(URL).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn cleared_turns_can_be_captured_again() {
        let store = memory_store();
        let doc = MemoryDocument::new();
        show(&doc, &[("q1", "a1")]);
        let capture = attach(store.clone());
        capture.open(&doc, URL).await.unwrap();
        capture.save(&turn("q1", "a1"), URL).await.unwrap();

        store.clear(URL).await.unwrap();
        assert_eq!(store.stored_count(URL).await.unwrap(), 0);

        capture.on_scroll(&doc, URL).await.unwrap();
        assert_eq!(capture.pending().await, vec![turn("q1", "a1")]);
    }

    #[tokio::test]
    async fn small_removals_do_not_reset() {
        let doc = MemoryDocument::new();
        show(&doc, &[("q1", "a1")]);
        let capture = attach(memory_store());
        capture.open(&doc, URL).await.unwrap();

        let outcome = capture.on_nodes_removed(&doc, 5, URL).await.unwrap();
        assert!(outcome.is_none());
        assert_eq!(capture.pending().await.len(), 1);
    }

    #[tokio::test]
    async fn navigation_resets_session_and_recaptures() {
        let doc = MemoryDocument::new();
        show(&doc, &[("q1", "a1"), ("q2", "a2")]);
        let capture = attach(memory_store());
        capture.open(&doc, URL).await.unwrap();

        show(&doc, &[("other", "conversation")]);
        let next_url = "https://chatgpt.com/c/second";
        let report = capture
            .on_nodes_removed(&doc, 40, next_url)
            .await
            .unwrap()
            .expect("large removal resets");

        assert_eq!(numbers(&report), vec![1]);
        assert_eq!(capture.pending().await, vec![turn("other", "conversation")]);
        assert_eq!(capture.url().await, next_url);
        assert_eq!(capture.state().await, SessionState::Idle);
    }

    #[tokio::test]
    async fn closed_panel_still_resets_but_does_not_capture() {
        let doc = MemoryDocument::new();
        show(&doc, &[("q1", "a1")]);
        let capture = attach(memory_store());
        capture.open(&doc, URL).await.unwrap();
        capture.close();

        let report = capture
            .on_nodes_removed(&doc, 10, URL)
            .await
            .unwrap()
            .expect("reset happened");
        assert!(!report.ran);
        assert!(capture.pending().await.is_empty());
    }

    /// Fails reads until told otherwise.
    struct FlakyKv {
        inner: MemoryKv,
        failing: AtomicBool,
    }

    #[async_trait]
    impl KvStore for FlakyKv {
        async fn get(&self, keys: &[&str]) -> anyhow::Result<Entries> {
            if self.failing.load(Ordering::SeqCst) {
                anyhow::bail!("storage unavailable");
            }
            self.inner.get(keys).await
        }

        async fn set(&self, entries: Entries) -> anyhow::Result<()> {
            self.inner.set(entries).await
        }

        async fn remove(&self, keys: &[&str]) -> anyhow::Result<()> {
            self.inner.remove(keys).await
        }

        async fn keys(&self) -> anyhow::Result<Vec<String>> {
            self.inner.keys().await
        }
    }

    #[tokio::test]
    async fn storage_failure_leaves_loop_runnable() {
        let kv = Arc::new(FlakyKv {
            inner: MemoryKv::new(),
            failing: AtomicBool::new(true),
        });
        let doc = MemoryDocument::new();
        show(&doc, &[("q1", "a1")]);
        let capture = attach(TurnStore::new(kv.clone()));

        assert!(capture.open(&doc, URL).await.is_err());
        assert_eq!(capture.state().await, SessionState::Idle);

        kv.failing.store(false, Ordering::SeqCst);
        let report = capture.on_scroll(&doc, URL).await.unwrap();
        assert_eq!(numbers(&report), vec![1]);
    }

    #[tokio::test]
    async fn url_change_without_navigation_follows_live_url() {
        let store = memory_store();
        let doc = MemoryDocument::new();
        show(&doc, &[("q1", "a1")]);
        let home = "https://chatgpt.com/";
        let thread = "https://chatgpt.com/c/abc";
        let capture =
            CaptureLoop::attach(home, store.clone(), &CaptureConfig::default()).expect("supported");
        capture.open(&doc, home).await.unwrap();

        assert!(capture.on_nodes_removed(&doc, 3, thread).await.unwrap().is_none());
        assert!(capture.save(&turn("q1", "a1"), thread).await.unwrap());

        assert_eq!(capture.url().await, thread);
        assert_eq!(store.stored_count(thread).await.unwrap(), 1);
        assert_eq!(store.stored_count(home).await.unwrap(), 0);

        let report = capture.on_scroll(&doc, thread).await.unwrap();
        assert!(report.emitted.is_empty());
        assert!(capture.pending().await.is_empty());
    }

    /// Yields to the scheduler inside every read so overlapping triggers
    /// meet at a storage suspension point.
    struct YieldingKv {
        inner: MemoryKv,
    }

    #[async_trait]
    impl KvStore for YieldingKv {
        async fn get(&self, keys: &[&str]) -> anyhow::Result<Entries> {
            tokio::task::yield_now().await;
            self.inner.get(keys).await
        }

        async fn set(&self, entries: Entries) -> anyhow::Result<()> {
            self.inner.set(entries).await
        }

        async fn remove(&self, keys: &[&str]) -> anyhow::Result<()> {
            self.inner.remove(keys).await
        }

        async fn keys(&self) -> anyhow::Result<Vec<String>> {
            self.inner.keys().await
        }
    }

    #[tokio::test]
    async fn overlapping_scrolls_do_not_interleave() {
        let store = TurnStore::new(Arc::new(YieldingKv {
            inner: MemoryKv::new(),
        }));
        let doc = MemoryDocument::new();
        let capture = attach(store);
        capture.open(&doc, URL).await.unwrap();

        show(&doc, &[("q1", "a1"), ("q2", "a2")]);
        let (first, second) = tokio::join!(
            capture.on_scroll(&doc, URL),
            capture.on_scroll(&doc, URL)
        );

        let mut all = numbers(&first.unwrap());
        all.extend(numbers(&second.unwrap()));
        all.sort_unstable();
        assert_eq!(all, vec![1, 2]);
        assert_eq!(
            capture.pending().await,
            vec![turn("q1", "a1"), turn("q2", "a2")]
        );
    }
}
