//! The orchestrator (spec §4.8): owns the store, the configured multi-logs
//! and their index pumps, and the graph builder pump, and exposes the
//! external operations a transport layer drives.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use ssb_fsck::{ConsistencyProblems, FsckMode, ProgressFn};
use ssb_graph::{Graph, UnfollowPolicy};
use ssb_index::{addr_fns, AddrFn, Pump};
use ssb_store::{CancelToken, MultiLog, Store};
use ssb_types::FeedRef;

use crate::config::CoreConfig;
use crate::status::{IndexState, IndexStatus, Status};
use crate::{CoreError, Result};

/// Cursor name the graph builder persists its own progress under; distinct
/// from any index pump's name so the two can't collide in the `cursors`
/// table.
const GRAPH_CURSOR: &str = "graph";

fn addr_fn_for(name: &str) -> Option<AddrFn> {
    match name {
        "feeds" => Some(addr_fns::feeds_addr()),
        "byType" => Some(addr_fns::by_type_addr()),
        "byContent" => Some(addr_fns::by_content_addr()),
        "private" => Some(addr_fns::private_addr()),
        _ => None,
    }
}

/// The running core: storage plus every pump started against it.
pub struct Core {
    config: CoreConfig,
    store: Store,
    multilogs: HashMap<String, MultiLog>,
    cancel: CancelToken,
    handles: Mutex<Vec<JoinHandle<()>>>,
    index_states: Arc<Mutex<HashMap<String, IndexState>>>,
}

impl Core {
    /// Open the store at `config`'s data directory, start every configured
    /// multi-log's index pump plus the graph builder pump, and return the
    /// running core. Pumps run on dedicated threads and keep running until
    /// [`Core::shutdown`] cancels them.
    pub fn open(config: CoreConfig) -> Result<Self> {
        let data_dir = config.data_dir();
        std::fs::create_dir_all(&data_dir)?;
        let store = Store::open(&data_dir.join("ssb.db"))?;

        let mut multilogs = HashMap::new();
        for name in &config.multilogs {
            multilogs.insert(name.clone(), store.multi_log(name));
        }

        let cancel = CancelToken::new();
        let index_states = Arc::new(Mutex::new(HashMap::new()));
        let mut handles = Vec::new();

        for name in &config.multilogs {
            let Some(addr_fn) = addr_fn_for(name) else {
                tracing::warn!(index = %name, "no address function for configured index, skipping pump");
                continue;
            };
            let ml = multilogs.get(name).expect("just inserted").clone();
            let receive_log = store.receive_log();
            let cursors = store.cursor_store();
            let cancel = cancel.clone();
            let states = index_states.clone();
            let pump_name = name.clone();
            states.lock().unwrap().insert(pump_name.clone(), IndexState::Building);

            handles.push(std::thread::spawn(move || {
                let pump = Pump::new(pump_name.clone(), receive_log, ml, addr_fn);
                match pump.run(&cursors, &cancel) {
                    Ok(()) => {
                        states.lock().unwrap().insert(pump_name.clone(), IndexState::Idle);
                    }
                    Err(e) => {
                        tracing::error!(index = %pump_name, error = %e, "index pump failed");
                        states.lock().unwrap().insert(pump_name, IndexState::Error(e.to_string()));
                    }
                }
            }));
        }

        {
            let receive_log = store.receive_log();
            let edges = store.edge_store();
            let cursors = store.cursor_store();
            let cancel = cancel.clone();
            let states = index_states.clone();
            states.lock().unwrap().insert(GRAPH_CURSOR.to_string(), IndexState::Building);

            handles.push(std::thread::spawn(move || {
                let result = ssb_graph::pump::run_badger_pump(
                    &receive_log,
                    &edges,
                    &cursors,
                    GRAPH_CURSOR,
                    &cancel,
                    UnfollowPolicy::RemoveEdge,
                );
                match result {
                    Ok(()) => {
                        states.lock().unwrap().insert(GRAPH_CURSOR.to_string(), IndexState::Idle);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "graph pump failed");
                        states.lock().unwrap().insert(GRAPH_CURSOR.to_string(), IndexState::Error(e.to_string()));
                    }
                }
            }));
        }

        Ok(Self {
            config,
            store,
            multilogs,
            cancel,
            handles: Mutex::new(handles),
            index_states,
        })
    }

    /// A named multi-log, if it's among the ones this core opened.
    pub fn get_multi_log(&self, name: &str) -> Option<MultiLog> {
        self.multilogs.get(name).cloned()
    }

    /// Alias for [`Core::get_multi_log`]: this implementation backs every
    /// named index with the same multi-log storage, so there's no separate
    /// "simple index" representation to distinguish it from.
    pub fn get_simple_index(&self, name: &str) -> Option<MultiLog> {
        self.get_multi_log(name)
    }

    /// A fresh snapshot of the trust graph (spec §4.5).
    pub fn graph(&self) -> Result<Graph> {
        Ok(Graph::build(&self.store.edge_store())?)
    }

    /// A façade over the trust graph for replication's peer-selection
    /// logic: its `lister` returns the follow/block sets a root feed would
    /// use to decide who to replicate.
    pub fn replicator(&self) -> Result<Replicator> {
        Ok(Replicator { graph: self.graph()? })
    }

    /// A point-in-time status snapshot (spec §6). `peers` and
    /// `pending_blob_wants` are left empty; this core doesn't own the
    /// transport or blob layers that would populate them.
    pub fn status(&self) -> Result<Status> {
        let receive_log_length = self.store.receive_log().seq()? + 1;
        let states = self.index_states.lock().unwrap();
        let indexes = states
            .iter()
            .map(|(name, state)| IndexStatus { name: name.clone(), state: state.clone() })
            .collect();
        Ok(Status {
            pid: std::process::id(),
            peers: Vec::new(),
            pending_blob_wants: Vec::new(),
            receive_log_length,
            indexes,
        })
    }

    /// Run a consistency check (spec §4.7), gating its progress callback at
    /// `self.config.fsck.progress_interval_secs`.
    pub fn fsck(&self, mode: FsckMode, progress: Option<&mut ProgressFn<'_>>) -> Result<()> {
        let feeds = self
            .multilogs
            .get("feeds")
            .ok_or(CoreError::NotFound)?;
        let progress_interval = Duration::from_secs(self.config.fsck.progress_interval_secs);
        ssb_fsck::run(mode, feeds, &self.store.receive_log(), progress_interval, progress).map_err(Into::into)
    }

    /// Null every message `problems` implicates and strip the offending
    /// feeds from every multi-log this core owns (spec §4.7 Heal).
    pub fn heal_repo(&self, problems: &ConsistencyProblems) -> Result<()> {
        let mls: Vec<MultiLog> = self.multilogs.values().cloned().collect();
        ssb_fsck::heal(problems, &self.store.receive_log(), &mls).map_err(Into::into)
    }

    /// Remove every trace of `author` from every multi-log this core owns,
    /// without touching the receive-log itself.
    pub fn null_feed(&self, author: &FeedRef) -> Result<()> {
        let addr = author.to_storage();
        for ml in self.multilogs.values() {
            ml.remove_all(&addr)?;
        }
        Ok(())
    }

    /// Cancel every pump, wait for them to exit, and close the multi-logs.
    /// Idempotent: a second call finds no handles left to join.
    pub fn shutdown(&self) -> Result<()> {
        self.cancel.cancel();
        let mut handles = self.handles.lock().unwrap();
        while let Some(handle) = handles.pop() {
            if handle.join().is_err() {
                tracing::error!("a pump thread panicked during shutdown");
            }
        }
        for ml in self.multilogs.values() {
            ml.close()?;
        }
        Ok(())
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }
}

/// The follow/block sets replication would use to decide who to pull from,
/// for a given root feed (spec §4.6's authorization rules operate on the
/// same graph this reads).
pub struct Replicator {
    graph: Graph,
}

impl Replicator {
    /// Feeds `root` follows and blocks directly — the seed set a `Lister`
    /// implementation would expand via [`ssb_graph::Authorizer`].
    pub fn lister(&self, root: &FeedRef) -> Result<(Vec<FeedRef>, Vec<FeedRef>)> {
        Ok((self.graph.follows(root)?, self.graph.blocks(root)?))
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }
}
