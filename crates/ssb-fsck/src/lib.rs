//! # ssb-fsck
//!
//! Consistency checking and naive repair for the receive-log and its
//! multi-logs (spec §4.7): Length mode spot-checks the last entry of every
//! feed's sub-log, Sequence mode walks the whole receive-log verifying each
//! feed's `sequence` field increases by one, and [`heal`] nulls whatever it
//! found broken.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use bitvec::vec::BitVec;

use ssb_store::{MultiLog, QuerySpec, ReceiveLog, StoreError};
use ssb_types::FeedRef;

/// Which consistency check to run (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsckMode {
    /// Check only the last entry of each feed's sub-log against its
    /// recorded length. Cheap, O(feeds).
    Length,
    /// Walk the entire receive-log verifying every feed's sequence numbers
    /// increase by exactly one. Expensive, O(messages).
    Sequence,
}

/// One feed whose sequence numbers don't form the expected run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrongSequence {
    pub author: FeedRef,
    pub rx_seq: i64,
    pub expected: i64,
    pub found: i64,
}

impl fmt::Display for WrongSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "feed {}: expected sequence {}, found {} (rx_seq {})",
            self.author, self.expected, self.found, self.rx_seq
        )
    }
}

/// One or more feeds failed a consistency check. A single offender prints
/// as one line; multiple offenders print as a numbered report (spec §4.7 /
/// SPEC_FULL §3).
#[derive(Debug, Clone)]
pub struct ConsistencyProblems {
    pub errors: Vec<WrongSequence>,
    /// Every rx_seq belonging to an offending feed, not just the first bad
    /// one — `heal` needs to null all of it, since a feed is unrecoverable
    /// past its first break.
    pub bad_rx_seqs: Vec<i64>,
}

impl fmt::Display for ConsistencyProblems {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.len() == 1 {
            return write!(f, "{}", self.errors[0]);
        }
        writeln!(
            f,
            "multiple consistency problems ({}) over {} messages",
            self.errors.len(),
            self.bad_rx_seqs.len()
        )?;
        for (i, err) in self.errors.iter().enumerate() {
            writeln!(f, "{i:02}: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConsistencyProblems {}

#[derive(Debug, thiserror::Error)]
pub enum FsckError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Ref(#[from] ssb_types::RefError),
    /// Length mode found exactly one feed whose last sub-log entry doesn't
    /// match the feed's own length (original_source `lengthFSCK` returns
    /// this bare, not wrapped in a consistency report).
    #[error(transparent)]
    WrongSequence(#[from] WrongSequence),
    /// Sequence mode found one or more broken feeds.
    #[error(transparent)]
    Consistency(#[from] ConsistencyProblems),
}

impl std::error::Error for WrongSequence {}

pub type Result<T> = std::result::Result<T, FsckError>;

/// Called periodically during [`FsckMode::Sequence`] with a completion
/// percentage and an estimated time remaining.
pub type ProgressFn<'a> = dyn FnMut(f64, Duration) + 'a;

/// Default interval between progress callback invocations, at most (spec
/// §4.7 mirrors the 3-second tick of the system it was distilled from).
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(3);

/// Run one consistency check over `feeds`/`receive_log`. `progress_interval`
/// caps how often `progress` fires during [`FsckMode::Sequence`]; ignored by
/// [`FsckMode::Length`], which has no progress callback.
pub fn run(
    mode: FsckMode,
    feeds: &MultiLog,
    receive_log: &ReceiveLog,
    progress_interval: Duration,
    progress: Option<&mut ProgressFn<'_>>,
) -> Result<()> {
    match mode {
        FsckMode::Length => length_fsck(feeds, receive_log),
        FsckMode::Sequence => sequence_fsck(receive_log, progress_interval, progress),
    }
}

/// Checks only the last sub-log entry of each feed: its message's
/// `sequence` must equal the sub-log's 1-based length.
fn length_fsck(feeds: &MultiLog, receive_log: &ReceiveLog) -> Result<()> {
    for author_addr in feeds.list()? {
        let sub = feeds.get(&author_addr)?;
        let current_idx = sub.current_seq();
        if current_idx < 0 {
            continue;
        }
        let Some(rx_seq) = sub.get(current_idx) else {
            continue;
        };
        let msg = match receive_log.get(rx_seq) {
            Ok(msg) => msg,
            Err(StoreError::Nulled(_)) => continue,
            Err(e) => return Err(e.into()),
        };

        let expected = current_idx + 1;
        if msg.sequence != expected {
            let author = FeedRef::from_storage(&author_addr)?;
            return Err(WrongSequence {
                author,
                rx_seq,
                expected,
                found: msg.sequence,
            }
            .into());
        }
    }
    Ok(())
}

/// Walks every receive-log entry (nulled ones are skipped) tracking each
/// author's last-seen sequence number and the full set of rx_seqs it has
/// contributed, so a broken feed's entire run can be nulled by [`heal`].
fn sequence_fsck(
    receive_log: &ReceiveLog,
    progress_interval: Duration,
    mut progress: Option<&mut ProgressFn<'_>>,
) -> Result<()> {
    let total = receive_log.seq()? + 1;
    let entries = receive_log.query(QuerySpec::from(0))?;

    let mut last_sequence: HashMap<Vec<u8>, i64> = HashMap::new();
    let mut seen_rx_seqs: HashMap<Vec<u8>, BitVec> = HashMap::new();
    let mut errors = Vec::new();
    let mut processed: i64 = 0;

    let start = Instant::now();
    let mut last_tick = start;

    for (rx_seq, maybe_msg) in entries {
        let Some(msg) = maybe_msg else {
            continue;
        };
        let author_addr = msg.author.to_storage();

        let bits = seen_rx_seqs.entry(author_addr.clone()).or_default();
        set_bit(bits, rx_seq as usize);

        let broken = match last_sequence.get(&author_addr).copied() {
            None if msg.sequence != 1 => {
                errors.push(WrongSequence {
                    author: msg.author.clone(),
                    rx_seq,
                    expected: 1,
                    found: msg.sequence,
                });
                true
            }
            None => {
                last_sequence.insert(author_addr, 1);
                false
            }
            Some(curr) if curr < 0 => true,
            Some(curr) if curr + 1 != msg.sequence => {
                errors.push(WrongSequence {
                    author: msg.author.clone(),
                    rx_seq,
                    expected: curr + 1,
                    found: msg.sequence,
                });
                true
            }
            Some(curr) => {
                last_sequence.insert(author_addr, curr + 1);
                processed += 1;
                false
            }
        };
        if broken {
            last_sequence.insert(msg.author.to_storage(), -1);
        }

        if let Some(cb) = progress.as_deref_mut() {
            if last_tick.elapsed() >= progress_interval {
                let percent = if total > 0 { (processed as f64 / total as f64) * 100.0 } else { 100.0 };
                cb(percent, estimate_time_left(start.elapsed(), percent));
                last_tick = Instant::now();
            }
        }
    }

    if errors.is_empty() {
        return Ok(());
    }

    let mut bad_rx_seqs: Vec<i64> = Vec::new();
    let mut seen_authors: Vec<Vec<u8>> = Vec::new();
    for err in &errors {
        let addr = err.author.to_storage();
        if seen_authors.contains(&addr) {
            continue;
        }
        seen_authors.push(addr.clone());
        if let Some(bits) = seen_rx_seqs.get(&addr) {
            bad_rx_seqs.extend(bits.iter_ones().map(|i| i as i64));
        }
    }
    bad_rx_seqs.sort_unstable();

    Err(ConsistencyProblems { errors, bad_rx_seqs }.into())
}

fn set_bit(bits: &mut BitVec, idx: usize) {
    if bits.len() <= idx {
        bits.resize(idx + 1, false);
    }
    bits.set(idx, true);
}

fn estimate_time_left(elapsed: Duration, percent: f64) -> Duration {
    if percent <= 0.0 {
        return Duration::ZERO;
    }
    let total_estimate = elapsed.as_secs_f64() * (100.0 / percent);
    Duration::from_secs_f64((total_estimate - elapsed.as_secs_f64()).max(0.0))
}

/// Naive repair (spec §4.7 Heal): null every rx_seq implicated in
/// `problems`, then strip the offending feeds from every given multi-log.
pub fn heal(problems: &ConsistencyProblems, receive_log: &ReceiveLog, multilogs: &[MultiLog]) -> Result<()> {
    if problems.errors.is_empty() {
        tracing::warn!("heal called with no errors to repair");
        return Ok(());
    }

    tracing::info!(
        feeds = problems.errors.len(),
        messages = problems.bad_rx_seqs.len(),
        "healing broken feeds"
    );

    for &rx_seq in &problems.bad_rx_seqs {
        match receive_log.null(rx_seq) {
            Ok(()) | Err(StoreError::Nulled(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    for err in &problems.errors {
        let addr = err.author.to_storage();
        for ml in multilogs {
            ml.remove_all(&addr)?;
        }
    }

    Ok(())
}
