//! SQL schema for the single SQLite database backing the receive-log,
//! every named multi-log, index cursors, and the graph builder's edge
//! store.

pub const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS receive_log (
    rx_seq      INTEGER PRIMARY KEY,
    nulled      INTEGER NOT NULL DEFAULT 0,
    author      BLOB NOT NULL,
    sequence    INTEGER NOT NULL,
    msg_key     BLOB NOT NULL,
    canonical   BLOB
);
CREATE INDEX IF NOT EXISTS receive_log_author_idx ON receive_log(author, sequence);

CREATE TABLE IF NOT EXISTS multilog_entries (
    multilog_name TEXT NOT NULL,
    addr          BLOB NOT NULL,
    idx           INTEGER NOT NULL,
    rx_seq        INTEGER NOT NULL,
    PRIMARY KEY (multilog_name, addr, idx)
);
CREATE INDEX IF NOT EXISTS multilog_entries_addr_idx ON multilog_entries(multilog_name, addr);

CREATE TABLE IF NOT EXISTS cursors (
    name    TEXT PRIMARY KEY,
    rx_seq  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS graph_edges (
    from_addr       BLOB NOT NULL,
    to_addr         BLOB NOT NULL,
    weight          INTEGER NOT NULL,
    source_sequence INTEGER NOT NULL,
    PRIMARY KEY (from_addr, to_addr)
);

CREATE TABLE IF NOT EXISTS graph_known_feeds (
    addr BLOB PRIMARY KEY
);
";
