use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use rand::TryRngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub first: String,
    pub last: String,
    pub company: String,
    pub title: String,
    pub location: String,
    pub keywords: String,
}

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first, self.last).trim().to_owned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    None,
    Pending,
    Accepted,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::None => "none",
            ConnectionStatus::Pending => "pending",
            ConnectionStatus::Accepted => "accepted",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Connection {
    pub profile_id: String,
    pub status: ConnectionStatus,
    pub note: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub sent_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub accepted_at: Option<OffsetDateTime>,
}

impl Connection {
    fn none(profile_id: &str) -> Self {
        Connection {
            profile_id: profile_id.to_owned(),
            status: ConnectionStatus::None,
            note: String::new(),
            sent_at: None,
            accepted_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub thread_id: String,
    pub profile_id: String,
    pub from_self: bool,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub sent_at: OffsetDateTime,
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("connection request already sent")]
    AlreadyRequested,
    #[error("not connected")]
    NotConnected,
    #[error("session id generation failed: {0}")]
    SessionId(String),
}

/// Threads are addressed by counterparty profile id. This naming scheme is a
/// public contract: clients build the string themselves to deep-link into a
/// conversation.
pub fn thread_id(profile_id: &str) -> String {
    format!("thread-{profile_id}")
}

/// Case-insensitive substring filter over the profile catalog. An empty field
/// (after trimming) matches everything; all non-empty fields must match.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub keywords: String,
}

#[derive(Default)]
struct Inner {
    profiles: Vec<Profile>,
    profiles_by_id: HashMap<String, Profile>,
    // session id -> username
    sessions: HashMap<String, String>,
    // profile id -> connection
    connections: HashMap<String, Connection>,
    // thread id -> messages, insertion order = chronological
    threads: HashMap<String, Vec<Message>>,
}

/// All mutable mock-network state behind one reader/writer lock. Every method
/// holds the lock for its full duration and does no I/O inside the critical
/// section.
pub struct State {
    inner: RwLock<Inner>,
}

impl State {
    pub fn new(seed_profiles: Vec<Profile>) -> Self {
        let profiles_by_id = seed_profiles
            .iter()
            .map(|p| (p.id.clone(), p.clone()))
            .collect();
        State {
            inner: RwLock::new(Inner {
                profiles: seed_profiles,
                profiles_by_id,
                ..Inner::default()
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn new_session(&self, username: &str) -> Result<String, StateError> {
        let mut buf = [0u8; 16];
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| StateError::SessionId(e.to_string()))?;
        let id = hex::encode(buf);

        self.write().sessions.insert(id.clone(), username.to_owned());
        Ok(id)
    }

    pub fn delete_session(&self, session_id: &str) {
        self.write().sessions.remove(session_id);
    }

    pub fn username_for_session(&self, session_id: &str) -> Option<String> {
        self.read().sessions.get(session_id).cloned()
    }

    pub fn get_profile(&self, id: &str) -> Option<Profile> {
        self.read().profiles_by_id.get(id).cloned()
    }

    pub fn search(&self, q: &SearchQuery) -> Vec<Profile> {
        fn matches(hay: &str, want: &str) -> bool {
            let want = want.trim().to_lowercase();
            if want.is_empty() {
                return true;
            }
            hay.to_lowercase().contains(&want)
        }

        let inner = self.read();
        let mut out: Vec<Profile> = inner
            .profiles
            .iter()
            .filter(|p| {
                matches(&p.title, &q.title)
                    && matches(&p.company, &q.company)
                    && matches(&p.location, &q.location)
                    && matches(&p.keywords, &q.keywords)
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// A connection absent from the map is the same thing as one at status
    /// none, so callers never see an optional here.
    pub fn connection_for(&self, profile_id: &str) -> Connection {
        self.read()
            .connections
            .get(profile_id)
            .cloned()
            .unwrap_or_else(|| Connection::none(profile_id))
    }

    pub fn send_connection_request(
        &self,
        profile_id: &str,
        note: &str,
    ) -> Result<Connection, StateError> {
        let mut inner = self.write();

        if let Some(c) = inner.connections.get(profile_id) {
            if matches!(
                c.status,
                ConnectionStatus::Pending | ConnectionStatus::Accepted
            ) {
                return Err(StateError::AlreadyRequested);
            }
        }

        let c = Connection {
            profile_id: profile_id.to_owned(),
            status: ConnectionStatus::Pending,
            note: note.to_owned(),
            sent_at: Some(OffsetDateTime::now_utc()),
            accepted_at: None,
        };
        inner.connections.insert(profile_id.to_owned(), c.clone());
        Ok(c)
    }

    /// Accepts from any prior status, including none (a request-less
    /// promotion the original network allows), and lazily creates the empty
    /// thread for the conversation.
    pub fn accept_connection(&self, profile_id: &str) -> Connection {
        let mut inner = self.write();

        let mut c = inner
            .connections
            .get(profile_id)
            .cloned()
            .unwrap_or_else(|| Connection::none(profile_id));
        c.status = ConnectionStatus::Accepted;
        c.accepted_at = Some(OffsetDateTime::now_utc());
        inner.connections.insert(profile_id.to_owned(), c.clone());

        inner.threads.entry(thread_id(profile_id)).or_default();
        c
    }

    /// Partitions stored connections by status, each ordered by profile id
    /// ascending so rendering and tests are deterministic.
    pub fn list_connections(&self) -> (Vec<Connection>, Vec<Connection>) {
        let inner = self.read();
        let mut pending = Vec::new();
        let mut accepted = Vec::new();
        for c in inner.connections.values() {
            match c.status {
                ConnectionStatus::Pending => pending.push(c.clone()),
                ConnectionStatus::Accepted => accepted.push(c.clone()),
                ConnectionStatus::None => {}
            }
        }
        pending.sort_by(|a, b| a.profile_id.cmp(&b.profile_id));
        accepted.sort_by(|a, b| a.profile_id.cmp(&b.profile_id));
        (pending, accepted)
    }

    pub fn list_threads(&self) -> Vec<String> {
        let inner = self.read();
        let mut ids: Vec<String> = inner.threads.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Unknown threads yield an empty list, never an error.
    pub fn messages(&self, thread_id: &str) -> Vec<Message> {
        self.read()
            .threads
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn send_message(&self, profile_id: &str, body: &str) -> Result<Message, StateError> {
        let mut inner = self.write();

        let connected = inner
            .connections
            .get(profile_id)
            .is_some_and(|c| c.status == ConnectionStatus::Accepted);
        if !connected {
            return Err(StateError::NotConnected);
        }

        let tid = thread_id(profile_id);
        let m = Message {
            thread_id: tid.clone(),
            profile_id: profile_id.to_owned(),
            from_self: true,
            body: body.to_owned(),
            sent_at: OffsetDateTime::now_utc(),
        };
        inner.threads.entry(tid).or_default().push(m.clone());
        Ok(m)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};

    use super::*;

    fn seed() -> Vec<Profile> {
        // Deliberately out of id order: search must sort, not preserve.
        vec![
            profile("p3", "Noor", "Haddad", "Lumen Labs", "Product Manager", "Berlin", "roadmaps"),
            profile("p1", "Ada", "Lovelace", "Analytical Engines", "Software Engineer", "London", "compilers, mathematics"),
            profile("p2", "Grace", "Hopper", "Eckert-Mauchly", "Senior Engineer", "Philadelphia", "compilers, navy"),
        ]
    }

    fn profile(
        id: &str,
        first: &str,
        last: &str,
        company: &str,
        title: &str,
        location: &str,
        keywords: &str,
    ) -> Profile {
        Profile {
            id: id.into(),
            first: first.into(),
            last: last.into(),
            company: company.into(),
            title: title.into(),
            location: location.into(),
            keywords: keywords.into(),
        }
    }

    #[test]
    fn sessions_roundtrip_and_idempotent_delete() {
        let st = State::new(seed());
        let sid = st.new_session("demo").unwrap();
        assert_eq!(sid.len(), 32, "16 random bytes, hex encoded");
        assert_eq!(st.username_for_session(&sid).as_deref(), Some("demo"));

        st.delete_session(&sid);
        assert_eq!(st.username_for_session(&sid), None);
        // deleting again is a no-op
        st.delete_session(&sid);
    }

    #[test]
    fn search_filters_all_fields_case_insensitively_and_sorts_by_id() {
        let st = State::new(seed());

        let q = SearchQuery {
            title: "  eng  ".into(),
            ..SearchQuery::default()
        };
        let got: Vec<String> = st.search(&q).into_iter().map(|p| p.id).collect();
        assert_eq!(got, vec!["p1", "p2"]);

        let q = SearchQuery {
            title: "ENGINEER".into(),
            keywords: "compilers".into(),
            location: "london".into(),
            ..SearchQuery::default()
        };
        let got: Vec<String> = st.search(&q).into_iter().map(|p| p.id).collect();
        assert_eq!(got, vec!["p1"]);

        let q = SearchQuery {
            title: "manager".into(),
            ..SearchQuery::default()
        };
        let got: Vec<String> = st.search(&q).into_iter().map(|p| p.id).collect();
        assert_eq!(got, vec!["p3"]);

        // empty query matches everything, still in id order
        let got: Vec<String> = st
            .search(&SearchQuery::default())
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(got, vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn connection_for_absent_profile_is_none_status() {
        let st = State::new(seed());
        let c = st.connection_for("p1");
        assert_eq!(c.status, ConnectionStatus::None);
        assert_eq!(c.profile_id, "p1");
        assert!(c.sent_at.is_none());
    }

    #[test]
    fn duplicate_request_fails_and_leaves_state_unchanged() {
        let st = State::new(seed());

        let c = st.send_connection_request("p1", "hi").unwrap();
        assert_eq!(c.status, ConnectionStatus::Pending);
        assert_eq!(c.note, "hi");
        assert!(c.sent_at.is_some());

        let err = st.send_connection_request("p1", "second note").unwrap_err();
        assert!(matches!(err, StateError::AlreadyRequested));
        assert_eq!(st.connection_for("p1").note, "hi");

        // still rejected once accepted
        st.accept_connection("p1");
        let err = st.send_connection_request("p1", "third").unwrap_err();
        assert!(matches!(err, StateError::AlreadyRequested));
    }

    #[test]
    fn accept_is_idempotent_and_does_not_duplicate_the_thread() {
        let st = State::new(seed());
        st.send_connection_request("p1", "hi").unwrap();

        let c = st.accept_connection("p1");
        assert_eq!(c.status, ConnectionStatus::Accepted);
        assert!(c.accepted_at.is_some());
        assert_eq!(st.list_threads(), vec!["thread-p1"]);

        let c = st.accept_connection("p1");
        assert_eq!(c.status, ConnectionStatus::Accepted);
        assert_eq!(st.list_threads(), vec!["thread-p1"]);
        assert!(st.messages("thread-p1").is_empty());
    }

    // The original network promotes none straight to accepted with no prior
    // request. Kept for compatibility; this test pins the permissive path.
    #[test]
    fn accept_without_request_promotes_none_to_accepted() {
        let st = State::new(seed());
        let c = st.accept_connection("p2");
        assert_eq!(c.status, ConnectionStatus::Accepted);
        assert!(c.sent_at.is_none());
        assert!(st.list_threads().contains(&"thread-p2".to_owned()));
    }

    #[test]
    fn message_requires_accepted_connection() {
        let st = State::new(seed());

        let err = st.send_message("p1", "hello").unwrap_err();
        assert!(matches!(err, StateError::NotConnected));

        st.send_connection_request("p1", "hi").unwrap();
        let err = st.send_message("p1", "hello").unwrap_err();
        assert!(matches!(err, StateError::NotConnected));

        st.accept_connection("p1");
        let m = st.send_message("p1", "hello").unwrap();
        assert_eq!(m.thread_id, "thread-p1");
        assert!(m.from_self);

        let msgs = st.messages("thread-p1");
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].body, "hello");
    }

    #[test]
    fn messages_for_unknown_thread_is_empty() {
        let st = State::new(seed());
        assert!(st.messages("thread-nope").is_empty());
    }

    #[test]
    fn list_connections_partitions_and_orders_by_profile_id() {
        let st = State::new(seed());
        st.send_connection_request("p3", "a").unwrap();
        st.send_connection_request("p1", "b").unwrap();
        st.send_connection_request("p2", "c").unwrap();
        st.accept_connection("p2");

        let (pending, accepted) = st.list_connections();
        let pending_ids: Vec<&str> = pending.iter().map(|c| c.profile_id.as_str()).collect();
        let accepted_ids: Vec<&str> = accepted.iter().map(|c| c.profile_id.as_str()).collect();
        assert_eq!(pending_ids, vec!["p1", "p3"]);
        assert_eq!(accepted_ids, vec!["p2"]);
    }

    #[test]
    fn concurrent_requests_have_exactly_one_winner() {
        const N: usize = 8;
        let st = Arc::new(State::new(seed()));
        let barrier = Arc::new(Barrier::new(N));

        let handles: Vec<_> = (0..N)
            .map(|i| {
                let st = Arc::clone(&st);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    st.send_connection_request("p1", &format!("note-{i}"))
                        .map(|c| c.note)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .cloned()
            .collect();
        let losers = results
            .iter()
            .filter(|r| matches!(r, Err(StateError::AlreadyRequested)))
            .count();

        assert_eq!(winners.len(), 1);
        assert_eq!(losers, N - 1);
        // the stored note belongs to the single winning call
        assert_eq!(st.connection_for("p1").note, winners[0]);
    }
}
