use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::RelayError;

pub const SENDER: &str = "sender";
pub const RECEIVER: &str = "receiver";

/// The two fixed peers of a negotiation.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Role {
    Sender,
    Receiver,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Sender => SENDER,
            Role::Receiver => RECEIVER,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            SENDER => Ok(Role::Sender),
            RECEIVER => Ok(Role::Receiver),
            _ => Err(RelayError::UnknownRole(s.to_string())),
        }
    }
}

/// An ICE candidate and the media line it belongs to. Both are opaque.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct Candidate {
    pub candidate: String,
    pub mid: String,
}

impl Candidate {
    pub fn new(candidate: impl Into<String>, mid: impl Into<String>) -> crate::Result<Self> {
        let candidate = candidate.into();
        let mid = mid.into();
        if candidate.is_empty() || mid.is_empty() {
            return Err(RelayError::InvalidInput("candidate or mid"));
        }
        Ok(Self { candidate, mid })
    }
}

/// Negotiation state of one session id.
///
/// There is no phase field: which of `offer`/`answer` is populated is the
/// phase. A new offer starts a new ICE round, so it drops every candidate
/// gathered for the previous one.
#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub(crate) offer: Option<String>,
    pub(crate) answer: Option<String>,
    pub(crate) sender_candidates: Vec<Candidate>,
    pub(crate) receiver_candidates: Vec<Candidate>,
    pub(crate) last_seen: Instant,
}

impl Session {
    pub(crate) fn new(now: Instant) -> Self {
        Self {
            offer: None,
            answer: None,
            sender_candidates: Vec::new(),
            receiver_candidates: Vec::new(),
            last_seen: now,
        }
    }

    pub(crate) fn set_offer(&mut self, sdp: String) {
        self.offer = Some(sdp);
        self.sender_candidates.clear();
        self.receiver_candidates.clear();
    }

    pub(crate) fn set_answer(&mut self, sdp: String) {
        self.answer = Some(sdp);
    }

    pub(crate) fn candidates(&self, role: Role) -> &Vec<Candidate> {
        match role {
            Role::Sender => &self.sender_candidates,
            Role::Receiver => &self.receiver_candidates,
        }
    }

    pub(crate) fn candidates_mut(&mut self, role: Role) -> &mut Vec<Candidate> {
        match role {
            Role::Sender => &mut self.sender_candidates,
            Role::Receiver => &mut self.receiver_candidates,
        }
    }

    pub(crate) fn touch(&mut self, now: Instant) {
        self.last_seen = self.last_seen.max(now);
    }

    pub(crate) fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > ttl
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use crate::{
        entity::{Candidate, Role, Session},
        error::RelayError,
        Result,
    };

    #[test]
    fn role_parse() -> Result<()> {
        assert_eq!("sender".parse::<Role>()?, Role::Sender);
        assert_eq!("receiver".parse::<Role>()?, Role::Receiver);
        match "Sender".parse::<Role>() {
            Err(RelayError::UnknownRole(role)) => assert_eq!(role, "Sender"),
            other => panic!("unexpected: {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn candidate_serialize() -> Result<()> {
        let c = Candidate::new("candidate:1 1 UDP 2122252543 192.168.1.2 50000 typ host", "0")?;
        let json = serde_json::to_string(&c)?;
        assert_eq!(
            json,
            r#"{"candidate":"candidate:1 1 UDP 2122252543 192.168.1.2 50000 typ host","mid":"0"}"#
        );
        Ok(())
    }

    #[test]
    fn candidate_rejects_empty_fields() {
        assert!(matches!(
            Candidate::new("", "0"),
            Err(RelayError::InvalidInput(_))
        ));
        assert!(matches!(
            Candidate::new("candidate:1", ""),
            Err(RelayError::InvalidInput(_))
        ));
    }

    #[test]
    fn offer_resets_both_candidate_lists() -> Result<()> {
        let mut session = Session::new(Instant::now());
        session
            .candidates_mut(Role::Sender)
            .push(Candidate::new("a", "0")?);
        session
            .candidates_mut(Role::Receiver)
            .push(Candidate::new("b", "0")?);
        session.set_answer("answer".to_string());
        session.set_offer("offer".to_string());

        assert!(session.candidates(Role::Sender).is_empty());
        assert!(session.candidates(Role::Receiver).is_empty());
        assert_eq!(session.offer.as_deref(), Some("offer"));
        assert_eq!(session.answer.as_deref(), Some("answer"));
        Ok(())
    }

    #[test]
    fn expiry() {
        let start = Instant::now();
        let mut session = Session::new(start);
        let ttl = Duration::from_secs(10);
        assert!(!session.is_expired(start + ttl, ttl));
        assert!(session.is_expired(start + ttl + Duration::from_secs(1), ttl));

        session.touch(start + Duration::from_secs(5));
        assert!(!session.is_expired(start + ttl + Duration::from_secs(1), ttl));
    }
}
