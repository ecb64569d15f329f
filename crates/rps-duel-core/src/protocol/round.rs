//! Commit-reveal state for a single round.
//!
//! Every transition is gated on explicit flags so the round resolves
//! correctly under any interleaving of local actions and peer messages.

use crate::crypto::{CryptoError, MoveKey, SealedMove};
use crate::games::Move;
use thiserror::Error;

/// Local actions the round refuses
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RoundError {
    #[error("a move was already chosen this round")]
    MoveAlreadyChosen,

    #[error("no move has been chosen this round")]
    NoMoveChosen,

    #[error("the commitment was already sent this round")]
    AlreadyCommitted,
}

/// What happened to an inbound commitment or key
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Observation {
    /// First arrival, now recorded
    Recorded,
    /// Byte-identical to the recorded value
    Duplicate,
    /// Slot already holds a different value
    Conflict,
}

/// Both moves of a resolved round
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub local: Move,
    pub remote: Move,
}

/// Everything needed to open the opponent's commitment, detached from the
/// round so decryption can run as a separate task
#[derive(Clone, Debug)]
pub struct PendingReveal {
    round: u64,
    local: Move,
    commitment: SealedMove,
    key: MoveKey,
}

impl PendingReveal {
    /// Round this reveal belongs to
    pub fn round(&self) -> u64 {
        self.round
    }

    /// `sealed` is the commitment this reveal opens
    pub fn consumed_commitment(&self, sealed: &SealedMove) -> bool {
        self.commitment == *sealed
    }

    /// `key` is the key this reveal opens with
    pub fn consumed_key(&self, key: &MoveKey) -> bool {
        self.key == *key
    }

    /// Decrypt and verify the opponent's commitment
    pub fn open(&self) -> Result<Resolution, CryptoError> {
        let remote = self.commitment.open(&self.key)?;
        Ok(Resolution {
            local: self.local,
            remote,
        })
    }
}

/// Per-round protocol state
#[derive(Clone, Debug)]
pub struct Round {
    number: u64,
    local_move: Option<Move>,
    local_key: Option<MoveKey>,
    committed: bool,
    remote_commitment: Option<SealedMove>,
    remote_key: Option<MoveKey>,
    key_disclosed: bool,
    revealing: bool,
}

impl Round {
    pub fn new(number: u64) -> Self {
        Self {
            number,
            local_move: None,
            local_key: None,
            committed: false,
            remote_commitment: None,
            remote_key: None,
            key_disclosed: false,
            revealing: false,
        }
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn local_move(&self) -> Option<Move> {
        self.local_move
    }

    pub fn key_disclosed(&self) -> bool {
        self.key_disclosed
    }

    pub fn has_remote_commitment(&self) -> bool {
        self.remote_commitment.is_some()
    }

    pub fn has_remote_key(&self) -> bool {
        self.remote_key.is_some()
    }

    /// Decryption of the opponent's commitment is in flight
    pub fn is_revealing(&self) -> bool {
        self.revealing
    }

    /// Lock in the local move. It cannot change until the round resets.
    pub fn choose(&mut self, mv: Move) -> Result<(), RoundError> {
        if self.local_move.is_some() {
            return Err(RoundError::MoveAlreadyChosen);
        }
        self.local_move = Some(mv);
        Ok(())
    }

    /// Record that the sealed local move has been sent, keeping its key
    pub fn commit(&mut self, key: MoveKey) -> Result<(), RoundError> {
        if self.local_move.is_none() {
            return Err(RoundError::NoMoveChosen);
        }
        if self.committed {
            return Err(RoundError::AlreadyCommitted);
        }
        self.local_key = Some(key);
        self.committed = true;
        Ok(())
    }

    pub fn observe_remote_commitment(&mut self, sealed: SealedMove) -> Observation {
        match &self.remote_commitment {
            None => {
                self.remote_commitment = Some(sealed);
                Observation::Recorded
            }
            Some(existing) if *existing == sealed => Observation::Duplicate,
            Some(_) => Observation::Conflict,
        }
    }

    /// Release the local key exactly once, and only after our commitment was
    /// sent and the opponent's commitment was received
    pub fn disclose_key_if_ready(&mut self) -> Option<MoveKey> {
        if self.key_disclosed || !self.committed || self.remote_commitment.is_none() {
            return None;
        }
        let key = self.local_key.clone()?;
        self.key_disclosed = true;
        Some(key)
    }

    pub fn observe_remote_key(&mut self, key: MoveKey) -> Observation {
        match &self.remote_key {
            None => {
                self.remote_key = Some(key);
                Observation::Recorded
            }
            Some(existing) if *existing == key => Observation::Duplicate,
            Some(_) => Observation::Conflict,
        }
    }

    /// Hand out the reveal once all inputs are present; later calls yield
    /// nothing so the opponent's commitment is opened at most once
    pub fn begin_reveal(&mut self) -> Option<PendingReveal> {
        if self.revealing || !self.committed {
            return None;
        }
        let reveal = PendingReveal {
            round: self.number,
            local: self.local_move?,
            commitment: self.remote_commitment.clone()?,
            key: self.remote_key.clone()?,
        };
        self.revealing = true;
        Some(reveal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Take the reveal if ready and open it, as the session's task does
    fn reveal(round: &mut Round) -> Result<Option<Resolution>, CryptoError> {
        round.begin_reveal().map(|pending| pending.open()).transpose()
    }

    fn committed_round(mv: Move) -> (Round, SealedMove) {
        let mut round = Round::new(1);
        round.choose(mv).unwrap();
        let (key, sealed) = SealedMove::seal(mv).unwrap();
        round.commit(key).unwrap();
        (round, sealed)
    }

    #[test]
    fn test_move_is_set_once() {
        let mut round = Round::new(1);
        round.choose(Move::Rock).unwrap();

        assert_eq!(round.choose(Move::Paper), Err(RoundError::MoveAlreadyChosen));
        assert_eq!(round.local_move(), Some(Move::Rock));
    }

    #[test]
    fn test_commit_requires_move() {
        let mut round = Round::new(1);
        assert_eq!(round.commit(MoveKey::random()), Err(RoundError::NoMoveChosen));
    }

    #[test]
    fn test_no_disclosure_before_local_commit() {
        let mut round = Round::new(1);
        let (_, remote) = SealedMove::seal(Move::Paper).unwrap();
        round.observe_remote_commitment(remote);
        round.choose(Move::Rock).unwrap();

        assert_eq!(round.disclose_key_if_ready(), None);
        assert!(!round.key_disclosed());
    }

    #[test]
    fn test_no_disclosure_before_remote_commit() {
        let (mut round, _) = committed_round(Move::Rock);

        assert_eq!(round.disclose_key_if_ready(), None);
        assert!(!round.key_disclosed());
    }

    #[test]
    fn test_disclosure_happens_once() {
        let (mut round, _) = committed_round(Move::Rock);
        let (_, remote) = SealedMove::seal(Move::Paper).unwrap();
        round.observe_remote_commitment(remote);

        assert!(round.disclose_key_if_ready().is_some());
        assert!(round.disclose_key_if_ready().is_none());
    }

    #[test]
    fn test_duplicate_commitment_ignored() {
        let mut round = Round::new(1);
        let (_, first) = SealedMove::seal(Move::Paper).unwrap();
        let (_, second) = SealedMove::seal(Move::Rock).unwrap();

        assert_eq!(round.observe_remote_commitment(first.clone()), Observation::Recorded);
        assert_eq!(round.observe_remote_commitment(first), Observation::Duplicate);
        assert_eq!(round.observe_remote_commitment(second), Observation::Conflict);
    }

    #[test]
    fn test_duplicate_key_ignored() {
        let mut round = Round::new(1);
        let key = MoveKey::random();

        assert_eq!(round.observe_remote_key(key.clone()), Observation::Recorded);
        assert_eq!(round.observe_remote_key(key), Observation::Duplicate);
        assert_eq!(round.observe_remote_key(MoveKey::random()), Observation::Conflict);
    }

    #[test]
    fn test_resolve_after_all_inputs() {
        let (mut round, _) = committed_round(Move::Rock);
        let (remote_key, remote) = SealedMove::seal(Move::Scissors).unwrap();

        round.observe_remote_commitment(remote);
        assert_eq!(reveal(&mut round), Ok(None));

        round.observe_remote_key(remote_key);
        assert_eq!(
            reveal(&mut round),
            Ok(Some(Resolution {
                local: Move::Rock,
                remote: Move::Scissors,
            }))
        );
        // opened at most once
        assert_eq!(reveal(&mut round), Ok(None));
    }

    #[test]
    fn test_resolve_waits_for_local_commit() {
        let mut round = Round::new(1);
        let (remote_key, remote) = SealedMove::seal(Move::Scissors).unwrap();
        round.choose(Move::Rock).unwrap();
        round.observe_remote_commitment(remote);
        round.observe_remote_key(remote_key);

        assert!(round.begin_reveal().is_none());
    }

    #[test]
    fn test_wrong_remote_key_is_fatal() {
        let (mut round, _) = committed_round(Move::Rock);
        let (_, remote) = SealedMove::seal(Move::Paper).unwrap();
        round.observe_remote_commitment(remote);
        round.observe_remote_key(MoveKey::random());

        assert_eq!(reveal(&mut round), Err(CryptoError::VerificationFailed));
    }
}
