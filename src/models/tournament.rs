//! Tournament aggregate: format, lifecycle status, registrants and the match arena.

use crate::models::error::{TournamentError, TournamentResult};
use crate::models::game::{GameMatch, MatchId, MatchKey};
use crate::models::options::BracketOptions;
use crate::models::participant::{Participant, ParticipantId, ParticipantStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a tournament.
pub type TournamentId = Uuid;

/// Supported formats. Every format is two-party per match.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TournamentFormat {
    #[default]
    SingleElimination,
    DoubleElimination,
    RoundRobin,
    Swiss,
    League,
}

impl TournamentFormat {
    pub fn is_elimination(self) -> bool {
        matches!(
            self,
            TournamentFormat::SingleElimination | TournamentFormat::DoubleElimination
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TournamentFormat::SingleElimination => "SINGLE_ELIMINATION",
            TournamentFormat::DoubleElimination => "DOUBLE_ELIMINATION",
            TournamentFormat::RoundRobin => "ROUND_ROBIN",
            TournamentFormat::Swiss => "SWISS",
            TournamentFormat::League => "LEAGUE",
        }
    }
}

impl fmt::Display for TournamentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TournamentFormat {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "SINGLE_ELIMINATION" => Ok(TournamentFormat::SingleElimination),
            "DOUBLE_ELIMINATION" => Ok(TournamentFormat::DoubleElimination),
            "ROUND_ROBIN" => Ok(TournamentFormat::RoundRobin),
            "SWISS" => Ok(TournamentFormat::Swiss),
            "LEAGUE" => Ok(TournamentFormat::League),
            _ => Err(TournamentError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Lifecycle of a tournament.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TournamentStatus {
    #[default]
    Draft,
    Published,
    RegistrationOpen,
    /// Bracket built; results are being reported.
    InProgress,
    Completed,
    Canceled,
}

impl TournamentStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, TournamentStatus::Completed | TournamentStatus::Canceled)
    }
}

/// Shape of the built bracket. Everything else about the match graph is derived from it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BracketLayout {
    /// Participants placed in the bracket.
    pub entrants: u32,
    /// Winners-bracket rounds, ceil(log2 N). Zero for pooled formats.
    pub winners_rounds: u32,
    /// Losers-bracket rounds, 2(R-1) for double elimination.
    pub losers_rounds: u32,
    /// Scheduled rounds for pooled formats.
    pub pool_rounds: u32,
}

impl BracketLayout {
    /// Slots in the first winners round (next power of two).
    pub fn bracket_size(&self) -> u32 {
        1 << self.winners_rounds
    }
}

/// Full tournament state: registrants, matches and phase.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub format: TournamentFormat,
    pub status: TournamentStatus,
    pub registration_limit: Option<usize>,
    pub options: BracketOptions,
    /// Set once, when the bracket is built.
    pub layout: Option<BracketLayout>,
    pub participants: Vec<Participant>,
    /// Match arena, addressed by position or by key.
    pub matches: Vec<GameMatch>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    /// Completed or canceled at.
    pub finished_at: Option<DateTime<Utc>>,
}

impl Tournament {
    /// Create a new tournament in Draft with no participants.
    pub fn new(
        name: impl Into<String>,
        format: TournamentFormat,
        registration_limit: Option<usize>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            format,
            status: TournamentStatus::Draft,
            registration_limit,
            options: BracketOptions::default(),
            layout: None,
            participants: Vec::new(),
            matches: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Draft -> Published.
    pub fn publish(&mut self) -> TournamentResult<()> {
        self.transition(TournamentStatus::Draft, TournamentStatus::Published)
    }

    /// Published -> RegistrationOpen.
    pub fn open_registration(&mut self) -> TournamentResult<()> {
        self.transition(TournamentStatus::Published, TournamentStatus::RegistrationOpen)
    }

    fn transition(&mut self, from: TournamentStatus, to: TournamentStatus) -> TournamentResult<()> {
        if self.status != from {
            return Err(TournamentError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Change the format. Locked once the tournament is in progress.
    pub fn set_format(&mut self, format: TournamentFormat) -> TournamentResult<()> {
        if self.layout.is_some() || self.status.is_finished() {
            return Err(TournamentError::FormatLocked);
        }
        self.format = format;
        Ok(())
    }

    /// Register a participant (Published or RegistrationOpen). Names are unique, case-insensitive.
    pub fn register_participant(
        &mut self,
        name: impl Into<String>,
        requested_seed: Option<u32>,
    ) -> TournamentResult<ParticipantId> {
        if !matches!(
            self.status,
            TournamentStatus::Published | TournamentStatus::RegistrationOpen
        ) {
            return Err(TournamentError::RegistrationClosed);
        }
        let name = name.into();
        let name = name.trim();
        if name.is_empty() {
            return Err(TournamentError::InvalidState(
                "participant name must not be empty".to_string(),
            ));
        }
        if let Some(limit) = self.registration_limit {
            let registered = self
                .participants
                .iter()
                .filter(|p| p.status.is_eligible())
                .count();
            if registered >= limit {
                return Err(TournamentError::RegistrationFull { limit });
            }
        }
        if self
            .participants
            .iter()
            .any(|p| p.name.eq_ignore_ascii_case(name))
        {
            return Err(TournamentError::DuplicateParticipantName);
        }
        let participant = Participant::new(name, requested_seed);
        let id = participant.id;
        self.participants.push(participant);
        Ok(id)
    }

    /// Registered -> CheckedIn (before the bracket is built).
    pub fn check_in(&mut self, participant_id: ParticipantId) -> TournamentResult<()> {
        if self.layout.is_some() || self.status.is_finished() {
            return Err(TournamentError::InvalidState(
                "check-in closes when the bracket is built".to_string(),
            ));
        }
        let p = self.participant_mut(participant_id)?;
        if p.status != ParticipantStatus::Registered {
            return Err(TournamentError::InvalidState(format!(
                "cannot check in a participant with status {:?}",
                p.status
            )));
        }
        p.status = ParticipantStatus::CheckedIn;
        Ok(())
    }

    pub fn participant(&self, id: ParticipantId) -> TournamentResult<&Participant> {
        self.participants
            .iter()
            .find(|p| p.id == id)
            .ok_or(TournamentError::ParticipantNotFound(id))
    }

    pub fn participant_mut(&mut self, id: ParticipantId) -> TournamentResult<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(TournamentError::ParticipantNotFound(id))
    }

    /// Bracket seed of a participant (None if unknown or not seeded).
    pub fn seed_of(&self, id: ParticipantId) -> Option<u32> {
        self.participants
            .iter()
            .find(|p| p.id == id)
            .and_then(|p| p.seed)
    }

    /// Arena position of the match with this key.
    pub fn match_index(&self, key: MatchKey) -> Option<usize> {
        self.matches.iter().position(|m| m.key == key)
    }

    /// Arena position of the match with this id.
    pub fn match_position(&self, id: MatchId) -> TournamentResult<usize> {
        self.matches
            .iter()
            .position(|m| m.id == id)
            .ok_or(TournamentError::MatchNotFound(id))
    }

    pub fn get_match(&self, id: MatchId) -> TournamentResult<&GameMatch> {
        self.match_position(id).map(|idx| &self.matches[idx])
    }

    pub fn match_by_key(&self, key: MatchKey) -> Option<&GameMatch> {
        self.match_index(key).map(|idx| &self.matches[idx])
    }

    /// Participants placed in the bracket, ordered by seed.
    pub fn seeded_participants(&self) -> Vec<&Participant> {
        let mut seeded: Vec<_> = self.participants.iter().filter(|p| p.in_bracket()).collect();
        seeded.sort_by_key(|p| p.seed_key());
        seeded
    }

    pub fn layout(&self) -> TournamentResult<BracketLayout> {
        self.layout.ok_or_else(|| {
            TournamentError::InvalidState("bracket has not been built".to_string())
        })
    }
}
