/**
 * Driving quiz sessions with JSON requests, one per line.
 *
 * A `SessionService` owns any number of independent sessions for one owner, keyed by
 * an id handed out by `start_session`. Results are written to the injected store after
 * every scored guess. A failed write is reported back as a warning and the session
 * carries on as if it had succeeded.
 */
use std::collections::HashMap;
use std::io::{BufRead, Write};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::common::{QuizError, Result};
use super::config::EngineConfig;
use super::persistence::{OutcomeRecord, OutcomeSink, VocabularySource};
use super::retry::RetryPolicy;
use super::session::{
    Guess, GuessResult, Presentation, RecordedOutcome, Session, SessionSummary, Snapshot,
};
use super::vocab::VocabularyItem;


pub type SessionId = u64;


#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    /// Start a session over `words`, or over the owner's stored words if not given.
    StartSession {
        #[serde(default)]
        words: Option<Vec<VocabularyItem>>,
        #[serde(default)]
        config: Option<EngineConfig>,
    },
    CurrentPresentation { session: SessionId },
    Flip { session: SessionId },
    SubmitGuess {
        session: SessionId,
        #[serde(default)]
        korean_guess: Option<String>,
        #[serde(default)]
        english_guess: Option<String>,
        #[serde(default)]
        was_flipped: bool,
    },
    Advance { session: SessionId },
    ForceGraduate { session: SessionId, korean: String },
    RemoveFromSession { session: SessionId, korean: String },
    /// Throw away the session's progress and start over from its word list.
    RestartSession { session: SessionId },
    /// Applies to the store and to every running session.
    UpdateWord { old_korean: String, word: VocabularyItem },
    Snapshot { session: SessionId },
    EndSession { session: SessionId },
}


#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Payload {
    Started {
        session: SessionId,
        presentation: Option<Presentation>,
        is_session_complete: bool,
    },
    Presentation {
        presentation: Option<Presentation>,
        is_session_complete: bool,
    },
    Flipped { answer: VocabularyItem },
    Guess(GuessResult),
    Snapshot(Snapshot),
    Summary(SessionSummary),
    Updated { updated: bool },
}


#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Payload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}


impl Response {
    fn success(result: Option<Payload>, warnings: Vec<String>) -> Self {
        Response { ok: true, result, error: None, warnings }
    }

    fn failure(error: &QuizError, warnings: Vec<String>) -> Self {
        Response { ok: false, result: None, error: Some(error.to_string()), warnings }
    }
}


pub fn parse_request(line: &str) -> Result<Request> {
    serde_json::from_str(line).map_err(|e| QuizError::InvalidRequest(e.to_string()))
}


pub struct SessionService<S> {
    store: S,
    owner: String,
    config: EngineConfig,
    retry: RetryPolicy,
    sessions: HashMap<SessionId, Session>,
    next_id: SessionId,
    rng: StdRng,
}


impl<S: VocabularySource + OutcomeSink> SessionService<S> {
    pub fn new(store: S, owner: &str, config: EngineConfig) -> Self {
        SessionService {
            store,
            owner: String::from(owner),
            config,
            retry: RetryPolicy::default(),
            sessions: HashMap::new(),
            next_id: 1,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Seed the generator that seeds each session, for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn handle_line(&mut self, line: &str) -> Response {
        match parse_request(line) {
            Ok(request) => self.handle(request),
            Err(e) => {
                tracing::warn!(error = %e, "rejecting request");
                Response::failure(&e, Vec::new())
            }
        }
    }

    /// Answer a request. Requests the engine turns down leave everything as it was and
    /// come back as a successful response with a warning.
    pub fn handle(&mut self, request: Request) -> Response {
        let mut warnings = Vec::new();
        match self.dispatch(request, &mut warnings) {
            Ok(result) => Response::success(Some(result), warnings),
            Err(QuizError::Engine(e)) => {
                warnings.push(e.to_string());
                Response::success(None, warnings)
            }
            Err(e) => Response::failure(&e, warnings),
        }
    }

    /// Read requests from `input` until it runs out, writing one response per line to
    /// `output`. Blank lines are skipped.
    pub fn serve<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> Result<()> {
        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let response = self.handle_line(&line);
            writeln!(output, "{}", serde_json::to_string(&response)?)?;
            output.flush()?;
        }
        Ok(())
    }

    fn dispatch(&mut self, request: Request, warnings: &mut Vec<String>) -> Result<Payload> {
        match request {
            Request::StartSession { words, config } => {
                let words = match words {
                    Some(words) => words,
                    None => self.store.load_vocabulary(&self.owner)?,
                };
                let config = config.unwrap_or_else(|| self.config.clone());
                let rng = StdRng::seed_from_u64(self.rng.gen());
                let session = Session::start_with_rng(words, &config, rng);

                let id = self.next_id;
                self.next_id += 1;
                let payload = Payload::Started {
                    session: id,
                    presentation: session.current_presentation(),
                    is_session_complete: session.is_complete(),
                };
                tracing::info!(session = id, owner = %self.owner, "started session");
                self.sessions.insert(id, session);
                Ok(payload)
            }
            Request::CurrentPresentation { session } => {
                Ok(presentation_of(self.session(session)?))
            }
            Request::Flip { session } => {
                let answer = self.session(session)?.flip()?.clone();
                Ok(Payload::Flipped { answer })
            }
            Request::SubmitGuess { session, korean_guess, english_guess, was_flipped } => {
                let guess = Guess { korean_guess, english_guess, was_flipped };
                let result = self.session(session)?.submit_guess(&guess)?;
                if let Some(outcome) = &result.recorded {
                    self.persist(outcome, warnings);
                }
                Ok(Payload::Guess(result))
            }
            Request::Advance { session } => {
                let session = self.session(session)?;
                session.advance()?;
                Ok(presentation_of(session))
            }
            Request::ForceGraduate { session, korean } => {
                let session = self.session(session)?;
                session.force_graduate(&korean)?;
                Ok(presentation_of(session))
            }
            Request::RemoveFromSession { session, korean } => {
                let session = self.session(session)?;
                session.remove_from_session(&korean)?;
                Ok(presentation_of(session))
            }
            Request::RestartSession { session: id } => {
                let session = self.session(id)?;
                session.restart();
                tracing::info!(session = id, "restarted session");
                Ok(presentation_of(session))
            }
            Request::UpdateWord { old_korean, word } => {
                let updated = self.store.update_word(&self.owner, &old_korean, &word)?;
                for (id, session) in self.sessions.iter_mut() {
                    if let Err(e) = session.update_word(&old_korean, word.clone()) {
                        tracing::debug!(session = id, error = %e, "word not updated in session");
                    }
                }
                Ok(Payload::Updated { updated })
            }
            Request::Snapshot { session } => Ok(Payload::Snapshot(self.session(session)?.snapshot())),
            Request::EndSession { session } => {
                let ended = self.sessions.remove(&session).ok_or(QuizError::UnknownSession(session))?;
                tracing::info!(session, "ended session");
                Ok(Payload::Summary(ended.summary()))
            }
        }
    }

    fn session(&mut self, id: SessionId) -> Result<&mut Session> {
        self.sessions.get_mut(&id).ok_or(QuizError::UnknownSession(id))
    }

    fn persist(&self, outcome: &RecordedOutcome, warnings: &mut Vec<String>) {
        let record = OutcomeRecord::from(outcome);
        let result = self.retry.run("persist outcome", || {
            self.store.persist_outcome(&self.owner, &outcome.korean, &record)
        });
        if let Err(e) = result {
            tracing::warn!(korean = %outcome.korean, error = %e, "could not save result");
            warnings.push(format!("could not save result for '{}': {}", outcome.korean, e));
        }
    }
}


fn presentation_of(session: &Session) -> Payload {
    Payload::Presentation {
        presentation: session.current_presentation(),
        is_session_complete: session.is_complete(),
    }
}
