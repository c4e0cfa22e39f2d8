//! HTTP host for the bracket engine: JSON API over an in-memory tournament registry.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default. Override with env: HOST, PORT (see `ServerConfig`).

use actix_web::{
    get, post, put,
    http::StatusCode,
    web::{Data, Json, Path},
    App, HttpResponse, HttpServer, Responder,
};
use bracket_engine::config::ServerConfig;
use bracket_engine::export::placements_csv;
use bracket_engine::{
    BracketEngine, BracketOptions, MatchId, ParticipantExit, ParticipantId, ResultReport,
    SeedingPolicy, TournamentError, TournamentFormat, TournamentId, TournamentResult,
};
use serde::{Deserialize, Serialize};

struct AppState {
    engine: BracketEngine,
    config: ServerConfig,
}

type State = Data<AppState>;

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
    tournaments: usize,
}

#[derive(Deserialize)]
struct CreateTournamentBody {
    name: String,
    #[serde(default)]
    format: TournamentFormat,
    #[serde(default)]
    registration_limit: Option<usize>,
}

#[derive(Deserialize)]
struct SetFormatBody {
    format: TournamentFormat,
}

#[derive(Deserialize)]
struct RegisterBody {
    name: String,
    #[serde(default)]
    requested_seed: Option<u32>,
}

#[derive(Deserialize)]
struct WithdrawBody {
    exit: ParticipantExit,
}

#[derive(Deserialize)]
struct BuildBracketBody {
    #[serde(default)]
    participant_ids: Vec<ParticipantId>,
    format: Option<TournamentFormat>,
    #[serde(default)]
    seeding: SeedingPolicy,
    options: Option<BracketOptions>,
}

#[derive(Serialize)]
struct RegisteredResponse {
    participant_id: ParticipantId,
}

/// Path segment: tournament id (e.g. /api/tournaments/{id})
#[derive(Deserialize)]
struct TournamentPath {
    id: TournamentId,
}

/// Path segments: tournament id and participant id
#[derive(Deserialize)]
struct TournamentParticipantPath {
    id: TournamentId,
    participant_id: ParticipantId,
}

#[derive(Deserialize)]
struct MatchPath {
    match_id: MatchId,
}

fn status_for(e: &TournamentError) -> StatusCode {
    match e {
        TournamentError::TournamentNotFound(_)
        | TournamentError::MatchNotFound(_)
        | TournamentError::ParticipantNotFound(_) => StatusCode::NOT_FOUND,
        TournamentError::AlreadyBuilt
        | TournamentError::ResultLocked
        | TournamentError::VersionConflict { .. }
        | TournamentError::MatchNotReady { .. }
        | TournamentError::InvalidTransition { .. }
        | TournamentError::InvalidState(_)
        | TournamentError::RegistrationClosed
        | TournamentError::RegistrationFull { .. }
        | TournamentError::DuplicateParticipantName
        | TournamentError::FormatLocked
        | TournamentError::NotCompleted => StatusCode::CONFLICT,
        TournamentError::InvalidParticipantCount { .. }
        | TournamentError::UnsupportedFormat(_)
        | TournamentError::DrawNotAllowed
        | TournamentError::ParticipantNotInMatch(_)
        | TournamentError::InvalidScores(_) => StatusCode::UNPROCESSABLE_ENTITY,
        TournamentError::IntegrityViolation(_)
        | TournamentError::LockPoisoned
        | TournamentError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(e: TournamentError) -> HttpResponse {
    if e.is_fatal() {
        log::error!("Request failed: {}", e);
    }
    HttpResponse::build(status_for(&e)).json(serde_json::json!({ "error": e.to_string() }))
}

fn respond<T: Serialize>(result: TournamentResult<T>) -> HttpResponse {
    match result {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(e) => error_response(e),
    }
}

#[get("/api/health")]
async fn api_health(state: State) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "bracket-engine",
        tournaments: state.engine.len(),
    })
}

/// Create a tournament in DRAFT.
#[post("/api/tournaments")]
async fn api_create_tournament(state: State, body: Json<CreateTournamentBody>) -> HttpResponse {
    let body = body.into_inner();
    respond(
        state
            .engine
            .create_tournament(body.name.trim(), body.format, body.registration_limit),
    )
}

#[get("/api/tournaments/{id}")]
async fn api_get_tournament(state: State, path: Path<TournamentPath>) -> HttpResponse {
    respond(state.engine.snapshot(path.id))
}

#[post("/api/tournaments/{id}/publish")]
async fn api_publish(state: State, path: Path<TournamentPath>) -> HttpResponse {
    respond(state.engine.publish(path.id))
}

#[post("/api/tournaments/{id}/registration/open")]
async fn api_open_registration(state: State, path: Path<TournamentPath>) -> HttpResponse {
    respond(state.engine.open_registration(path.id))
}

#[put("/api/tournaments/{id}/format")]
async fn api_set_format(
    state: State,
    path: Path<TournamentPath>,
    body: Json<SetFormatBody>,
) -> HttpResponse {
    respond(state.engine.set_format(path.id, body.format))
}

#[post("/api/tournaments/{id}/cancel")]
async fn api_cancel_tournament(state: State, path: Path<TournamentPath>) -> HttpResponse {
    respond(state.engine.cancel_tournament(path.id))
}

#[post("/api/tournaments/{id}/participants")]
async fn api_register(
    state: State,
    path: Path<TournamentPath>,
    body: Json<RegisterBody>,
) -> HttpResponse {
    respond(
        state
            .engine
            .register(path.id, &body.name, body.requested_seed)
            .map(|participant_id| RegisteredResponse { participant_id }),
    )
}

#[post("/api/tournaments/{id}/participants/{participant_id}/check-in")]
async fn api_check_in(state: State, path: Path<TournamentParticipantPath>) -> HttpResponse {
    match state.engine.check_in(path.id, path.participant_id) {
        Ok(()) => respond(state.engine.snapshot(path.id)),
        Err(e) => error_response(e),
    }
}

/// Withdraw or disqualify a participant (external moderation action).
#[post("/api/tournaments/{id}/participants/{participant_id}/withdraw")]
async fn api_withdraw(
    state: State,
    path: Path<TournamentParticipantPath>,
    body: Json<WithdrawBody>,
) -> HttpResponse {
    respond(state.engine.withdraw(path.id, path.participant_id, body.exit))
}

/// Build the bracket (one-time). Omitted options fall back to the server defaults.
#[post("/api/tournaments/{id}/bracket")]
async fn api_build_bracket(
    state: State,
    path: Path<TournamentPath>,
    body: Json<BuildBracketBody>,
) -> HttpResponse {
    let body = body.into_inner();
    let format = match body.format {
        Some(format) => format,
        None => match state.engine.snapshot(path.id) {
            Ok(t) => t.format,
            Err(e) => return error_response(e),
        },
    };
    let options = body.options.unwrap_or(state.config.default_options);
    respond(state.engine.build_bracket(
        path.id,
        &body.participant_ids,
        format,
        body.seeding,
        options,
    ))
}

#[post("/api/tournaments/{id}/advance")]
async fn api_advance(state: State, path: Path<TournamentPath>) -> HttpResponse {
    respond(state.engine.advance(path.id))
}

#[get("/api/tournaments/{id}/standings")]
async fn api_standings(state: State, path: Path<TournamentPath>) -> HttpResponse {
    respond(state.engine.get_standings(path.id))
}

#[get("/api/tournaments/{id}/placements")]
async fn api_placements(state: State, path: Path<TournamentPath>) -> HttpResponse {
    respond(state.engine.get_final_placements(path.id))
}

#[get("/api/tournaments/{id}/placements.csv")]
async fn api_placements_csv(state: State, path: Path<TournamentPath>) -> HttpResponse {
    match state
        .engine
        .get_final_placements(path.id)
        .and_then(|placements| placements_csv(&placements))
    {
        Ok(csv) => HttpResponse::Ok()
            .content_type("text/csv; charset=utf-8")
            .body(csv),
        Err(e) => error_response(e),
    }
}

#[get("/api/matches/{match_id}")]
async fn api_get_match(state: State, path: Path<MatchPath>) -> HttpResponse {
    respond(state.engine.get_match(path.match_id))
}

/// Report a (partial) result. Send `expected_version` to guard against concurrent reports.
#[post("/api/matches/{match_id}/result")]
async fn api_report_result(
    state: State,
    path: Path<MatchPath>,
    body: Json<ResultReport>,
) -> HttpResponse {
    respond(state.engine.report_result(path.match_id, &body))
}

#[post("/api/matches/{match_id}/start")]
async fn api_start_match(state: State, path: Path<MatchPath>) -> HttpResponse {
    respond(state.engine.start_match(path.match_id))
}

#[post("/api/matches/{match_id}/cancel")]
async fn api_cancel_match(state: State, path: Path<MatchPath>) -> HttpResponse {
    respond(state.engine.cancel_match(path.match_id))
}

#[post("/api/matches/{match_id}/void")]
async fn api_void_match(state: State, path: Path<MatchPath>) -> HttpResponse {
    respond(state.engine.void_match(path.match_id))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = ServerConfig::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
    let bind = (config.host.clone(), config.port);
    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    let state = Data::new(AppState {
        engine: BracketEngine::new(),
        config,
    });

    // Background task: periodically archive tournaments that finished before the retention window
    let state_archive = state.clone();
    actix_web::rt::spawn(async move {
        let mut interval =
            actix_web::rt::time::interval(state_archive.config.archive_sweep_interval());
        loop {
            interval.tick().await;
            let cutoff = state_archive.config.archive_cutoff(chrono::Utc::now());
            if let Err(e) = state_archive.engine.archive_finished(cutoff) {
                log::error!("Archive sweep failed: {}", e);
            }
        }
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(api_health)
            .service(api_create_tournament)
            .service(api_get_tournament)
            .service(api_publish)
            .service(api_open_registration)
            .service(api_set_format)
            .service(api_cancel_tournament)
            .service(api_register)
            .service(api_check_in)
            .service(api_withdraw)
            .service(api_build_bracket)
            .service(api_advance)
            .service(api_standings)
            .service(api_placements)
            .service(api_placements_csv)
            .service(api_get_match)
            .service(api_report_result)
            .service(api_start_match)
            .service(api_cancel_match)
            .service(api_void_match)
    })
    .bind(bind)?
    .run()
    .await
}
