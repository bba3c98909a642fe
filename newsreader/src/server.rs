use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::Utc;
use rocket::figment::Figment;
use rocket::fs::NamedFile;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{catch, catchers, get, post, routes, Build, Request, Rocket, State};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use common::Config;

use crate::extraction::{ExtractionRules, Extractor};
use crate::fetching::{self, ArticleFetcher};
use crate::llm::{LlmProvider, LlmRequest};
use crate::prompts::{PromptBuilder, DEFAULT_HISTORY_WINDOW};
use crate::sessions::{ConversationTurn, InMemorySessionStore, SessionStore, SessionSummary};

/// Where `index.html` is looked up when `[server] static_dir` is unset.
pub const DEFAULT_STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

const LLM_CHECK_PROMPT: &str =
    "Hello! Please respond with 'Gemini API is working correctly' if you can see this message.";

/// Application state stored inside Rocket managed state.
pub struct AppState {
    pub fetcher: Arc<ArticleFetcher>,
    pub llm: Arc<dyn LlmProvider>,
    pub sessions: Arc<dyn SessionStore>,
    pub prompts: PromptBuilder,
    pub static_dir: PathBuf,
}

impl AppState {
    /// Wire the fetcher, prompt builder and an empty in-memory session store
    /// from configuration around an already constructed LLM provider.
    pub fn new(config: &Config, llm: Arc<dyn LlmProvider>) -> Result<Self> {
        let rules = ExtractionRules::from_config(config.extraction.as_ref());
        let extractor = Extractor::new(&rules)?;

        let fetch = config.fetch.clone().unwrap_or_default();
        let fetcher = ArticleFetcher::new(
            extractor,
            fetch.timeout_seconds.unwrap_or(fetching::DEFAULT_TIMEOUT_SECS),
            fetch.user_agent.as_deref().unwrap_or(fetching::DEFAULT_USER_AGENT),
        )?;

        let history = config
            .chat
            .as_ref()
            .and_then(|c| c.history_turns)
            .unwrap_or(DEFAULT_HISTORY_WINDOW);

        let static_dir = config
            .server
            .as_ref()
            .and_then(|s| s.static_dir.clone())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));

        Ok(Self {
            fetcher: Arc::new(fetcher),
            llm,
            sessions: Arc::new(InMemorySessionStore::new()),
            prompts: PromptBuilder::new(history),
            static_dir,
        })
    }

    pub fn with_sessions(mut self, sessions: Arc<dyn SessionStore>) -> Self {
        self.sessions = sessions;
        self
    }
}

/// JSON body of every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

type ApiError = (Status, Json<ErrorBody>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(status: Status, message: &str) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
}

/// Treats missing, null and blank values alike.
fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
}

#[derive(Serialize)]
struct LlmCheckResponse {
    status: &'static str,
    response: String,
    message: &'static str,
}

#[derive(Deserialize)]
struct LoadArticleRequest {
    url: Option<String>,
}

#[derive(Serialize)]
struct LoadArticleResponse {
    session_id: String,
    title: String,
    url: String,
    summary: String,
    word_count: usize,
    published_date: Option<String>,
    author: Option<String>,
}

#[derive(Deserialize)]
struct ChatRequest {
    session_id: Option<String>,
    message: Option<String>,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
    session_id: String,
}

#[derive(Serialize)]
struct ChatHistoryResponse {
    chat_history: Vec<ConversationTurn>,
    article_title: String,
}

#[derive(Serialize)]
struct SessionsResponse {
    sessions: Vec<SessionSummary>,
}

#[get("/")]
async fn index(state: &State<AppState>) -> Option<NamedFile> {
    NamedFile::open(state.static_dir.join("index.html")).await.ok()
}

#[get("/health")]
fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Round-trip a fixed prompt through the generation backend.
#[get("/test-gemini")]
async fn test_gemini(state: &State<AppState>) -> ApiResult<LlmCheckResponse> {
    match state.llm.generate(LlmRequest::new(LLM_CHECK_PROMPT)).await {
        Ok(reply) => Ok(Json(LlmCheckResponse {
            status: "success",
            response: reply.content,
            message: "Gemini API is working correctly",
        })),
        Err(e) => {
            error!("LLM API test failed: {:#}", e);
            Err(api_error(Status::InternalServerError, "Gemini API test failed"))
        }
    }
}

/// Fetch an article, summarize it and open a session for it.
#[post("/load-article", data = "<body>")]
async fn load_article(
    state: &State<AppState>,
    body: Json<LoadArticleRequest>,
) -> ApiResult<LoadArticleResponse> {
    let Some(url) = required(&body.url) else {
        return Err(api_error(Status::BadRequest, "URL is required"));
    };

    info!("Loading article from: {}", url);

    let article = state.fetcher.fetch_article(url).await.map_err(|e| {
        warn!("could not load article {}: {}", url, e);
        api_error(Status::BadRequest, "Failed to fetch article content")
    })?;

    let prompt = state.prompts.summary_prompt(&article.content);
    let summary = state
        .llm
        .generate(LlmRequest::new(prompt))
        .await
        .map_err(|e| {
            error!("Error loading article {}: {:#}", url, e);
            api_error(Status::InternalServerError, "Failed to load article")
        })?
        .content;

    let title = article.title.clone();
    let url = article.url.clone();
    let word_count = article.word_count();
    let published_date = article.published_date.clone();
    let author = article.author.clone();
    let session_id = state.sessions.create(article, summary.clone()).await;

    let response = LoadArticleResponse {
        session_id,
        title,
        url,
        summary,
        word_count,
        published_date,
        author,
    };

    info!("Article loaded successfully: {}", response.title);
    Ok(Json(response))
}

/// Answer a question about the session's article.
#[post("/chat", data = "<body>")]
async fn chat(state: &State<AppState>, body: Json<ChatRequest>) -> ApiResult<ChatResponse> {
    // The question is kept exactly as sent; only blankness is checked.
    let (Some(session_id), Some(message)) = (
        required(&body.session_id),
        body.message.as_deref().filter(|m| !m.trim().is_empty()),
    ) else {
        return Err(api_error(Status::BadRequest, "Session ID and message are required"));
    };

    let session = state
        .sessions
        .get(session_id)
        .await
        .map_err(|_| api_error(Status::BadRequest, "Invalid session ID"))?;

    info!(
        "Processing chat message: {}...",
        message.chars().take(50).collect::<String>()
    );

    // The store lock is not held while the backend is generating.
    let prompt = state
        .prompts
        .chat_prompt(&session.article.content, message, &session.turns);
    let answer = state
        .llm
        .generate(LlmRequest::new(prompt))
        .await
        .map_err(|e| {
            error!("Error in chat for {}: {:#}", session_id, e);
            api_error(Status::InternalServerError, "Failed to process message")
        })?
        .content;

    state
        .sessions
        .append_turn(session_id, message.to_string(), answer.clone())
        .await
        .map_err(|_| api_error(Status::BadRequest, "Invalid session ID"))?;

    Ok(Json(ChatResponse {
        response: answer,
        session_id: session_id.to_string(),
    }))
}

#[get("/chat-history/<session_id>")]
async fn chat_history(state: &State<AppState>, session_id: &str) -> ApiResult<ChatHistoryResponse> {
    let session = state
        .sessions
        .get(session_id)
        .await
        .map_err(|_| api_error(Status::BadRequest, "Invalid session ID"))?;

    Ok(Json(ChatHistoryResponse {
        chat_history: session.turns,
        article_title: session.article.title,
    }))
}

#[get("/sessions")]
async fn list_sessions(state: &State<AppState>) -> Json<SessionsResponse> {
    Json(SessionsResponse {
        sessions: state.sessions.list().await,
    })
}

#[catch(400)]
fn bad_request() -> Json<ErrorBody> {
    Json(ErrorBody {
        error: "Bad request".to_string(),
    })
}

#[catch(404)]
fn not_found(req: &Request<'_>) -> Json<ErrorBody> {
    Json(ErrorBody {
        error: format!("Not found: {}", req.uri()),
    })
}

#[catch(422)]
fn unprocessable() -> Json<ErrorBody> {
    Json(ErrorBody {
        error: "Invalid JSON body".to_string(),
    })
}

#[catch(500)]
fn internal_error() -> Json<ErrorBody> {
    Json(ErrorBody {
        error: "Internal server error".to_string(),
    })
}

/// Assemble the Rocket instance without launching it.
pub fn build_rocket(state: AppState, figment: Figment) -> Rocket<Build> {
    rocket::custom(figment)
        .manage(state)
        .mount(
            "/",
            routes![
                index,
                health,
                test_gemini,
                load_article,
                chat,
                chat_history,
                list_sessions,
            ],
        )
        .register("/", catchers![bad_request, not_found, unprocessable, internal_error])
}

/// Build and launch a Rocket server.
///
/// Address and port come from the `[server]` section; a `PORT` environment
/// variable overrides the configured port. Blocks until Rocket shuts down.
pub async fn launch_rocket(state: AppState, config: &Config) -> Result<()> {
    let mut fig = rocket::Config::figment();

    if let Some(server) = &config.server {
        if let Some(bind) = &server.bind {
            fig = fig.merge(("address", bind.clone()));
        }
        if let Some(port) = server.port {
            fig = fig.merge(("port", port));
        }
    }

    if let Ok(port) = std::env::var("PORT") {
        match port.parse::<u16>() {
            Ok(port) => fig = fig.merge(("port", port)),
            Err(_) => warn!("ignoring invalid PORT value '{}'", port),
        }
    }

    tracing::info!("Starting Rocket HTTP server");
    build_rocket(state, fig)
        .launch()
        .await
        .map_err(|e| anyhow!("Rocket failed: {}", e))?;

    tracing::info!("Rocket HTTP server has shut down");
    Ok(())
}
