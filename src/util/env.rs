use std::sync::LazyLock;

use thiserror::Error;
use tokio::sync::OnceCell;

pub type EnvResult<T> = core::result::Result<T, EnvErr>;

static ENV: LazyLock<OnceCell<Env>> = LazyLock::new(OnceCell::new);

/// Process-wide configuration, materialized once on first access.
///
/// Values are sourced from the environment (a `.env` file is honored in
/// development via [`dotenvy`]). Every field carries a default so a bare
/// environment still boots; an unset or placeholder `OPENAI_API_KEY`
/// disables the AI collaborator rather than failing startup.
#[derive(Debug, Clone)]
pub struct Env {
    pub server_api_port: u16,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub ai_timeout_ms: u64,
}

impl Env {
    pub async fn get() -> EnvResult<&'static Env> {
        ENV.get_or_try_init(|| async { Env::load() }).await
    }

    fn load() -> EnvResult<Self> {
        dotenvy::dotenv().ok();

        let server_api_port = opt("SERVER_API_PORT")
            .unwrap_or_else(|| String::from("5001"))
            .parse::<u16>()
            .map_err(|_| EnvErr::Invalid("SERVER_API_PORT"))?;

        // "default_key" is the placeholder the deployment templates ship
        // with; treat it the same as unset
        let openai_api_key = opt("OPENAI_API_KEY").filter(|k| !k.is_empty() && k != "default_key");

        let openai_base_url = opt("OPENAI_BASE_URL")
            .unwrap_or_else(|| String::from("https://api.openai.com"))
            .trim_end_matches('/')
            .to_string();

        let openai_model = opt("OPENAI_MODEL").unwrap_or_else(|| String::from("gpt-5"));

        let ai_timeout_ms = opt("AI_TIMEOUT_MS")
            .unwrap_or_else(|| String::from("8000"))
            .parse::<u64>()
            .map_err(|_| EnvErr::Invalid("AI_TIMEOUT_MS"))?;

        Ok(Self {
            server_api_port,
            openai_api_key,
            openai_base_url,
            openai_model,
            ai_timeout_ms,
        })
    }
}

fn opt(name: &'static str) -> Option<String> {
    std::env::var(name).ok()
}

#[derive(Debug, Error)]
pub enum EnvErr {
    #[error("missing environment variable '{0}'")]
    Missing(&'static str),

    #[error("invalid value for environment variable '{0}'")]
    Invalid(&'static str),
}
