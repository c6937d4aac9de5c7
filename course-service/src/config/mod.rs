use serde::Deserialize;
use service_core::config::{self as core_config, get_env, is_production, parse_env};
use service_core::error::AppError;

const DEFAULT_STORE_TIMEOUT_SECS: &str = "10";
const DEFAULT_GENERATION_TIMEOUT_SECS: &str = "30";

#[derive(Debug, Clone, Deserialize)]
pub struct CourseConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub supabase: SupabaseConfig,
    pub openai: OpenAiConfig,
    pub search: SearchConfig,
    pub recommend: RecommendConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    pub api_key: String,
    pub table: String,
    /// Comma-separated column list for title search.
    pub select: String,
    /// Postgres function used for vector search.
    pub match_function: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub temperature: f32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub mode: SearchMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendConfig {
    /// Upper bound for `top_k` when the caller leaves it out.
    pub max_top_k: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// `*` allows any origin.
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Case-insensitive substring match on the title column.
    Title,
    /// Embed the query and rank by vector distance in the store.
    Semantic,
}

impl std::str::FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "title" => Ok(SearchMode::Title),
            "semantic" => Ok(SearchMode::Semantic),
            _ => Err(format!("Invalid search mode: {}", s)),
        }
    }
}

impl CourseConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;
        let is_prod = is_production();

        let supabase_key = match get_env("SUPABASE_ANON_KEY", None, is_prod) {
            Ok(key) => key,
            Err(_) => get_env("SUPABASE_SERVICE_ROLE_KEY", None, is_prod)?,
        };

        let mode = get_env("SEARCH_MODE", Some("title"), is_prod)?;

        Ok(CourseConfig {
            common: common_config,
            supabase: SupabaseConfig {
                url: get_env("SUPABASE_URL", None, is_prod)?
                    .trim_end_matches('/')
                    .to_string(),
                api_key: supabase_key,
                table: get_env("COURSES_TABLE", Some("courses"), is_prod)?,
                select: get_env(
                    "COURSES_SELECT",
                    Some("course_id,title,instructor,credits"),
                    is_prod,
                )?,
                match_function: get_env("SUPABASE_MATCH_FUNCTION", Some("match_courses"), is_prod)?,
                timeout_secs: parse_env(
                    "SUPABASE_TIMEOUT_SECS",
                    &get_env(
                        "SUPABASE_TIMEOUT_SECS",
                        Some(DEFAULT_STORE_TIMEOUT_SECS),
                        is_prod,
                    )?,
                )?,
            },
            openai: OpenAiConfig {
                api_key: get_env("OPENAI_API_KEY", None, is_prod)?,
                base_url: get_env("OPENAI_BASE_URL", Some("https://api.openai.com/v1"), is_prod)?
                    .trim_end_matches('/')
                    .to_string(),
                chat_model: get_env("OPENAI_CHAT_MODEL", Some("gpt-4o-mini"), is_prod)?,
                embedding_model: get_env(
                    "OPENAI_EMBEDDING_MODEL",
                    Some("text-embedding-3-small"),
                    is_prod,
                )?,
                embedding_dim: parse_env(
                    "OPENAI_EMBEDDING_DIM",
                    &get_env("OPENAI_EMBEDDING_DIM", Some("1536"), is_prod)?,
                )?,
                temperature: parse_env(
                    "OPENAI_TEMPERATURE",
                    &get_env("OPENAI_TEMPERATURE", Some("0.2"), is_prod)?,
                )?,
                timeout_secs: parse_env(
                    "OPENAI_TIMEOUT_SECS",
                    &get_env(
                        "OPENAI_TIMEOUT_SECS",
                        Some(DEFAULT_GENERATION_TIMEOUT_SECS),
                        is_prod,
                    )?,
                )?,
            },
            search: SearchConfig {
                mode: mode
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
            },
            recommend: RecommendConfig {
                max_top_k: parse_env(
                    "RECOMMEND_MAX_TOP_K",
                    &get_env("RECOMMEND_MAX_TOP_K", Some("10"), is_prod)?,
                )?,
            },
            cors: CorsConfig {
                allowed_origins: parse_origins(&get_env(
                    "CORS_ALLOWED_ORIGINS",
                    Some("*"),
                    is_prod,
                )?),
            },
        })
        .and_then(CourseConfig::validated)
    }

    /// Reject settings that would make a bounded call unbounded or an
    /// endpoint unusable.
    pub fn validated(self) -> Result<Self, AppError> {
        if self.supabase.timeout_secs == 0 || self.openai.timeout_secs == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Outbound timeouts must be at least one second"
            )));
        }
        if self.recommend.max_top_k == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "RECOMMEND_MAX_TOP_K must be positive"
            )));
        }
        if self.openai.embedding_dim == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "OPENAI_EMBEDDING_DIM must be positive"
            )));
        }
        Ok(self)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
