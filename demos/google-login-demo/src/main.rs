use anyhow::{Context, Result};
use axum::{Router, response::Html, routing::get};
use google_oauth_provider::{GoogleOAuthProvider, HostApp, OAuthConfig};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Configuration for the Google sign-in demo
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_scope: Vec<String>,
    pub redirect_uri: Option<String>,
    pub server_host: String,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            google_client_id: std::env::var("GOOGLE_CLIENT_ID")
                .context("GOOGLE_CLIENT_ID environment variable is required")?,
            google_client_secret: std::env::var("GOOGLE_CLIENT_SECRET")
                .context("GOOGLE_CLIENT_SECRET environment variable is required")?,
            google_scope: parse_scope(
                &std::env::var("GOOGLE_SCOPE").unwrap_or_else(|_| "profile,email".to_string()),
            ),
            redirect_uri: std::env::var("REDIRECT_URI").ok(),
            server_host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: std::env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
        })
    }

    pub fn oauth_config(&self) -> OAuthConfig {
        OAuthConfig::new(
            self.google_client_id.clone(),
            self.google_client_secret.clone(),
            self.google_scope.clone(),
        )
    }
}

/// Comma separated scopes, blanks dropped
fn parse_scope(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|scope| !scope.is_empty())
        .map(String::from)
        .collect()
}

async fn index_handler() -> Html<&'static str> {
    Html(
        r#"
<!DOCTYPE html>
<html>
<head><title>Google Sign-In</title></head>
<body>
    <h1>Google Sign-In Demo</h1>
    <a href="/login/google">Sign in with Google</a>
</body>
</html>
    "#,
    )
}

/// Host router with Google sign-in registered under `/login`
fn build_app(config: &AppConfig) -> Result<Router> {
    let mut host = HostApp::with_router(Router::new().route("/", get(index_handler)));

    GoogleOAuthProvider::with_config(&mut host, &config.oauth_config(), |blueprint_config| {
        match &config.redirect_uri {
            Some(redirect_uri) => blueprint_config.with_redirect_uri(redirect_uri.clone()),
            None => blueprint_config,
        }
    })
    .context("Failed to set up Google sign-in")?;

    Ok(host.into_router().layer(TraceLayer::new_for_http()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let config = AppConfig::from_env()?;
    let app = build_app(&config)?;

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Google sign-in demo listening on http://{}", addr);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;

    fn config() -> AppConfig {
        AppConfig {
            google_client_id: "client-id".to_string(),
            google_client_secret: "client-secret".to_string(),
            google_scope: vec!["profile".to_string(), "email".to_string()],
            redirect_uri: Some("http://localhost:3000/login/google/authorized".to_string()),
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
        }
    }

    #[test]
    fn test_parse_scope() {
        assert_eq!(parse_scope("profile, email,,openid "), vec!["profile", "email", "openid"]);
        assert!(parse_scope("").is_empty());
    }

    #[tokio::test]
    async fn test_login_redirects_to_google() {
        let server = TestServer::new(build_app(&config()).unwrap()).unwrap();

        let index = server.get("/").await;
        assert_eq!(index.status_code(), StatusCode::OK);

        let login = server.get("/login/google").await;
        assert_eq!(login.status_code(), StatusCode::SEE_OTHER);
        let location = login.header("location");
        let location = location.to_str().unwrap();
        assert!(location.starts_with("https://accounts.google.com/o/oauth2/auth?"));
        assert!(location.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Flogin%2Fgoogle%2Fauthorized"
        ));
    }

    #[tokio::test]
    async fn test_redirect_uri_derived_without_override() {
        let config = AppConfig {
            redirect_uri: None,
            ..config()
        };
        let server = TestServer::new(build_app(&config).unwrap()).unwrap();

        let login = server.get("/login/google").await;
        assert_eq!(login.status_code(), StatusCode::SEE_OTHER);
        let location = login.header("location");
        let location = location.to_str().unwrap();
        assert!(location.contains("redirect_uri=http%3A%2F%2Flocalhost"));
        assert!(location.contains("%2Flogin%2Fgoogle%2Fauthorized"));
    }
}
