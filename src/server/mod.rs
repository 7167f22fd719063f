//! Development server with live reload

use anyhow::Result;
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{Request, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode};
use percent_encoding::percent_decode_str;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;

use crate::commands::build;
use crate::{Site, CONFIG_FILE};

/// Live reload script injected into HTML pages
const LIVE_RELOAD_SCRIPT: &str = r#"
<script>
(function() {
    var ws = new WebSocket('ws://' + location.host + '/__livereload');
    ws.onmessage = function(msg) {
        if (msg.data === 'reload') {
            location.reload();
        }
    };
    ws.onclose = function() {
        console.log('Live reload disconnected. Attempting to reconnect...');
        setTimeout(function() { location.reload(); }, 1000);
    };
})();
</script>
</body>
"#;

/// Server state
struct ServerState {
    output_dir: PathBuf,
    baseurl: String,
    reload_tx: broadcast::Sender<()>,
    live_reload: bool,
}

/// Start the development server
pub async fn start(site: &Site, ip: &str, port: u16, watch: bool, open: bool) -> Result<()> {
    // Create broadcast channel for live reload notifications
    let (reload_tx, _) = broadcast::channel::<()>(16);

    let state = Arc::new(ServerState {
        output_dir: site.output_dir.clone(),
        baseurl: site.config.baseurl.trim_end_matches('/').to_string(),
        reload_tx: reload_tx.clone(),
        live_reload: watch,
    });

    // Create router with live reload endpoint
    let app = Router::new()
        .route("/__livereload", get(livereload_handler))
        .fallback(fallback_handler)
        .with_state(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!(
        "http://{}:{}{}/",
        ip,
        port,
        site.config.baseurl.trim_end_matches('/')
    );
    println!("Server running at {}", url);
    if watch {
        println!("Live reload enabled. Watching for changes...");
    }
    println!("Press Ctrl+C to stop.");

    // Open browser if requested
    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    // Start file watcher if watch mode is enabled
    if watch {
        let site = site.clone();

        tokio::task::spawn_blocking(move || {
            if let Err(e) = watch_and_reload(site, reload_tx) {
                tracing::error!("File watcher error: {}", e);
            }
        });
    }

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Watch for file changes and trigger reload
fn watch_and_reload(site: Site, reload_tx: broadcast::Sender<()>) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();

    // Create debouncer to avoid multiple rapid rebuilds
    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;

    if site.source_dir.exists() {
        debouncer
            .watcher()
            .watch(&site.source_dir, RecursiveMode::Recursive)?;
        tracing::debug!("Watching: {:?}", site.source_dir);
    }

    let config_path = site.base_dir.join(CONFIG_FILE);

    // Watch config file
    if config_path.exists() {
        debouncer
            .watcher()
            .watch(&config_path, RecursiveMode::NonRecursive)?;
        tracing::debug!("Watching: {:?}", config_path);
    }

    // Handle file change events
    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                // Filter out irrelevant events (like .git, .DS_Store, etc.)
                let relevant_events: Vec<_> = events
                    .iter()
                    .filter(|e| {
                        let path_str = e.path.to_string_lossy();
                        !e.path.starts_with(&site.output_dir)
                            && !path_str.contains(".git")
                            && !path_str.contains(".DS_Store")
                            && !path_str.contains("node_modules")
                            && !path_str.ends_with('~')
                    })
                    .collect();

                if relevant_events.is_empty() {
                    continue;
                }

                // Log changed files
                println!();
                for event in &relevant_events {
                    println!("📝 File changed: {}", event.path.display());
                }

                // Regenerate site
                println!("\n🔄 Regenerating...");
                match build::rebuild(&site) {
                    Ok(report) => {
                        if report.is_success() {
                            println!("✅ Regenerated successfully!");
                        } else {
                            println!("⚠️  {} documents failed to render", report.failures.len());
                        }
                        // Notify all connected clients to reload
                        let _ = reload_tx.send(());
                    }
                    Err(e) => {
                        println!("❌ Generation failed: {}", e);
                    }
                }
            }
            Ok(Err(e)) => {
                tracing::error!("Watch error: {:?}", e);
            }
            Err(e) => {
                tracing::error!("Channel error: {:?}", e);
                break;
            }
        }
    }

    Ok(())
}

/// WebSocket handler for live reload
async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    let reload_rx = state.reload_tx.subscribe();
    ws.on_upgrade(move |socket| handle_livereload_socket(socket, reload_rx))
}

/// Handle WebSocket connection for live reload
async fn handle_livereload_socket(mut socket: WebSocket, mut reload_rx: broadcast::Receiver<()>) {
    tracing::debug!("Live reload client connected");

    loop {
        tokio::select! {
            // Wait for reload signal
            result = reload_rx.recv() => {
                match result {
                    Ok(_) => {
                        if socket.send(Message::Text("reload".to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
            // Handle incoming messages (ping/pong)
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    tracing::debug!("Live reload client disconnected");
}

/// Fallback handler that serves files and injects live reload script
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    request: Request<Body>,
) -> Response {
    let path = request.uri().path();

    let file_path = resolve_file(&state.output_dir, &state.baseurl, path);

    // Check if it's an HTML file that needs live reload injection
    let is_html = file_path
        .extension()
        .map(|ext| ext == "html" || ext == "htm")
        .unwrap_or(false)
        || file_path.ends_with("index.html");

    if is_html && state.live_reload {
        // Read and inject live reload script
        match tokio::fs::read_to_string(&file_path).await {
            Ok(content) => {
                let injected = inject_live_reload(&content);
                Html(injected).into_response()
            }
            Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        }
    } else {
        // Serve static file using tower-http
        let mut request = request;
        let stripped = strip_baseurl(request.uri().path(), &state.baseurl).to_string();
        if let Ok(uri) = stripped.parse::<Uri>() {
            *request.uri_mut() = uri;
        }

        let mut service = ServeDir::new(&state.output_dir).append_index_html_on_directories(true);
        match service.try_call(request).await {
            Ok(response) => response.into_response(),
            Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
        }
    }
}

/// Map a request path to a file in the output directory
fn resolve_file(output_dir: &Path, baseurl: &str, path: &str) -> PathBuf {
    let path = percent_decode_str(path).decode_utf8_lossy();
    let path = strip_baseurl(&path, baseurl);

    // Never leave the output directory
    let clean_path: PathBuf = path
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .collect();

    let candidate = output_dir.join(&clean_path);
    if candidate.is_dir() {
        candidate.join("index.html")
    } else if candidate.exists() {
        candidate
    } else {
        // Try adding .html extension
        let with_html = candidate.with_extension("html");
        if with_html.exists() {
            with_html
        } else {
            candidate
        }
    }
}

/// Remove the baseurl prefix from a request path, if present
fn strip_baseurl<'a>(path: &'a str, baseurl: &str) -> &'a str {
    match path.strip_prefix(baseurl) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    }
}

/// Inject live reload script into HTML content
fn inject_live_reload(html: &str) -> String {
    if html.contains("</body>") {
        html.replace("</body>", LIVE_RELOAD_SCRIPT)
    } else {
        // If no </body> tag, append to end
        format!("{}{}", html, LIVE_RELOAD_SCRIPT)
    }
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_resolve_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path();
        fs::create_dir_all(out.join("posts/my post")).unwrap();
        fs::write(out.join("index.html"), "").unwrap();
        fs::write(out.join("posts/my post/index.html"), "").unwrap();
        fs::write(out.join("about.html"), "").unwrap();

        assert_eq!(resolve_file(out, "", "/"), out.join("index.html"));
        assert_eq!(
            resolve_file(out, "/blog", "/blog/posts/my%20post/"),
            out.join("posts/my post/index.html")
        );
        assert_eq!(resolve_file(out, "", "/about"), out.join("about.html"));
        assert_eq!(resolve_file(out, "", "/../secret"), out.join("secret"));
    }

    #[test]
    fn test_strip_baseurl() {
        assert_eq!(strip_baseurl("/blog/a.css", "/blog"), "/a.css");
        assert_eq!(strip_baseurl("/blog", "/blog"), "");
        assert_eq!(strip_baseurl("/blogger/a.css", "/blog"), "/blogger/a.css");
        assert_eq!(strip_baseurl("/a.css", ""), "/a.css");
    }

    #[test]
    fn test_inject_live_reload() {
        let html = inject_live_reload("<html><body><p>x</p></body></html>");
        assert!(html.contains("__livereload"));
        assert!(html.ends_with("</body>\n</html>"));

        let bare = inject_live_reload("<p>x</p>");
        assert!(bare.starts_with("<p>x</p>"));
        assert!(bare.contains("__livereload"));
    }
}
