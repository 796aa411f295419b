use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::CollectError;
use crate::html;
use crate::monitor::ArbitrageMonitor;

/// 路由共享的状态
pub struct AppState {
    pub monitor: ArbitrageMonitor,
}

/// 页面生成失败时返回给客户端的错误，不暴露细节
#[derive(Debug)]
pub struct AppError(CollectError);

impl From<CollectError> for AppError {
    fn from(e: CollectError) -> Self {
        AppError(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("生成价格页面失败: {}", self.0);
        plain_text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
    }
}

fn plain_text(status: StatusCode, body: &'static str) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

/// 只有 GET / 会触发采集，其余路径和方法一律 404
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index).fallback(not_found))
        .fallback(not_found)
        .with_state(state)
}

async fn index(
    method: Method,
    uri: Uri,
    State(state): State<Arc<AppState>>,
) -> Result<Response, AppError> {
    // get() 同时接收 HEAD
    if method != Method::GET {
        return Ok(not_found(uri).await);
    }

    info!("GET / - 开始生成价格页面");
    let snapshot = state.monitor.scan().await?;
    Ok(Html(html::render(&snapshot, state.monitor.columns())).into_response())
}

async fn not_found(uri: Uri) -> Response {
    info!("{} - 404", uri.path());
    plain_text(StatusCode::NOT_FOUND, "Page Not Found")
}

/// 监听指定地址，直到收到 Ctrl+C
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("无法监听 {}", addr))?;
    info!("Server is running on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP 服务异常退出")?;

    info!("HTTP 服务已停止");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("无法监听 Ctrl+C 信号: {}", e);
        std::future::pending::<()>().await;
    }
    info!("收到退出信号，正在停止服务...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ExchangeConfig, FailurePolicy};
    use crate::exchanges::{GatewayRegistry, StaticGateway};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    struct Fixture {
        app: Router,
        binance: Arc<StaticGateway>,
    }

    fn fixture(policy: FailurePolicy, kraken_down: bool) -> Fixture {
        let binance = Arc::new(
            StaticGateway::new("binance")
                .with_display_name("Binance")
                .with_price("BTC/USDT", "50000"),
        );
        let mut kraken = StaticGateway::new("kraken")
            .with_display_name("Kraken")
            .with_price("BTC/USDT", "50500");
        if kraken_down {
            kraken = kraken.failing_markets();
        }

        let mut registry = GatewayRegistry::new();
        registry.register(binance.clone());
        registry.register(Arc::new(kraken));

        let mut config = Config {
            exchanges: vec![ExchangeConfig::new("binance"), ExchangeConfig::new("kraken")],
            pairs: vec!["BTC/USDT".to_string()],
            ..Config::default()
        };
        config.collector.failure_policy = policy;

        let monitor = ArbitrageMonitor::from_registry(&config, registry);
        let app = router(Arc::new(AppState { monitor }));
        Fixture { app, binance }
    }

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_index_renders_html() {
        let fixture = fixture(FailurePolicy::Isolate, false);
        let response = fixture.app.oneshot(request(Method::GET, "/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/html"));

        let body = body_text(response).await;
        assert!(body.contains(r#"<td class="buy">50000</td><td class="sell">50500</td><td>1.00%</td>"#));
    }

    #[tokio::test]
    async fn test_isolated_failure_still_renders() {
        let fixture = fixture(FailurePolicy::Isolate, true);
        let response = fixture.app.oneshot(request(Method::GET, "/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("<li>kraken (failed while loading markets)</li>"));
        assert!(body.contains(r#"<td class="buy">50000</td><td class="">-</td><td>0.00%</td>"#));
    }

    #[tokio::test]
    async fn test_aborted_collection_is_500() {
        let fixture = fixture(FailurePolicy::Abort, true);
        let response = fixture.app.oneshot(request(Method::GET, "/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "Internal Server Error");
    }

    #[tokio::test]
    async fn test_unknown_path_is_404_without_scanning() {
        let fixture = fixture(FailurePolicy::Isolate, false);
        let response = fixture
            .app
            .oneshot(request(Method::GET, "/prices"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "Page Not Found");
        assert_eq!(fixture.binance.calls(), 0);
    }

    #[tokio::test]
    async fn test_head_on_root_is_404() {
        let fixture = fixture(FailurePolicy::Isolate, false);
        let response = fixture.app.oneshot(request(Method::HEAD, "/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(fixture.binance.calls(), 0);
    }

    #[tokio::test]
    async fn test_other_method_on_root_is_404() {
        let fixture = fixture(FailurePolicy::Isolate, false);
        let response = fixture.app.oneshot(request(Method::POST, "/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "Page Not Found");
        assert_eq!(fixture.binance.calls(), 0);
    }
}
