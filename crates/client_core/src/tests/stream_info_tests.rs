use axum::{http::StatusCode, routing::get, Json, Router};
use serde_json::json;
use tokio::net::TcpListener;

use super::*;

async fn spawn_stream_server() -> anyhow::Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route(
            "/streams",
            get(|| async {
                Json(json!([
                    {
                        "ip": "239.1.1.1",
                        "port": 1234,
                        "bitrateMbps": 7.5,
                        "programs": [{
                            "programId": 1,
                            "isProblematic": true,
                            "streams": [{"pid": 256, "type": "video", "lastPTS": "900"}]
                        }]
                    },
                    {"ip": "239.1.1.2", "port": 1234, "programs": []},
                    {"ip": "239.1.1.3", "port": 1234}
                ]))
            }),
        )
        .route(
            "/broken",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

fn page_size(size: usize) -> NonZeroUsize {
    NonZeroUsize::new(size).expect("non-zero")
}

#[tokio::test]
async fn loads_and_pages_stream_info() {
    let base = spawn_stream_server().await.expect("spawn server");
    let client = StreamInfoClient::new(Client::new(), format!("{base}/streams"));

    let mut view = StreamInfoView::load(&client, page_size(2)).await;

    assert_eq!(view.error(), None);
    assert_eq!(view.pager().total_pages(), 2);
    let first = view.pager().current();
    assert_eq!(first[0].endpoint_key(), "239.1.1.1:1234");
    assert_eq!(first[0].problematic_programs().count(), 1);
    assert_eq!(first[0].programs[0].streams()[0].last_pts.as_deref(), Some("900"));

    let second = view.pager_mut().next();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].ip, "239.1.1.3");
}

#[tokio::test]
async fn failed_load_shows_error_and_empty_pager() {
    let base = spawn_stream_server().await.expect("spawn server");
    let client = StreamInfoClient::new(Client::new(), format!("{base}/broken"));

    assert!(client.fetch().await.is_err());

    let view = StreamInfoView::load(&client, page_size(2)).await;
    assert_eq!(view.error(), Some(LOAD_FAILED_MESSAGE));
    assert_eq!(view.pager().total_pages(), 0);
    assert!(view.pager().current().is_empty());
}
