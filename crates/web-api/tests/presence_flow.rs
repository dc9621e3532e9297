//! 在线状态查询的端到端测试

mod support;

use reqwest::Client;
use tokio_tungstenite::connect_async;

use support::{new_user, spawn_server};

#[tokio::test]
async fn presence_endpoint_tracks_connections() {
    let server = spawn_server().await;
    let client = Client::new();
    let (a, b) = (new_user(), new_user());
    let token_a = server.token_for(a, "alice");
    let token_b = server.token_for(b, "bob");

    // 无人在线
    let empty = client
        .get(server.http_url("/api/v1/presence"))
        .header("authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .expect("presence")
        .json::<serde_json::Value>()
        .await
        .expect("json");
    assert_eq!(empty["user_ids"].as_array().unwrap().len(), 0);

    // 同一用户的多个设备只算一个在线成员
    let (mut ws_a1, _) = connect_async(server.ws_url(&token_a)).await.expect("ws a1");
    let (mut ws_a2, _) = connect_async(server.ws_url(&token_a)).await.expect("ws a2");
    let (mut ws_b, _) = connect_async(server.ws_url(&token_b)).await.expect("ws b");

    // 给注册留一点时间
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let online = client
        .get(server.http_url("/api/v1/presence"))
        .header("authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .expect("presence")
        .json::<serde_json::Value>()
        .await
        .expect("json");
    assert_eq!(online["user_ids"].as_array().unwrap().len(), 2);

    // a 的一个设备断开后 a 仍在线
    ws_a1.close(None).await.expect("close a1");
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let still_online = client
        .get(server.http_url("/api/v1/presence"))
        .header("authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .expect("presence")
        .json::<serde_json::Value>()
        .await
        .expect("json");
    assert_eq!(still_online["user_ids"].as_array().unwrap().len(), 2);

    // 全部断开后回到空集合
    ws_a2.close(None).await.expect("close a2");
    ws_b.close(None).await.expect("close b");
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let offline = client
        .get(server.http_url("/api/v1/presence"))
        .header("authorization", format!("Bearer {}", token_b))
        .send()
        .await
        .expect("presence")
        .json::<serde_json::Value>()
        .await
        .expect("json");
    assert_eq!(offline["user_ids"].as_array().unwrap().len(), 0);

    server.stop().await;
}
