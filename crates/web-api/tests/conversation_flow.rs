//! 会话生命周期与消息语义的端到端测试

mod support;

use reqwest::Client;
use serde_json::json;

use support::{new_user, spawn_server};

#[tokio::test]
async fn conversation_gate_and_accept_flow() {
    let server = spawn_server().await;
    let client = Client::new();
    let (a, b) = (new_user(), new_user());
    let token_a = server.token_for(a, "alice");
    let token_b = server.token_for(b, "bob");

    // a 发起会话
    let conversation = client
        .post(server.http_url("/api/v1/conversations"))
        .header("authorization", format!("Bearer {}", token_a))
        .json(&json!({ "peer_id": b }))
        .send()
        .await
        .expect("create conversation")
        .json::<serde_json::Value>()
        .await
        .expect("conversation json");
    let conversation_id = conversation["id"].as_str().unwrap().to_string();

    // 接受前 b 不能发送
    let premature = client
        .post(server.http_url(&format!(
            "/api/v1/conversations/{}/messages",
            conversation_id
        )))
        .header("authorization", format!("Bearer {}", token_b))
        .json(&json!({ "receiver_id": a, "text": "early" }))
        .send()
        .await
        .expect("premature send");
    assert_eq!(premature.status(), 409);

    // 创建者随时可发
    let sent = client
        .post(server.http_url(&format!(
            "/api/v1/conversations/{}/messages",
            conversation_id
        )))
        .header("authorization", format!("Bearer {}", token_a))
        .json(&json!({ "receiver_id": b, "text": "hello" }))
        .send()
        .await
        .expect("creator send");
    assert_eq!(sent.status(), 201);

    // b 接受后即可发送
    let accepted = client
        .post(server.http_url(&format!("/api/v1/conversations/{}/accept", conversation_id)))
        .header("authorization", format!("Bearer {}", token_b))
        .send()
        .await
        .expect("accept");
    assert_eq!(accepted.status(), 200);

    let reply = client
        .post(server.http_url(&format!(
            "/api/v1/conversations/{}/messages",
            conversation_id
        )))
        .header("authorization", format!("Bearer {}", token_b))
        .json(&json!({ "receiver_id": a, "text": "hi back" }))
        .send()
        .await
        .expect("reply");
    assert_eq!(reply.status(), 201);

    // 双方都能读到两条消息
    let history = client
        .get(server.http_url(&format!(
            "/api/v1/conversations/{}/messages",
            conversation_id
        )))
        .header("authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .expect("history")
        .json::<Vec<serde_json::Value>>()
        .await
        .expect("history json");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["text"], "hello");
    assert_eq!(history[1]["text"], "hi back");

    server.stop().await;
}

#[tokio::test]
async fn reject_deletes_conversation_and_history() {
    let server = spawn_server().await;
    let client = Client::new();
    let (a, b) = (new_user(), new_user());
    let token_a = server.token_for(a, "alice");
    let token_b = server.token_for(b, "bob");

    let conversation = client
        .post(server.http_url("/api/v1/conversations"))
        .header("authorization", format!("Bearer {}", token_a))
        .json(&json!({ "peer_id": b }))
        .send()
        .await
        .expect("create conversation")
        .json::<serde_json::Value>()
        .await
        .expect("conversation json");
    let conversation_id = conversation["id"].as_str().unwrap().to_string();

    client
        .post(server.http_url(&format!(
            "/api/v1/conversations/{}/messages",
            conversation_id
        )))
        .header("authorization", format!("Bearer {}", token_a))
        .json(&json!({ "receiver_id": b, "text": "anyone there?" }))
        .send()
        .await
        .expect("send");

    // 创建者不能拒绝自己的会话
    let by_creator = client
        .post(server.http_url(&format!("/api/v1/conversations/{}/reject", conversation_id)))
        .header("authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .expect("reject by creator");
    assert_eq!(by_creator.status(), 403);

    let rejected = client
        .post(server.http_url(&format!("/api/v1/conversations/{}/reject", conversation_id)))
        .header("authorization", format!("Bearer {}", token_b))
        .send()
        .await
        .expect("reject");
    assert_eq!(rejected.status(), 204);

    // 会话与历史不再可达
    let gone = client
        .get(server.http_url(&format!(
            "/api/v1/conversations/{}/messages",
            conversation_id
        )))
        .header("authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .expect("history after reject");
    assert_eq!(gone.status(), 404);

    server.stop().await;
}

#[tokio::test]
async fn delete_scopes_behave_differently() {
    let server = spawn_server().await;
    let client = Client::new();
    let (a, b) = (new_user(), new_user());
    let token_a = server.token_for(a, "alice");
    let token_b = server.token_for(b, "bob");

    let conversation = client
        .post(server.http_url("/api/v1/conversations"))
        .header("authorization", format!("Bearer {}", token_a))
        .json(&json!({ "peer_id": b }))
        .send()
        .await
        .expect("create")
        .json::<serde_json::Value>()
        .await
        .expect("json");
    let conversation_id = conversation["id"].as_str().unwrap().to_string();
    client
        .post(server.http_url(&format!("/api/v1/conversations/{}/accept", conversation_id)))
        .header("authorization", format!("Bearer {}", token_b))
        .send()
        .await
        .expect("accept");

    let first = client
        .post(server.http_url(&format!(
            "/api/v1/conversations/{}/messages",
            conversation_id
        )))
        .header("authorization", format!("Bearer {}", token_a))
        .json(&json!({ "receiver_id": b, "text": "one" }))
        .send()
        .await
        .expect("send one")
        .json::<serde_json::Value>()
        .await
        .expect("json");
    let second = client
        .post(server.http_url(&format!(
            "/api/v1/conversations/{}/messages",
            conversation_id
        )))
        .header("authorization", format!("Bearer {}", token_a))
        .json(&json!({ "receiver_id": b, "text": "two" }))
        .send()
        .await
        .expect("send two")
        .json::<serde_json::Value>()
        .await
        .expect("json");

    // b 本地删除第一条：只对 b 消失
    let me_scope = client
        .delete(server.http_url(&format!(
            "/api/v1/messages/{}?scope=me",
            first["id"].as_str().unwrap()
        )))
        .header("authorization", format!("Bearer {}", token_b))
        .send()
        .await
        .expect("delete me");
    assert_eq!(me_scope.status(), 204);

    // 非发送者不能对所有人删除
    let forbidden = client
        .delete(server.http_url(&format!(
            "/api/v1/messages/{}?scope=everyone",
            second["id"].as_str().unwrap()
        )))
        .header("authorization", format!("Bearer {}", token_b))
        .send()
        .await
        .expect("delete everyone forbidden");
    assert_eq!(forbidden.status(), 403);

    // 发送者墓碑化第二条
    let everyone = client
        .delete(server.http_url(&format!(
            "/api/v1/messages/{}?scope=everyone",
            second["id"].as_str().unwrap()
        )))
        .header("authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .expect("delete everyone");
    assert_eq!(everyone.status(), 204);

    let for_b = client
        .get(server.http_url(&format!(
            "/api/v1/conversations/{}/messages",
            conversation_id
        )))
        .header("authorization", format!("Bearer {}", token_b))
        .send()
        .await
        .expect("history b")
        .json::<Vec<serde_json::Value>>()
        .await
        .expect("json");
    // 第一条被本地隐藏，第二条是空墓碑
    assert_eq!(for_b.len(), 1);
    assert_eq!(for_b[0]["deleted"], true);
    assert!(for_b[0]["text"].is_null());

    let for_a = client
        .get(server.http_url(&format!(
            "/api/v1/conversations/{}/messages",
            conversation_id
        )))
        .header("authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .expect("history a")
        .json::<Vec<serde_json::Value>>()
        .await
        .expect("json");
    assert_eq!(for_a.len(), 2);
    assert_eq!(for_a[0]["text"], "one");

    server.stop().await;
}

#[tokio::test]
async fn assistant_reply_and_rate_limit() {
    let server = spawn_server().await;
    let client = Client::new();
    let (a, b) = (new_user(), new_user());
    let token_a = server.token_for(a, "alice");
    let token_b = server.token_for(b, "bob");

    let conversation = client
        .post(server.http_url("/api/v1/conversations"))
        .header("authorization", format!("Bearer {}", token_a))
        .json(&json!({ "peer_id": b }))
        .send()
        .await
        .expect("create")
        .json::<serde_json::Value>()
        .await
        .expect("json");
    let conversation_id = conversation["id"].as_str().unwrap().to_string();
    client
        .post(server.http_url(&format!("/api/v1/conversations/{}/accept", conversation_id)))
        .header("authorization", format!("Bearer {}", token_b))
        .send()
        .await
        .expect("accept");
    client
        .post(server.http_url(&format!(
            "/api/v1/conversations/{}/messages",
            conversation_id
        )))
        .header("authorization", format!("Bearer {}", token_a))
        .json(&json!({ "receiver_id": b, "text": "帮我想个回复" }))
        .send()
        .await
        .expect("send");

    let reply = client
        .post(server.http_url(&format!(
            "/api/v1/conversations/{}/assistant",
            conversation_id
        )))
        .header("authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .expect("assistant");
    assert_eq!(reply.status(), 200);
    let reply = reply.json::<serde_json::Value>().await.expect("json");
    assert_eq!(reply["text"], "好的，收到。");

    // 冷却窗口内立刻再调用被限流
    let limited = client
        .post(server.http_url(&format!(
            "/api/v1/conversations/{}/assistant",
            conversation_id
        )))
        .header("authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .expect("assistant again");
    assert_eq!(limited.status(), 429);

    // 助手回复仅调用者可见
    let for_b = client
        .get(server.http_url(&format!(
            "/api/v1/conversations/{}/messages",
            conversation_id
        )))
        .header("authorization", format!("Bearer {}", token_b))
        .send()
        .await
        .expect("history b")
        .json::<Vec<serde_json::Value>>()
        .await
        .expect("json");
    assert_eq!(for_b.len(), 1);

    server.stop().await;
}

#[tokio::test]
async fn requests_without_token_are_unauthorized() {
    let server = spawn_server().await;
    let client = Client::new();

    let response = client
        .post(server.http_url("/api/v1/conversations"))
        .json(&json!({ "peer_id": new_user() }))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 401);

    server.stop().await;
}
