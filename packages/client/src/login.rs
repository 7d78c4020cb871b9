//! Credential exchange against `POST /api/login`.

use serde::Serialize;

use crate::error::ClientError;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Exchange credentials for a bearer token.
///
/// The server registers unknown usernames on first login.
pub async fn login(
    http: &reqwest::Client,
    base_url: &str,
    username: &str,
    password: &str,
) -> Result<String, ClientError> {
    let url = format!("{}/api/login", base_url.trim_end_matches('/'));
    let response = http
        .post(url)
        .json(&LoginRequest { username, password })
        .send()
        .await?;

    match response.status() {
        reqwest::StatusCode::OK => Ok(response.text().await?.trim().to_string()),
        reqwest::StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
        status => Err(ClientError::LoginStatus(status.as_u16())),
    }
}

/// Build the WebSocket URL for `base_url` (`http` → `ws`, `https` → `wss`).
pub fn websocket_url(base_url: &str, token: &str) -> Result<String, ClientError> {
    let base = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        return Err(ClientError::InvalidUrl(base_url.to_string()));
    };
    Ok(format!("{}/ws?bearer={}", ws_base, token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_websocket_url_from_http() {
        // テスト項目: http の URL が ws の接続先に変換される
        // given (前提条件):
        let base = "http://127.0.0.1:8080/";

        // when (操作):
        let url = websocket_url(base, "abc").unwrap();

        // then (期待する結果):
        assert_eq!(url, "ws://127.0.0.1:8080/ws?bearer=abc");
    }

    #[test]
    fn test_websocket_url_from_https() {
        // テスト項目: https の URL は wss に変換される
        // given (前提条件):
        let base = "https://chat.example.com";

        // when (操作):
        let url = websocket_url(base, "t").unwrap();

        // then (期待する結果):
        assert_eq!(url, "wss://chat.example.com/ws?bearer=t");
    }

    #[test]
    fn test_websocket_url_rejects_other_schemes() {
        // テスト項目: http/https 以外のスキームはエラーになる
        // given (前提条件):
        let base = "ftp://example.com";

        // when (操作):
        let result = websocket_url(base, "t");

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::InvalidUrl(_))));
    }
}
