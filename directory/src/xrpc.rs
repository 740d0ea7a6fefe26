//! XRPC-over-HTTP implementation of [`Directory`].

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use likewatch_types::{AccountId, AttestationRef, Handle, Liker, PostUri, Profile, Timestamp};

use crate::wire::{
    ActorView, CreateRecordRequest, CreateRecordResponse, CreateSessionRequest,
    GetLikesResponse, SessionResponse, VerificationRecord, XrpcErrorBody,
    VERIFICATION_COLLECTION,
};
use crate::{Directory, DirectoryError};

/// Default timeout for a single XRPC request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Page size requested from `app.bsky.feed.getLikes`.
const LIKES_PAGE_SIZE: &str = "100";

/// Upper bound on pages walked per listing.
const MAX_LIKE_PAGES: usize = 100;

/// Operator login material.
#[derive(Clone, Debug)]
pub struct Credentials {
    /// PDS base URL, e.g. `https://bsky.social`.
    pub service_url: String,
    /// Operator handle or DID.
    pub identifier: String,
    pub app_password: String,
}

struct Session {
    access_jwt: String,
    refresh_jwt: String,
    did: String,
}

impl From<SessionResponse> for Session {
    fn from(resp: SessionResponse) -> Self {
        Self {
            access_jwt: resp.access_jwt,
            refresh_jwt: resp.refresh_jwt,
            did: resp.did,
        }
    }
}

/// Failure of one XRPC call before it is attributed to an account.
enum CallError {
    Transport(String),
    Rejected { status: StatusCode, body: XrpcErrorBody },
    Auth(String),
}

impl CallError {
    fn into_directory_error(self, account: Option<&AccountId>) -> DirectoryError {
        match self {
            CallError::Transport(msg) => DirectoryError::RemoteUnavailable(msg),
            CallError::Auth(msg) => DirectoryError::Auth(msg),
            CallError::Rejected { body, .. }
                if body.is_account_deactivated() || body.is_account_missing() =>
            {
                match account {
                    Some(account) => DirectoryError::AccountDeactivated(account.clone()),
                    None => DirectoryError::RemoteUnavailable(describe_rejection(None, &body)),
                }
            }
            CallError::Rejected { status, body } => {
                DirectoryError::RemoteUnavailable(describe_rejection(Some(status), &body))
            }
        }
    }
}

fn describe_rejection(status: Option<StatusCode>, body: &XrpcErrorBody) -> String {
    let status = status.map(|s| format!("HTTP {s} ")).unwrap_or_default();
    format!(
        "{status}{}: {}",
        body.error.as_deref().unwrap_or("UnknownError"),
        body.message.as_deref().unwrap_or("no message"),
    )
}

fn transport_error(e: reqwest::Error) -> CallError {
    if e.is_timeout() {
        CallError::Transport(format!("request timed out: {e}"))
    } else if e.is_connect() {
        CallError::Transport(format!("connection failed: {e}"))
    } else {
        CallError::Transport(e.to_string())
    }
}

/// Authenticated XRPC client for the operator's account.
///
/// Holds the session obtained at login and refreshes it transparently when
/// the server reports an expired access token.
pub struct XrpcDirectory {
    http_client: reqwest::Client,
    service_url: String,
    session: RwLock<Session>,
}

impl XrpcDirectory {
    /// Log in with `com.atproto.server.createSession`.
    ///
    /// Every subsequent request is bounded by `timeout`.
    pub async fn login(credentials: &Credentials, timeout: Duration) -> Result<Self, DirectoryError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| DirectoryError::RemoteUnavailable(e.to_string()))?;
        let service_url = credentials.service_url.trim_end_matches('/').to_string();

        let url = format!("{service_url}/xrpc/com.atproto.server.createSession");
        let request = http_client.post(&url).json(&CreateSessionRequest {
            identifier: &credentials.identifier,
            password: &credentials.app_password,
        });
        let resp: SessionResponse = match execute(request).await {
            Ok(resp) => parse(resp).await,
            Err(CallError::Rejected { status, body }) => {
                Err(CallError::Auth(describe_rejection(Some(status), &body)))
            }
            Err(e) => Err(e),
        }
        .map_err(|e| e.into_directory_error(None))?;

        tracing::debug!(did = %resp.did, handle = %resp.handle, "created session");
        Ok(Self {
            http_client,
            service_url,
            session: RwLock::new(resp.into()),
        })
    }

    /// DID of the logged-in operator account.
    pub async fn operator_did(&self) -> String {
        self.session.read().await.did.clone()
    }

    fn endpoint(&self, nsid: &str) -> String {
        format!("{}/xrpc/{nsid}", self.service_url)
    }

    async fn access_token(&self) -> String {
        self.session.read().await.access_jwt.clone()
    }

    async fn refresh_session(&self) -> Result<(), CallError> {
        let refresh_jwt = self.session.read().await.refresh_jwt.clone();
        let request = self
            .http_client
            .post(self.endpoint("com.atproto.server.refreshSession"))
            .bearer_auth(refresh_jwt);
        let resp: SessionResponse = match execute(request).await {
            Ok(resp) => parse(resp).await?,
            Err(CallError::Rejected { status, body }) => {
                return Err(CallError::Auth(describe_rejection(Some(status), &body)));
            }
            Err(e) => return Err(e),
        };
        *self.session.write().await = resp.into();
        tracing::info!("refreshed XRPC session");
        Ok(())
    }

    /// Run an authenticated call, refreshing the session once on `ExpiredToken`.
    async fn call<T, F>(&self, build: F) -> Result<T, CallError>
    where
        T: DeserializeOwned,
        F: Fn(&str) -> RequestBuilder,
    {
        let resp = match execute(build(&self.access_token().await)).await {
            Err(CallError::Rejected { body, .. }) if body.is_expired_token() => {
                self.refresh_session().await?;
                execute(build(&self.access_token().await)).await?
            }
            other => other?,
        };
        parse(resp).await
    }
}

async fn execute(request: RequestBuilder) -> Result<Response, CallError> {
    let resp = request.send().await.map_err(transport_error)?;
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.json::<XrpcErrorBody>().await.unwrap_or_default();
    Err(CallError::Rejected { status, body })
}

async fn parse<T: DeserializeOwned>(resp: Response) -> Result<T, CallError> {
    resp.json()
        .await
        .map_err(|e| CallError::Transport(format!("invalid response body: {e}")))
}

impl Directory for XrpcDirectory {
    async fn list_likers(&self, post: &PostUri) -> Result<Vec<Liker>, DirectoryError> {
        let url = self.endpoint("app.bsky.feed.getLikes");
        let mut likers = Vec::new();
        let mut cursor: Option<String> = None;

        for page_no in 0..MAX_LIKE_PAGES {
            let page: GetLikesResponse = self
                .call(|token| {
                    let mut req = self
                        .http_client
                        .get(&url)
                        .bearer_auth(token)
                        .query(&[("uri", post.as_str()), ("limit", LIKES_PAGE_SIZE)]);
                    if let Some(c) = &cursor {
                        req = req.query(&[("cursor", c.as_str())]);
                    }
                    req
                })
                .await
                .map_err(|e| e.into_directory_error(None))?;

            let fetched = page.likes.len();
            likers.extend(page.likes.into_iter().map(|like| Liker::from(like.actor)));

            match page.cursor {
                Some(next) if fetched > 0 => cursor = Some(next),
                _ => return Ok(likers),
            }
            if page_no + 1 == MAX_LIKE_PAGES {
                tracing::warn!(
                    pages = MAX_LIKE_PAGES,
                    likers = likers.len(),
                    "stopped paging likes at page limit"
                );
            }
        }
        Ok(likers)
    }

    async fn resolve_profile(&self, account: &AccountId) -> Result<Profile, DirectoryError> {
        let url = self.endpoint("app.bsky.actor.getProfile");
        let actor: ActorView = self
            .call(|token| {
                self.http_client
                    .get(&url)
                    .bearer_auth(token)
                    .query(&[("actor", account.as_str())])
            })
            .await
            .map_err(|e| e.into_directory_error(Some(account)))?;
        Ok(actor.into())
    }

    async fn issue_attestation(
        &self,
        account: &AccountId,
        handle: &Handle,
        display_name: &str,
        issued_at: Timestamp,
    ) -> Result<AttestationRef, DirectoryError> {
        let url = self.endpoint("com.atproto.repo.createRecord");
        let repo = self.operator_did().await;
        let created: CreateRecordResponse = self
            .call(|token| {
                self.http_client
                    .post(&url)
                    .bearer_auth(token)
                    .json(&CreateRecordRequest {
                        repo: &repo,
                        collection: VERIFICATION_COLLECTION,
                        record: VerificationRecord::new(account, handle, display_name, issued_at),
                    })
            })
            .await
            .map_err(|e| e.into_directory_error(None))?;
        Ok(AttestationRef { uri: created.uri })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(error: &str, message: &str) -> CallError {
        CallError::Rejected {
            status: StatusCode::BAD_REQUEST,
            body: XrpcErrorBody {
                error: Some(error.into()),
                message: Some(message.into()),
            },
        }
    }

    #[test]
    fn deactivated_profile_maps_to_account_deactivated() {
        let account = AccountId::new("did:plc:gone");
        let err = rejected("AccountDeactivated", "Account is deactivated")
            .into_directory_error(Some(&account));
        assert!(matches!(err, DirectoryError::AccountDeactivated(a) if a == account));
    }

    #[test]
    fn deactivation_without_account_context_is_unavailable() {
        let err = rejected("AccountDeactivated", "Account is deactivated").into_directory_error(None);
        assert!(matches!(err, DirectoryError::RemoteUnavailable(_)));
    }

    #[test]
    fn removed_profile_maps_to_account_deactivated_only_with_account() {
        let account = AccountId::new("did:plc:deleted");
        let err = rejected("InvalidRequest", "Profile not found").into_directory_error(Some(&account));
        assert!(matches!(err, DirectoryError::AccountDeactivated(a) if a == account));

        let err = rejected("InvalidRequest", "Profile not found").into_directory_error(None);
        assert!(matches!(err, DirectoryError::RemoteUnavailable(_)));
    }

    #[test]
    fn other_rejections_map_to_unavailable_with_details() {
        let account = AccountId::new("did:plc:alice");
        let err = rejected("InternalServerError", "boom").into_directory_error(Some(&account));
        match err {
            DirectoryError::RemoteUnavailable(msg) => {
                assert!(msg.contains("400"));
                assert!(msg.contains("InternalServerError"));
                assert!(msg.contains("boom"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn auth_failures_stay_auth() {
        let err = CallError::Auth("bad password".into()).into_directory_error(None);
        assert!(matches!(err, DirectoryError::Auth(_)));
    }

    // ── Against a local XRPC server ────────────────────────────────────

    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    type RequestLog = Arc<Mutex<Vec<String>>>;

    const SESSION: &str =
        r#"{"accessJwt":"access-1","refreshJwt":"refresh-1","did":"did:plc:op","handle":"op.test"}"#;
    const REFRESHED: &str =
        r#"{"accessJwt":"access-2","refreshJwt":"refresh-2","did":"did:plc:op","handle":"op.test"}"#;

    /// Read one request; returns its target and its lowercased head.
    async fn read_request(socket: &mut TcpStream) -> (String, String) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let head_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break buf.len();
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let raw_head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
        let head = raw_head.to_ascii_lowercase();
        let content_length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < head_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let target = raw_head.split_whitespace().nth(1).unwrap_or_default().to_string();
        (target, head)
    }

    fn likes_page(did: &str, cursor: Option<&str>) -> String {
        let mut page = serde_json::json!({
            "likes": [{ "actor": { "did": did, "handle": format!("{did}.test") } }]
        });
        if let Some(cursor) = cursor {
            page["cursor"] = cursor.into();
        }
        page.to_string()
    }

    /// The first access token is always reported expired.
    fn respond(target: &str, head: &str) -> (&'static str, String) {
        let path = target.split('?').next().unwrap_or_default();
        let bearer = |token: &str| head.contains(&format!("authorization: bearer {token}"));
        let error_body = |error: &str, message: &str| {
            serde_json::json!({ "error": error, "message": message }).to_string()
        };
        match path {
            "/xrpc/com.atproto.server.createSession" => ("200 OK", SESSION.into()),
            "/xrpc/com.atproto.server.refreshSession" if bearer("refresh-1") => {
                ("200 OK", REFRESHED.into())
            }
            _ if bearer("access-1") => (
                "400 Bad Request",
                error_body("ExpiredToken", "Token has expired"),
            ),
            "/xrpc/app.bsky.feed.getLikes" if target.contains("cursor=c1") => {
                ("200 OK", likes_page("did:plc:b", None))
            }
            "/xrpc/app.bsky.feed.getLikes" => ("200 OK", likes_page("did:plc:a", Some("c1"))),
            "/xrpc/app.bsky.actor.getProfile" if target.contains("gone") => (
                "400 Bad Request",
                error_body("AccountDeactivated", "Account is deactivated"),
            ),
            "/xrpc/app.bsky.actor.getProfile" if target.contains("deleted") => (
                "400 Bad Request",
                error_body("InvalidRequest", "Profile not found"),
            ),
            "/xrpc/app.bsky.actor.getProfile" => (
                "200 OK",
                r#"{"did":"did:plc:alice","handle":"alice.test","displayName":"Alice"}"#.into(),
            ),
            _ => ("404 Not Found", error_body("MethodNotImplemented", path)),
        }
    }

    async fn spawn_server() -> (String, RequestLog) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let log = RequestLog::default();
        let seen = log.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let (target, head) = read_request(&mut socket).await;
                let (status, body) = respond(&target, &head);
                seen.lock().unwrap().push(target);
                let reply = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: application/json\r\n\
                     content-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
        });
        (url, log)
    }

    async fn login(url: &str) -> XrpcDirectory {
        let credentials = Credentials {
            service_url: url.to_string(),
            identifier: "op.test".into(),
            app_password: "xxxx-xxxx".into(),
        };
        XrpcDirectory::login(&credentials, Duration::from_secs(5))
            .await
            .unwrap()
    }

    fn nsids(log: &RequestLog) -> Vec<String> {
        log.lock()
            .unwrap()
            .iter()
            .map(|t| {
                let path = t.split('?').next().unwrap_or_default();
                path.trim_start_matches("/xrpc/").to_string()
            })
            .collect()
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_likes_are_paged() {
        let (url, log) = spawn_server().await;
        let directory = login(&url).await;
        assert_eq!(directory.operator_did().await, "did:plc:op");

        let likers = directory
            .list_likers(&PostUri::new("at://did:plc:op/app.bsky.feed.post/1"))
            .await
            .unwrap();
        let ids: Vec<&str> = likers.iter().map(|l| l.account_id.as_str()).collect();
        assert_eq!(ids, ["did:plc:a", "did:plc:b"]);

        assert_eq!(
            nsids(&log),
            [
                "com.atproto.server.createSession",
                "app.bsky.feed.getLikes",
                "com.atproto.server.refreshSession",
                "app.bsky.feed.getLikes",
                "app.bsky.feed.getLikes",
            ]
        );
        let log = log.lock().unwrap();
        assert!(!log[3].contains("cursor="));
        assert!(log[4].contains("cursor=c1"));
    }

    #[tokio::test]
    async fn deactivated_and_removed_profiles_map_to_account_deactivated() {
        let (url, _log) = spawn_server().await;
        let directory = login(&url).await;

        let gone = AccountId::new("did:plc:gone");
        let err = directory.resolve_profile(&gone).await.unwrap_err();
        assert!(matches!(err, DirectoryError::AccountDeactivated(a) if a == gone));

        let deleted = AccountId::new("did:plc:deleted");
        let err = directory.resolve_profile(&deleted).await.unwrap_err();
        assert!(matches!(err, DirectoryError::AccountDeactivated(a) if a == deleted));

        let profile = directory
            .resolve_profile(&AccountId::new("did:plc:alice"))
            .await
            .unwrap();
        assert_eq!(profile.handle, Handle::new("alice.test"));
        assert_eq!(profile.effective_display_name(), "Alice");
    }
}
