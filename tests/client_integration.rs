//! Integration tests for the COS client against a recording transport
//!
//! These tests verify that requests are signed over exactly what is sent and
//! that service envelopes come back as the right error kinds.

use async_trait::async_trait;
use bytes::Bytes;
use cos_client::cos::{
    CanonicalRequest, CosClient, CosConfig, CosError, Credentials, FixedClock, Signer, Transport,
    TransportError,
};
use hyper::{Request, Response, StatusCode};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

const LIST_BUCKETS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListAllMyBucketsResult>
    <Owner>
        <ID>qcs::cam::uin/100000000001:uin/100000000001</ID>
        <DisplayName>100000000001</DisplayName>
    </Owner>
    <Buckets>
        <Bucket>
            <Name>mybucket-1250000000</Name>
            <Location>ap-guangzhou</Location>
            <CreationDate>2019-05-24T11:20:10Z</CreationDate>
        </Bucket>
    </Buckets>
</ListAllMyBucketsResult>"#;

const ACCESS_DENIED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error>
    <Code>AccessDenied</Code>
    <Message>Forbidden</Message>
    <Resource>mybucket-1250000000.cos.ap-guangzhou.myqcloud.com/secret.txt</Resource>
    <RequestId>NWQ0MjQ0NzFfODdhOTFjMGJfNjE1N18xOGQ0ZTU=</RequestId>
    <TraceId>OGVmYzZiMmQzYjA2OWNhODk0NTRkMTBiOWVmMDAxODc0OWRkZjk0ZDM1</TraceId>
</Error>"#;

const SECRET_ID: &str = "AKIDexample";
const SECRET_KEY: &str = "secretexample";

/// Records every request and replies from a queue (or a fixed reply once empty)
struct MockTransport {
    requests: Mutex<Vec<Request<Bytes>>>,
    replies: Mutex<VecDeque<Result<Response<Bytes>, TransportError>>>,
    fallback: Option<(StatusCode, &'static str)>,
}

impl MockTransport {
    fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            replies: Mutex::new(VecDeque::new()),
            fallback: None,
        }
    }

    fn always(status: StatusCode, body: &'static str) -> Self {
        Self {
            fallback: Some((status, body)),
            ..Self::new()
        }
    }

    fn reply(self, status: StatusCode, body: &'static str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(response(status, body)));
        self
    }

    fn reply_with(self, reply: Result<Response<Bytes>, TransportError>) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    fn take_requests(&self) -> Vec<Request<Bytes>> {
        std::mem::take(&mut *self.requests.lock().unwrap())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        self.requests.lock().unwrap().push(request);
        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            return reply;
        }
        match self.fallback {
            Some((status, body)) => Ok(response(status, body)),
            None => Err(TransportError::Connect("no reply queued".to_string())),
        }
    }
}

fn response(status: StatusCode, body: &'static str) -> Response<Bytes> {
    Response::builder()
        .status(status)
        .body(Bytes::from_static(body.as_bytes()))
        .unwrap()
}

fn client(transport: Arc<MockTransport>, now: i64) -> CosClient {
    let config = CosConfig::new(SECRET_ID, SECRET_KEY, "1250000000", "ap-guangzhou");
    CosClient::with_transport(config, transport)
        .unwrap()
        .with_clock(Arc::new(FixedClock(now)))
}

/// Recompute the authorization value for a recorded request at `now`
fn expected_authorization(request: &Request<Bytes>, now: i64) -> String {
    let headers: Vec<(&str, &str)> = request
        .headers()
        .iter()
        .filter(|(name, _)| name.as_str() != "authorization")
        .map(|(name, value)| (name.as_str(), value.to_str().unwrap()))
        .collect();
    let canonical = CanonicalRequest::new(
        request.method().as_str(),
        request.uri().path(),
        request.uri().query().unwrap_or(""),
        headers,
    );

    let signer = Signer::with_clock(
        Credentials::new(SECRET_ID, SECRET_KEY).unwrap(),
        Arc::new(FixedClock(now)),
    );
    signer.authorize(&canonical).unwrap()
}

fn authorization(request: &Request<Bytes>) -> &str {
    request
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .unwrap()
        .to_str()
        .unwrap()
}

#[tokio::test]
async fn test_list_buckets() {
    let transport = Arc::new(MockTransport::new().reply(StatusCode::OK, LIST_BUCKETS));
    let client = client(transport.clone(), 1_700_000_000);

    let response = client.list_buckets().await.unwrap();
    assert_eq!(response.buckets.len(), 1);
    let bucket = &response.buckets[0];
    assert_eq!(bucket.name, "mybucket");
    assert_eq!(bucket.app_id, "1250000000");
    assert_eq!(bucket.region, "ap-guangzhou");
    assert_eq!(response.owner_display_name.as_deref(), Some("100000000001"));

    let requests = transport.take_requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method(), hyper::Method::GET);
    assert_eq!(
        request.uri().to_string(),
        "https://service.cos.myqcloud.com/"
    );
    assert_eq!(
        request.headers().get(hyper::header::HOST).unwrap(),
        "service.cos.myqcloud.com"
    );

    let auth = authorization(request);
    assert!(auth.starts_with(
        "q-sign-algorithm=sha1&q-ak=AKIDexample&q-sign-time=1700000000;1700000030&q-key-time=1700000000;1700000030&q-header-list=host&q-url-param-list=&q-signature="
    ));
    assert_eq!(auth, expected_authorization(request, 1_700_000_000));
}

#[tokio::test]
async fn test_list_buckets_non_xml_body_is_malformed() {
    let transport = Arc::new(MockTransport::new().reply(StatusCode::OK, "<html>gateway</html>"));
    let client = client(transport.clone(), 1_700_000_000);

    let err = client.list_buckets().await.unwrap_err();
    assert!(matches!(err, CosError::MalformedResponse(_)));

    let transport = Arc::new(MockTransport::new().reply(StatusCode::OK, "OK"));
    let client = self::client(transport, 1_700_000_000);
    assert!(matches!(
        client.list_buckets().await,
        Err(CosError::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn test_get_object_access_denied() {
    let transport = Arc::new(MockTransport::new().reply(StatusCode::FORBIDDEN, ACCESS_DENIED));
    let client = client(transport.clone(), 1_700_000_000);

    let err = client.get_object("mybucket", "secret.txt").await.unwrap_err();
    let service = err.service_error().expect("service error");
    assert_eq!(service.http_status_code, 403);
    assert_eq!(service.error_code, "AccessDenied");
    assert_eq!(service.message, "Forbidden");
    assert_eq!(
        service.resource_url,
        "mybucket-1250000000.cos.ap-guangzhou.myqcloud.com/secret.txt"
    );
    assert_eq!(service.request_id, "NWQ0MjQ0NzFfODdhOTFjMGJfNjE1N18xOGQ0ZTU=");
    assert_eq!(
        service.trace_id,
        "OGVmYzZiMmQzYjA2OWNhODk0NTRkMTBiOWVmMDAxODc0OWRkZjk0ZDM1"
    );

    let requests = transport.take_requests();
    assert_eq!(
        requests[0].uri().to_string(),
        "https://mybucket-1250000000.cos.ap-guangzhou.myqcloud.com/secret.txt"
    );
}

#[tokio::test]
async fn test_get_object_returns_body() {
    let transport = Arc::new(MockTransport::new().reply(StatusCode::OK, "hello, cos"));
    let client = client(transport, 1_700_000_000);

    let data = client.get_object("mybucket", "docs/hello.txt").await.unwrap();
    assert_eq!(data, Bytes::from_static(b"hello, cos"));
}

#[tokio::test]
async fn test_put_object_signs_content_length() {
    let reply = Response::builder()
        .status(StatusCode::OK)
        .header("ETag", "\"d41d8cd98f00b204e9800998ecf8427e\"")
        .body(Bytes::new())
        .unwrap();
    let transport = Arc::new(MockTransport::new().reply_with(Ok(reply)));
    let client = client(transport.clone(), 1_700_000_123);

    let output = client
        .put_object("mybucket", "photos/腾讯 云.png", Bytes::from_static(b"0123456789"))
        .await
        .unwrap();
    assert_eq!(output.etag.as_deref(), Some("d41d8cd98f00b204e9800998ecf8427e"));

    let requests = transport.take_requests();
    let request = &requests[0];
    assert_eq!(
        request.uri().path(),
        "/photos/%E8%85%BE%E8%AE%AF%20%E4%BA%91.png"
    );
    assert_eq!(request.headers().get(hyper::header::CONTENT_LENGTH).unwrap(), "10");
    assert_eq!(request.body(), &Bytes::from_static(b"0123456789"));

    let auth = authorization(request);
    assert!(auth.contains("&q-header-list=content-length;host&"));
    assert_eq!(auth, expected_authorization(request, 1_700_000_123));
}

#[tokio::test]
async fn test_delete_accepts_200_and_204() {
    let transport = Arc::new(
        MockTransport::new()
            .reply(StatusCode::NO_CONTENT, "")
            .reply(StatusCode::OK, "")
            .reply(StatusCode::NO_CONTENT, ""),
    );
    let client = client(transport.clone(), 1_700_000_000);

    client.delete_object("mybucket", "a.txt").await.unwrap();
    client.delete_object("mybucket", "b.txt").await.unwrap();
    client.delete_bucket("mybucket").await.unwrap();

    let requests = transport.take_requests();
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|r| r.method() == hyper::Method::DELETE));
    assert_eq!(requests[2].uri().path(), "/");
}

#[tokio::test]
async fn test_create_bucket_conflict() {
    let body = "<Error><Code>BucketAlreadyExists</Code><Message>The requested bucket name is not available.</Message></Error>";
    let transport = Arc::new(MockTransport::new().reply(StatusCode::CONFLICT, body));
    let client = client(transport, 1_700_000_000);

    let err = client.create_bucket("mybucket").await.unwrap_err();
    let service = err.service_error().expect("service error");
    assert_eq!(service.http_status_code, 409);
    assert_eq!(service.error_code, "BucketAlreadyExists");
    assert_eq!(service.request_id, "");
}

#[tokio::test]
async fn test_create_bucket_rejects_unexpected_success_status() {
    // 204 is only a success for deletes
    let transport = Arc::new(MockTransport::new().reply(StatusCode::NO_CONTENT, ""));
    let client = client(transport, 1_700_000_000);

    assert!(matches!(
        client.create_bucket("mybucket").await,
        Err(CosError::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn test_error_status_without_body_is_malformed() {
    let transport = Arc::new(MockTransport::new().reply(StatusCode::NOT_FOUND, ""));
    let client = client(transport, 1_700_000_000);

    let err = client.delete_object("mybucket", "gone.txt").await.unwrap_err();
    assert!(matches!(err, CosError::MalformedResponse(_)));
    assert!(err.service_error().is_none());
}

#[tokio::test]
async fn test_transport_failure_is_not_service_error() {
    let transport = Arc::new(
        MockTransport::new().reply_with(Err(TransportError::Connect("connection reset".to_string()))),
    );
    let client = client(transport, 1_700_000_000);

    let err = client.get_object("mybucket", "a.txt").await.unwrap_err();
    assert!(matches!(err, CosError::Transport(TransportError::Connect(_))));
}

#[tokio::test]
async fn test_invalid_request_never_reaches_transport() {
    let transport = Arc::new(MockTransport::new());
    let client = client(transport.clone(), 1_700_000_000);

    assert!(matches!(
        client.get_object("Bad_Bucket", "a.txt").await,
        Err(CosError::InvalidRequest(_))
    ));
    assert!(matches!(
        client.put_object("mybucket", "", Bytes::new()).await,
        Err(CosError::InvalidRequest(_))
    ));
    assert!(transport.take_requests().is_empty());
}

#[tokio::test]
async fn test_concurrent_calls_sign_independently() {
    let transport = Arc::new(MockTransport::always(StatusCode::OK, LIST_BUCKETS));
    let early = client(transport.clone(), 1_700_000_000);
    let late = client(transport.clone(), 1_700_000_045);

    let (a, b) = tokio::join!(
        tokio::spawn(async move { early.list_buckets().await }),
        tokio::spawn(async move { late.list_buckets().await }),
    );
    a.unwrap().unwrap();
    b.unwrap().unwrap();

    let requests = transport.take_requests();
    assert_eq!(requests.len(), 2);

    let mut signed_at = Vec::new();
    for request in &requests {
        let auth = authorization(request);
        let now = if auth.contains("q-sign-time=1700000000;1700000030") {
            1_700_000_000
        } else {
            assert!(auth.contains("q-sign-time=1700000045;1700000075"));
            1_700_000_045
        };
        assert_eq!(auth, expected_authorization(request, now));
        signed_at.push(now);
    }
    signed_at.sort();
    assert_eq!(signed_at, vec![1_700_000_000, 1_700_000_045]);
    assert_ne!(authorization(&requests[0]), authorization(&requests[1]));
}
