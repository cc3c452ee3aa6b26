//! Pipeline tests against an in-memory recording transport.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use fata::{
    AbortController, Blob, Body, Error, ErrorKind, Fata, FataBuilder, FormData, HttpClient,
    Method, Payload, RedirectPolicy, Request, RequestConfig, RequestOptions, Response,
    ResponseDecoder, Result, UrlSearchParams,
};
use http::HeaderMap;
use http::header::CONTENT_TYPE;
use serde_json::json;

type Responder = dyn Fn(&Request) -> Result<Response> + Send + Sync;

/// Records every dispatched request and answers with `respond`.
#[derive(Clone)]
struct MockTransport {
    requests: Arc<Mutex<Vec<Request>>>,
    respond: Arc<Responder>,
    delay: Duration,
}

impl MockTransport {
    fn new(respond: impl Fn(&Request) -> Result<Response> + Send + Sync + 'static) -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            respond: Arc::new(respond),
            delay: Duration::ZERO,
        }
    }

    fn replying(status: u16, content_type: Option<&'static str>, body: &'static str) -> Self {
        Self::new(move |_| {
            let mut headers = HeaderMap::new();
            if let Some(content_type) = content_type {
                headers.insert(CONTENT_TYPE, content_type.parse().expect("content type"));
            }
            Ok(Response::new(status, headers, body))
        })
    }

    fn json(body: &'static str) -> Self {
        Self::replying(200, Some("application/json"), body)
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn requests(&self) -> Vec<Request> {
        self.requests.lock().expect("lock").clone()
    }

    fn last(&self) -> Request {
        self.requests().pop().expect("a dispatched request")
    }
}

impl HttpClient for MockTransport {
    async fn execute(&self, request: Request) -> Result<Response> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let reply = (self.respond)(&request);
        self.requests.lock().expect("lock").push(request);
        reply
    }
}

fn api(transport: &MockTransport) -> Fata<MockTransport> {
    FataBuilder::new(transport.clone())
        .base_url("https://api.test/")
        .build()
}

fn body_text(request: &Request) -> Option<String> {
    request
        .body()
        .map(|body| String::from_utf8_lossy(body).into_owned())
}

#[tokio::test]
async fn resolves_url_with_path_and_query() {
    let transport = MockTransport::json("{}");
    let fata = api(&transport);

    fata.get(
        "/users/{id}",
        RequestOptions::new().path("id", 7).query("active", true),
    )
    .await
    .expect("payload");

    assert_eq!(
        transport.last().url().as_str(),
        "https://api.test/users/7?active=true"
    );
}

#[tokio::test]
async fn unmatched_placeholder_is_left_alone() {
    let transport = MockTransport::json("{}");
    let fata = api(&transport);

    fata.get(
        "/users/{id}/{other}",
        RequestOptions::new().path("id", 7).query_opt("skip", None::<&str>),
    )
    .await
    .expect("payload");

    assert_eq!(
        transport.last().url().as_str(),
        "https://api.test/users/7/%7Bother%7D"
    );
}

#[tokio::test]
async fn absolute_url_bypasses_base() {
    let transport = MockTransport::json("{}");
    let fata = api(&transport);
    let url = url::Url::parse("https://other.test/ping").expect("valid URL");

    fata.get(url, RequestOptions::new()).await.expect("payload");

    assert_eq!(transport.last().url().as_str(), "https://other.test/ping");
}

#[tokio::test]
async fn invalid_url_rejects_before_dispatch() {
    let transport = MockTransport::json("{}");
    let fata = FataBuilder::new(transport.clone()).build();

    let err = fata
        .get("/relative-without-base", RequestOptions::new())
        .await
        .expect_err("invalid URL");

    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn json_body_sets_content_type() {
    let transport = MockTransport::json("{}");
    let fata = api(&transport);

    fata.post("/users", RequestOptions::new().body(json!({"name": "x"})))
        .await
        .expect("payload");

    let request = transport.last();
    assert_eq!(
        request.header("content-type"),
        Some("application/json; charset=utf-8")
    );
    assert_eq!(body_text(&request).as_deref(), Some(r#"{"name":"x"}"#));
}

#[tokio::test]
async fn json_body_round_trips() {
    let transport = MockTransport::json("{}");
    let fata = api(&transport);
    let record = json!({"name": "x", "tags": ["a", "b"], "nested": {"n": 1.5}});

    fata.put(
        "/users/1",
        RequestOptions::new()
            .header("Content-Type", "application/xml")
            .body(record.clone()),
    )
    .await
    .expect("payload");

    let request = transport.last();
    assert!(
        request
            .header("content-type")
            .is_some_and(|value| value.starts_with("application/json"))
    );
    let sent: serde_json::Value =
        serde_json::from_slice(request.body().expect("body")).expect("json body");
    assert_eq!(sent, record);
}

#[tokio::test]
async fn serializable_struct_body() {
    #[derive(serde::Serialize)]
    struct NewUser<'a> {
        name: &'a str,
    }

    let transport = MockTransport::json("{}");
    let fata = api(&transport);

    fata.post(
        "/users",
        RequestOptions::new()
            .json(&NewUser { name: "Ada" })
            .expect("serializable"),
    )
    .await
    .expect("payload");

    assert_eq!(body_text(&transport.last()).as_deref(), Some(r#"{"name":"Ada"}"#));
}

#[tokio::test]
async fn get_and_head_never_send_a_body() {
    let transport = MockTransport::replying(200, None, "");
    let fata = api(&transport);

    for method in [Method::Get, Method::Head] {
        let config = RequestOptions::new()
            .header("Content-Type", "application/json")
            .body(json!({"ignored": true}))
            .into_config(method, "/items");
        fata.request(config).await.expect("payload");

        let request = transport.last();
        assert_eq!(request.method(), method);
        assert!(request.body().is_none());
        assert!(request.header("content-type").is_none());
    }
}

#[tokio::test]
async fn scalar_bodies_are_text() {
    let transport = MockTransport::json("{}");
    let fata = api(&transport);

    let bodies: Vec<(Body, &str)> = vec![
        (Body::from("hello"), "hello"),
        (Body::from(true), "true"),
        (Body::from(42_u32), "42"),
        (Body::from(json!(-1.5)), "-1.5"),
    ];
    for (body, expected) in bodies {
        fata.post("/echo", RequestOptions::new().body(body))
            .await
            .expect("payload");

        let request = transport.last();
        assert_eq!(
            request.header("content-type"),
            Some("text/plain; charset=utf-8")
        );
        assert_eq!(body_text(&request).as_deref(), Some(expected));
    }
}

#[tokio::test]
async fn binary_bodies_keep_caller_content_type() {
    let transport = MockTransport::json("{}");
    let fata = api(&transport);

    fata.post(
        "/upload",
        RequestOptions::new()
            .header("Content-Type", "image/png")
            .body(Bytes::from_static(b"\x89PNG")),
    )
    .await
    .expect("payload");
    let request = transport.last();
    assert_eq!(request.header("content-type"), Some("image/png"));
    assert_eq!(request.body().map(Bytes::as_ref), Some(&b"\x89PNG"[..]));

    fata.post("/upload", RequestOptions::new().body(vec![1_u8, 2, 3]))
        .await
        .expect("payload");
    assert!(transport.last().header("content-type").is_none());

    fata.post(
        "/upload",
        RequestOptions::new().body(Blob::new("<svg/>").with_type("image/svg+xml")),
    )
    .await
    .expect("payload");
    assert_eq!(transport.last().header("content-type"), Some("image/svg+xml"));
}

#[tokio::test]
async fn stream_body_is_buffered() {
    let transport = MockTransport::json("{}");
    let fata = api(&transport);
    let chunks = futures_util::stream::iter(vec![
        Ok::<_, Error>(Bytes::from_static(b"chunk-1,")),
        Ok(Bytes::from_static(b"chunk-2")),
    ]);

    fata.post("/stream", RequestOptions::new().body(Body::stream(chunks)))
        .await
        .expect("payload");

    assert_eq!(body_text(&transport.last()).as_deref(), Some("chunk-1,chunk-2"));
}

#[tokio::test]
async fn form_builders_pick_their_encoding() {
    let transport = MockTransport::json("{}");
    let fata = api(&transport);

    fata.post(
        "/login",
        RequestOptions::new()
            .header("Content-Type", "application/json")
            .body(
                UrlSearchParams::new()
                    .field("user", "ada")
                    .optional_field("otp", None::<u32>),
            ),
    )
    .await
    .expect("payload");
    let request = transport.last();
    assert_eq!(
        request.header("content-type"),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(body_text(&request).as_deref(), Some("user=ada"));

    fata.post(
        "/profile",
        RequestOptions::new().body(FormData::new().field("name", "Ada").boundary("b0undary")),
    )
    .await
    .expect("payload");
    let request = transport.last();
    assert_eq!(
        request.header("content-type"),
        Some("multipart/form-data; boundary=b0undary")
    );
    assert!(
        body_text(&request)
            .expect("body")
            .contains("Content-Disposition: form-data; name=\"name\"")
    );
}

#[tokio::test]
async fn header_precedence() {
    let transport = MockTransport::json("{}");
    let fata = FataBuilder::new(transport.clone())
        .base_url("https://api.test")
        .header("X-Tier", "common")
        .header("X-Common", "yes")
        .method_header(Method::Get, "X-Tier", "method")
        .method_header(Method::Get, "X-Method", "yes")
        .build();

    fata.get("/a", RequestOptions::new()).await.expect("payload");
    let request = transport.last();
    assert_eq!(request.header("x-tier"), Some("method"));
    assert_eq!(request.header("x-common"), Some("yes"));
    assert_eq!(request.header("x-method"), Some("yes"));
    assert_eq!(request.header("accept"), Some(fata::DEFAULT_ACCEPT));

    fata.get(
        "/a",
        RequestOptions::new()
            .header("x-tier", "caller")
            .unset_header("Accept"),
    )
    .await
    .expect("payload");
    let request = transport.last();
    assert_eq!(request.header("x-tier"), Some("caller"));
    assert!(request.header("accept").is_none());

    fata.post("/a", RequestOptions::new()).await.expect("payload");
    let request = transport.last();
    assert_eq!(request.header("x-tier"), Some("common"));
    assert!(request.header("x-method").is_none());
}

#[tokio::test]
async fn defaults_mutation_applies_to_later_requests() {
    let transport = MockTransport::json("{}");
    let fata = api(&transport);

    fata.update_defaults(|defaults| {
        defaults.headers.common.set("Authorization", "Bearer t0k3n");
    });
    fata.set_base_url("https://v2.api.test");
    fata.get("/me", RequestOptions::new()).await.expect("payload");

    let request = transport.last();
    assert_eq!(request.url().as_str(), "https://v2.api.test/me");
    assert_eq!(request.header("authorization"), Some("Bearer t0k3n"));
}

#[tokio::test]
async fn request_interceptors_run_in_order_on_resolved_config() {
    let transport = MockTransport::json("{}");
    let fata = api(&transport);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let log = Arc::clone(&seen);
    fata.interceptors()
        .request
        .register(move |mut config: RequestConfig| {
            let log = Arc::clone(&log);
            async move {
                let url = config.url.as_url().map(ToString::to_string);
                log.lock().expect("lock").push(url.unwrap_or_default());
                config.header.set("Authorization", "Bearer first");
                Ok(config)
            }
        });
    let log = Arc::clone(&seen);
    fata.interceptors()
        .request
        .register(move |mut config: RequestConfig| {
            let log = Arc::clone(&log);
            async move {
                let auth = config.header.get("authorization").unwrap_or_default();
                log.lock().expect("lock").push(auth.to_string());
                if let Some(url) = config.url_mut() {
                    url.query_pairs_mut().append_pair("signed", "1");
                }
                Ok(config)
            }
        });

    fata.get("/users/{id}", RequestOptions::new().path("id", 1))
        .await
        .expect("payload");

    assert_eq!(
        *seen.lock().expect("lock"),
        ["https://api.test/users/1", "Bearer first"]
    );
    assert_eq!(
        transport.last().url().as_str(),
        "https://api.test/users/1?signed=1"
    );
}

#[tokio::test]
async fn request_interceptor_failure_skips_dispatch_and_error_chain() {
    let transport = MockTransport::json("{}");
    let fata = api(&transport);
    let error_chain_ran = Arc::new(Mutex::new(false));

    fata.interceptors()
        .request
        .register(|_config: RequestConfig| async { Err(Error::interceptor("not signed in")) });
    let flag = Arc::clone(&error_chain_ran);
    fata.interceptors().response.register(
        |_config, _head, data| async move { Ok(data) },
        move |_config, _err| {
            let flag = Arc::clone(&flag);
            async move {
                *flag.lock().expect("lock") = true;
                Ok(Payload::Text("recovered".to_string()))
            }
        },
    );

    let err = fata
        .get("/me", RequestOptions::new())
        .await
        .expect_err("interceptor failure");

    assert_eq!(err.kind(), ErrorKind::Interceptor);
    assert_eq!(err.message(), "not signed in");
    assert!(transport.requests().is_empty());
    assert!(!*error_chain_ran.lock().expect("lock"));
}

#[tokio::test]
async fn removed_interceptor_is_skipped() {
    let transport = MockTransport::json("{}");
    let fata = api(&transport);

    let handle = fata
        .interceptors()
        .request
        .register(|mut config: RequestConfig| async move {
            config.header.set("X-Removed", "no");
            Ok(config)
        });
    assert!(handle.remove());
    assert!(!handle.remove());

    fata.get("/x", RequestOptions::new()).await.expect("payload");
    assert!(transport.last().header("x-removed").is_none());
}

#[tokio::test]
async fn not_found_rejects_with_status_text() {
    let transport = MockTransport::new(|_| {
        Ok(Response::new(404, HeaderMap::new(), r#"{"error":"missing"}"#)
            .with_status_text("Not Found"))
    });
    let fata = api(&transport);

    let err = fata
        .get("/users/404", RequestOptions::new())
        .await
        .expect_err("not found");

    assert_eq!(err.kind(), ErrorKind::Http);
    insta::assert_snapshot!(err, @"Not Found");
    assert_eq!(err.status(), Some(404));

    #[derive(Debug, serde::Deserialize)]
    struct ApiError {
        error: String,
    }
    let body: ApiError = err.decode_body().expect("response").expect("json");
    assert_eq!(body.error, "missing");
}

#[tokio::test]
async fn non_ok_response_only_reaches_error_chain() {
    let transport = MockTransport::replying(503, Some("text/plain"), "down");
    let fata = api(&transport);
    let success_ran = Arc::new(Mutex::new(false));

    let flag = Arc::clone(&success_ran);
    fata.interceptors().response.register(
        move |_config, _head, data| {
            let flag = Arc::clone(&flag);
            async move {
                *flag.lock().expect("lock") = true;
                Ok(data)
            }
        },
        |_config, err: Error| async move {
            let status = err.status().unwrap_or_default();
            Ok(Payload::Json(json!({"fallback": true, "status": status})))
        },
    );

    let payload = fata
        .get("/flaky", RequestOptions::new())
        .await
        .expect("recovered");

    assert_eq!(payload, Payload::Json(json!({"fallback": true, "status": 503})));
    assert!(!*success_ran.lock().expect("lock"));
}

#[tokio::test]
async fn error_chain_keeps_last_result_and_sees_original_error() {
    let transport = MockTransport::new(|_| Err(Error::transport("connection refused")));
    let fata = api(&transport);
    let seen = Arc::new(Mutex::new(Vec::new()));

    for label in ["first", "second"] {
        let log = Arc::clone(&seen);
        fata.interceptors().response.register(
            |_config, _head, data| async move { Ok(data) },
            move |_config, err: Error| {
                let log = Arc::clone(&log);
                async move {
                    log.lock().expect("lock").push(err.message().to_string());
                    Ok(Payload::Text(label.to_string()))
                }
            },
        );
    }

    let payload = fata.get("/x", RequestOptions::new()).await.expect("recovered");

    assert_eq!(payload, Payload::Text("second".to_string()));
    assert_eq!(
        *seen.lock().expect("lock"),
        ["connection refused", "connection refused"]
    );
}

#[tokio::test]
async fn failing_error_transform_rejects() {
    let transport = MockTransport::new(|_| Err(Error::transport("connection refused")));
    let fata = api(&transport);

    fata.interceptors().response.register(
        |_config, _head, data| async move { Ok(data) },
        |_config, err: Error| async move {
            Err(Error::interceptor(format!("wrapped: {err}")))
        },
    );

    let err = fata
        .get("/x", RequestOptions::new())
        .await
        .expect_err("rejected");
    assert_eq!(err.kind(), ErrorKind::Interceptor);
    assert_eq!(err.message(), "wrapped: connection refused");
}

#[tokio::test]
async fn success_chain_unwraps_envelope() {
    let transport = MockTransport::json(r#"{"code":0,"data":{"id":7,"name":"Ada"}}"#);
    let fata = api(&transport);

    fata.interceptors().response.register(
        |_config, head: Arc<fata::ResponseHead>, data: Payload| async move {
            assert_eq!(head.status(), 200);
            match data {
                Payload::Json(mut envelope) => Ok(Payload::Json(envelope["data"].take())),
                other => Ok(other),
            }
        },
        |_config, err| async move { Err(err) },
    );

    #[derive(Debug, PartialEq, serde::Deserialize)]
    struct User {
        id: u64,
        name: String,
    }

    let user: User = fata
        .get("/users/7", RequestOptions::new())
        .await
        .expect("payload")
        .deserialize()
        .expect("user");
    assert_eq!(
        user,
        User {
            id: 7,
            name: "Ada".to_string()
        }
    );
}

#[tokio::test]
async fn decode_failure_reaches_error_chain() {
    let transport = MockTransport::json("{not json");
    let fata = api(&transport);

    fata.interceptors().response.register(
        |_config, _head, data| async move { Ok(data) },
        |_config, err: Error| async move {
            assert_eq!(err.kind(), ErrorKind::Decode);
            Ok(Payload::Text("raw fallback".to_string()))
        },
    );

    let payload = fata.get("/broken", RequestOptions::new()).await.expect("recovered");
    assert_eq!(payload, Payload::Text("raw fallback".to_string()));
}

#[tokio::test]
async fn inbound_negotiation_by_content_type() {
    let cases = [
        (Some("application/json"), r#"{"a":1}"#, Payload::Json(json!({"a": 1}))),
        (
            Some("application/x-www-form-urlencoded"),
            "a=1&b=two",
            Payload::Form(vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "two".to_string()),
            ]),
        ),
        (
            Some("application/octet-stream"),
            "\u{1}\u{2}",
            Payload::Blob(Bytes::from_static(b"\x01\x02")),
        ),
        (Some("text/csv"), "a,b", Payload::Text("a,b".to_string())),
        (None, "plain", Payload::Text("plain".to_string())),
    ];

    for (content_type, body, expected) in cases {
        let transport = MockTransport::replying(200, content_type, body);
        let payload = api(&transport)
            .get("/data", RequestOptions::new())
            .await
            .expect("payload");
        assert_eq!(payload, expected, "content type {content_type:?}");
    }
}

#[tokio::test]
async fn empty_json_body_is_null() {
    let transport = MockTransport::replying(200, Some("application/json"), "");
    let payload = api(&transport)
        .get("/nothing", RequestOptions::new())
        .await
        .expect("payload");

    assert_eq!(payload, Payload::Json(serde_json::Value::Null));
}

#[tokio::test]
async fn binary_body_with_unknown_type_is_text() {
    let transport = MockTransport::new(|_| {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "image/png".parse().expect("content type"));
        Ok(Response::new(200, headers, vec![0x89, b'P', b'N', b'G', 0xff, 0xd8]))
    });
    let payload = api(&transport)
        .get("/logo.png", RequestOptions::new())
        .await
        .expect("payload");

    assert_eq!(payload, Payload::Text("\u{FFFD}PNG\u{FFFD}\u{FFFD}".to_string()));
}

#[tokio::test]
async fn decoder_override_bypasses_content_type() {
    let transport = MockTransport::json(r#"{"a":1}"#);
    let fata = api(&transport);

    let payload = fata
        .get(
            "/raw",
            RequestOptions::new().decoder(ResponseDecoder::text()),
        )
        .await
        .expect("payload");
    assert_eq!(payload, Payload::Text(r#"{"a":1}"#.to_string()));

    let payload = fata
        .get(
            "/raw",
            RequestOptions::new().decoder(ResponseDecoder::new(|response: Response| async move {
                Ok(Payload::Text(response.status().to_string()))
            })),
        )
        .await
        .expect("payload");
    assert_eq!(payload, Payload::Text("200".to_string()));
}

#[tokio::test]
async fn transport_options_are_forwarded() {
    let transport = MockTransport::json("{}");
    let fata = api(&transport);
    let controller = AbortController::new();

    fata.get(
        "/x",
        RequestOptions::new()
            .redirect(RedirectPolicy::Manual)
            .integrity("sha256-abc")
            .signal(controller.signal()),
    )
    .await
    .expect("payload");

    let request = transport.last();
    let options = request.options();
    assert_eq!(options.redirect, Some(RedirectPolicy::Manual));
    assert_eq!(options.integrity.as_deref(), Some("sha256-abc"));
    assert!(options.signal.is_some());
}

#[tokio::test(start_paused = true)]
async fn timeout_rejects_and_reaches_error_chain() {
    let transport = MockTransport::json("{}").delayed(Duration::from_millis(200));
    let fata = api(&transport);
    let seen = Arc::new(Mutex::new(None));

    let slot = Arc::clone(&seen);
    fata.interceptors().response.register(
        |_config, _head, data| async move { Ok(data) },
        move |_config, err: Error| {
            let slot = Arc::clone(&slot);
            async move {
                *slot.lock().expect("lock") = Some(err.kind());
                Err(err)
            }
        },
    );

    let err = fata
        .get(
            "/slow",
            RequestOptions::new().timeout(Duration::from_millis(50)),
        )
        .await
        .expect_err("timeout");

    assert!(err.is_timeout());
    assert!(err.response().is_none());
    insta::assert_snapshot!(err, @"timeout of 50ms");
    assert_eq!(*seen.lock().expect("lock"), Some(ErrorKind::Timeout));
}

#[tokio::test(start_paused = true)]
async fn default_timeout_applies_when_unset_or_zero() {
    let transport = MockTransport::json("{}").delayed(Duration::from_millis(200));
    let fata = FataBuilder::new(transport.clone())
        .base_url("https://api.test")
        .timeout(Duration::from_millis(100))
        .build();

    let err = fata
        .get("/slow", RequestOptions::new().timeout(Duration::ZERO))
        .await
        .expect_err("timeout");
    insta::assert_snapshot!(err, @"timeout of 100ms");

    fata.get(
        "/slow",
        RequestOptions::new().timeout(Duration::from_millis(300)),
    )
    .await
    .expect("settles in time");
}

#[tokio::test(start_paused = true)]
async fn zero_default_timeout_disables_race() {
    let transport = MockTransport::json("{}").delayed(Duration::from_secs(3600));
    let fata = FataBuilder::new(transport.clone())
        .base_url("https://api.test")
        .timeout(Duration::ZERO)
        .build();

    fata.get("/slow", RequestOptions::new())
        .await
        .expect("no race");
}

#[tokio::test]
async fn concurrent_requests_are_independent() {
    let transport = MockTransport::new(|request| {
        let id = request.url().path().trim_start_matches("/users/").to_string();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "application/json".parse().expect("content type"));
        Ok(Response::new(200, headers, format!(r#"{{"id":{id}}}"#)))
    });
    let fata = api(&transport);

    let requests = (1..=5).map(|id| {
        let fata = fata.clone();
        async move {
            fata.get("/users/{id}", RequestOptions::new().path("id", id))
                .await
        }
    });
    let payloads = futures_util::future::join_all(requests).await;

    for (index, payload) in payloads.into_iter().enumerate() {
        assert_eq!(
            payload.expect("payload"),
            Payload::Json(json!({"id": index + 1}))
        );
    }
    assert_eq!(transport.requests().len(), 5);
}
