//! Tests de integración para el servidor HTTP
//! tests/integration_test.rs
//!
//! Cada test levanta su propio `Router` en un puerto efímero y habla con él
//! por TCP real, así que no hace falta tener el binario corriendo.

use mini_httpd::error::{HandlerError, ServerError};
use mini_httpd::http::Response;
use mini_httpd::router::Router;
use serde_json::Value;
use std::io::{Read, Write};
use std::net::{Ipv4Addr, Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

const NOT_FOUND_BODY: &str = "<html><body><h1>404 - Not Found</h1></body></html>";

/// Helper: servidor en 0.0.0.0 con puerto efímero, ya arrancado
fn start_router(setup: impl FnOnce(&mut Router)) -> Router {
    let mut router = Router::new(0).expect("Failed to bind");
    setup(&mut router);
    router.start().expect("Failed to start");
    router
}

fn connect(router: &Router) -> TcpStream {
    let addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), router.local_addr().port());
    let stream = TcpStream::connect(addr).expect("Failed to connect");
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    stream.set_write_timeout(Some(Duration::from_secs(5))).unwrap();
    stream
}

/// Helper: envía un request crudo y retorna la response completa
fn send_raw(router: &Router, raw: &str) -> String {
    let mut stream = connect(router);
    stream.write_all(raw.as_bytes()).unwrap();
    stream.flush().unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    response
}

/// Helper: extrae el body de una response HTTP
fn extract_body(response: &str) -> &str {
    match response.find("\r\n\r\n") {
        Some(pos) => &response[pos + 4..],
        None => "",
    }
}

#[test]
fn test_get_root_html() {
    let router = start_router(|r| r.get("/", |_req| Response::html("<h1>Hi</h1>")));

    let response = send_raw(&router, "GET / HTTP/1.1\r\nHost: localhost\r\n\r\n");

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "got: {response}");
    assert!(response.contains("Content-Type: text/html\r\n"));
    assert!(response.contains("Content-Length: 11\r\n"));
    assert_eq!(extract_body(&response), "<h1>Hi</h1>");
}

#[test]
fn test_post_echo_body() {
    let router = start_router(|r| {
        r.post("/echo", |req| Response::text(&String::from_utf8_lossy(req.body())))
    });

    let response = send_raw(&router, "POST /echo HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc");

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("Content-Length: 3\r\n"));
    assert_eq!(extract_body(&response), "abc");
}

#[test]
fn test_json_echo_with_serde() {
    let router = start_router(|r| {
        r.post("/api/echo", |req| {
            Response::json_value(&serde_json::json!({
                "method": req.method(),
                "path": req.path(),
                "body": String::from_utf8_lossy(req.body()),
            }))
        })
    });

    let response = send_raw(&router, "POST /api/echo HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello");
    assert!(response.contains("Content-Type: application/json\r\n"));

    let json: Value = serde_json::from_str(extract_body(&response)).expect("valid JSON");
    assert_eq!(json["method"], "POST");
    assert_eq!(json["path"], "/api/echo");
    assert_eq!(json["body"], "hello");
}

#[test]
fn test_unmatched_route_is_404() {
    let router = start_router(|r| r.get("/", |_req| Response::text("root")));

    let response = send_raw(&router, "GET /missing HTTP/1.1\r\n\r\n");

    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(response.contains("Content-Type: text/html\r\n"));
    assert_eq!(extract_body(&response), NOT_FOUND_BODY);
}

#[test]
fn test_unmatched_route_with_headers_and_body_is_404() {
    let router = start_router(|r| {
        r.post("/echo", |req| Response::text(&String::from_utf8_lossy(req.body())))
    });

    let response = send_raw(
        &router,
        "POST /missing HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nX-Trace: 42\r\nContent-Length: 10\r\n\r\n{\"k\": \"v\"}",
    );

    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"), "got: {response}");
    assert!(response.contains("Content-Type: text/html\r\n"));
    assert!(response.contains(&format!("Content-Length: {}\r\n", NOT_FOUND_BODY.len())));
    assert_eq!(extract_body(&response), NOT_FOUND_BODY);
}

#[test]
fn test_method_mismatch_is_404() {
    let router = start_router(|r| r.get("/only-get", |_req| Response::text("ok")));

    let response = send_raw(&router, "POST /only-get HTTP/1.1\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
}

#[test]
fn test_query_string_does_not_match() {
    let router = start_router(|r| r.get("/hello", |_req| Response::text("hello")));

    let exact = send_raw(&router, "GET /hello HTTP/1.1\r\n\r\n");
    assert_eq!(extract_body(&exact), "hello");

    let with_query = send_raw(&router, "GET /hello?name=Ana HTTP/1.1\r\n\r\n");
    assert!(with_query.starts_with("HTTP/1.1 404 Not Found\r\n"));
}

#[test]
fn test_put_and_delete_routes() {
    let router = start_router(|r| {
        r.put("/item", |_req| Response::text("updated"));
        r.delete("/item", |_req| Response::text("deleted"));
    });

    assert_eq!(extract_body(&send_raw(&router, "PUT /item HTTP/1.1\r\n\r\n")), "updated");
    assert_eq!(extract_body(&send_raw(&router, "DELETE /item HTTP/1.1\r\n\r\n")), "deleted");
}

#[test]
fn test_handler_error_is_500() {
    let router = start_router(|r| {
        r.get("/boom", |_req| -> Result<Response, HandlerError> { Err("database down".into()) })
    });

    let response = send_raw(&router, "GET /boom HTTP/1.1\r\n\r\n");

    assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    assert!(response.contains("Content-Type: text/plain\r\n"));
    assert!(response.contains("Content-Length: 21\r\n"));
    assert_eq!(extract_body(&response), "Internal Server Error");
}

#[test]
fn test_handler_panic_is_500_and_server_survives() {
    let router = start_router(|r| {
        r.get("/panic", |_req| -> Response { panic!("handler bug") });
        r.get("/ok", |_req| Response::text("still alive"));
    });

    let response = send_raw(&router, "GET /panic HTTP/1.1\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));

    let response = send_raw(&router, "GET /ok HTTP/1.1\r\n\r\n");
    assert_eq!(extract_body(&response), "still alive");
}

#[test]
fn test_handler_content_length_is_overridden() {
    let router = start_router(|r| {
        r.get("/lying", |_req| Response::text("four").with_header("Content-Length", "999"))
    });

    let response = send_raw(&router, "GET /lying HTTP/1.1\r\n\r\n");

    assert!(response.contains("Content-Length: 4\r\n"));
    assert!(!response.contains("999"));
    assert_eq!(extract_body(&response), "four");
}

#[test]
fn test_custom_status_and_headers() {
    let router = start_router(|r| {
        r.post("/things", |_req| {
            Response::json(r#"{"id":1}"#)
                .with_status(201)
                .with_header("X-Request-Id", "abc123")
        })
    });

    let response = send_raw(&router, "POST /things HTTP/1.1\r\n\r\n");

    assert!(response.starts_with("HTTP/1.1 201 Created\r\n"));
    assert!(response.contains("X-Request-Id: abc123\r\n"));
}

#[test]
fn test_empty_connection_gets_no_response() {
    let router = start_router(|r| r.get("/", |_req| Response::text("root")));

    let mut stream = connect(&router);
    stream.shutdown(Shutdown::Write).unwrap();

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).unwrap();
    assert!(buf.is_empty());
}

#[test]
fn test_concurrent_clients() {
    let router = start_router(|r| r.get("/", |_req| Response::text("ok")));
    let addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), router.local_addr().port());

    let clients: Vec<_> = (0..8)
        .map(|_| {
            std::thread::spawn(move || {
                let mut stream = TcpStream::connect(addr).unwrap();
                stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
                stream.write_all(b"GET / HTTP/1.1\r\n\r\n").unwrap();
                let mut response = String::new();
                stream.read_to_string(&mut response).unwrap();
                response
            })
        })
        .collect();

    for client in clients {
        let response = client.join().unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    }
}

#[test]
fn test_lifecycle() {
    let mut router = Router::new(0).expect("Failed to bind");
    router.start().unwrap();
    assert!(matches!(router.start(), Err(ServerError::AlreadyRunning)));

    router.stop();
    router.stop();
    assert!(!router.is_running());
    assert!(matches!(router.start(), Err(ServerError::Stopped)));
}

#[test]
fn test_port_conflict() {
    let first = Router::new(0).expect("Failed to bind");
    let second = Router::new(first.local_addr().port());

    assert!(matches!(second, Err(ServerError::Bind { .. })));
}
