//! The `http` native and its parameter type, registered into an
//! interpreter's startup scope.

use indexmap::IndexMap;
use mindscript_core::builtins::define_native;
use mindscript_core::interpreter::{Interpreter, Interrupt};
use mindscript_core::tokens::Token;
use mindscript_core::values::{unwrap, wrap, MObject, MValue, Value};
use std::time::Instant;

const HTTP_PARAMS: &str = "let HTTPParams = type {
    mode: Str?,
    cache: Str?,
    credentials: Str?,
    headers: {}?,
    redirect: Str?,
    referrerPolicy: Str?,
    body: {}?
}";

fn error_map(kind: &str, detail: &str) -> MObject {
    let mut map = IndexMap::new();
    map.insert("error".to_string(), MObject::str(kind));
    map.insert("detail".to_string(), MObject::str(detail));
    MObject::map(map)
}

fn http(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> Result<MObject, Interrupt> {
    let params = args.first().map(unwrap).unwrap_or(serde_json::Value::Null);
    let method = match args.get(1) {
        Some(MObject::Value(MValue {
            value: Value::Str(m),
            ..
        })) => m.to_string(),
        _ => "GET".to_string(),
    };
    let Some(MObject::Value(MValue {
        value: Value::Str(url),
        ..
    })) = args.get(2)
    else {
        return Ok(MObject::null());
    };

    let method = match reqwest::Method::from_bytes(method.to_uppercase().as_bytes()) {
        Ok(method) => method,
        Err(_) => return Ok(error_map("Invalid method", &method)),
    };

    let client = reqwest::blocking::Client::new();
    let mut request = client
        .request(method, url.as_ref())
        .timeout(crate::TIMEOUT);
    if let Some(headers) = params.get("headers").and_then(|h| h.as_object()) {
        for (name, value) in headers {
            if let Some(value) = value.as_str() {
                request = request.header(name, value);
            }
        }
    }
    if let Some(body) = params.get("body") {
        if !body.is_null() {
            request = request.json(body);
        }
    }

    let started = Instant::now();
    let response = match request.send() {
        Ok(response) => response,
        Err(e) if e.is_timeout() => return Ok(error_map("Timeout", &e.to_string())),
        Err(e) if e.is_connect() => return Ok(error_map("Connection error", &e.to_string())),
        Err(e) => return Ok(error_map("Request error", &e.to_string())),
    };

    let status = response.status();
    let mut headers = IndexMap::new();
    for (name, value) in response.headers() {
        headers.insert(
            name.to_string(),
            MObject::str(value.to_str().unwrap_or_default()),
        );
    }
    let is_json = response
        .headers()
        .get("Content-Type")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false);
    let final_url = response.url().to_string();
    let text = match response.text() {
        Ok(text) => text,
        Err(e) => return Ok(error_map("Decode error", &e.to_string())),
    };

    let mut result = IndexMap::new();
    result.insert("statusCode".to_string(), MObject::int(status.as_u16() as i64));
    result.insert("headers".to_string(), MObject::map(headers));
    result.insert(
        "reason".to_string(),
        MObject::str(status.canonical_reason().unwrap_or_default()),
    );
    result.insert(
        "elapsed_ms".to_string(),
        MObject::num(started.elapsed().as_secs_f64() * 1000.0),
    );
    result.insert(
        "is_redirect".to_string(),
        MObject::bool(status.is_redirection()),
    );
    result.insert("text".to_string(), MObject::str(&text));
    result.insert("url".to_string(), MObject::str(&final_url));
    if is_json {
        if let Ok(decoded) = serde_json::from_str::<serde_json::Value>(&text) {
            result.insert("json".to_string(), wrap(&decoded));
        }
    }
    Ok(MObject::map(result))
}

/// Evaluate the `HTTPParams` type and bind the `http` native. Meant to run
/// through the bootstrap hook so both land in the startup scope.
pub fn register(ip: &mut Interpreter) -> Result<(), Interrupt> {
    ip.eval(HTTP_PARAMS, None)?;
    define_native(
        ip,
        "http",
        "fun(params: HTTPParams?, method: Str?, url: Str) -> {}",
        "Makes an HTTP request.",
        Box::new(http),
    )
}
