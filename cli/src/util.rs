use serde_json::{Value, json};

pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}

pub fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}

/// Print a structured CLI error to stderr and exit with status 1.
pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    print_error("cli_error", message, docs_hint);
    std::process::exit(1);
}

fn print_error(code: &str, message: &str, docs_hint: Option<&str>) {
    let mut err = json!({
        "error": code,
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    match serde_json::to_string_pretty(&err) {
        Ok(text) => eprintln!("{text}"),
        Err(_) => eprintln!("{err}"),
    }
}

pub enum RequestBody {
    None,
    /// Pre-serialized JSON, sent byte for byte so a signature over it stays valid
    Json(Vec<u8>),
}

pub struct ApiResponse {
    pub exit_code: i32,
    pub body: Value,
}

/// Send one request to the bridge.
///
/// Exit codes: 0 = 2xx, 1 = 4xx, 2 = 5xx, 3 = connection error, 4 = usage error.
/// Connection and usage errors are printed here and returned as `Err(code)`.
pub async fn api_request(
    api_url: &str,
    method: reqwest::Method,
    path: &str,
    body: RequestBody,
    extra_headers: &[(String, String)],
) -> Result<ApiResponse, i32> {
    let url = match reqwest::Url::parse(&format!("{}{path}", api_url.trim_end_matches('/'))) {
        Ok(url) => url,
        Err(e) => {
            print_error("cli_error", &format!("Invalid URL: {api_url}{path}: {e}"), None);
            return Err(4);
        }
    };

    let mut req = client().request(method, url);
    for (k, v) in extra_headers {
        req = req.header(k.as_str(), v.as_str());
    }
    if let RequestBody::Json(bytes) = body {
        req = req.header("content-type", "application/json").body(bytes);
    }

    let resp = match req.send().await {
        Ok(r) => r,
        Err(e) => {
            print_error(
                "connection_error",
                &format!("{e}"),
                Some("Is the bridge running? Check DESKBRIDGE_API_URL."),
            );
            return Err(3);
        }
    };

    let exit_code = match resp.status().as_u16() {
        200..=299 => 0,
        400..=499 => 1,
        _ => 2,
    };
    let text = resp.text().await.unwrap_or_default();
    let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
    Ok(ApiResponse { exit_code, body })
}
