use crate::util::{RequestBody, api_request};

pub async fn run(api_url: &str) -> i32 {
    match api_request(api_url, reqwest::Method::GET, "/health", RequestBody::None, &[]).await {
        Ok(response) => {
            crate::util::print_json(&response.body);
            response.exit_code
        }
        Err(code) => code,
    }
}
