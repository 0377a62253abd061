use anyhow::{Context, Result, anyhow};
use reqwest::Response;

/// Read the body of `res`, failing with status and a body excerpt on non-2xx.
pub(crate) async fn success_body(res: Response, what: &str) -> Result<String> {
    let status = res.status();
    let body = res
        .text()
        .await
        .with_context(|| format!("Failed to read {what} response body"))?;

    if !status.is_success() {
        return Err(anyhow!(
            "{what} request failed with status {}: {}",
            status,
            truncate_body(&body),
        ));
    }

    Ok(body)
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
